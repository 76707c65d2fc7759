//! Submission entity <-> model mapper

use points_core::{DomainError, RecordId, Submission, SubmissionPayload};

use crate::models::SubmissionModel;

impl TryFrom<SubmissionModel> for Submission {
    type Error = DomainError;

    fn try_from(model: SubmissionModel) -> Result<Self, Self::Error> {
        let activity = model
            .activity
            .parse()
            .map_err(|e: points_core::UnknownActivityError| DomainError::Internal(e.to_string()))?;
        let status = model
            .status
            .parse()
            .map_err(|e: String| DomainError::Internal(e))?;
        let visibility = model
            .visibility
            .parse()
            .map_err(|e: String| DomainError::Internal(e))?;
        let payload: SubmissionPayload = serde_json::from_value(model.payload)
            .map_err(|e| DomainError::Internal(format!("malformed submission payload: {e}")))?;

        Ok(Submission {
            id: RecordId::new(model.id),
            user_id: RecordId::new(model.user_id),
            activity,
            status,
            visibility,
            payload,
            reviewer_id: model.reviewer_id.map(RecordId::new),
            review_note: model.review_note,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

/// Serialize a submission payload for the JSONB column.
pub fn payload_to_json(submission: &Submission) -> Result<serde_json::Value, DomainError> {
    serde_json::to_value(&submission.payload)
        .map_err(|e| DomainError::Internal(format!("payload serialization: {e}")))
}
