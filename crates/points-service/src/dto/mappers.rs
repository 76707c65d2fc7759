//! DTO mappers

use serde_json::Value as JsonValue;

use points_core::{ActivityCode, DomainError, Submission, SubmissionPayload};

use super::responses::SubmissionResponse;

impl From<&Submission> for SubmissionResponse {
    fn from(submission: &Submission) -> Self {
        Self {
            id: submission.id.to_string(),
            user_id: submission.user_id.to_string(),
            activity: submission.activity.as_str().to_string(),
            status: submission.status.as_str().to_string(),
            visibility: submission.visibility.as_str().to_string(),
            payload: submission.payload.clone(),
            reviewer_id: submission.reviewer_id.map(|id| id.to_string()),
            review_note: submission.review_note.clone(),
            created_at: submission.created_at,
            updated_at: submission.updated_at,
        }
    }
}

/// Parse the request's free-form payload object into the activity's typed
/// payload variant. The variant tag comes from the activity code, not the
/// caller, so a payload can never claim a different stage than the
/// submission it rides on.
pub fn parse_payload(
    activity: ActivityCode,
    payload: JsonValue,
) -> Result<SubmissionPayload, DomainError> {
    let mut object = match payload {
        JsonValue::Object(map) => map,
        other => {
            return Err(DomainError::InvalidPayload(format!(
                "payload must be an object, got {other}"
            )))
        }
    };
    object.insert(
        "kind".to_string(),
        JsonValue::String(activity.as_str().to_string()),
    );

    serde_json::from_value(JsonValue::Object(object))
        .map_err(|e| DomainError::InvalidPayload(e.to_string()))
}
