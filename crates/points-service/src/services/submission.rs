//! Submission service
//!
//! Handles submission creation with admission control, plus read queries
//! for a user's submissions.

use chrono::Utc;
use serde_json::json;
use tracing::{info, instrument};
use validator::Validate;

use points_core::entities::{AuditAction, AuditEntry, Submission};
use points_core::policy::{check_rolling_quota, AdmissionPolicy, TraineeCounts};
use points_core::value_objects::RecordId;
use points_core::{ActivityCode, DomainError, UnknownActivityError, Visibility};

use crate::dto::{parse_payload, CreateSubmissionRequest, SubmissionResponse};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

/// Submission service
pub struct SubmissionService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> SubmissionService<'a> {
    /// Create a new SubmissionService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Create a new submission
    ///
    /// Preconditions, in order: the actor exists and is eligible, the
    /// activity code is known, the payload matches the activity's shape,
    /// and the activity's admission policy admits it.
    #[instrument(skip(self, request))]
    pub async fn create_submission(
        &self,
        user_id: RecordId,
        request: CreateSubmissionRequest,
    ) -> ServiceResult<SubmissionResponse> {
        request.validate()?;

        let user = self
            .ctx
            .users()
            .find_by_id(user_id)
            .await?
            .ok_or(DomainError::UserNotFound(user_id))?;
        if !user.can_earn_credit() {
            return Err(DomainError::Ineligible(user_id).into());
        }

        let activity: ActivityCode = request
            .activity
            .parse()
            .map_err(|e: UnknownActivityError| DomainError::UnknownActivity(e.0))?;

        let visibility = match request.visibility.as_deref() {
            None => Visibility::default(),
            Some(raw) => raw
                .parse()
                .map_err(|e: String| ServiceError::validation(e))?,
        };

        let payload = parse_payload(activity, request.payload)?;
        payload.validate()?;

        self.check_admission(user_id, activity, &payload).await?;

        let submission = Submission::new(self.ctx.generate_id(), user_id, payload, visibility);
        self.ctx.submissions().create(&submission).await?;

        let audit = AuditEntry::new(
            self.ctx.generate_id(),
            user_id,
            AuditAction::CreateSubmission,
            "submission",
            submission.id.to_string(),
            Some(json!({ "activity": activity.as_str() })),
        );
        self.ctx.audit().record(&audit).await?;

        info!(submission_id = %submission.id, activity = %activity, "Submission created");

        Ok(SubmissionResponse::from(&submission))
    }

    /// Get one submission
    #[instrument(skip(self))]
    pub async fn get_submission(&self, id: RecordId) -> ServiceResult<SubmissionResponse> {
        let submission = self
            .ctx
            .submissions()
            .find_by_id(id)
            .await?
            .ok_or(DomainError::SubmissionNotFound(id))?;
        Ok(SubmissionResponse::from(&submission))
    }

    /// All submissions for a user, newest first
    #[instrument(skip(self))]
    pub async fn list_user_submissions(
        &self,
        user_id: RecordId,
    ) -> ServiceResult<Vec<SubmissionResponse>> {
        let submissions = self.ctx.submissions().list_by_user(user_id).await?;
        Ok(submissions.iter().map(SubmissionResponse::from).collect())
    }

    /// Evaluate the activity's admission policy against stored submissions.
    async fn check_admission(
        &self,
        user_id: RecordId,
        activity: ActivityCode,
        payload: &points_core::SubmissionPayload,
    ) -> ServiceResult<()> {
        match activity.admission_policy() {
            AdmissionPolicy::Open => {}
            AdmissionPolicy::SingleActive => {
                if self.ctx.submissions().has_active(user_id, activity).await? {
                    return Err(DomainError::DuplicateSubmission.into());
                }
            }
            AdmissionPolicy::RollingQuota(limits) => {
                // Recomputed from raw rows at every evaluation; see the
                // schema notes on the accepted read-then-write race window.
                let now = Utc::now();
                let prior = self
                    .ctx
                    .submissions()
                    .find_since(user_id, activity, now - limits.window())
                    .await?;
                check_rolling_quota(
                    &limits,
                    &prior,
                    TraineeCounts::from_payload(payload),
                    now,
                )?;
            }
        }
        Ok(())
    }
}
