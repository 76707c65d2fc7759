//! Review service - the review orchestrator
//!
//! Builds everything a reviewer decision writes (status transition, ledger
//! credit, audit rows) and hands it to the transactional review store as
//! one unit. A submission can never be observed approved without its
//! ledger credit, and a retried review is rejected by the pending-status
//! guard before it can pay twice.

use serde_json::json;
use tracing::{info, instrument, warn};
use validator::Validate;

use points_core::entities::{AuditAction, AuditEntry, LedgerEntry, Submission, SubmissionStatus};
use points_core::traits::ReviewDecisionRecord;
use points_core::value_objects::RecordId;
use points_core::DomainError;

use crate::dto::{BulkReviewRequest, BulkReviewResponse, ReviewDecision, ReviewRequest, SubmissionResponse};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

/// Hard cap on bulk review batch size.
pub const BULK_REVIEW_CAP: usize = 50;

/// Review service
pub struct ReviewService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> ReviewService<'a> {
    /// Create a new ReviewService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Review one submission
    #[instrument(skip(self, request))]
    pub async fn review(
        &self,
        submission_id: RecordId,
        reviewer_id: RecordId,
        request: ReviewRequest,
    ) -> ServiceResult<SubmissionResponse> {
        request.validate()?;
        let decision: ReviewDecision = request
            .decision
            .parse()
            .map_err(|e: String| ServiceError::validation(e))?;

        let submission = self
            .ctx
            .submissions()
            .find_by_id(submission_id)
            .await?
            .ok_or(DomainError::SubmissionNotFound(submission_id))?;
        if !submission.status.is_pending() {
            return Err(DomainError::InvalidState {
                current: submission.status,
            }
            .into());
        }

        let record = self.build_decision(
            &submission,
            reviewer_id,
            decision,
            request.note,
            request.point_override,
        )?;
        self.ctx.review_store().commit_decision(&record).await?;

        info!(
            submission_id = %submission_id,
            decision = %request.decision,
            "Submission reviewed"
        );

        let reviewed = self
            .ctx
            .submissions()
            .find_by_id(submission_id)
            .await?
            .ok_or_else(|| ServiceError::internal("reviewed submission vanished"))?;
        Ok(SubmissionResponse::from(&reviewed))
    }

    /// Review a bounded batch with one shared decision and note.
    ///
    /// Submissions that are missing or no longer pending are skipped, not
    /// errors; the store skips any that lose a race after this filter. No
    /// point overrides in bulk.
    #[instrument(skip(self, request), fields(batch_len = request.submission_ids.len()))]
    pub async fn bulk_review(
        &self,
        reviewer_id: RecordId,
        request: BulkReviewRequest,
    ) -> ServiceResult<BulkReviewResponse> {
        request.validate()?;
        if request.submission_ids.len() > BULK_REVIEW_CAP {
            return Err(ServiceError::validation(format!(
                "batch exceeds the {BULK_REVIEW_CAP}-submission cap"
            )));
        }
        let decision: ReviewDecision = request
            .decision
            .parse()
            .map_err(|e: String| ServiceError::validation(e))?;

        let mut records = Vec::with_capacity(request.submission_ids.len());
        for raw_id in &request.submission_ids {
            let id: RecordId = raw_id
                .parse()
                .map_err(|_| ServiceError::validation(format!("invalid submission id: {raw_id}")))?;

            let Some(submission) = self.ctx.submissions().find_by_id(id).await? else {
                warn!(submission_id = %id, "bulk review skipped missing submission");
                continue;
            };
            if !submission.status.is_pending() {
                continue;
            }

            records.push(self.build_decision(
                &submission,
                reviewer_id,
                decision,
                request.note.clone(),
                None,
            )?);
        }

        let processed_count = self.ctx.review_store().commit_batch(&records).await?;

        info!(processed = processed_count, "Bulk review committed");

        Ok(BulkReviewResponse { processed_count })
    }

    /// Assemble the full write set for one decision.
    fn build_decision(
        &self,
        submission: &Submission,
        reviewer_id: RecordId,
        decision: ReviewDecision,
        note: Option<String>,
        point_override: Option<i64>,
    ) -> ServiceResult<ReviewDecisionRecord> {
        match decision {
            ReviewDecision::Reject => Ok(ReviewDecisionRecord {
                submission_id: submission.id,
                reviewer_id,
                status: SubmissionStatus::Rejected,
                note: note.clone(),
                ledger_entry: None,
                audit_entries: vec![AuditEntry::new(
                    self.ctx.generate_id(),
                    reviewer_id,
                    AuditAction::RejectSubmission,
                    "submission",
                    submission.id.to_string(),
                    note.map(|n| json!({ "note": n })),
                )],
            }),
            ReviewDecision::Approve => self.build_approval(submission, reviewer_id, note, point_override),
        }
    }

    fn build_approval(
        &self,
        submission: &Submission,
        reviewer_id: RecordId,
        note: Option<String>,
        point_override: Option<i64>,
    ) -> ServiceResult<ReviewDecisionRecord> {
        // Credit for webhook-paid activities is owned by the ingest path;
        // approval only acknowledges the evidence.
        if !submission.activity.credits_via_manual_review() {
            return Ok(ReviewDecisionRecord {
                submission_id: submission.id,
                reviewer_id,
                status: SubmissionStatus::Approved,
                note,
                ledger_entry: None,
                audit_entries: vec![AuditEntry::new(
                    self.ctx.generate_id(),
                    reviewer_id,
                    AuditAction::ApproveSubmission,
                    "submission",
                    submission.id.to_string(),
                    Some(json!({ "credited_via": "webhook" })),
                )],
            });
        }

        let base_points = self
            .ctx
            .scoring()
            .compute_points(submission.activity, &submission.payload);
        let final_points = point_override.unwrap_or(base_points);

        if let Some(override_points) = point_override {
            let max_adjustment = max_adjustment(base_points);
            if (override_points - base_points).abs() > max_adjustment {
                return Err(DomainError::PointAdjustmentOutOfBounds {
                    base_points,
                    override_points,
                    max_adjustment,
                }
                .into());
            }
        }

        let ledger_entry = LedgerEntry::manual_credit(
            self.ctx.generate_id(),
            submission.user_id,
            submission.activity,
            final_points,
            submission.id,
            Some(json!({ "base_points": base_points })),
        );

        let mut audit_entries = vec![AuditEntry::new(
            self.ctx.generate_id(),
            reviewer_id,
            AuditAction::ApproveSubmission,
            "submission",
            submission.id.to_string(),
            Some(json!({ "points": final_points })),
        )];
        if final_points != base_points {
            audit_entries.push(AuditEntry::new(
                self.ctx.generate_id(),
                reviewer_id,
                AuditAction::AdjustPoints,
                "submission",
                submission.id.to_string(),
                Some(json!({
                    "base_points": base_points,
                    "override_points": final_points,
                    "reason": note.clone(),
                })),
            ));
        }

        Ok(ReviewDecisionRecord {
            submission_id: submission.id,
            reviewer_id,
            status: SubmissionStatus::Approved,
            note,
            ledger_entry: Some(ledger_entry),
            audit_entries,
        })
    }
}

/// Largest permitted deviation from the computed base: ceil(0.2 × base).
pub fn max_adjustment(base_points: i64) -> i64 {
    (base_points.max(0) + 4) / 5
}
