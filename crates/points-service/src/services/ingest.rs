//! Ingest service - the external event ingestor
//!
//! Converts asynchronous course-completion deliveries into ledger credits
//! through the same kind of idempotent path as manual review. Every
//! delivery is stored before any decision; the pipeline is re-entrant, so
//! a manual reprocess runs the identical steps over the stored record.

use serde_json::{json, Value as JsonValue};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use points_core::activity::is_recognized_course_signal;
use points_core::entities::{
    AuditAction, AuditEntry, ExternalEvent, ExternalEventStatus, LedgerEntry, User,
};
use points_core::traits::{CreditOutcome, ExternalCreditRecord};
use points_core::{ActivityCode, DomainError};

use crate::dto::{IngestResponse, WebhookPayload};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

/// Ingest service
pub struct IngestService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> IngestService<'a> {
    /// Create a new IngestService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Ingest one raw webhook delivery.
    ///
    /// Never fails on expected pipeline outcomes: unmatched users,
    /// ineligible users, and redeliveries all store the event with a
    /// terminal status and report it in the response.
    #[instrument(skip(self, raw))]
    pub async fn ingest_event(&self, raw: JsonValue) -> ServiceResult<IngestResponse> {
        let parsed: WebhookPayload = serde_json::from_value(raw.clone())
            .map_err(|e| ServiceError::validation(format!("malformed webhook payload: {e}")))?;
        let event_id = parsed
            .event_id
            .ok_or_else(|| ServiceError::validation("webhook payload missing event id"))?;
        let signal = normalize(
            &parsed
                .tag
                .ok_or_else(|| ServiceError::validation("webhook payload missing tag"))?,
        );

        let mut event = ExternalEvent::received(
            event_id,
            signal,
            parsed.contact_id,
            parsed.email.map(|e| normalize(&e)),
            raw,
        );

        if !is_recognized_course_signal(&event.signal) {
            // Stored for the record, not actionable.
            event.status = ExternalEventStatus::Ignored;
            self.ctx.events().create(&event).await?;
            info!(signal = %event.signal, "unrecognized signal stored as ignored");
            return Ok(IngestResponse {
                event_record_id: event.id,
                status: event.status.as_str().to_string(),
            });
        }

        self.ctx.events().create(&event).await?;
        let status = self.run_pipeline(&event, false).await?;

        Ok(IngestResponse {
            event_record_id: event.id,
            status: status.as_str().to_string(),
        })
    }

    /// Re-run the pipeline over a stored event, e.g. after account linkage.
    ///
    /// Same contract as ingest, except an ineligible match surfaces as an
    /// error to the interactive caller instead of a silent terminal status.
    #[instrument(skip(self))]
    pub async fn reprocess_event(&self, id: Uuid) -> ServiceResult<IngestResponse> {
        let event = self
            .ctx
            .events()
            .find_by_id(id)
            .await?
            .ok_or(DomainError::EventNotFound(id))?;

        // Already credited: reprocessing is a no-op, not a duplicate.
        if event.status == ExternalEventStatus::Processed {
            return Ok(IngestResponse {
                event_record_id: event.id,
                status: event.status.as_str().to_string(),
            });
        }

        if !is_recognized_course_signal(&event.signal) {
            if event.status != ExternalEventStatus::Ignored {
                self.ctx
                    .events()
                    .update_status(event.id, ExternalEventStatus::Ignored)
                    .await?;
            }
            return Ok(IngestResponse {
                event_record_id: event.id,
                status: ExternalEventStatus::Ignored.as_str().to_string(),
            });
        }

        let status = self.run_pipeline(&event, true).await?;
        Ok(IngestResponse {
            event_record_id: event.id,
            status: status.as_str().to_string(),
        })
    }

    /// The shared pipeline: resolve, gate, dedup, credit.
    async fn run_pipeline(
        &self,
        event: &ExternalEvent,
        interactive: bool,
    ) -> ServiceResult<ExternalEventStatus> {
        let Some(user) = self.resolve_user(event).await? else {
            // Expected steady state: the event arrived before the account
            // was linked. A later reprocess picks it up.
            self.ctx
                .events()
                .update_status(event.id, ExternalEventStatus::QueuedUnmatched)
                .await?;
            info!(event_id = %event.event_id, "no matching account, queued");
            return Ok(ExternalEventStatus::QueuedUnmatched);
        };

        if !user.can_earn_credit() {
            self.ctx
                .events()
                .update_status(event.id, ExternalEventStatus::RejectedIneligible)
                .await?;
            if interactive {
                return Err(DomainError::Ineligible(user.id).into());
            }
            info!(user_id = %user.id, "ineligible account, credit withheld");
            return Ok(ExternalEventStatus::RejectedIneligible);
        }

        self.ctx.events().set_matched_user(event.id, user.id).await?;

        // Redelivery of an already-processed (event id, signal) pair stops
        // here; the grant and ledger constraints below remain the backstop.
        if self
            .ctx
            .events()
            .processed_exists(&event.event_id, &event.signal, event.id)
            .await?
        {
            self.ctx
                .events()
                .update_status(event.id, ExternalEventStatus::Duplicate)
                .await?;
            return Ok(ExternalEventStatus::Duplicate);
        }

        let delta = ActivityCode::Learn.default_points();
        let ledger_entry = LedgerEntry::webhook_credit(
            self.ctx.generate_id(),
            user.id,
            ActivityCode::Learn,
            delta,
            self.ctx.webhook_provider(),
            &event.event_id,
            &event.signal,
        );
        let audit_entry = AuditEntry::system(
            self.ctx.generate_id(),
            AuditAction::ProcessExternalEvent,
            "external_event",
            event.id.to_string(),
            Some(json!({
                "user_id": user.id.to_string(),
                "signal": event.signal,
                "delta": delta,
            })),
        );

        let outcome = self
            .ctx
            .credit_store()
            .commit_external_credit(&ExternalCreditRecord {
                event_record_id: event.id,
                user_id: user.id,
                signal: event.signal.clone(),
                ledger_entry,
                audit_entry,
            })
            .await?;

        Ok(match outcome {
            CreditOutcome::Credited => {
                info!(user_id = %user.id, delta, "course completion credited");
                ExternalEventStatus::Processed
            }
            CreditOutcome::AlreadyGranted | CreditOutcome::DuplicateEvent => {
                ExternalEventStatus::Duplicate
            }
        })
    }

    /// Resolve the target account: stored contact id first, then email.
    /// An email match back-fills the contact id for future fast-path
    /// lookups; a failure there is logged and ignored.
    async fn resolve_user(&self, event: &ExternalEvent) -> ServiceResult<Option<User>> {
        if let Some(contact_id) = &event.contact_id {
            if let Some(user) = self.ctx.users().find_by_contact_id(contact_id).await? {
                return Ok(Some(user));
            }
        }

        let Some(email) = &event.email else {
            return Ok(None);
        };
        let Some(user) = self.ctx.users().find_by_email(email).await? else {
            return Ok(None);
        };

        if user.lms_contact_id.is_none() {
            if let Some(contact_id) = &event.contact_id {
                if let Err(err) = self.ctx.users().store_contact_id(user.id, contact_id).await {
                    warn!(user_id = %user.id, %err, "contact id cache-fill failed");
                }
            }
        }

        Ok(Some(user))
    }
}

fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_lowercases_and_trims() {
        assert_eq!(normalize("  Learn_Course_Complete "), "learn_course_complete");
        assert_eq!(normalize("Pat@Example.EDU"), "pat@example.edu");
    }
}
