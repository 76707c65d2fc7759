//! PostgreSQL implementation of ReviewStore
//!
//! One reviewer decision is one transaction: status update, ledger insert,
//! audit rows. Commit makes all of it visible at once; any failure rolls
//! the whole unit back. A reader can never observe an approved submission
//! without its ledger entry.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::instrument;

use points_core::entities::{AuditEntry, LedgerEntry, SubmissionStatus};
use points_core::error::DomainError;
use points_core::traits::{RepoResult, ReviewDecisionRecord, ReviewStore};

use super::error::map_db_error;

/// PostgreSQL implementation of ReviewStore
#[derive(Clone)]
pub struct PgReviewStore {
    pool: PgPool,
}

impl PgReviewStore {
    /// Create a new PgReviewStore
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Move the submission out of `pending`. Returns false when no pending
    /// row matched (gone or already reviewed) - the caller decides whether
    /// that is an error or a silent skip.
    async fn apply_status(
        tx: &mut Transaction<'_, Postgres>,
        decision: &ReviewDecisionRecord,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE submissions
            SET status = $2, reviewer_id = $3, review_note = $4, updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(decision.submission_id.into_inner())
        .bind(decision.status.as_str())
        .bind(decision.reviewer_id.into_inner())
        .bind(decision.note.as_deref())
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

pub(super) async fn insert_ledger_entry(
    tx: &mut Transaction<'_, Postgres>,
    entry: &LedgerEntry,
) -> Result<u64, sqlx::Error> {
    let (external_source, external_event_id) = match &entry.event_key {
        Some(key) => (
            Some(key.external_source.as_str()),
            Some(key.external_event_id.as_str()),
        ),
        None => (None, None),
    };

    let result = sqlx::query(
        r#"
        INSERT INTO points_ledger (id, user_id, activity, delta, source, external_source, external_event_id, occurred_at, metadata)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT ON CONSTRAINT points_ledger_event_key DO NOTHING
        "#,
    )
    .bind(entry.id.into_inner())
    .bind(entry.user_id.into_inner())
    .bind(entry.activity.as_str())
    .bind(entry.delta)
    .bind(entry.source.as_str())
    .bind(external_source)
    .bind(external_event_id)
    .bind(entry.occurred_at)
    .bind(&entry.metadata)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected())
}

pub(super) async fn insert_audit_entry(
    tx: &mut Transaction<'_, Postgres>,
    entry: &AuditEntry,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, actor_id, action, target_type, target_id, metadata, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(entry.id.into_inner())
    .bind(entry.actor_id.into_inner())
    .bind(entry.action.as_str())
    .bind(&entry.target_type)
    .bind(&entry.target_id)
    .bind(&entry.metadata)
    .bind(entry.created_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

#[async_trait]
impl ReviewStore for PgReviewStore {
    #[instrument(skip(self, decision), fields(submission_id = %decision.submission_id))]
    async fn commit_decision(&self, decision: &ReviewDecisionRecord) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        if !Self::apply_status(&mut tx, decision)
            .await
            .map_err(map_db_error)?
        {
            // Nothing written yet; find out why before dropping the tx.
            let current: Option<String> =
                sqlx::query_scalar("SELECT status FROM submissions WHERE id = $1")
                    .bind(decision.submission_id.into_inner())
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(map_db_error)?;
            tx.rollback().await.map_err(map_db_error)?;

            return Err(match current {
                None => DomainError::SubmissionNotFound(decision.submission_id),
                Some(status) => DomainError::InvalidState {
                    current: status
                        .parse::<SubmissionStatus>()
                        .map_err(DomainError::Internal)?,
                },
            });
        }

        if let Some(entry) = &decision.ledger_entry {
            let inserted = insert_ledger_entry(&mut tx, entry)
                .await
                .map_err(map_db_error)?;
            if inserted == 0 {
                // The submission was pending yet its credit already exists:
                // inconsistent state, refuse to make it worse.
                tx.rollback().await.map_err(map_db_error)?;
                return Err(DomainError::Internal(format!(
                    "ledger credit already present for pending submission {}",
                    decision.submission_id
                )));
            }
        }

        for audit in &decision.audit_entries {
            insert_audit_entry(&mut tx, audit)
                .await
                .map_err(map_db_error)?;
        }

        tx.commit().await.map_err(map_db_error)?;
        Ok(())
    }

    #[instrument(skip(self, decisions), fields(batch_len = decisions.len()))]
    async fn commit_batch(&self, decisions: &[ReviewDecisionRecord]) -> RepoResult<u64> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;
        let mut processed = 0u64;

        for decision in decisions {
            // A submission reviewed by someone else since the batch was
            // assembled is skipped, not an error.
            if !Self::apply_status(&mut tx, decision)
                .await
                .map_err(map_db_error)?
            {
                continue;
            }

            if let Some(entry) = &decision.ledger_entry {
                let inserted = insert_ledger_entry(&mut tx, entry)
                    .await
                    .map_err(map_db_error)?;
                if inserted == 0 {
                    tx.rollback().await.map_err(map_db_error)?;
                    return Err(DomainError::Internal(format!(
                        "ledger credit already present for pending submission {}",
                        decision.submission_id
                    )));
                }
            }

            for audit in &decision.audit_entries {
                insert_audit_entry(&mut tx, audit)
                    .await
                    .map_err(map_db_error)?;
            }

            processed += 1;
        }

        tx.commit().await.map_err(map_db_error)?;
        Ok(processed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PgReviewStore>();
    }
}
