//! PostgreSQL implementation of CreditStore
//!
//! One external credit is one transaction: course-grant insert, ledger
//! insert, audit row, badge evaluation, event status. The unique
//! constraints on course_grants and points_ledger are the concurrency
//! control; a redelivery racing this transaction loses at insert time and
//! is reported as a duplicate outcome, not an error.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{info, instrument};
use uuid::Uuid;

use points_core::entities::ExternalEventStatus;
use points_core::traits::{CreditOutcome, CreditStore, ExternalCreditRecord, RepoResult};

use crate::badges::BadgeEvaluator;

use super::error::map_db_error;
use super::review_store::{insert_audit_entry, insert_ledger_entry};

/// PostgreSQL implementation of CreditStore
#[derive(Clone)]
pub struct PgCreditStore {
    pool: PgPool,
    badge_evaluator: Arc<dyn BadgeEvaluator>,
}

impl PgCreditStore {
    /// Create a new PgCreditStore
    pub fn new(pool: PgPool, badge_evaluator: Arc<dyn BadgeEvaluator>) -> Self {
        Self {
            pool,
            badge_evaluator,
        }
    }

    async fn set_event_status_tx(
        tx: &mut Transaction<'_, Postgres>,
        event_record_id: Uuid,
        status: ExternalEventStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE external_events SET status = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(event_record_id)
        .bind(status.as_str())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Status write after a rolled-back credit attempt; runs on the pool,
    /// outside the aborted transaction.
    async fn set_event_status(
        &self,
        event_record_id: Uuid,
        status: ExternalEventStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE external_events SET status = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(event_record_id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl CreditStore for PgCreditStore {
    #[instrument(skip(self, record), fields(event_record_id = %record.event_record_id, user_id = %record.user_id))]
    async fn commit_external_credit(
        &self,
        record: &ExternalCreditRecord,
    ) -> RepoResult<CreditOutcome> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let grant = sqlx::query(
            r#"
            INSERT INTO course_grants (user_id, signal, granted_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (user_id, signal) DO NOTHING
            "#,
        )
        .bind(record.user_id.into_inner())
        .bind(&record.signal)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        if grant.rows_affected() == 0 {
            // Signal already granted to this user (redelivery with a fresh
            // event id, or a retry). No ledger effect.
            Self::set_event_status_tx(&mut tx, record.event_record_id, ExternalEventStatus::Duplicate)
                .await
                .map_err(map_db_error)?;
            tx.commit().await.map_err(map_db_error)?;
            info!(signal = %record.signal, "course signal already granted, marked duplicate");
            return Ok(CreditOutcome::AlreadyGranted);
        }

        let inserted = insert_ledger_entry(&mut tx, &record.ledger_entry)
            .await
            .map_err(map_db_error)?;
        if inserted == 0 {
            // Same crediting event already paid under a different grant.
            // Roll the grant insert back so a granted marker never exists
            // without its points, then record the duplicate status.
            tx.rollback().await.map_err(map_db_error)?;
            self.set_event_status(record.event_record_id, ExternalEventStatus::Duplicate)
                .await
                .map_err(map_db_error)?;
            info!("ledger event key already present, marked duplicate");
            return Ok(CreditOutcome::DuplicateEvent);
        }

        insert_audit_entry(&mut tx, &record.audit_entry)
            .await
            .map_err(map_db_error)?;

        // Badge criteria may now be satisfied; the evaluator is idempotent
        // and runs inside the same transaction.
        self.badge_evaluator
            .grant_badges(&mut tx, record.user_id.into_inner())
            .await
            .map_err(map_db_error)?;

        Self::set_event_status_tx(&mut tx, record.event_record_id, ExternalEventStatus::Processed)
            .await
            .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;
        info!(delta = record.ledger_entry.delta, "external credit committed");
        Ok(CreditOutcome::Credited)
    }
}
