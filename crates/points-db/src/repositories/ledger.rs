//! PostgreSQL implementation of LedgerRepository
//!
//! Reads derive totals by summing deltas; the standalone insert exists for
//! corrections and form backfills. Credits produced by review or webhook
//! processing go through the transactional stores instead.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use points_core::activity::ActivityCode;
use points_core::entities::LedgerEntry;
use points_core::traits::{LedgerRepository, RepoResult};
use points_core::value_objects::{EventKey, RecordId};

use crate::models::LedgerEntryModel;

use super::error::{map_db_error, map_unique_violation};

const LEDGER_COLUMNS: &str = "id, user_id, activity, delta, source, external_source, external_event_id, occurred_at, metadata";

/// PostgreSQL implementation of LedgerRepository
#[derive(Clone)]
pub struct PgLedgerRepository {
    pool: PgPool,
}

impl PgLedgerRepository {
    /// Create a new PgLedgerRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerRepository for PgLedgerRepository {
    #[instrument(skip(self, entry))]
    async fn insert(&self, entry: &LedgerEntry) -> RepoResult<()> {
        let (external_source, external_event_id) = match &entry.event_key {
            Some(key) => (
                Some(key.external_source.as_str()),
                Some(key.external_event_id.as_str()),
            ),
            None => (None, None),
        };

        sqlx::query(
            r#"
            INSERT INTO points_ledger (id, user_id, activity, delta, source, external_source, external_event_id, occurred_at, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
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
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_unique_violation(e, || {
                points_core::DomainError::Validation(
                    "a ledger entry for this crediting event already exists".to_string(),
                )
            })
        })?;

        Ok(())
    }

    #[instrument(skip(self, key))]
    async fn find_by_event_key(&self, key: &EventKey) -> RepoResult<Option<LedgerEntry>> {
        let result = sqlx::query_as::<_, LedgerEntryModel>(&format!(
            r#"
            SELECT {LEDGER_COLUMNS} FROM points_ledger
            WHERE external_source = $1 AND external_event_id = $2
            "#
        ))
        .bind(&key.external_source)
        .bind(&key.external_event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        result.map(LedgerEntry::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn total_for_user(&self, user_id: RecordId) -> RepoResult<i64> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(delta), 0) FROM points_ledger WHERE user_id = $1",
        )
        .bind(user_id.into_inner())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(total)
    }

    #[instrument(skip(self))]
    async fn total_for_user_activity(
        &self,
        user_id: RecordId,
        activity: ActivityCode,
    ) -> RepoResult<i64> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(delta), 0) FROM points_ledger WHERE user_id = $1 AND activity = $2",
        )
        .bind(user_id.into_inner())
        .bind(activity.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(total)
    }

    #[instrument(skip(self))]
    async fn list_by_user(&self, user_id: RecordId) -> RepoResult<Vec<LedgerEntry>> {
        let results = sqlx::query_as::<_, LedgerEntryModel>(&format!(
            r#"
            SELECT {LEDGER_COLUMNS} FROM points_ledger
            WHERE user_id = $1
            ORDER BY occurred_at DESC
            "#
        ))
        .bind(user_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        results.into_iter().map(LedgerEntry::try_from).collect()
    }
}
