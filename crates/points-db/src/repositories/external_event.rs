//! PostgreSQL implementation of ExternalEventRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use points_core::entities::{ExternalEvent, ExternalEventStatus};
use points_core::traits::{ExternalEventRepository, RepoResult};
use points_core::value_objects::RecordId;

use crate::models::ExternalEventModel;

use super::error::{event_not_found, map_db_error};

const EVENT_COLUMNS: &str = "id, event_id, signal, contact_id, email, matched_user_id, status, raw_payload, received_at, updated_at";

/// PostgreSQL implementation of ExternalEventRepository
#[derive(Clone)]
pub struct PgExternalEventRepository {
    pool: PgPool,
}

impl PgExternalEventRepository {
    /// Create a new PgExternalEventRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExternalEventRepository for PgExternalEventRepository {
    #[instrument(skip(self, event))]
    async fn create(&self, event: &ExternalEvent) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO external_events (id, event_id, signal, contact_id, email, matched_user_id, status, raw_payload, received_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(event.id)
        .bind(&event.event_id)
        .bind(&event.signal)
        .bind(event.contact_id.as_deref())
        .bind(event.email.as_deref())
        .bind(event.matched_user_id.map(RecordId::into_inner))
        .bind(event.status.as_str())
        .bind(&event.raw_payload)
        .bind(event.received_at)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<ExternalEvent>> {
        let result = sqlx::query_as::<_, ExternalEventModel>(&format!(
            "SELECT {EVENT_COLUMNS} FROM external_events WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        result.map(ExternalEvent::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn processed_exists(
        &self,
        event_id: &str,
        signal: &str,
        excluding: Uuid,
    ) -> RepoResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM external_events
                WHERE event_id = $1 AND signal = $2 AND status = 'processed' AND id <> $3
            )
            "#,
        )
        .bind(event_id)
        .bind(signal)
        .bind(excluding)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(exists)
    }

    #[instrument(skip(self))]
    async fn update_status(&self, id: Uuid, status: ExternalEventStatus) -> RepoResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE external_events
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(event_not_found(id));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn set_matched_user(&self, id: Uuid, user_id: RecordId) -> RepoResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE external_events
            SET matched_user_id = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(user_id.into_inner())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(event_not_found(id));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_unmatched(&self, limit: i64) -> RepoResult<Vec<ExternalEvent>> {
        let limit = limit.clamp(1, 500);
        let results = sqlx::query_as::<_, ExternalEventModel>(&format!(
            r#"
            SELECT {EVENT_COLUMNS} FROM external_events
            WHERE status = 'queued_unmatched'
            ORDER BY received_at ASC
            LIMIT $1
            "#
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        results.into_iter().map(ExternalEvent::try_from).collect()
    }
}
