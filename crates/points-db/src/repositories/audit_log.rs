//! PostgreSQL implementation of AuditLogRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use points_core::entities::AuditEntry;
use points_core::traits::{AuditLogRepository, RepoResult};

use crate::models::AuditLogModel;

use super::error::map_db_error;

/// PostgreSQL implementation of AuditLogRepository
#[derive(Clone)]
pub struct PgAuditLogRepository {
    pool: PgPool,
}

impl PgAuditLogRepository {
    /// Create a new PgAuditLogRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditLogRepository for PgAuditLogRepository {
    #[instrument(skip(self, entry))]
    async fn record(&self, entry: &AuditEntry) -> RepoResult<()> {
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
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_for_target(
        &self,
        target_type: &str,
        target_id: &str,
    ) -> RepoResult<Vec<AuditEntry>> {
        let results = sqlx::query_as::<_, AuditLogModel>(
            r#"
            SELECT id, actor_id, action, target_type, target_id, metadata, created_at
            FROM audit_logs
            WHERE target_type = $1 AND target_id = $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(target_type)
        .bind(target_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        results.into_iter().map(AuditEntry::try_from).collect()
    }
}
