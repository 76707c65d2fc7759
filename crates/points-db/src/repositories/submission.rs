//! PostgreSQL implementation of SubmissionRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use points_core::activity::ActivityCode;
use points_core::entities::Submission;
use points_core::traits::{RepoResult, SubmissionRepository};
use points_core::value_objects::RecordId;

use crate::mappers::payload_to_json;
use crate::models::SubmissionModel;

use super::error::map_db_error;

const SUBMISSION_COLUMNS: &str = "id, user_id, activity, status, visibility, payload, reviewer_id, review_note, created_at, updated_at";

/// PostgreSQL implementation of SubmissionRepository
#[derive(Clone)]
pub struct PgSubmissionRepository {
    pool: PgPool,
}

impl PgSubmissionRepository {
    /// Create a new PgSubmissionRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubmissionRepository for PgSubmissionRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: RecordId) -> RepoResult<Option<Submission>> {
        let result = sqlx::query_as::<_, SubmissionModel>(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE id = $1"
        ))
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        result.map(Submission::try_from).transpose()
    }

    #[instrument(skip(self, submission))]
    async fn create(&self, submission: &Submission) -> RepoResult<()> {
        let payload = payload_to_json(submission)?;
        sqlx::query(
            r#"
            INSERT INTO submissions (id, user_id, activity, status, visibility, payload, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(submission.id.into_inner())
        .bind(submission.user_id.into_inner())
        .bind(submission.activity.as_str())
        .bind(submission.status.as_str())
        .bind(submission.visibility.as_str())
        .bind(payload)
        .bind(submission.created_at)
        .bind(submission.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn has_active(&self, user_id: RecordId, activity: ActivityCode) -> RepoResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM submissions
                WHERE user_id = $1 AND activity = $2 AND status IN ('pending', 'approved')
            )
            "#,
        )
        .bind(user_id.into_inner())
        .bind(activity.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(exists)
    }

    #[instrument(skip(self))]
    async fn find_since(
        &self,
        user_id: RecordId,
        activity: ActivityCode,
        since: DateTime<Utc>,
    ) -> RepoResult<Vec<Submission>> {
        let results = sqlx::query_as::<_, SubmissionModel>(&format!(
            r#"
            SELECT {SUBMISSION_COLUMNS} FROM submissions
            WHERE user_id = $1 AND activity = $2 AND created_at > $3
            ORDER BY created_at ASC
            "#
        ))
        .bind(user_id.into_inner())
        .bind(activity.as_str())
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        results.into_iter().map(Submission::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn list_by_user(&self, user_id: RecordId) -> RepoResult<Vec<Submission>> {
        let results = sqlx::query_as::<_, SubmissionModel>(&format!(
            r#"
            SELECT {SUBMISSION_COLUMNS} FROM submissions
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(user_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        results.into_iter().map(Submission::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn list_pending(&self, limit: i64) -> RepoResult<Vec<Submission>> {
        let limit = limit.clamp(1, 100);
        let results = sqlx::query_as::<_, SubmissionModel>(&format!(
            r#"
            SELECT {SUBMISSION_COLUMNS} FROM submissions
            WHERE status = 'pending'
            ORDER BY created_at ASC
            LIMIT $1
            "#
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        results.into_iter().map(Submission::try_from).collect()
    }
}
