//! PostgreSQL implementation of UserRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use points_core::entities::User;
use points_core::traits::{RepoResult, UserRepository};
use points_core::value_objects::RecordId;

use crate::models::UserModel;

use super::error::{map_db_error, map_unique_violation, user_not_found};

const USER_COLUMNS: &str =
    "id, email, display_name, role, ineligible, lms_contact_id, created_at, updated_at";

/// PostgreSQL implementation of UserRepository
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new PgUserRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: RecordId) -> RepoResult<Option<User>> {
        let result = sqlx::query_as::<_, UserModel>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        result.map(User::try_from).transpose()
    }

    #[instrument(skip(self, email))]
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let result = sqlx::query_as::<_, UserModel>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        result.map(User::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn find_by_contact_id(&self, contact_id: &str) -> RepoResult<Option<User>> {
        let result = sqlx::query_as::<_, UserModel>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE lms_contact_id = $1"
        ))
        .bind(contact_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        result.map(User::try_from).transpose()
    }

    #[instrument(skip(self, user))]
    async fn create(&self, user: &User) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, display_name, role, ineligible, lms_contact_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(user.id.into_inner())
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(user.role.as_str())
        .bind(user.ineligible)
        .bind(user.lms_contact_id.as_deref())
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_unique_violation(e, || {
                points_core::DomainError::Validation("email already registered".to_string())
            })
        })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn store_contact_id(&self, id: RecordId, contact_id: &str) -> RepoResult<()> {
        // Fill-once: a contact id learned from an email match never
        // overwrites one already stored.
        let result = sqlx::query(
            r#"
            UPDATE users
            SET lms_contact_id = $2, updated_at = NOW()
            WHERE id = $1 AND lms_contact_id IS NULL
            "#,
        )
        .bind(id.into_inner())
        .bind(contact_id)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            // Either the user is gone or the id is already set; both are
            // fine for a cache-fill, but a missing user is worth surfacing.
            let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
                .bind(id.into_inner())
                .fetch_one(&self.pool)
                .await
                .map_err(map_db_error)?;
            if !exists {
                return Err(user_not_found(id));
            }
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn set_ineligible(&self, id: RecordId, ineligible: bool) -> RepoResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET ineligible = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id.into_inner())
        .bind(ineligible)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(user_not_found(id));
        }

        Ok(())
    }
}
