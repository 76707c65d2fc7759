//! Error handling utilities for repositories

use points_core::error::DomainError;
use points_core::value_objects::RecordId;
use sqlx::Error as SqlxError;
use uuid::Uuid;

/// Convert SQLx error to DomainError
pub fn map_db_error(e: SqlxError) -> DomainError {
    DomainError::Database(e.to_string())
}

/// Check for unique violation and return appropriate error or fallback
pub fn map_unique_violation<F>(e: SqlxError, on_unique: F) -> DomainError
where
    F: FnOnce() -> DomainError,
{
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            return on_unique();
        }
    }
    DomainError::Database(e.to_string())
}

/// Create a "user not found" error
pub fn user_not_found(id: RecordId) -> DomainError {
    DomainError::UserNotFound(id)
}

/// Create a "submission not found" error
pub fn submission_not_found(id: RecordId) -> DomainError {
    DomainError::SubmissionNotFound(id)
}

/// Create an "event not found" error
pub fn event_not_found(id: Uuid) -> DomainError {
    DomainError::EventNotFound(id)
}
