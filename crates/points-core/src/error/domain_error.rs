//! Domain errors - error types for the domain layer

use thiserror::Error;
use uuid::Uuid;

use crate::entities::SubmissionStatus;
use crate::policy::QuotaDimension;
use crate::value_objects::RecordId;

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Not Found Errors
    // =========================================================================
    #[error("User not found: {0}")]
    UserNotFound(RecordId),

    #[error("Submission not found: {0}")]
    SubmissionNotFound(RecordId),

    #[error("External event not found: {0}")]
    EventNotFound(Uuid),

    #[error("Unknown activity code: {0}")]
    UnknownActivity(String),

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    // =========================================================================
    // Business Rule Rejections
    // =========================================================================
    #[error("An active submission already exists for this stage")]
    DuplicateSubmission,

    #[error("Quota exceeded for {dimension}: attempted {attempted}, ceiling {ceiling}")]
    QuotaExceeded {
        dimension: QuotaDimension,
        attempted: i64,
        ceiling: i64,
    },

    #[error("Submission is already {current:?}; no further review is possible")]
    InvalidState { current: SubmissionStatus },

    #[error(
        "Point override {override_points} outside adjustment bound: base {base_points}, max adjustment {max_adjustment}"
    )]
    PointAdjustmentOutOfBounds {
        base_points: i64,
        override_points: i64,
        max_adjustment: i64,
    },

    #[error("Account {0} is not eligible to earn credit")]
    Ineligible(RecordId),

    // =========================================================================
    // Infrastructure Errors (wrapped)
    // =========================================================================
    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    /// Get a stable error code string for API responses
    pub fn code(&self) -> &'static str {
        match self {
            // Not Found
            Self::UserNotFound(_) => "UNKNOWN_USER",
            Self::SubmissionNotFound(_) => "UNKNOWN_SUBMISSION",
            Self::EventNotFound(_) => "UNKNOWN_EVENT",
            Self::UnknownActivity(_) => "UNKNOWN_ACTIVITY",

            // Validation
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidPayload(_) => "INVALID_PAYLOAD",

            // Business rules
            Self::DuplicateSubmission => "DUPLICATE_SUBMISSION",
            Self::QuotaExceeded { .. } => "QUOTA_EXCEEDED",
            Self::InvalidState { .. } => "INVALID_STATE",
            Self::PointAdjustmentOutOfBounds { .. } => "ADJUSTMENT_OUT_OF_BOUNDS",
            Self::Ineligible(_) => "INELIGIBLE_USER",

            // Infrastructure
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UserNotFound(_)
                | Self::SubmissionNotFound(_)
                | Self::EventNotFound(_)
                | Self::UnknownActivity(_)
        )
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::InvalidPayload(_))
    }

    /// Business-rule rejections and stale-state conflicts: surfaced to the
    /// caller, never retried automatically.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::DuplicateSubmission
                | Self::QuotaExceeded { .. }
                | Self::InvalidState { .. }
                | Self::PointAdjustmentOutOfBounds { .. }
        )
    }

    /// Check if this is a forbidden-actor error
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Ineligible(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = DomainError::UserNotFound(RecordId::new(1));
        assert_eq!(err.code(), "UNKNOWN_USER");

        let err = DomainError::QuotaExceeded {
            dimension: QuotaDimension::Peers,
            attempted: 51,
            ceiling: 50,
        };
        assert_eq!(err.code(), "QUOTA_EXCEEDED");
    }

    #[test]
    fn test_classifiers() {
        assert!(DomainError::SubmissionNotFound(RecordId::new(1)).is_not_found());
        assert!(DomainError::DuplicateSubmission.is_conflict());
        assert!(DomainError::InvalidState {
            current: SubmissionStatus::Approved
        }
        .is_conflict());
        assert!(DomainError::Ineligible(RecordId::new(2)).is_forbidden());
        assert!(!DomainError::Database("boom".to_string()).is_conflict());
    }

    #[test]
    fn test_adjustment_error_display_carries_bounds() {
        let err = DomainError::PointAdjustmentOutOfBounds {
            base_points: 100,
            override_points: 121,
            max_adjustment: 20,
        };
        let message = err.to_string();
        assert!(message.contains("121"));
        assert!(message.contains("100"));
        assert!(message.contains("20"));
    }
}
