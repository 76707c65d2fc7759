//! Request DTOs
//!
//! All request DTOs implement `Deserialize` and, where fields need it,
//! `Validate` for input validation.

use serde::Deserialize;
use serde_json::Value as JsonValue;
use validator::Validate;

// ============================================================================
// Submission Requests
// ============================================================================

/// Create submission request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSubmissionRequest {
    /// Activity code: learn, explore, amplify, present, shine
    pub activity: String,

    /// public (default) or private
    pub visibility: Option<String>,

    /// Activity-specific evidence fields; shape is keyed by the activity
    pub payload: JsonValue,
}

// ============================================================================
// Review Requests
// ============================================================================

/// Reviewer decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    Approve,
    Reject,
}

impl std::str::FromStr for ReviewDecision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            other => Err(format!("unknown review decision: {other}")),
        }
    }
}

/// Single review request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReviewRequest {
    /// approve or reject
    pub decision: String,

    #[validate(length(max = 1000, message = "Review note must be at most 1000 characters"))]
    pub note: Option<String>,

    /// Reviewer override of the computed point value; bounded to ±20% of
    /// the base (rounded up)
    pub point_override: Option<i64>,
}

/// Bulk review request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BulkReviewRequest {
    #[validate(length(min = 1, max = 50, message = "Batch must contain 1-50 submission ids"))]
    pub submission_ids: Vec<String>,

    /// approve or reject, applied to every submission in the batch
    pub decision: String,

    #[validate(length(max = 1000, message = "Review note must be at most 1000 characters"))]
    pub note: Option<String>,
}

// ============================================================================
// Webhook Requests
// ============================================================================

/// Fields the ingest pipeline extracts from a raw LMS delivery. The full
/// raw payload is stored alongside; this struct only names what the
/// pipeline needs.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    /// Canonical upstream event id
    #[serde(alias = "id")]
    pub event_id: Option<String>,

    /// Course-completion tag
    #[serde(alias = "signal")]
    pub tag: Option<String>,

    pub contact_id: Option<String>,

    pub email: Option<String>,
}
