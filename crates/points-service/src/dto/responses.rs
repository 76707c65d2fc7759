//! Response DTOs
//!
//! Ids serialize as strings (JavaScript number safety); enums serialize as
//! their stable lowercase codes.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use points_core::SubmissionPayload;

/// Submission representation returned to callers
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionResponse {
    pub id: String,
    pub user_id: String,
    pub activity: String,
    pub status: String,
    pub visibility: String,
    pub payload: SubmissionPayload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Bulk review result
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BulkReviewResponse {
    pub processed_count: u64,
}

/// Outcome of ingesting or reprocessing one external event
#[derive(Debug, Clone, Serialize)]
pub struct IngestResponse {
    pub event_record_id: Uuid,
    /// processed | duplicate | queued_unmatched | rejected_ineligible | ignored
    pub status: String,
}

/// Per-activity point subtotal
#[derive(Debug, Clone, Serialize)]
pub struct ActivityPointsResponse {
    pub activity: String,
    pub points: i64,
}

/// Derived point totals for one user
#[derive(Debug, Clone, Serialize)]
pub struct PointsSummaryResponse {
    pub user_id: String,
    pub total: i64,
    pub by_activity: Vec<ActivityPointsResponse>,
}
