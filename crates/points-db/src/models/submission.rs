//! Submission database model

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::FromRow;

/// Database model for submissions table
#[derive(Debug, Clone, FromRow)]
pub struct SubmissionModel {
    pub id: i64,
    pub user_id: i64,
    pub activity: String,
    pub status: String,
    pub visibility: String,
    /// Tagged activity-specific payload (JSONB)
    pub payload: JsonValue,
    pub reviewer_id: Option<i64>,
    pub review_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
