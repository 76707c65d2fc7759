//! External event database model

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for external_events table
#[derive(Debug, Clone, FromRow)]
pub struct ExternalEventModel {
    pub id: Uuid,
    pub event_id: String,
    pub signal: String,
    pub contact_id: Option<String>,
    pub email: Option<String>,
    pub matched_user_id: Option<i64>,
    pub status: String,
    pub raw_payload: JsonValue,
    pub received_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
