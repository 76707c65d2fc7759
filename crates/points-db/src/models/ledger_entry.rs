//! Points ledger database model

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::FromRow;

/// Database model for points_ledger table
#[derive(Debug, Clone, FromRow)]
pub struct LedgerEntryModel {
    pub id: i64,
    pub user_id: i64,
    pub activity: String,
    pub delta: i64,
    pub source: String,
    /// Both key halves present or both absent; uniqueness over the pair is
    /// enforced by the schema.
    pub external_source: Option<String>,
    pub external_event_id: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub metadata: Option<JsonValue>,
}
