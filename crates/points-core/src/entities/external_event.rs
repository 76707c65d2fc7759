//! External event record - one raw inbound LMS delivery
//!
//! Every webhook delivery is stored before any processing decision, so an
//! unmatched or malformed event is never lost. The status field is the only
//! mutation the record ever sees.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::value_objects::RecordId;

/// Lifecycle of a stored external event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExternalEventStatus {
    /// Stored, not yet through the pipeline.
    Received,
    /// Credited the ledger.
    Processed,
    /// Redelivery of an already-granted credit; no ledger effect.
    Duplicate,
    /// No matching account yet; eligible for later reprocessing.
    QueuedUnmatched,
    /// Matched an ineligible account; no ledger effect, terminal.
    RejectedIneligible,
    /// Signal not on the allow-list; stored, not actionable.
    Ignored,
}

impl ExternalEventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Processed => "processed",
            Self::Duplicate => "duplicate",
            Self::QueuedUnmatched => "queued_unmatched",
            Self::RejectedIneligible => "rejected_ineligible",
            Self::Ignored => "ignored",
        }
    }
}

impl std::str::FromStr for ExternalEventStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "received" => Ok(Self::Received),
            "processed" => Ok(Self::Processed),
            "duplicate" => Ok(Self::Duplicate),
            "queued_unmatched" => Ok(Self::QueuedUnmatched),
            "rejected_ineligible" => Ok(Self::RejectedIneligible),
            "ignored" => Ok(Self::Ignored),
            other => Err(format!("unknown external event status: {other}")),
        }
    }
}

/// One stored webhook delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalEvent {
    pub id: Uuid,
    /// Canonical upstream event id. Together with `signal` this forms the
    /// redelivery dedup key; it is independent of the ledger's event key
    /// because a stored event can be reprocessed.
    pub event_id: String,
    /// Normalized (lower-cased, trimmed) signal name.
    pub signal: String,
    pub contact_id: Option<String>,
    pub email: Option<String>,
    pub matched_user_id: Option<RecordId>,
    pub status: ExternalEventStatus,
    pub raw_payload: JsonValue,
    pub received_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExternalEvent {
    pub fn received(
        event_id: String,
        signal: String,
        contact_id: Option<String>,
        email: Option<String>,
        raw_payload: JsonValue,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            event_id,
            signal,
            contact_id,
            email,
            matched_user_id: None,
            status: ExternalEventStatus::Received,
            raw_payload,
            received_at: now,
            updated_at: now,
        }
    }
}

/// Dedup guard scoped to (user, signal): the same named course credit is
/// awarded at most once per user, even when upstream event ids differ
/// across redeliveries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseGrant {
    pub user_id: RecordId,
    pub signal: String,
    pub granted_at: DateTime<Utc>,
}

impl CourseGrant {
    pub fn new(user_id: RecordId, signal: impl Into<String>) -> Self {
        Self {
            user_id,
            signal: signal.into(),
            granted_at: Utc::now(),
        }
    }
}
