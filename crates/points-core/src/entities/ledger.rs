//! Points ledger entry - one immutable signed point adjustment
//!
//! The ledger is the single source of truth for point totals. Rows are
//! never updated or deleted; a correction is a new offsetting row. Totals
//! are always derived by summing deltas.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::activity::ActivityCode;
use crate::value_objects::{EventKey, RecordId};

/// Where a ledger credit originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreditSource {
    /// Reviewer approval of a submission.
    Manual,
    /// Asynchronous course-completion event from the LMS.
    Webhook,
    /// Imported/backfilled form data.
    Form,
}

impl CreditSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Webhook => "webhook",
            Self::Form => "form",
        }
    }
}

impl std::str::FromStr for CreditSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(Self::Manual),
            "webhook" => Ok(Self::Webhook),
            "form" => Ok(Self::Form),
            other => Err(format!("unknown credit source: {other}")),
        }
    }
}

/// One immutable point delta for one user and activity.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub id: RecordId,
    pub user_id: RecordId,
    pub activity: ActivityCode,
    pub delta: i64,
    pub source: CreditSource,
    /// Identity of the crediting event; unique when present. Absent only on
    /// offsetting corrections that are not tied to an external action.
    pub event_key: Option<EventKey>,
    pub occurred_at: DateTime<Utc>,
    pub metadata: Option<JsonValue>,
}

impl LedgerEntry {
    /// Credit produced by reviewer approval of a submission. The key is
    /// derived from the submission id, so retrying a review can never pay
    /// the same submission twice.
    pub fn manual_credit(
        id: RecordId,
        user_id: RecordId,
        activity: ActivityCode,
        delta: i64,
        submission_id: RecordId,
        metadata: Option<JsonValue>,
    ) -> Self {
        Self {
            id,
            user_id,
            activity,
            delta,
            source: CreditSource::Manual,
            event_key: Some(EventKey::for_submission(submission_id)),
            occurred_at: Utc::now(),
            metadata,
        }
    }

    /// Credit produced by an LMS course-completion event.
    pub fn webhook_credit(
        id: RecordId,
        user_id: RecordId,
        activity: ActivityCode,
        delta: i64,
        provider: &str,
        event_id: &str,
        signal: &str,
    ) -> Self {
        Self {
            id,
            user_id,
            activity,
            delta,
            source: CreditSource::Webhook,
            event_key: Some(EventKey::for_external_event(provider, event_id, signal)),
            occurred_at: Utc::now(),
            metadata: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_credit_key_derived_from_submission() {
        let entry = LedgerEntry::manual_credit(
            RecordId::new(1),
            RecordId::new(10),
            ActivityCode::Explore,
            15,
            RecordId::new(77),
            None,
        );
        let key = entry.event_key.unwrap();
        assert_eq!(key.external_source, "admin_approval");
        assert_eq!(key.external_event_id, "submission_77");
        assert_eq!(entry.source, CreditSource::Manual);
    }

    #[test]
    fn test_webhook_credit_key_carries_provider_and_signal() {
        let entry = LedgerEntry::webhook_credit(
            RecordId::new(2),
            RecordId::new(10),
            ActivityCode::Learn,
            50,
            "thinkific",
            "evt-9",
            "learn_course_complete",
        );
        let key = entry.event_key.unwrap();
        assert_eq!(key.external_source, "thinkific");
        assert_eq!(key.external_event_id, "thinkific:evt-9|tag:learn_course_complete");
        assert_eq!(entry.source, CreditSource::Webhook);
    }

    #[test]
    fn test_source_parse_roundtrip() {
        for source in [CreditSource::Manual, CreditSource::Webhook, CreditSource::Form] {
            assert_eq!(source.as_str().parse::<CreditSource>().unwrap(), source);
        }
    }
}
