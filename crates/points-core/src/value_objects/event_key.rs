//! EventKey - identity of a crediting event
//!
//! Every path that inserts a ledger credit derives a deterministic key from
//! the thing being credited (a submission id, or an upstream event id plus
//! signal). The storage layer enforces uniqueness over the pair, which is
//! what makes retries and webhook redeliveries effect-free after the first
//! success.

use serde::{Deserialize, Serialize};

use super::RecordId;

/// The (source, event id) pair identifying one crediting event.
///
/// Distinct from the ledger row's own primary key: two ledger rows can never
/// share an `EventKey`, but a ledger row without one (a plain manual
/// correction) is allowed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventKey {
    pub external_source: String,
    pub external_event_id: String,
}

impl EventKey {
    /// Source recorded for credits produced by reviewer approval.
    pub const ADMIN_APPROVAL: &'static str = "admin_approval";

    pub fn new(external_source: impl Into<String>, external_event_id: impl Into<String>) -> Self {
        Self {
            external_source: external_source.into(),
            external_event_id: external_event_id.into(),
        }
    }

    /// Key for the one manual credit a submission may ever produce.
    pub fn for_submission(submission_id: RecordId) -> Self {
        Self {
            external_source: Self::ADMIN_APPROVAL.to_string(),
            external_event_id: format!("submission_{submission_id}"),
        }
    }

    /// Key for a course-completion credit delivered by the LMS provider.
    ///
    /// The signal is part of the key: one upstream event can in principle
    /// carry several recognized signals, each a separate credit.
    pub fn for_external_event(provider: &str, event_id: &str, signal: &str) -> Self {
        Self {
            external_source: provider.to_string(),
            external_event_id: format!("{provider}:{event_id}|tag:{signal}"),
        }
    }
}
