//! Audit log entry - "actor did action to target"
//!
//! Written alongside every state-changing operation. Append-only.

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

use crate::value_objects::RecordId;

/// Auditable action types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    CreateSubmission,
    ApproveSubmission,
    RejectSubmission,
    AdjustPoints,
    ProcessExternalEvent,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateSubmission => "CREATE_SUBMISSION",
            Self::ApproveSubmission => "APPROVE_SUBMISSION",
            Self::RejectSubmission => "REJECT_SUBMISSION",
            Self::AdjustPoints => "ADJUST_POINTS",
            Self::ProcessExternalEvent => "PROCESS_EXTERNAL_EVENT",
        }
    }
}

impl std::str::FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATE_SUBMISSION" => Ok(Self::CreateSubmission),
            "APPROVE_SUBMISSION" => Ok(Self::ApproveSubmission),
            "REJECT_SUBMISSION" => Ok(Self::RejectSubmission),
            "ADJUST_POINTS" => Ok(Self::AdjustPoints),
            "PROCESS_EXTERNAL_EVENT" => Ok(Self::ProcessExternalEvent),
            other => Err(format!("unknown audit action: {other}")),
        }
    }
}

/// One append-only audit record.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub id: RecordId,
    /// Acting user, or `RecordId::SYSTEM` for engine-initiated actions.
    pub actor_id: RecordId,
    pub action: AuditAction,
    pub target_type: String,
    pub target_id: String,
    pub metadata: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        id: RecordId,
        actor_id: RecordId,
        action: AuditAction,
        target_type: impl Into<String>,
        target_id: impl Into<String>,
        metadata: Option<JsonValue>,
    ) -> Self {
        Self {
            id,
            actor_id,
            action,
            target_type: target_type.into(),
            target_id: target_id.into(),
            metadata,
            created_at: Utc::now(),
        }
    }

    /// Audit record for an action taken by the engine itself (webhook path).
    pub fn system(
        id: RecordId,
        action: AuditAction,
        target_type: impl Into<String>,
        target_id: impl Into<String>,
        metadata: Option<JsonValue>,
    ) -> Self {
        Self::new(id, RecordId::SYSTEM, action, target_type, target_id, metadata)
    }
}
