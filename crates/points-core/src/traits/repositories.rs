//! Repository traits (ports) - define the interface for data access
//!
//! The domain layer defines what it needs, and the infrastructure layer
//! provides the implementation. The two store traits at the bottom are the
//! engine's transactional units: their implementations own a database
//! transaction per call, so atomicity is part of the contract and test
//! doubles can exercise it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::activity::ActivityCode;
use crate::entities::{
    AuditEntry, ExternalEvent, ExternalEventStatus, LedgerEntry, Submission, SubmissionStatus,
    User,
};
use crate::error::DomainError;
use crate::value_objects::{EventKey, RecordId};

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

// ============================================================================
// User Repository
// ============================================================================

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find user by ID
    async fn find_by_id(&self, id: RecordId) -> RepoResult<Option<User>>;

    /// Find user by normalized email
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>>;

    /// Find user by stored LMS contact id
    async fn find_by_contact_id(&self, contact_id: &str) -> RepoResult<Option<User>>;

    /// Create a new user (first sign-in)
    async fn create(&self, user: &User) -> RepoResult<()>;

    /// Persist the LMS contact id learned from an email match.
    /// Cache-fill for future fast-path lookups, not a correctness requirement.
    async fn store_contact_id(&self, id: RecordId, contact_id: &str) -> RepoResult<()>;

    /// Flip the ineligibility flag (admin action)
    async fn set_ineligible(&self, id: RecordId, ineligible: bool) -> RepoResult<()>;
}

// ============================================================================
// Submission Repository
// ============================================================================

#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    /// Find submission by ID
    async fn find_by_id(&self, id: RecordId) -> RepoResult<Option<Submission>>;

    /// Insert a new pending submission
    async fn create(&self, submission: &Submission) -> RepoResult<()>;

    /// Whether an active (pending or approved) submission exists for
    /// (user, activity). Single-active admission check.
    async fn has_active(&self, user_id: RecordId, activity: ActivityCode) -> RepoResult<bool>;

    /// Submissions for (user, activity) created after `since`, any status.
    /// Rolling-quota evaluation reads.
    async fn find_since(
        &self,
        user_id: RecordId,
        activity: ActivityCode,
        since: DateTime<Utc>,
    ) -> RepoResult<Vec<Submission>>;

    /// All submissions for a user, newest first
    async fn list_by_user(&self, user_id: RecordId) -> RepoResult<Vec<Submission>>;

    /// Pending submissions, oldest first, for the review queue
    async fn list_pending(&self, limit: i64) -> RepoResult<Vec<Submission>>;
}

// ============================================================================
// Ledger Repository
// ============================================================================

#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Insert one entry outside any review/credit transaction
    /// (corrections and form backfills).
    async fn insert(&self, entry: &LedgerEntry) -> RepoResult<()>;

    /// Look up an entry by its crediting-event identity
    async fn find_by_event_key(&self, key: &EventKey) -> RepoResult<Option<LedgerEntry>>;

    /// Sum of deltas for a user across all activities. Always derived;
    /// there is no stored running total.
    async fn total_for_user(&self, user_id: RecordId) -> RepoResult<i64>;

    /// Sum of deltas for one (user, activity)
    async fn total_for_user_activity(
        &self,
        user_id: RecordId,
        activity: ActivityCode,
    ) -> RepoResult<i64>;

    /// All entries for a user, newest first
    async fn list_by_user(&self, user_id: RecordId) -> RepoResult<Vec<LedgerEntry>>;
}

// ============================================================================
// Audit Log Repository
// ============================================================================

#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// Append one audit record
    async fn record(&self, entry: &AuditEntry) -> RepoResult<()>;

    /// Audit records for one target, newest first
    async fn list_for_target(&self, target_type: &str, target_id: &str)
        -> RepoResult<Vec<AuditEntry>>;
}

// ============================================================================
// External Event Repository
// ============================================================================

#[async_trait]
pub trait ExternalEventRepository: Send + Sync {
    /// Store a freshly received event
    async fn create(&self, event: &ExternalEvent) -> RepoResult<()>;

    /// Find a stored event by its record id
    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<ExternalEvent>>;

    /// Whether a different record with the same (event id, signal) pair has
    /// already been processed. Redelivery short-circuit.
    async fn processed_exists(
        &self,
        event_id: &str,
        signal: &str,
        excluding: Uuid,
    ) -> RepoResult<bool>;

    /// Transition the lifecycle status (the record's only mutation)
    async fn update_status(&self, id: Uuid, status: ExternalEventStatus) -> RepoResult<()>;

    /// Record which user the event resolved to
    async fn set_matched_user(&self, id: Uuid, user_id: RecordId) -> RepoResult<()>;

    /// Events awaiting account linkage, oldest first
    async fn list_unmatched(&self, limit: i64) -> RepoResult<Vec<ExternalEvent>>;
}

// ============================================================================
// Review Store (transactional)
// ============================================================================

/// Everything one reviewer decision writes, built by the orchestrator and
/// committed atomically by the store.
#[derive(Debug, Clone)]
pub struct ReviewDecisionRecord {
    pub submission_id: RecordId,
    pub reviewer_id: RecordId,
    /// Target status; `Approved` or `Rejected`.
    pub status: SubmissionStatus,
    pub note: Option<String>,
    /// Present only for approvals of activities credited via manual review.
    pub ledger_entry: Option<LedgerEntry>,
    pub audit_entries: Vec<AuditEntry>,
}

#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Apply one decision in a single transaction: status update guarded on
    /// `pending`, ledger insert, audit rows. Fails `InvalidState` (committing
    /// nothing) when the submission was concurrently reviewed.
    async fn commit_decision(&self, decision: &ReviewDecisionRecord) -> RepoResult<()>;

    /// Apply a batch in one outer transaction. Items found non-pending at
    /// execution time are silently skipped. Returns the number applied.
    async fn commit_batch(&self, decisions: &[ReviewDecisionRecord]) -> RepoResult<u64>;
}

// ============================================================================
// Credit Store (transactional)
// ============================================================================

/// Everything one external credit writes, committed atomically.
#[derive(Debug, Clone)]
pub struct ExternalCreditRecord {
    /// Stored event record driving this credit.
    pub event_record_id: Uuid,
    pub user_id: RecordId,
    /// Normalized signal; keys the (user, signal) course grant.
    pub signal: String,
    pub ledger_entry: LedgerEntry,
    pub audit_entry: AuditEntry,
}

/// Result of attempting an external credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditOutcome {
    /// Grant + ledger entry inserted, badges evaluated, event processed.
    Credited,
    /// (user, signal) grant already present; no ledger effect, event marked
    /// duplicate. Expected under redelivery.
    AlreadyGranted,
    /// Ledger event key already present; transaction rolled back, event
    /// marked duplicate.
    DuplicateEvent,
}

#[async_trait]
pub trait CreditStore: Send + Sync {
    /// Grant-record insert, ledger insert, audit row, badge evaluation and
    /// event status update as one transaction. Unique-constraint conflicts
    /// are converted to `AlreadyGranted` / `DuplicateEvent`, never errors.
    async fn commit_external_credit(
        &self,
        record: &ExternalCreditRecord,
    ) -> RepoResult<CreditOutcome>;
}
