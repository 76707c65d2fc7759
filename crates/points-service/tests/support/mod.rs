//! In-memory backend for engine tests
//!
//! One shared state behind a mutex implements every port, mirroring the
//! constraint behavior of the real schema: the (user, signal) grant set,
//! the ledger event-key uniqueness, and the pending-status guard. The
//! review store supports one-shot failure injection so the atomicity
//! property can be observed.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use points_core::entities::{
    AuditEntry, ExternalEvent, ExternalEventStatus, LedgerEntry, Submission, User,
};
use points_core::traits::{
    AuditLogRepository, CreditOutcome, CreditStore, ExternalCreditRecord, ExternalEventRepository,
    LedgerRepository, RepoResult, ReviewDecisionRecord, ReviewStore, SubmissionRepository,
    UserRepository,
};
use points_core::value_objects::{EventKey, RecordId, RecordIdGenerator};
use points_core::{ActivityCode, DefaultScoring, DomainError};
use points_service::ServiceContext;

static NEXT_ID: AtomicI64 = AtomicI64::new(1_000);

pub fn next_id() -> RecordId {
    RecordId::new(NEXT_ID.fetch_add(1, Ordering::SeqCst))
}

#[derive(Default)]
struct EngineState {
    users: HashMap<i64, User>,
    submissions: HashMap<i64, Submission>,
    ledger: Vec<LedgerEntry>,
    grants: HashSet<(i64, String)>,
    audits: Vec<AuditEntry>,
    events: HashMap<Uuid, ExternalEvent>,
    badge_evaluations: Vec<i64>,
    fail_next_review_commit: bool,
}

#[derive(Clone, Default)]
pub struct InMemoryBackend {
    state: Arc<Mutex<EngineState>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().expect("engine state lock")
    }

    // === Test setup ===

    pub fn seed_user(&self, email: &str) -> RecordId {
        let id = next_id();
        let user = User::new(id, email.to_string(), format!("User {id}"));
        self.lock().users.insert(id.into_inner(), user);
        id
    }

    pub fn seed_ineligible_user(&self, email: &str) -> RecordId {
        let id = self.seed_user(email);
        self.lock()
            .users
            .get_mut(&id.into_inner())
            .expect("just seeded")
            .ineligible = true;
        id
    }

    /// Insert a submission row directly, optionally backdated.
    pub fn seed_submission(&self, mut submission: Submission, age_days: i64) -> RecordId {
        submission.created_at = Utc::now() - chrono::Duration::days(age_days);
        submission.updated_at = submission.created_at;
        let id = submission.id;
        self.lock().submissions.insert(id.into_inner(), submission);
        id
    }

    pub fn fail_next_review_commit(&self) {
        self.lock().fail_next_review_commit = true;
    }

    // === Test assertions ===

    pub fn submission(&self, id: RecordId) -> Option<Submission> {
        self.lock().submissions.get(&id.into_inner()).cloned()
    }

    pub fn ledger_entries(&self) -> Vec<LedgerEntry> {
        self.lock().ledger.clone()
    }

    pub fn audits(&self) -> Vec<AuditEntry> {
        self.lock().audits.clone()
    }

    pub fn event(&self, id: Uuid) -> Option<ExternalEvent> {
        self.lock().events.get(&id).cloned()
    }

    pub fn badge_evaluations(&self) -> Vec<i64> {
        self.lock().badge_evaluations.clone()
    }
}

fn has_event_key(ledger: &[LedgerEntry], key: &EventKey) -> bool {
    ledger
        .iter()
        .any(|entry| entry.event_key.as_ref() == Some(key))
}

fn apply_decision(state: &mut EngineState, decision: &ReviewDecisionRecord) -> bool {
    let Some(submission) = state.submissions.get(&decision.submission_id.into_inner()) else {
        return false;
    };
    if !submission.status.is_pending() {
        return false;
    }

    let submission = state
        .submissions
        .get_mut(&decision.submission_id.into_inner())
        .expect("checked above");
    submission.status = decision.status;
    submission.reviewer_id = Some(decision.reviewer_id);
    submission.review_note = decision.note.clone();
    submission.updated_at = Utc::now();

    if let Some(entry) = &decision.ledger_entry {
        state.ledger.push(entry.clone());
    }
    state.audits.extend(decision.audit_entries.iter().cloned());
    true
}

// ============================================================================
// Port implementations
// ============================================================================

#[async_trait]
impl UserRepository for InMemoryBackend {
    async fn find_by_id(&self, id: RecordId) -> RepoResult<Option<User>> {
        Ok(self.lock().users.get(&id.into_inner()).cloned())
    }

    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        Ok(self
            .lock()
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_contact_id(&self, contact_id: &str) -> RepoResult<Option<User>> {
        Ok(self
            .lock()
            .users
            .values()
            .find(|u| u.lms_contact_id.as_deref() == Some(contact_id))
            .cloned())
    }

    async fn create(&self, user: &User) -> RepoResult<()> {
        self.lock().users.insert(user.id.into_inner(), user.clone());
        Ok(())
    }

    async fn store_contact_id(&self, id: RecordId, contact_id: &str) -> RepoResult<()> {
        let mut state = self.lock();
        let user = state
            .users
            .get_mut(&id.into_inner())
            .ok_or(DomainError::UserNotFound(id))?;
        if user.lms_contact_id.is_none() {
            user.lms_contact_id = Some(contact_id.to_string());
        }
        Ok(())
    }

    async fn set_ineligible(&self, id: RecordId, ineligible: bool) -> RepoResult<()> {
        let mut state = self.lock();
        let user = state
            .users
            .get_mut(&id.into_inner())
            .ok_or(DomainError::UserNotFound(id))?;
        user.ineligible = ineligible;
        Ok(())
    }
}

#[async_trait]
impl SubmissionRepository for InMemoryBackend {
    async fn find_by_id(&self, id: RecordId) -> RepoResult<Option<Submission>> {
        Ok(self.lock().submissions.get(&id.into_inner()).cloned())
    }

    async fn create(&self, submission: &Submission) -> RepoResult<()> {
        self.lock()
            .submissions
            .insert(submission.id.into_inner(), submission.clone());
        Ok(())
    }

    async fn has_active(&self, user_id: RecordId, activity: ActivityCode) -> RepoResult<bool> {
        Ok(self.lock().submissions.values().any(|s| {
            s.user_id == user_id && s.activity == activity && s.status.is_active()
        }))
    }

    async fn find_since(
        &self,
        user_id: RecordId,
        activity: ActivityCode,
        since: DateTime<Utc>,
    ) -> RepoResult<Vec<Submission>> {
        Ok(self
            .lock()
            .submissions
            .values()
            .filter(|s| s.user_id == user_id && s.activity == activity && s.created_at > since)
            .cloned()
            .collect())
    }

    async fn list_by_user(&self, user_id: RecordId) -> RepoResult<Vec<Submission>> {
        let mut result: Vec<Submission> = self
            .lock()
            .submissions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }

    async fn list_pending(&self, limit: i64) -> RepoResult<Vec<Submission>> {
        let mut result: Vec<Submission> = self
            .lock()
            .submissions
            .values()
            .filter(|s| s.status.is_pending())
            .cloned()
            .collect();
        result.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        result.truncate(limit as usize);
        Ok(result)
    }
}

#[async_trait]
impl LedgerRepository for InMemoryBackend {
    async fn insert(&self, entry: &LedgerEntry) -> RepoResult<()> {
        let mut state = self.lock();
        if let Some(key) = &entry.event_key {
            if has_event_key(&state.ledger, key) {
                return Err(DomainError::Validation(
                    "a ledger entry for this crediting event already exists".to_string(),
                ));
            }
        }
        state.ledger.push(entry.clone());
        Ok(())
    }

    async fn find_by_event_key(&self, key: &EventKey) -> RepoResult<Option<LedgerEntry>> {
        Ok(self
            .lock()
            .ledger
            .iter()
            .find(|entry| entry.event_key.as_ref() == Some(key))
            .cloned())
    }

    async fn total_for_user(&self, user_id: RecordId) -> RepoResult<i64> {
        Ok(self
            .lock()
            .ledger
            .iter()
            .filter(|e| e.user_id == user_id)
            .map(|e| e.delta)
            .sum())
    }

    async fn total_for_user_activity(
        &self,
        user_id: RecordId,
        activity: ActivityCode,
    ) -> RepoResult<i64> {
        Ok(self
            .lock()
            .ledger
            .iter()
            .filter(|e| e.user_id == user_id && e.activity == activity)
            .map(|e| e.delta)
            .sum())
    }

    async fn list_by_user(&self, user_id: RecordId) -> RepoResult<Vec<LedgerEntry>> {
        Ok(self
            .lock()
            .ledger
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AuditLogRepository for InMemoryBackend {
    async fn record(&self, entry: &AuditEntry) -> RepoResult<()> {
        self.lock().audits.push(entry.clone());
        Ok(())
    }

    async fn list_for_target(
        &self,
        target_type: &str,
        target_id: &str,
    ) -> RepoResult<Vec<AuditEntry>> {
        Ok(self
            .lock()
            .audits
            .iter()
            .filter(|a| a.target_type == target_type && a.target_id == target_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ExternalEventRepository for InMemoryBackend {
    async fn create(&self, event: &ExternalEvent) -> RepoResult<()> {
        self.lock().events.insert(event.id, event.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<ExternalEvent>> {
        Ok(self.lock().events.get(&id).cloned())
    }

    async fn processed_exists(
        &self,
        event_id: &str,
        signal: &str,
        excluding: Uuid,
    ) -> RepoResult<bool> {
        Ok(self.lock().events.values().any(|e| {
            e.event_id == event_id
                && e.signal == signal
                && e.status == ExternalEventStatus::Processed
                && e.id != excluding
        }))
    }

    async fn update_status(&self, id: Uuid, status: ExternalEventStatus) -> RepoResult<()> {
        let mut state = self.lock();
        let event = state.events.get_mut(&id).ok_or(DomainError::EventNotFound(id))?;
        event.status = status;
        event.updated_at = Utc::now();
        Ok(())
    }

    async fn set_matched_user(&self, id: Uuid, user_id: RecordId) -> RepoResult<()> {
        let mut state = self.lock();
        let event = state.events.get_mut(&id).ok_or(DomainError::EventNotFound(id))?;
        event.matched_user_id = Some(user_id);
        Ok(())
    }

    async fn list_unmatched(&self, limit: i64) -> RepoResult<Vec<ExternalEvent>> {
        let mut result: Vec<ExternalEvent> = self
            .lock()
            .events
            .values()
            .filter(|e| e.status == ExternalEventStatus::QueuedUnmatched)
            .cloned()
            .collect();
        result.sort_by(|a, b| a.received_at.cmp(&b.received_at));
        result.truncate(limit as usize);
        Ok(result)
    }
}

#[async_trait]
impl ReviewStore for InMemoryBackend {
    async fn commit_decision(&self, decision: &ReviewDecisionRecord) -> RepoResult<()> {
        let mut state = self.lock();

        if state.fail_next_review_commit {
            // Simulated mid-transaction failure: nothing is applied.
            state.fail_next_review_commit = false;
            return Err(DomainError::Database("injected ledger insert failure".to_string()));
        }

        let current = state
            .submissions
            .get(&decision.submission_id.into_inner())
            .map(|s| s.status);
        match current {
            None => return Err(DomainError::SubmissionNotFound(decision.submission_id)),
            Some(status) if !status.is_pending() => {
                return Err(DomainError::InvalidState { current: status })
            }
            Some(_) => {}
        }

        if let Some(entry) = &decision.ledger_entry {
            if let Some(key) = &entry.event_key {
                if has_event_key(&state.ledger, key) {
                    return Err(DomainError::Internal(format!(
                        "ledger credit already present for pending submission {}",
                        decision.submission_id
                    )));
                }
            }
        }

        apply_decision(&mut state, decision);
        Ok(())
    }

    async fn commit_batch(&self, decisions: &[ReviewDecisionRecord]) -> RepoResult<u64> {
        let mut state = self.lock();
        let mut processed = 0u64;
        for decision in decisions {
            if apply_decision(&mut state, decision) {
                processed += 1;
            }
        }
        Ok(processed)
    }
}

#[async_trait]
impl CreditStore for InMemoryBackend {
    async fn commit_external_credit(
        &self,
        record: &ExternalCreditRecord,
    ) -> RepoResult<CreditOutcome> {
        let mut state = self.lock();
        let grant_key = (record.user_id.into_inner(), record.signal.clone());

        if state.grants.contains(&grant_key) {
            if let Some(event) = state.events.get_mut(&record.event_record_id) {
                event.status = ExternalEventStatus::Duplicate;
            }
            return Ok(CreditOutcome::AlreadyGranted);
        }

        let key = record
            .ledger_entry
            .event_key
            .as_ref()
            .expect("webhook credits always carry an event key");
        if has_event_key(&state.ledger, key) {
            // Rolled back: the grant is not recorded.
            if let Some(event) = state.events.get_mut(&record.event_record_id) {
                event.status = ExternalEventStatus::Duplicate;
            }
            return Ok(CreditOutcome::DuplicateEvent);
        }

        state.grants.insert(grant_key);
        state.ledger.push(record.ledger_entry.clone());
        state.audits.push(record.audit_entry.clone());
        let user_id = record.user_id.into_inner();
        state.badge_evaluations.push(user_id);
        if let Some(event) = state.events.get_mut(&record.event_record_id) {
            event.status = ExternalEventStatus::Processed;
            event.matched_user_id = Some(record.user_id);
        }
        Ok(CreditOutcome::Credited)
    }
}

/// Build a ServiceContext wired entirely to the in-memory backend.
pub fn test_context(backend: &InMemoryBackend) -> ServiceContext {
    ServiceContext::new(
        Arc::new(backend.clone()),
        Arc::new(backend.clone()),
        Arc::new(backend.clone()),
        Arc::new(backend.clone()),
        Arc::new(backend.clone()),
        Arc::new(backend.clone()),
        Arc::new(backend.clone()),
        Arc::new(DefaultScoring),
        Arc::new(RecordIdGenerator::new(1)),
        "thinkific",
    )
}
