//! Service context - dependency container for services
//!
//! Holds the repositories, transactional stores, and collaborators the
//! services need.

use std::sync::Arc;

use points_core::traits::{
    AuditLogRepository, CreditStore, ExternalEventRepository, LedgerRepository, ReviewStore,
    SubmissionRepository, UserRepository,
};
use points_core::value_objects::{RecordId, RecordIdGenerator};
use points_core::Scoring;

/// Service context containing all dependencies
///
/// Provides access to:
/// - Repositories and the two transactional stores
/// - The activity scoring collaborator
/// - The record-id generator
/// - The configured webhook provider prefix
#[derive(Clone)]
pub struct ServiceContext {
    users: Arc<dyn UserRepository>,
    submissions: Arc<dyn SubmissionRepository>,
    ledger: Arc<dyn LedgerRepository>,
    audit: Arc<dyn AuditLogRepository>,
    events: Arc<dyn ExternalEventRepository>,
    review_store: Arc<dyn ReviewStore>,
    credit_store: Arc<dyn CreditStore>,
    scoring: Arc<dyn Scoring>,
    ids: Arc<RecordIdGenerator>,
    webhook_provider: String,
}

impl ServiceContext {
    /// Create a new service context with all dependencies
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        users: Arc<dyn UserRepository>,
        submissions: Arc<dyn SubmissionRepository>,
        ledger: Arc<dyn LedgerRepository>,
        audit: Arc<dyn AuditLogRepository>,
        events: Arc<dyn ExternalEventRepository>,
        review_store: Arc<dyn ReviewStore>,
        credit_store: Arc<dyn CreditStore>,
        scoring: Arc<dyn Scoring>,
        ids: Arc<RecordIdGenerator>,
        webhook_provider: impl Into<String>,
    ) -> Self {
        Self {
            users,
            submissions,
            ledger,
            audit,
            events,
            review_store,
            credit_store,
            scoring,
            ids,
            webhook_provider: webhook_provider.into(),
        }
    }

    // === Repositories ===

    pub fn users(&self) -> &dyn UserRepository {
        self.users.as_ref()
    }

    pub fn submissions(&self) -> &dyn SubmissionRepository {
        self.submissions.as_ref()
    }

    pub fn ledger(&self) -> &dyn LedgerRepository {
        self.ledger.as_ref()
    }

    pub fn audit(&self) -> &dyn AuditLogRepository {
        self.audit.as_ref()
    }

    pub fn events(&self) -> &dyn ExternalEventRepository {
        self.events.as_ref()
    }

    // === Transactional stores ===

    pub fn review_store(&self) -> &dyn ReviewStore {
        self.review_store.as_ref()
    }

    pub fn credit_store(&self) -> &dyn CreditStore {
        self.credit_store.as_ref()
    }

    // === Collaborators ===

    pub fn scoring(&self) -> &dyn Scoring {
        self.scoring.as_ref()
    }

    /// Generate a new RecordId
    pub fn generate_id(&self) -> RecordId {
        self.ids.generate()
    }

    /// Provider prefix for webhook ledger event keys
    pub fn webhook_provider(&self) -> &str {
        &self.webhook_provider
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("webhook_provider", &self.webhook_provider)
            .field("repositories", &"...")
            .finish()
    }
}
