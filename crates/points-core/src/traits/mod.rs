//! Repository and store traits (ports)

mod repositories;

pub use repositories::{
    AuditLogRepository, CreditOutcome, CreditStore, ExternalCreditRecord, ExternalEventRepository,
    LedgerRepository, RepoResult, ReviewDecisionRecord, ReviewStore, SubmissionRepository,
    UserRepository,
};
