//! PostgreSQL repository and store implementations

mod audit_log;
mod credit_store;
pub mod error;
mod external_event;
mod ledger;
mod review_store;
mod submission;
mod user;

pub use audit_log::PgAuditLogRepository;
pub use credit_store::PgCreditStore;
pub use external_event::PgExternalEventRepository;
pub use ledger::PgLedgerRepository;
pub use review_store::PgReviewStore;
pub use submission::PgSubmissionRepository;
pub use user::PgUserRepository;
