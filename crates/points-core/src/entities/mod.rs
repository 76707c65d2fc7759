//! Domain entities - core business objects

mod audit;
mod external_event;
mod ledger;
mod submission;
mod user;

pub use audit::{AuditAction, AuditEntry};
pub use external_event::{CourseGrant, ExternalEvent, ExternalEventStatus};
pub use ledger::{CreditSource, LedgerEntry};
pub use submission::{Submission, SubmissionPayload, SubmissionStatus, Visibility};
pub use user::{User, UserRole};
