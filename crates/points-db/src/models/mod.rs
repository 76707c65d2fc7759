//! Database models - `FromRow` structs mirroring the schema

mod audit_log;
mod course_grant;
mod external_event;
mod ledger_entry;
mod submission;
mod user;

pub use audit_log::AuditLogModel;
pub use course_grant::CourseGrantModel;
pub use external_event::ExternalEventModel;
pub use ledger_entry::LedgerEntryModel;
pub use submission::SubmissionModel;
pub use user::UserModel;
