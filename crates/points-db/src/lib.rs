//! # points-db
//!
//! Database layer implementing the points-core ports with PostgreSQL via SQLx.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - Connection pool management
//! - Database models with SQLx `FromRow` derives
//! - Entity ↔ Model mappers
//! - Repository implementations
//! - The two transactional stores (review decisions, external credits)
//! - The badge-evaluator hook that runs inside the credit transaction
//!
//! ## Usage
//!
//! ```rust,ignore
//! use points_db::pool::{create_pool, DatabaseConfig};
//! use points_db::PgSubmissionRepository;
//! use points_core::SubmissionRepository;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig::from_env();
//!     let pool = create_pool(&config).await?;
//!     let submissions = PgSubmissionRepository::new(pool);
//!
//!     // Use the repository...
//!     Ok(())
//! }
//! ```

pub mod badges;
pub mod mappers;
pub mod models;
pub mod pool;
pub mod repositories;

// Re-export commonly used types
pub use badges::{BadgeEvaluator, NoopBadgeEvaluator, ThresholdBadgeEvaluator};
pub use pool::{create_pool, create_pool_from_env, DatabaseConfig, PgPool};
pub use repositories::{
    PgAuditLogRepository, PgCreditStore, PgExternalEventRepository, PgLedgerRepository,
    PgReviewStore, PgSubmissionRepository, PgUserRepository,
};
