//! # points-common
//!
//! Shared utilities for the points engine: environment-driven configuration,
//! the application error type, and tracing setup.

pub mod config;
pub mod error;
pub mod telemetry;

pub use config::{AppConfig, ConfigError, DatabaseSettings, Environment, WebhookSettings};
pub use error::{AppError, AppResult, ErrorResponse};
pub use telemetry::{init_tracing, try_init_tracing, TracingSettings};
