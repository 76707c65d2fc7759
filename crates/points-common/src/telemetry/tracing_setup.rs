//! Tracing and logging setup
//!
//! Configures the `tracing` subscriber with environment-based filtering.
//! Pretty output for development, JSON for production.

use tracing::Level;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Tracing configuration options
#[derive(Debug, Clone)]
pub struct TracingSettings {
    /// Default level when `RUST_LOG` is not set
    pub level: Level,
    /// Emit JSON lines instead of the human-readable format
    pub json: bool,
    /// Include file and line numbers
    pub file_line: bool,
}

impl Default for TracingSettings {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json: false,
            file_line: true,
        }
    }
}

impl TracingSettings {
    /// Production configuration: INFO, JSON, no source locations.
    #[must_use]
    pub fn production() -> Self {
        Self {
            level: Level::INFO,
            json: true,
            file_line: false,
        }
    }
}

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` for filtering when set, otherwise the configured level.
///
/// # Panics
/// Panics if a subscriber is already installed.
pub fn init_tracing(settings: &TracingSettings) {
    try_init_tracing(settings).expect("tracing subscriber already initialized");
}

/// Like [`init_tracing`] but returns an error instead of panicking when a
/// subscriber is already installed (useful in tests).
pub fn try_init_tracing(settings: &TracingSettings) -> Result<(), TracingError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.level.to_string()));

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = if settings.json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_file(settings.file_line)
                    .with_line_number(settings.file_line),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_file(settings.file_line)
                    .with_line_number(settings.file_line),
            )
            .try_init()
    };

    result.map_err(|_| TracingError::AlreadyInitialized)
}

/// Tracing initialization errors
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("Tracing subscriber already initialized")]
    AlreadyInitialized,
}
