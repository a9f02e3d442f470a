//! Process-wide `tracing` subscriber setup.

use thiserror::Error;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::EnvConfig;

/// Directive used when no filter is configured.
pub const DEFAULT_LOG_DIRECTIVE: &str = "compiler_session=info";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingConfig {
    /// `EnvFilter` directives, e.g. `compiler_session=debug`.
    pub filter: Option<String>,
    pub ansi: bool,
}

impl LoggingConfig {
    #[must_use]
    pub fn from_env_config(config: &EnvConfig) -> Self {
        Self {
            filter: config.log_filter.clone(),
            ansi: config.log_ansi,
        }
    }

    #[must_use]
    pub fn directive(&self) -> &str {
        self.filter.as_deref().unwrap_or(DEFAULT_LOG_DIRECTIVE)
    }
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter '{filter}': {source}")]
    InvalidFilter {
        filter: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },

    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialized,
}

/// Installs a formatted subscriber writing to stderr.
pub fn init(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = build_filter(config)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.ansi)
        .with_writer(std::io::stderr)
        .finish()
        .try_init()
        .map_err(|_| LoggingError::AlreadyInitialized)
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, LoggingError> {
    let directive = config.directive();
    EnvFilter::try_new(directive).map_err(|source| LoggingError::InvalidFilter {
        filter: directive.to_string(),
        source,
    })
}
