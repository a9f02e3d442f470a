//! Environment configuration.

use std::env;
use std::str::FromStr;

use crate::error::ConfigurationError;
use crate::registry::BackendKind;

pub const BACKEND_ENV: &str = "COMPILER_SESSION_BACKEND";
pub const MAX_SESSIONS_ENV: &str = "COMPILER_SESSION_MAX_SESSIONS";
pub const EPISODE_LENGTH_ENV: &str = "COMPILER_SESSION_EPISODE_LENGTH";
pub const LOG_ENV: &str = "COMPILER_SESSION_LOG";
pub const LOG_ANSI_ENV: &str = "COMPILER_SESSION_LOG_ANSI";

/// Raw environment values, unvalidated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvConfig {
    pub backend: Option<String>,
    pub max_sessions: Option<String>,
    pub episode_length: Option<String>,
    pub log_filter: Option<String>,
    pub log_ansi: bool,
}

impl EnvConfig {
    pub fn from_env() -> Self {
        Self {
            backend: env_string_opt(BACKEND_ENV),
            max_sessions: env_string_opt(MAX_SESSIONS_ENV),
            episode_length: env_string_opt(EPISODE_LENGTH_ENV),
            log_filter: env_string_opt(LOG_ENV),
            log_ansi: env_flag(LOG_ANSI_ENV),
        }
    }
}

/// Validated service settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceOptions {
    /// Backend used for new sessions.
    pub backend: BackendKind,
    /// Upper bound on live sessions. `None` is unbounded.
    pub max_sessions: Option<usize>,
    /// Actions per episode. `None` never ends an episode.
    pub episode_length: Option<u64>,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            backend: BackendKind::Example,
            max_sessions: None,
            episode_length: None,
        }
    }
}

impl ServiceOptions {
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_env_config(&EnvConfig::from_env())
    }

    pub fn from_env_config(config: &EnvConfig) -> Result<Self, ConfigurationError> {
        let backend = match config.backend.as_deref() {
            Some(id) => id.parse().map_err(|_| ConfigurationError::InvalidEnv {
                key: BACKEND_ENV,
                value: id.to_string(),
                reason: format!(
                    "expected one of: {}",
                    BackendKind::ALL
                        .iter()
                        .map(|kind| kind.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            })?,
            None => BackendKind::Example,
        };

        Ok(Self {
            backend,
            max_sessions: parse_positive(MAX_SESSIONS_ENV, config.max_sessions.as_deref())?,
            episode_length: parse_positive(EPISODE_LENGTH_ENV, config.episode_length.as_deref())?,
        })
    }

    #[must_use]
    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    #[must_use]
    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = Some(max_sessions);
        self
    }

    #[must_use]
    pub fn with_episode_length(mut self, episode_length: u64) -> Self {
        self.episode_length = Some(episode_length);
        self
    }
}

fn parse_positive<T>(key: &'static str, value: Option<&str>) -> Result<Option<T>, ConfigurationError>
where
    T: FromStr + PartialEq + Default,
    T::Err: std::fmt::Display,
{
    let Some(value) = value else {
        return Ok(None);
    };

    let invalid = |reason: String| ConfigurationError::InvalidEnv {
        key,
        value: value.to_string(),
        reason,
    };
    let parsed: T = value
        .trim()
        .parse()
        .map_err(|error: T::Err| invalid(error.to_string()))?;
    if parsed == T::default() {
        return Err(invalid("must be greater than zero".to_string()));
    }
    Ok(Some(parsed))
}

fn env_flag(key: &str) -> bool {
    env::var(key).map(|value| value == "1").unwrap_or(false)
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}
