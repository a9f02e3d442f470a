use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{ConfigurationError, SessionError};

/// Coarse failure class reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCode {
    InvalidArgument,
    FailedPrecondition,
    NotFound,
    ResourceExhausted,
    Unavailable,
    Internal,
}

impl StatusCode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::FailedPrecondition => "FAILED_PRECONDITION",
            Self::NotFound => "NOT_FOUND",
            Self::ResourceExhausted => "RESOURCE_EXHAUSTED",
            Self::Unavailable => "UNAVAILABLE",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured failure of one service call.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct Status {
    pub code: StatusCode,
    pub message: String,
}

impl Status {
    #[must_use]
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(StatusCode::InvalidArgument, message)
    }
}

impl SessionError {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotInitialized { .. }
            | Self::AlreadyInitialized { .. }
            | Self::Ended { .. }
            | Self::Unusable { .. } => StatusCode::FailedPrecondition,
            Self::Closed { .. }
            | Self::UnknownSession { .. }
            | Self::UnknownObservationSpace { .. }
            | Self::Artifact(_) => StatusCode::NotFound,
            Self::UnknownActionSpace { .. }
            | Self::InvalidAction { .. }
            | Self::UnmappedAction { .. } => StatusCode::InvalidArgument,
            Self::ObservationMismatch { .. }
            | Self::ActionSpacePolicy { .. }
            | Self::Engine { .. } => StatusCode::Internal,
            Self::ShuttingDown => StatusCode::Unavailable,
            Self::SessionLimit { .. } => StatusCode::ResourceExhausted,
        }
    }
}

impl From<SessionError> for Status {
    fn from(error: SessionError) -> Self {
        Self::new(error.status_code(), error.to_string())
    }
}

impl From<ConfigurationError> for Status {
    fn from(error: ConfigurationError) -> Self {
        let code = match error {
            ConfigurationError::UnknownBackend { .. } => StatusCode::NotFound,
            _ => StatusCode::Internal,
        };
        Self::new(code, error.to_string())
    }
}
