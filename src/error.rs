use compiler_engine::{ArtifactError, EngineError};
use thiserror::Error;

use crate::session::SessionId;
use crate::spaces::{EventKind, SpaceError, SpaceViolation};

/// Failure of a session-level operation.
///
/// Validation and contract errors never change session state. Engine errors either
/// leave the session untouched (atomic engines) or mark it unusable.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session {session_id} has not been initialized")]
    NotInitialized { session_id: SessionId },

    #[error("session {session_id} is already initialized")]
    AlreadyInitialized { session_id: SessionId },

    #[error("session {session_id} has ended")]
    Ended { session_id: SessionId },

    #[error("session {session_id} is unusable after a failed engine call and must be closed")]
    Unusable { session_id: SessionId },

    #[error("session {session_id} is closed")]
    Closed { session_id: SessionId },

    #[error("unknown session {session_id}")]
    UnknownSession { session_id: SessionId },

    #[error("action space index {index} is outside [0, {available})")]
    UnknownActionSpace { index: usize, available: usize },

    #[error("invalid action for space '{space}': {violation}")]
    InvalidAction {
        space: String,
        #[source]
        violation: SpaceViolation,
    },

    #[error("backend {backend} has no transform for the action on space '{space}'")]
    UnmappedAction { backend: String, space: String },

    #[error("unknown observation space '{name}'")]
    UnknownObservationSpace { name: String },

    #[error("observation space '{space}' expects {expected} values but the backend produced {found}")]
    ObservationMismatch {
        space: String,
        expected: EventKind,
        found: EventKind,
    },

    #[error("backend published action space '{space}' in violation of its index policy: {reason}")]
    ActionSpacePolicy { space: String, reason: String },

    #[error("engine failed on {subject}: {source}")]
    Engine {
        subject: String,
        #[source]
        source: EngineError,
    },

    #[error("failed to fetch benchmark: {0}")]
    Artifact(#[source] ArtifactError),

    #[error("service is shutting down")]
    ShuttingDown,

    #[error("session limit of {limit} reached")]
    SessionLimit { limit: usize },
}

impl SessionError {
    #[must_use]
    pub fn engine(subject: impl Into<String>, source: EngineError) -> Self {
        Self::Engine {
            subject: subject.into(),
            source,
        }
    }
}

/// Defect in the static backend/registry configuration. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("unknown backend '{id}'; available backends: {available}")]
    UnknownBackend { id: String, available: String },

    #[error("action space kind {kind} is not handled by backend {backend}")]
    UnreachableSpaceKind {
        backend: &'static str,
        kind: &'static str,
    },

    #[error("backend {backend} publishes no action spaces")]
    NoActionSpaces { backend: &'static str },

    #[error("space '{space}' of backend {backend} is invalid: {source}")]
    InvalidSpace {
        backend: &'static str,
        space: String,
        #[source]
        source: SpaceError,
    },

    #[error("backend {backend} publishes space name '{name}' more than once")]
    DuplicateSpaceName { backend: &'static str, name: String },

    #[error("default observation of '{space}' in backend {backend} is invalid: {source}")]
    InvalidDefaultObservation {
        backend: &'static str,
        space: String,
        #[source]
        source: SpaceViolation,
    },

    #[error("environment variable {key}={value:?} is invalid: {reason}")]
    InvalidEnv {
        key: &'static str,
        value: String,
        reason: String,
    },
}
