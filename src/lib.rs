//! Stateful compilation-session service.
//!
//! Clients negotiate typed action and observation spaces, start sessions on input
//! programs, apply validated actions, read observations, and fork sessions to explore
//! alternative optimization paths. The compiler itself sits behind the
//! [`compiler_engine::CompilerEngine`] trait.
//!
//! # Public API Overview
//! - Describe domains with [`SpaceDescriptor`] and exchange values as [`Event`]s.
//! - Enumerate backends and their spaces through [`SpaceRegistry`].
//! - Drive one program with a [`Session`]; plug backend behavior in with
//!   [`SessionBackend`].
//! - Serve many sessions concurrently with [`CompilerService`].

pub mod artifacts;
pub mod backends;
pub mod config;
pub mod error;
pub mod logging;
pub mod registry;
pub mod service;
pub mod session;
pub mod spaces;

pub use crate::artifacts::FileArtifactStore;
pub use crate::config::{EnvConfig, ServiceOptions};
pub use crate::error::{ConfigurationError, SessionError};
pub use crate::logging::{LoggingConfig, LoggingError};
pub use crate::registry::{ActionSpaceKind, BackendKind, RegistryOptions, SpaceRegistry};
pub use crate::service::{CompilerService, Request, Response, Status, StatusCode};
pub use crate::session::{
    IndexPolicy, Session, SessionBackend, SessionId, SessionState, StepOutcome, ValidatedAction,
};
pub use crate::spaces::{
    ActionSpace, DescriptorKind, Event, EventKind, ObservationSpace, SpaceDescriptor, SpaceError,
    SpaceViolation,
};
