//! Session State Machine.
//!
//! A [`Session`] owns one engine program and the action spaces negotiated for it. It moves
//! `Uninitialized -> Active -> Ended`, with `Unusable` for sessions whose program may have
//! been left half-transformed and `Closed` once torn down.

mod backend;
mod machine;

pub use backend::{IndexPolicy, SessionBackend, ValidatedAction};
pub use machine::{Session, SessionId, SessionState, StepOutcome};
