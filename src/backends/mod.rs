//! Built-in [`SessionBackend`](crate::session::SessionBackend) implementations.

pub mod example;
pub mod llvm;

/// Episode budget shared by the built-in backends. `None` never ends an episode.
pub(crate) fn budget_exhausted(episode_length: Option<u64>, actions_applied: u64) -> bool {
    episode_length.is_some_and(|length| actions_applied >= length)
}
