use std::sync::Arc;

use compiler_engine::{CompilerEngine, EngineError, ProgramHandle};

use crate::spaces::{ActionSpace, Event, ObservationSpace};

/// An action that has already been checked against its action space.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidatedAction {
    /// Index into a discrete or flag space, with the resolved choice name.
    Choice { index: usize, name: String },
    /// Value in a scalar, tensor or string space.
    Value(Event),
}

impl ValidatedAction {
    #[must_use]
    pub fn choice_name(&self) -> Option<&str> {
        match self {
            Self::Choice { name, .. } => Some(name),
            Self::Value(_) => None,
        }
    }
}

/// How a backend may reshape the action space it publishes mid-session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IndexPolicy {
    /// Existing choices keep their index; new choices may only be appended.
    #[default]
    Stable,
    /// Choices may be renumbered freely. Clients must re-resolve names.
    Renumber,
}

/// Per-backend capabilities injected into every session of that backend.
///
/// Implementations are shared between sessions and must not keep per-session state.
pub trait SessionBackend: Send + Sync + 'static {
    /// Backend identifier used in errors and logs.
    fn name(&self) -> &str;

    fn action_spaces(&self) -> Arc<[ActionSpace]>;

    fn observation_spaces(&self) -> Arc<[ObservationSpace]>;

    /// Engine transform implementing `action`, or `None` when the backend has no mapping.
    fn transform_for(&self, space: &ActionSpace, action: &ValidatedAction) -> Option<String> {
        let _ = space;
        action.choice_name().map(str::to_string)
    }

    /// Computes one observation of `program`.
    fn compute_observation(
        &self,
        engine: &dyn CompilerEngine,
        program: &ProgramHandle,
        space: &ObservationSpace,
    ) -> Result<Event, EngineError> {
        engine.measure(program, &space.name).map(Event::from)
    }

    /// Whether an episode is over after `actions_applied` successful actions.
    fn end_of_episode(&self, actions_applied: u64) -> bool {
        let _ = actions_applied;
        false
    }

    /// Replacement for the selected action space after `action`, if any.
    fn next_action_space(
        &self,
        current: &ActionSpace,
        action: &ValidatedAction,
    ) -> Option<ActionSpace> {
        let _ = (current, action);
        None
    }

    fn index_policy(&self) -> IndexPolicy {
        IndexPolicy::Stable
    }
}
