use std::fmt;
use std::sync::Arc;

use compiler_engine::{CompilerEngine, ProgramArtifact, ProgramHandle};

use super::backend::{IndexPolicy, SessionBackend, ValidatedAction};
use crate::error::SessionError;
use crate::spaces::{first_duplicate_name, ActionSpace, Event, ObservationSpace};

/// Service-assigned session identifier.
pub type SessionId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Active,
    Ended,
    /// A non-atomic engine failed mid-transform. Only `close` is still legal.
    Unusable,
    Closed,
}

impl SessionState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Active => "active",
            Self::Ended => "ended",
            Self::Unusable => "unusable",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signals returned by a successful action.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    /// No further actions are meaningful. The session is `Ended` once this is returned.
    pub end_of_episode: bool,
    /// Replacement for the selected action space, when the action changed the legal set.
    pub new_action_space: Option<ActionSpace>,
    /// The engine reported the action as a semantic no-op.
    pub action_had_no_effect: bool,
}

/// One compilation session.
///
/// Every operation validates its input before touching the engine, so a rejected call
/// leaves the program and the state exactly as they were.
pub struct Session {
    id: SessionId,
    backend: Arc<dyn SessionBackend>,
    engine: Arc<dyn CompilerEngine>,
    state: SessionState,
    program: Option<ProgramHandle>,
    action_spaces: Arc<[ActionSpace]>,
    selected_action_space: usize,
    observation_spaces: Arc<[ObservationSpace]>,
    benchmark_uri: Option<String>,
    actions_applied: u64,
}

impl Session {
    #[must_use]
    pub fn new(
        id: SessionId,
        backend: Arc<dyn SessionBackend>,
        engine: Arc<dyn CompilerEngine>,
    ) -> Self {
        let action_spaces = backend.action_spaces();
        let observation_spaces = backend.observation_spaces();
        Self {
            id,
            backend,
            engine,
            state: SessionState::Uninitialized,
            program: None,
            action_spaces,
            selected_action_space: 0,
            observation_spaces,
            benchmark_uri: None,
            actions_applied: 0,
        }
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn backend(&self) -> Arc<dyn SessionBackend> {
        Arc::clone(&self.backend)
    }

    #[must_use]
    pub fn benchmark_uri(&self) -> Option<&str> {
        self.benchmark_uri.as_deref()
    }

    #[must_use]
    pub fn actions_applied(&self) -> u64 {
        self.actions_applied
    }

    /// Currently published action spaces. Replaced, never mutated, when the backend
    /// reveals a new space.
    #[must_use]
    pub fn action_spaces(&self) -> Arc<[ActionSpace]> {
        Arc::clone(&self.action_spaces)
    }

    #[must_use]
    pub fn observation_spaces(&self) -> Arc<[ObservationSpace]> {
        Arc::clone(&self.observation_spaces)
    }

    pub fn selected_action_space(&self) -> Result<&ActionSpace, SessionError> {
        self.require_initialized()?;
        self.action_spaces
            .get(self.selected_action_space)
            .ok_or(SessionError::UnknownActionSpace {
                index: self.selected_action_space,
                available: self.action_spaces.len(),
            })
    }

    /// Starts the session on a freshly loaded program.
    pub fn init(
        &mut self,
        action_space_index: usize,
        artifact: &ProgramArtifact,
    ) -> Result<(), SessionError> {
        self.require_uninitialized()?;
        if action_space_index >= self.action_spaces.len() {
            return Err(SessionError::UnknownActionSpace {
                index: action_space_index,
                available: self.action_spaces.len(),
            });
        }

        let program = self
            .engine
            .load_program(artifact)
            .map_err(|source| SessionError::engine(format!("benchmark {}", artifact.uri), source))?;

        self.program = Some(program);
        self.selected_action_space = action_space_index;
        self.benchmark_uri = Some(artifact.uri.clone());
        self.state = SessionState::Active;
        tracing::info!(
            session_id = self.id,
            backend = self.backend.name(),
            benchmark = %artifact.uri,
            action_space = %self.action_spaces[action_space_index].name,
            "session started"
        );
        Ok(())
    }

    /// Starts the session as an independent copy of an active `parent`.
    pub fn init_from(&mut self, parent: &Session) -> Result<(), SessionError> {
        self.require_uninitialized()?;
        parent.require_active()?;
        let parent_program = parent.program()?;

        let program = self
            .engine
            .clone_program(parent_program)
            .map_err(|source| {
                SessionError::engine(format!("fork of session {}", parent.id), source)
            })?;

        self.program = Some(program);
        self.action_spaces = Arc::clone(&parent.action_spaces);
        self.selected_action_space = parent.selected_action_space;
        self.observation_spaces = Arc::clone(&parent.observation_spaces);
        self.benchmark_uri = parent.benchmark_uri.clone();
        self.actions_applied = parent.actions_applied;
        self.state = SessionState::Active;
        tracing::info!(
            session_id = self.id,
            parent_id = parent.id,
            "session forked"
        );
        Ok(())
    }

    /// Applies one action to the program. Ends the episode when the backend says so.
    pub fn apply_action(&mut self, action: &Event) -> Result<StepOutcome, SessionError> {
        self.require_active()?;
        let outcome = self.apply_validated(action)?;
        self.finish_step(&outcome);
        Ok(outcome)
    }

    /// Applies one action and then computes the requested observations.
    ///
    /// Observation names are checked before the action runs, and the observations are
    /// taken before the episode is ended. An observation that fails after the action
    /// committed leaves the session `Unusable`: the caller cannot see the new state.
    pub fn step(
        &mut self,
        action: &Event,
        observation_spaces: &[String],
    ) -> Result<(StepOutcome, Vec<Event>), SessionError> {
        self.require_active()?;
        for name in observation_spaces {
            self.observation_space(name)?;
        }

        let outcome = self.apply_validated(action)?;
        let observations = match observation_spaces
            .iter()
            .map(|name| self.observe(name))
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(observations) => observations,
            Err(error) => {
                self.state = SessionState::Unusable;
                tracing::warn!(
                    session_id = self.id,
                    actions = self.actions_applied,
                    error = %error,
                    "observation failed after the action applied; session is unusable"
                );
                return Err(error);
            }
        };
        self.finish_step(&outcome);

        Ok((outcome, observations))
    }

    /// Measures the program in the named observation space. Never mutates the program.
    pub fn compute_observation(&self, name: &str) -> Result<Event, SessionError> {
        self.require_active()?;
        self.observe(name)
    }

    /// Releases the program and closes the session. Closing twice is a no-op.
    pub fn close(&mut self) {
        if let Some(program) = self.program.take() {
            self.engine.release_program(program);
        }
        if self.state != SessionState::Closed {
            tracing::info!(
                session_id = self.id,
                state = %self.state,
                actions = self.actions_applied,
                "session closed"
            );
        }
        self.state = SessionState::Closed;
    }

    fn apply_validated(&mut self, action: &Event) -> Result<StepOutcome, SessionError> {
        let spaces = Arc::clone(&self.action_spaces);
        let space = spaces
            .get(self.selected_action_space)
            .ok_or(SessionError::UnknownActionSpace {
                index: self.selected_action_space,
                available: spaces.len(),
            })?;

        space
            .descriptor
            .check(action)
            .map_err(|violation| SessionError::InvalidAction {
                space: space.name.clone(),
                violation,
            })?;
        let validated = match space.descriptor.choice(action) {
            Some((index, name)) => ValidatedAction::Choice {
                index,
                name: name.to_string(),
            },
            None => ValidatedAction::Value(action.clone()),
        };
        let transform = self.backend.transform_for(space, &validated).ok_or_else(|| {
            SessionError::UnmappedAction {
                backend: self.backend.name().to_string(),
                space: space.name.clone(),
            }
        })?;

        let applied = self.engine.apply_transform(self.program()?, &transform);
        let transformed = match applied {
            Ok(transformed) => transformed,
            Err(source) => {
                if self.engine.atomic_transforms() {
                    tracing::warn!(
                        session_id = self.id,
                        transform = %transform,
                        error = %source,
                        "transform failed; program unchanged"
                    );
                } else {
                    self.state = SessionState::Unusable;
                    tracing::warn!(
                        session_id = self.id,
                        transform = %transform,
                        error = %source,
                        "transform failed on a non-atomic engine; session is unusable"
                    );
                }
                return Err(SessionError::engine(format!("action '{transform}'"), source));
            }
        };
        self.actions_applied += 1;

        let new_action_space = match self.backend.next_action_space(space, &validated) {
            Some(next) => {
                self.publish_action_space(space, next.clone())?;
                Some(next)
            }
            None => None,
        };

        tracing::debug!(
            session_id = self.id,
            transform = %transform,
            changed = transformed.changed,
            actions = self.actions_applied,
            "action applied"
        );

        Ok(StepOutcome {
            end_of_episode: self.backend.end_of_episode(self.actions_applied),
            new_action_space,
            action_had_no_effect: !transformed.changed,
        })
    }

    fn publish_action_space(
        &mut self,
        current: &ActionSpace,
        next: ActionSpace,
    ) -> Result<(), SessionError> {
        if let Err(reason) = self.check_index_policy(current, &next) {
            self.state = SessionState::Unusable;
            tracing::warn!(
                session_id = self.id,
                space = %next.name,
                reason = %reason,
                "backend published an action space that breaks its index policy"
            );
            return Err(SessionError::ActionSpacePolicy {
                space: next.name,
                reason,
            });
        }

        let mut spaces = self.action_spaces.to_vec();
        spaces[self.selected_action_space] = next;
        self.action_spaces = spaces.into();
        Ok(())
    }

    fn check_index_policy(&self, current: &ActionSpace, next: &ActionSpace) -> Result<(), String> {
        let (from, to) = (current.descriptor.kind(), next.descriptor.kind());
        if from != to {
            return Err(format!("descriptor kind changed from {from} to {to}"));
        }

        let others = self
            .action_spaces
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != self.selected_action_space)
            .map(|(_, space)| space.name.as_str());
        if let Some(name) = first_duplicate_name(others.chain(std::iter::once(next.name.as_str())))
        {
            return Err(format!("space name '{name}' is already published"));
        }

        if self.backend.index_policy() == IndexPolicy::Stable {
            if let (Some(old), Some(new)) = (current.descriptor.names(), next.descriptor.names()) {
                if !new.names().starts_with(old.names()) {
                    return Err("existing choices were renumbered or removed".to_string());
                }
            }
        }

        Ok(())
    }

    fn finish_step(&mut self, outcome: &StepOutcome) {
        if outcome.end_of_episode && self.state == SessionState::Active {
            self.state = SessionState::Ended;
            tracing::info!(
                session_id = self.id,
                actions = self.actions_applied,
                "episode ended"
            );
        }
    }

    fn observe(&self, name: &str) -> Result<Event, SessionError> {
        let space = self.observation_space(name)?;
        let value = self
            .backend
            .compute_observation(self.engine.as_ref(), self.program()?, space)
            .map_err(|source| SessionError::engine(format!("observation '{name}'"), source))?;

        if !space.descriptor.accepts_kind(&value) {
            return Err(SessionError::ObservationMismatch {
                space: space.name.clone(),
                expected: space.descriptor.kind().event_kind(),
                found: value.kind(),
            });
        }
        Ok(value)
    }

    fn observation_space(&self, name: &str) -> Result<&ObservationSpace, SessionError> {
        self.observation_spaces
            .iter()
            .find(|space| space.name == name)
            .ok_or_else(|| SessionError::UnknownObservationSpace {
                name: name.to_string(),
            })
    }

    fn program(&self) -> Result<&ProgramHandle, SessionError> {
        self.program.as_ref().ok_or(SessionError::NotInitialized {
            session_id: self.id,
        })
    }

    fn require_uninitialized(&self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Uninitialized => Ok(()),
            SessionState::Closed => Err(SessionError::Closed {
                session_id: self.id,
            }),
            _ => Err(SessionError::AlreadyInitialized {
                session_id: self.id,
            }),
        }
    }

    fn require_initialized(&self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Uninitialized => Err(SessionError::NotInitialized {
                session_id: self.id,
            }),
            SessionState::Closed => Err(SessionError::Closed {
                session_id: self.id,
            }),
            _ => Ok(()),
        }
    }

    fn require_active(&self) -> Result<(), SessionError> {
        let session_id = self.id;
        match self.state {
            SessionState::Active => Ok(()),
            SessionState::Uninitialized => Err(SessionError::NotInitialized { session_id }),
            SessionState::Ended => Err(SessionError::Ended { session_id }),
            SessionState::Unusable => Err(SessionError::Unusable { session_id }),
            SessionState::Closed => Err(SessionError::Closed { session_id }),
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("backend", &self.backend.name())
            .field("state", &self.state)
            .field("benchmark_uri", &self.benchmark_uri)
            .field("selected_action_space", &self.selected_action_space)
            .field("actions_applied", &self.actions_applied)
            .finish_non_exhaustive()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(program) = self.program.take() {
            self.engine.release_program(program);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use assert_matches::assert_matches;
    use compiler_engine_mock::MockEngine;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::spaces::{Int64Tensor, SpaceDescriptor};

    struct ToyBackend {
        action_spaces: Arc<[ActionSpace]>,
        observation_spaces: Arc<[ObservationSpace]>,
        episode_length: Option<u64>,
        policy: IndexPolicy,
        reveal: Mutex<Option<ActionSpace>>,
    }

    impl ToyBackend {
        fn new() -> Self {
            let action_spaces: Arc<[ActionSpace]> = vec![ActionSpace::new(
                "default",
                SpaceDescriptor::named_discrete(["-inline", "-loop-unroll", "-dce"])
                    .expect("valid"),
            )]
            .into();
            let observation_spaces: Arc<[ObservationSpace]> = vec![
                ObservationSpace::new("ir", SpaceDescriptor::string(0, None).expect("valid")),
                ObservationSpace::new(
                    "features",
                    SpaceDescriptor::int_box(vec![3], vec![0; 3], vec![100; 3]).expect("valid"),
                ),
                ObservationSpace::new(
                    "runtime",
                    SpaceDescriptor::int_scalar(None, None).expect("valid"),
                ),
            ]
            .into();
            Self {
                action_spaces,
                observation_spaces,
                episode_length: None,
                policy: IndexPolicy::Stable,
                reveal: Mutex::new(None),
            }
        }

        fn with_episode_length(mut self, length: u64) -> Self {
            self.episode_length = Some(length);
            self
        }

        fn revealing(self, next: ActionSpace, policy: IndexPolicy) -> Self {
            *self.reveal.lock().expect("reveal lock") = Some(next);
            Self { policy, ..self }
        }
    }

    impl SessionBackend for ToyBackend {
        fn name(&self) -> &str {
            "toy"
        }

        fn action_spaces(&self) -> Arc<[ActionSpace]> {
            Arc::clone(&self.action_spaces)
        }

        fn observation_spaces(&self) -> Arc<[ObservationSpace]> {
            Arc::clone(&self.observation_spaces)
        }

        fn end_of_episode(&self, actions_applied: u64) -> bool {
            self.episode_length
                .is_some_and(|length| actions_applied >= length)
        }

        fn next_action_space(
            &self,
            _current: &ActionSpace,
            _action: &ValidatedAction,
        ) -> Option<ActionSpace> {
            self.reveal.lock().expect("reveal lock").take()
        }

        fn index_policy(&self) -> IndexPolicy {
            self.policy
        }
    }

    fn artifact() -> ProgramArtifact {
        ProgramArtifact::new("benchmark://toy/a", "define i32 @main()")
    }

    fn started(backend: ToyBackend, engine: &Arc<MockEngine>) -> Session {
        let mut session = Session::new(
            1,
            Arc::new(backend),
            Arc::clone(engine) as Arc<dyn CompilerEngine>,
        );
        session.init(0, &artifact()).expect("init");
        session
    }

    fn features(session: &Session) -> Event {
        session.compute_observation("features").expect("features")
    }

    #[test]
    fn uninitialized_session_rejects_everything_but_init() {
        let engine = Arc::new(MockEngine::new());
        let mut session = Session::new(7, Arc::new(ToyBackend::new()), engine);

        assert_matches!(
            session.apply_action(&Event::Int64(0)),
            Err(SessionError::NotInitialized { session_id: 7 })
        );
        assert_matches!(
            session.compute_observation("ir"),
            Err(SessionError::NotInitialized { .. })
        );
        assert_matches!(
            session.selected_action_space(),
            Err(SessionError::NotInitialized { .. })
        );
        assert_eq!(session.state(), SessionState::Uninitialized);
    }

    #[test]
    fn init_rejects_unknown_index_and_double_init() {
        let engine = Arc::new(MockEngine::new());
        let mut session = Session::new(1, Arc::new(ToyBackend::new()), engine);

        assert_matches!(
            session.init(1, &artifact()),
            Err(SessionError::UnknownActionSpace {
                index: 1,
                available: 1
            })
        );
        assert_eq!(session.state(), SessionState::Uninitialized);

        session.init(0, &artifact()).expect("init");
        assert_matches!(
            session.init(0, &artifact()),
            Err(SessionError::AlreadyInitialized { .. })
        );
        assert_eq!(session.benchmark_uri(), Some("benchmark://toy/a"));
    }

    #[test]
    fn invalid_action_leaves_program_untouched() {
        let engine = Arc::new(MockEngine::new());
        let mut session = started(ToyBackend::new(), &engine);
        session.apply_action(&Event::Int64(1)).expect("valid action");
        let before = features(&session);

        assert_matches!(
            session.apply_action(&Event::Int64(5)),
            Err(SessionError::InvalidAction { ref space, .. }) if space == "default"
        );
        assert_matches!(
            session.apply_action(&Event::from("-inline")),
            Err(SessionError::InvalidAction { .. })
        );

        assert_eq!(features(&session), before);
        assert_eq!(session.actions_applied(), 1);
        assert_eq!(session.state(), SessionState::Active);
    }

    #[test]
    fn repeated_action_reports_no_effect() {
        let engine = Arc::new(MockEngine::new());
        let mut session = started(ToyBackend::new(), &engine);

        let first = session.apply_action(&Event::Int64(2)).expect("first");
        let second = session.apply_action(&Event::Int64(2)).expect("second");

        assert!(!first.action_had_no_effect);
        assert!(second.action_had_no_effect);
        assert_eq!(second.new_action_space, None);
    }

    #[test]
    fn end_of_episode_ends_the_session_after_returning() {
        let engine = Arc::new(MockEngine::new());
        let mut session = started(ToyBackend::new().with_episode_length(2), &engine);

        assert!(!session.apply_action(&Event::Int64(0)).expect("one").end_of_episode);
        let (outcome, observations) = session
            .step(&Event::Int64(1), &["features".to_string()])
            .expect("last step still observes");
        assert!(outcome.end_of_episode);
        assert_eq!(
            observations,
            vec![Event::Int64Tensor(Int64Tensor::new(vec![3], vec![1, 1, 0]))]
        );
        assert_eq!(session.state(), SessionState::Ended);

        assert_matches!(
            session.apply_action(&Event::Int64(0)),
            Err(SessionError::Ended { .. })
        );
        assert_matches!(
            session.compute_observation("ir"),
            Err(SessionError::Ended { .. })
        );
        let mut child = Session::new(2, session.backend(), engine);
        assert_matches!(child.init_from(&session), Err(SessionError::Ended { .. }));
    }

    #[test]
    fn failed_observation_after_a_committed_action_makes_session_unusable() {
        let engine = Arc::new(MockEngine::new());
        let mut session = started(ToyBackend::new().with_episode_length(1), &engine);

        // The mock reports runtime as a double; this backend declares an int space.
        assert_matches!(
            session.step(&Event::Int64(1), &["runtime".to_string()]),
            Err(SessionError::ObservationMismatch { ref space, .. }) if space == "runtime"
        );
        assert_eq!(session.state(), SessionState::Unusable);
        assert_eq!(session.actions_applied(), 1);

        assert_matches!(
            session.step(&Event::Int64(0), &[]),
            Err(SessionError::Unusable { .. })
        );
        assert_matches!(
            session.compute_observation("ir"),
            Err(SessionError::Unusable { .. })
        );

        session.close();
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(engine.live_programs(), 0);
    }

    #[test]
    fn step_checks_observation_names_before_acting() {
        let engine = Arc::new(MockEngine::new());
        let mut session = started(ToyBackend::new(), &engine);

        assert_matches!(
            session.step(&Event::Int64(0), &["ir".to_string(), "nope".to_string()]),
            Err(SessionError::UnknownObservationSpace { ref name }) if name == "nope"
        );
        assert_eq!(session.actions_applied(), 0);
    }

    #[test]
    fn observation_of_the_wrong_variant_is_a_backend_defect() {
        let engine = Arc::new(MockEngine::new());
        let session = started(ToyBackend::new(), &engine);

        assert_matches!(
            session.compute_observation("runtime"),
            Err(SessionError::ObservationMismatch { ref space, .. }) if space == "runtime"
        );
        assert_matches!(
            session.compute_observation("missing"),
            Err(SessionError::UnknownObservationSpace { .. })
        );
    }

    #[test]
    fn fork_copies_program_and_diverges_independently() {
        let engine = Arc::new(MockEngine::new());
        let mut parent = started(ToyBackend::new(), &engine);
        parent.apply_action(&Event::Int64(0)).expect("parent action");

        let mut child = Session::new(
            2,
            parent.backend(),
            Arc::clone(&engine) as Arc<dyn CompilerEngine>,
        );
        child.init_from(&parent).expect("fork");
        assert_eq!(features(&child), features(&parent));
        assert_eq!(child.actions_applied(), 1);

        child.apply_action(&Event::Int64(1)).expect("child action");
        assert_eq!(
            features(&parent),
            Event::Int64Tensor(Int64Tensor::new(vec![3], vec![0, 1, 0]))
        );
        assert_eq!(
            features(&child),
            Event::Int64Tensor(Int64Tensor::new(vec![3], vec![1, 1, 0]))
        );
    }

    #[test]
    fn atomic_engine_failure_keeps_session_active() {
        let engine = Arc::new(MockEngine::new().with_failing_transforms(["-dce"]));
        let mut session = started(ToyBackend::new(), &engine);
        let before = session.compute_observation("ir").expect("ir");

        assert_matches!(
            session.apply_action(&Event::Int64(2)),
            Err(SessionError::Engine { ref subject, .. }) if subject.contains("-dce")
        );
        assert_eq!(session.state(), SessionState::Active);
        assert_eq!(session.compute_observation("ir").expect("ir"), before);
        assert_eq!(session.actions_applied(), 0);
    }

    #[test]
    fn non_atomic_engine_failure_makes_session_unusable() {
        let engine = Arc::new(
            MockEngine::new()
                .with_failing_transforms(["-dce"])
                .non_atomic(),
        );
        let mut session = started(ToyBackend::new(), &engine);

        assert_matches!(
            session.apply_action(&Event::Int64(2)),
            Err(SessionError::Engine { .. })
        );
        assert_eq!(session.state(), SessionState::Unusable);
        assert_matches!(
            session.apply_action(&Event::Int64(0)),
            Err(SessionError::Unusable { .. })
        );
        assert_matches!(
            session.compute_observation("ir"),
            Err(SessionError::Unusable { .. })
        );

        session.close();
        assert_eq!(engine.live_programs(), 0);
    }

    #[test]
    fn stable_policy_accepts_appended_choices() {
        let next = ActionSpace::new(
            "default",
            SpaceDescriptor::named_discrete(["-inline", "-loop-unroll", "-dce", "-licm"])
                .expect("valid"),
        );
        let engine = Arc::new(MockEngine::new());
        let mut session = started(
            ToyBackend::new().revealing(next.clone(), IndexPolicy::Stable),
            &engine,
        );
        let original = session.action_spaces();

        let outcome = session.apply_action(&Event::Int64(0)).expect("reveal");

        assert_eq!(outcome.new_action_space, Some(next.clone()));
        assert_eq!(session.selected_action_space().expect("selected"), &next);
        assert_eq!(original[0].descriptor.names().map(|names| names.len()), Some(3));
        session.apply_action(&Event::Int64(3)).expect("new choice is legal");
    }

    #[test]
    fn stable_policy_rejects_renumbering() {
        let next = ActionSpace::new(
            "default",
            SpaceDescriptor::named_discrete(["-dce", "-inline"]).expect("valid"),
        );
        let engine = Arc::new(MockEngine::new());
        let mut session = started(ToyBackend::new().revealing(next, IndexPolicy::Stable), &engine);

        assert_matches!(
            session.apply_action(&Event::Int64(0)),
            Err(SessionError::ActionSpacePolicy { .. })
        );
        assert_eq!(session.state(), SessionState::Unusable);
    }

    #[test]
    fn renumber_policy_allows_reordering_but_not_kind_changes() {
        let reordered = ActionSpace::new(
            "default",
            SpaceDescriptor::named_discrete(["-dce", "-inline"]).expect("valid"),
        );
        let engine = Arc::new(MockEngine::new());
        let mut session = started(
            ToyBackend::new().revealing(reordered, IndexPolicy::Renumber),
            &engine,
        );
        session.apply_action(&Event::Int64(0)).expect("renumbering allowed");

        let retyped = ActionSpace::new(
            "default",
            SpaceDescriptor::int_scalar(Some(0), Some(3)).expect("valid"),
        );
        let mut session = started(
            ToyBackend::new().revealing(retyped, IndexPolicy::Renumber),
            &engine,
        );
        assert_matches!(
            session.apply_action(&Event::Int64(0)),
            Err(SessionError::ActionSpacePolicy { ref reason, .. }) if reason.contains("kind")
        );
    }

    #[test]
    fn close_releases_program_and_is_idempotent() {
        let engine = Arc::new(MockEngine::new());
        let mut session = started(ToyBackend::new(), &engine);
        assert_eq!(engine.live_programs(), 1);

        session.close();
        session.close();

        assert_eq!(engine.live_programs(), 0);
        assert_eq!(session.state(), SessionState::Closed);
        assert_matches!(
            session.apply_action(&Event::Int64(0)),
            Err(SessionError::Closed { .. })
        );
        assert_matches!(
            session.init(0, &artifact()),
            Err(SessionError::Closed { .. })
        );
    }

    #[test]
    fn dropping_a_session_releases_its_program() {
        let engine = Arc::new(MockEngine::new());
        {
            let _session = started(ToyBackend::new(), &engine);
            assert_eq!(engine.live_programs(), 1);
        }
        assert_eq!(engine.live_programs(), 0);
    }
}
