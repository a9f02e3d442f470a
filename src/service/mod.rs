//! Service Façade: the session table and the RPC surface clients talk to.
//!
//! Every call either returns its typed reply or a [`Status`]. Calls addressed to
//! different sessions run in parallel; calls addressed to one session are serialized by
//! that session's mutex.

mod messages;
mod spans;
mod status;
mod table;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use compiler_engine::{ArtifactStore, CompilerEngine, ProgramArtifact};

pub use messages::{
    BenchmarkRef, EndSessionReply, EndSessionRequest, ForkSessionReply, ForkSessionRequest,
    GetSpacesReply, GetSpacesRequest, GetVersionReply, ObserveReply, ObserveRequest, Reply,
    Request, Response, ResponseEnvelope, StartSessionReply, StartSessionRequest, StepReply,
    StepRequest,
};
pub use status::{Status, StatusCode};
pub use table::{SessionTable, SharedSession};

use crate::config::ServiceOptions;
use crate::error::{ConfigurationError, SessionError};
use crate::registry::{BackendKind, RegistryOptions, SpaceRegistry};
use crate::session::{Session, SessionId};
use table::lock_unpoisoned;

/// Compilation-session service.
pub struct CompilerService {
    options: ServiceOptions,
    registry: SpaceRegistry,
    engine: Arc<dyn CompilerEngine>,
    artifacts: Arc<dyn ArtifactStore>,
    sessions: SessionTable,
    next_session_id: AtomicU64,
    shutting_down: AtomicBool,
}

impl CompilerService {
    /// Builds the space registry and an empty session table.
    ///
    /// Fails when the registry holds a configuration defect; the service must not start.
    pub fn new(
        options: ServiceOptions,
        engine: Arc<dyn CompilerEngine>,
        artifacts: Arc<dyn ArtifactStore>,
    ) -> Result<Self, ConfigurationError> {
        let registry = SpaceRegistry::build(&RegistryOptions {
            episode_length: options.episode_length,
        })?;
        tracing::info!(
            backend = options.backend.as_str(),
            engine = %engine.profile().engine_id,
            max_sessions = ?options.max_sessions,
            "compiler service ready"
        );

        Ok(Self {
            options,
            registry,
            engine,
            artifacts,
            sessions: SessionTable::new(),
            next_session_id: AtomicU64::new(1),
            shutting_down: AtomicBool::new(false),
        })
    }

    #[must_use]
    pub fn options(&self) -> &ServiceOptions {
        &self.options
    }

    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn get_version(&self) -> Result<GetVersionReply, Status> {
        self.call("get_version", None, || {
            Ok(GetVersionReply {
                service_version: env!("CARGO_PKG_VERSION").to_string(),
                compiler_version: self.engine.profile().compiler_version,
            })
        })
    }

    /// Lists the action and observation spaces of a backend, in registry order.
    pub fn get_spaces(&self, request: &GetSpacesRequest) -> Result<GetSpacesReply, Status> {
        self.call("get_spaces", None, || {
            let backend: BackendKind = request.backend.parse()?;
            Ok(GetSpacesReply {
                action_spaces: self.registry.action_spaces(backend).to_vec(),
                observation_spaces: self.registry.observation_spaces(backend).to_vec(),
            })
        })
    }

    /// Loads a benchmark into a new session of the configured backend.
    pub fn start_session(
        &self,
        request: &StartSessionRequest,
    ) -> Result<StartSessionReply, Status> {
        let session_id = self.next_session_id.fetch_add(1, Ordering::SeqCst);
        self.call("start_session", Some(session_id), || {
            self.ensure_running()?;
            self.ensure_capacity()?;

            let benchmark = &request.benchmark;
            let contents = match &benchmark.program {
                Some(program) => program.clone(),
                None => self
                    .artifacts
                    .fetch(&benchmark.uri)
                    .map_err(SessionError::Artifact)?,
            };
            let artifact = ProgramArtifact::new(benchmark.uri.clone(), contents);

            let mut session = Session::new(
                session_id,
                self.registry.backend(self.options.backend),
                Arc::clone(&self.engine),
            );
            session.init(request.action_space, &artifact)?;
            let observations = request
                .observation_spaces
                .iter()
                .map(|name| session.compute_observation(name))
                .collect::<Result<Vec<_>, _>>()?;

            self.sessions
                .insert_within_limit(session, self.options.max_sessions)?;
            Ok(StartSessionReply {
                session_id,
                observations,
            })
        })
    }

    /// Creates an independent copy of an active session.
    pub fn fork_session(&self, request: &ForkSessionRequest) -> Result<ForkSessionReply, Status> {
        self.call("fork_session", Some(request.session_id), || {
            self.ensure_running()?;
            self.ensure_capacity()?;
            let parent = self.sessions.get(request.session_id)?;

            let session_id = self.next_session_id.fetch_add(1, Ordering::SeqCst);
            let child = {
                let parent = lock_unpoisoned(&parent);
                let mut child = Session::new(session_id, parent.backend(), Arc::clone(&self.engine));
                child.init_from(&parent)?;
                child
            };

            self.sessions
                .insert_within_limit(child, self.options.max_sessions)?;
            Ok(ForkSessionReply { session_id })
        })
    }

    pub fn step(&self, request: &StepRequest) -> Result<StepReply, Status> {
        self.call("step", Some(request.session_id), || {
            self.ensure_running()?;
            let session = self.sessions.get(request.session_id)?;
            let mut session = lock_unpoisoned(&session);
            let (outcome, observations) =
                session.step(&request.action, &request.observation_spaces)?;

            Ok(StepReply {
                end_of_episode: outcome.end_of_episode,
                new_action_space: outcome.new_action_space,
                action_had_no_effect: outcome.action_had_no_effect,
                observations,
            })
        })
    }

    pub fn observe(&self, request: &ObserveRequest) -> Result<ObserveReply, Status> {
        self.call("observe", Some(request.session_id), || {
            self.ensure_running()?;
            let session = self.sessions.get(request.session_id)?;
            let observation =
                lock_unpoisoned(&session).compute_observation(&request.observation_space)?;
            Ok(ObserveReply { observation })
        })
    }

    /// Closes a session after any in-flight call on it finishes.
    ///
    /// Ending an unknown or already ended session succeeds.
    pub fn end_session(&self, request: &EndSessionRequest) -> Result<EndSessionReply, Status> {
        self.call("end_session", Some(request.session_id), || {
            match self.sessions.remove(request.session_id) {
                Some(session) => lock_unpoisoned(&session).close(),
                None => tracing::debug!(
                    session_id = request.session_id,
                    "end of unknown session ignored"
                ),
            }
            Ok(EndSessionReply {
                remaining_sessions: self.sessions.len(),
            })
        })
    }

    /// Routes a decoded request to its handler.
    pub fn handle(&self, request: Request) -> Response {
        match request {
            Request::GetVersion => self.get_version().map(Reply::GetVersion),
            Request::GetSpaces(request) => self.get_spaces(&request).map(Reply::GetSpaces),
            Request::StartSession(request) => {
                self.start_session(&request).map(Reply::StartSession)
            }
            Request::ForkSession(request) => self.fork_session(&request).map(Reply::ForkSession),
            Request::Step(request) => self.step(&request).map(Reply::Step),
            Request::Observe(request) => self.observe(&request).map(Reply::Observe),
            Request::EndSession(request) => self.end_session(&request).map(Reply::EndSession),
        }
    }

    /// Decodes and handles one JSON request, encoding the response as JSON.
    pub fn handle_json(&self, input: &str) -> String {
        let response = Request::from_json(input).and_then(|request| self.handle(request));
        serde_json::to_string(&ResponseEnvelope::from(&response)).unwrap_or_else(|error| {
            format!(
                r#"{{"error":{{"code":"internal","message":"failed to encode response: {error}"}}}}"#
            )
        })
    }

    /// Rejects new calls and closes every session. Returns how many were closed.
    pub fn shutdown(&self) -> usize {
        if self.shutting_down.swap(true, Ordering::SeqCst) {
            return 0;
        }

        let sessions = self.sessions.close();
        let closed = sessions.len();
        for session in sessions {
            lock_unpoisoned(&session).close();
        }
        tracing::info!(closed, "compiler service shut down");
        closed
    }

    fn call<T>(
        &self,
        method: &'static str,
        session_id: Option<SessionId>,
        body: impl FnOnce() -> Result<T, Status>,
    ) -> Result<T, Status> {
        let span = spans::request_span(method, session_id);
        let _entered = span.enter();
        let started_at = Instant::now();
        let result = body();
        spans::record_outcome(method, started_at, &result);
        result
    }

    fn ensure_running(&self) -> Result<(), SessionError> {
        if self.shutting_down.load(Ordering::SeqCst) {
            return Err(SessionError::ShuttingDown);
        }
        Ok(())
    }

    fn ensure_capacity(&self) -> Result<(), SessionError> {
        match self.options.max_sessions {
            Some(limit) if self.sessions.len() >= limit => Err(SessionError::SessionLimit { limit }),
            _ => Ok(()),
        }
    }
}

impl Drop for CompilerService {
    fn drop(&mut self) {
        self.shutdown();
    }
}
