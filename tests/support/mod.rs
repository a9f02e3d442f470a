#![allow(dead_code)]

use std::sync::Arc;

use compiler_engine::CompilerEngine;
use compiler_engine_mock::{InMemoryArtifactStore, MockEngine};
use compiler_session::service::{
    BenchmarkRef, EndSessionRequest, ObserveRequest, StartSessionRequest, StepReply, StepRequest,
};
use compiler_session::{CompilerService, Event, ServiceOptions, SessionId, Status};

pub const BENCHMARK_URI: &str = "benchmark://example/hello";
pub const BENCHMARK_SOURCE: &str = "int main() {\n  return 0;\n}\n";

pub fn service() -> (CompilerService, Arc<MockEngine>) {
    service_with(ServiceOptions::default(), MockEngine::new())
}

pub fn service_with(
    options: ServiceOptions,
    engine: MockEngine,
) -> (CompilerService, Arc<MockEngine>) {
    let engine = Arc::new(engine);
    let store = InMemoryArtifactStore::new().with_artifact(BENCHMARK_URI, BENCHMARK_SOURCE);
    let service = CompilerService::new(
        options,
        Arc::clone(&engine) as Arc<dyn CompilerEngine>,
        Arc::new(store),
    )
    .expect("built-in registry is valid");
    (service, engine)
}

pub fn start(service: &CompilerService, action_space: usize) -> SessionId {
    service
        .start_session(&StartSessionRequest {
            action_space,
            benchmark: BenchmarkRef::uri(BENCHMARK_URI),
            observation_spaces: Vec::new(),
        })
        .expect("start session")
        .session_id
}

pub fn step(
    service: &CompilerService,
    session_id: SessionId,
    index: i64,
) -> Result<StepReply, Status> {
    service.step(&StepRequest {
        session_id,
        action: Event::Int64(index),
        observation_spaces: Vec::new(),
    })
}

pub fn observe(
    service: &CompilerService,
    session_id: SessionId,
    observation_space: &str,
) -> Result<Event, Status> {
    service
        .observe(&ObserveRequest {
            session_id,
            observation_space: observation_space.to_string(),
        })
        .map(|reply| reply.observation)
}

pub fn end(service: &CompilerService, session_id: SessionId) -> usize {
    service
        .end_session(&EndSessionRequest { session_id })
        .expect("end session is infallible")
        .remaining_sessions
}
