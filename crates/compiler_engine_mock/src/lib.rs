//! Deterministic mock implementation of the shared `compiler_engine` contract.
//!
//! Programs are kept as source text plus the ordered list of transforms applied to
//! them. This crate contains no real compiler and is intended for local development and
//! contract-level integration testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use compiler_engine::{
    ArtifactError, ArtifactStore, CompilerEngine, EngineError, EngineErrorKind, EngineProfile,
    Measurement, ProgramArtifact, ProgramHandle, ProgramId, TransformOutcome,
};
use serde_json::json;

/// Stable engine identifier reported by [`MockEngine::profile`].
pub const MOCK_ENGINE_ID: &str = "mock";

/// Compiler version reported by default.
pub const MOCK_COMPILER_VERSION: &str = "1.0.0";

/// Transforms counted, in order, by the `features` metric.
pub const FEATURE_TRANSFORMS: [&str; 3] = ["-loop-unroll", "-inline", "-simplifycfg"];

/// Metrics understood by [`MockEngine::measure`].
pub const MOCK_METRICS: [&str; 7] = [
    "ir",
    "features",
    "runtime",
    "size",
    "instcount",
    "bitcode",
    "summary",
];

#[derive(Debug, Clone, PartialEq, Eq)]
struct MockProgram {
    uri: String,
    source: String,
    applied: Vec<String>,
}

impl MockProgram {
    fn render_ir(&self) -> String {
        let mut ir = format!("; ModuleID = '{}'\n{}", self.uri, self.source);
        for transform in &self.applied {
            ir.push_str("\n; pass ");
            ir.push_str(transform);
        }
        ir
    }

    fn feature_counts(&self) -> Vec<i64> {
        FEATURE_TRANSFORMS
            .iter()
            .map(|feature| {
                self.applied
                    .iter()
                    .filter(|transform| transform.as_str() == *feature)
                    .count() as i64
            })
            .collect()
    }

    fn instruction_count(&self) -> i64 {
        let source_lines = self
            .source
            .lines()
            .filter(|line| !line.trim().is_empty())
            .count();
        (source_lines + self.applied.len()) as i64
    }
}

#[derive(Debug, Default)]
struct EngineState {
    next_id: ProgramId,
    programs: HashMap<ProgramId, MockProgram>,
}

/// Deterministic mock engine used by `compiler_session` tests and local runs.
///
/// Applying the same transform twice in a row is reported as a no-op. Transforms
/// registered through [`MockEngine::with_failing_transforms`] always fail; a non-atomic
/// engine records a partial transform before failing.
#[derive(Debug)]
pub struct MockEngine {
    compiler_version: String,
    failing_transforms: Vec<String>,
    atomic: bool,
    state: Mutex<EngineState>,
    runtime_samples: AtomicU64,
}

impl MockEngine {
    /// Creates an atomic mock engine that accepts every transform.
    #[must_use]
    pub fn new() -> Self {
        Self {
            compiler_version: MOCK_COMPILER_VERSION.to_string(),
            failing_transforms: Vec::new(),
            atomic: true,
            state: Mutex::new(EngineState::default()),
            runtime_samples: AtomicU64::new(0),
        }
    }

    /// Makes the listed transforms fail on every application.
    #[must_use]
    pub fn with_failing_transforms(
        mut self,
        transforms: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.failing_transforms = transforms.into_iter().map(Into::into).collect();
        self
    }

    /// Makes failed transforms leave the program partially mutated.
    #[must_use]
    pub fn non_atomic(mut self) -> Self {
        self.atomic = false;
        self
    }

    #[must_use]
    pub fn with_compiler_version(mut self, version: impl Into<String>) -> Self {
        self.compiler_version = version.into();
        self
    }

    /// Number of programs currently held by the engine.
    #[must_use]
    pub fn live_programs(&self) -> usize {
        lock_unpoisoned(&self.state).programs.len()
    }

    /// Transforms recorded against a program, or `None` for unknown handles.
    #[must_use]
    pub fn applied_transforms(&self, program: &ProgramHandle) -> Option<Vec<String>> {
        lock_unpoisoned(&self.state)
            .programs
            .get(&program.id())
            .map(|program| program.applied.clone())
    }

    fn next_runtime_jitter(&self) -> f64 {
        let sample = self.runtime_samples.fetch_add(1, Ordering::SeqCst);
        (sample % 7) as f64 * 0.001
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CompilerEngine for MockEngine {
    fn profile(&self) -> EngineProfile {
        EngineProfile {
            engine_id: MOCK_ENGINE_ID.to_string(),
            compiler_version: self.compiler_version.clone(),
        }
    }

    fn atomic_transforms(&self) -> bool {
        self.atomic
    }

    fn load_program(&self, artifact: &ProgramArtifact) -> Result<ProgramHandle, EngineError> {
        let source = String::from_utf8(artifact.contents.clone()).map_err(|error| {
            EngineError::new(
                EngineErrorKind::Load,
                format!("{} is not UTF-8 source: {error}", artifact.uri),
            )
        })?;

        let mut state = lock_unpoisoned(&self.state);
        let id = state.next_id;
        state.next_id += 1;
        state.programs.insert(
            id,
            MockProgram {
                uri: artifact.uri.clone(),
                source,
                applied: Vec::new(),
            },
        );

        Ok(ProgramHandle::new(id))
    }

    fn apply_transform(
        &self,
        program: &ProgramHandle,
        action_id: &str,
    ) -> Result<TransformOutcome, EngineError> {
        let mut state = lock_unpoisoned(&self.state);
        let entry = state
            .programs
            .get_mut(&program.id())
            .ok_or_else(|| unknown_program(program))?;

        if action_id.trim().is_empty() {
            return Err(EngineError::new(
                EngineErrorKind::Transform,
                "transform name is empty",
            ));
        }

        if self
            .failing_transforms
            .iter()
            .any(|failing| failing == action_id)
        {
            if !self.atomic {
                entry.applied.push(format!("{action_id} (partial)"));
            }
            return Err(EngineError::new(
                EngineErrorKind::Transform,
                format!("transform {action_id} crashed"),
            ));
        }

        if entry.applied.last().map(String::as_str) == Some(action_id) {
            return Ok(TransformOutcome::unchanged());
        }

        entry.applied.push(action_id.to_string());
        Ok(TransformOutcome::changed())
    }

    fn measure(&self, program: &ProgramHandle, metric: &str) -> Result<Measurement, EngineError> {
        let snapshot = {
            let state = lock_unpoisoned(&self.state);
            state
                .programs
                .get(&program.id())
                .cloned()
                .ok_or_else(|| unknown_program(program))?
        };

        let measurement = match metric {
            "ir" => Measurement::Text(snapshot.render_ir()),
            "features" => Measurement::Int64Tensor {
                shape: vec![FEATURE_TRANSFORMS.len()],
                values: snapshot.feature_counts(),
            },
            "runtime" => Measurement::Double(
                1.0 + snapshot.applied.len() as f64 * 0.1 + self.next_runtime_jitter(),
            ),
            "size" => Measurement::Double((snapshot.source.len() + 16 * snapshot.applied.len()) as f64),
            "instcount" => Measurement::Int64(snapshot.instruction_count()),
            "bitcode" => Measurement::Bytes(snapshot.render_ir().into_bytes()),
            "summary" => Measurement::Opaque(json!({
                "uri": snapshot.uri,
                "passes": snapshot.applied.len(),
            })),
            unknown => {
                return Err(EngineError::new(
                    EngineErrorKind::UnknownMetric,
                    format!("unsupported metric '{unknown}'"),
                ))
            }
        };

        Ok(measurement)
    }

    fn clone_program(&self, program: &ProgramHandle) -> Result<ProgramHandle, EngineError> {
        let mut state = lock_unpoisoned(&self.state);
        let copy = state
            .programs
            .get(&program.id())
            .cloned()
            .ok_or_else(|| unknown_program(program))?;

        let id = state.next_id;
        state.next_id += 1;
        state.programs.insert(id, copy);

        Ok(ProgramHandle::new(id))
    }

    fn release_program(&self, program: ProgramHandle) {
        lock_unpoisoned(&self.state).programs.remove(&program.id());
    }
}

/// In-memory artifact store keyed by benchmark URI.
#[derive(Debug, Default)]
pub struct InMemoryArtifactStore {
    artifacts: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryArtifactStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_artifact(self, uri: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        self.insert(uri, contents);
        self
    }

    pub fn insert(&self, uri: impl Into<String>, contents: impl Into<Vec<u8>>) {
        lock_unpoisoned(&self.artifacts).insert(uri.into(), contents.into());
    }
}

impl ArtifactStore for InMemoryArtifactStore {
    fn fetch(&self, uri: &str) -> Result<Vec<u8>, ArtifactError> {
        lock_unpoisoned(&self.artifacts)
            .get(uri)
            .cloned()
            .ok_or_else(|| ArtifactError::new(uri, "artifact not found"))
    }
}

fn unknown_program(program: &ProgramHandle) -> EngineError {
    EngineError::new(
        EngineErrorKind::UnknownProgram,
        format!("no program with id {}", program.id()),
    )
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
