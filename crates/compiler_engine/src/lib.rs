//! Minimal backend-agnostic contract for the compiler engine behind a compilation session.
//!
//! This crate intentionally defines only program ownership, transform and measurement
//! results, and the artifact lookup seam. It excludes action/observation space schemas,
//! session lifecycle, and any RPC surface.

use std::fmt;

use serde_json::Value;

/// Identifier for one program representation owned by an engine.
pub type ProgramId = u64;

/// Opaque handle to an engine-owned program representation.
///
/// Handles are deliberately not `Clone`: the only way to obtain an independent copy of a
/// program is [`CompilerEngine::clone_program`].
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct ProgramHandle {
    id: ProgramId,
}

impl ProgramHandle {
    /// Wraps an engine-assigned program identifier.
    #[must_use]
    pub fn new(id: ProgramId) -> Self {
        Self { id }
    }

    /// Returns the engine-assigned identifier.
    #[must_use]
    pub fn id(&self) -> ProgramId {
        self.id
    }
}

/// Which engine operation produced an [`EngineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorKind {
    Load,
    Transform,
    Measure,
    Clone,
    UnknownProgram,
    UnknownMetric,
}

impl EngineErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Transform => "transform",
            Self::Measure => "measure",
            Self::Clone => "clone",
            Self::UnknownProgram => "unknown program",
            Self::UnknownMetric => "unknown metric",
        }
    }
}

/// Error returned by a compiler engine operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineError {
    kind: EngineErrorKind,
    message: String,
}

impl EngineError {
    /// Creates a new engine error.
    #[must_use]
    pub fn new(kind: EngineErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Returns the failing operation kind.
    #[must_use]
    pub fn kind(&self) -> EngineErrorKind {
        self.kind
    }

    /// Returns the underlying error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.kind.as_str(), self.message)
    }
}

impl std::error::Error for EngineError {}

/// Error returned while resolving a benchmark reference into program bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactError {
    uri: String,
    message: String,
}

impl ArtifactError {
    #[must_use]
    pub fn new(uri: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ArtifactError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.uri, self.message)
    }
}

impl std::error::Error for ArtifactError {}

/// Input program resolved from a benchmark reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramArtifact {
    pub uri: String,
    pub contents: Vec<u8>,
}

impl ProgramArtifact {
    #[must_use]
    pub fn new(uri: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            uri: uri.into(),
            contents: contents.into(),
        }
    }
}

/// Result of one successful transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformOutcome {
    /// False when the transform left the program semantically unchanged.
    pub changed: bool,
}

impl TransformOutcome {
    #[must_use]
    pub fn changed() -> Self {
        Self { changed: true }
    }

    #[must_use]
    pub fn unchanged() -> Self {
        Self { changed: false }
    }
}

/// Value produced by [`CompilerEngine::measure`].
#[derive(Debug, Clone, PartialEq)]
pub enum Measurement {
    Int64(i64),
    Double(f64),
    Text(String),
    Int64Tensor { shape: Vec<usize>, values: Vec<i64> },
    DoubleTensor { shape: Vec<usize>, values: Vec<f64> },
    Bytes(Vec<u8>),
    Opaque(Value),
}

/// Immutable metadata describing an engine build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineProfile {
    pub engine_id: String,
    pub compiler_version: String,
}

/// Compiler engine interface consumed by compilation sessions.
///
/// The engine owns every program representation; callers only ever hold
/// [`ProgramHandle`]s. Implementations must tolerate concurrent calls addressed to
/// different handles.
pub trait CompilerEngine: Send + Sync + 'static {
    /// Returns engine identity metadata.
    fn profile(&self) -> EngineProfile;

    /// Whether a failed [`CompilerEngine::apply_transform`] leaves the program untouched.
    ///
    /// Engines returning false may leave a program partially transformed on failure.
    fn atomic_transforms(&self) -> bool {
        true
    }

    /// Parses an input program into a new engine-owned representation.
    fn load_program(&self, artifact: &ProgramArtifact) -> Result<ProgramHandle, EngineError>;

    /// Applies one named transform to a program in place.
    fn apply_transform(
        &self,
        program: &ProgramHandle,
        action_id: &str,
    ) -> Result<TransformOutcome, EngineError>;

    /// Computes a named metric of a program without mutating it.
    fn measure(&self, program: &ProgramHandle, metric: &str) -> Result<Measurement, EngineError>;

    /// Deep-copies a program into a new, independent representation.
    fn clone_program(&self, program: &ProgramHandle) -> Result<ProgramHandle, EngineError>;

    /// Releases a program representation. Engines without explicit cleanup can ignore it.
    fn release_program(&self, program: ProgramHandle) {
        let _ = program;
    }
}

/// Artifact store interface resolving benchmark references into program bytes.
pub trait ArtifactStore: Send + Sync + 'static {
    fn fetch(&self, uri: &str) -> Result<Vec<u8>, ArtifactError>;
}

#[cfg(test)]
mod tests {
    use super::{
        ArtifactError, CompilerEngine, EngineError, EngineErrorKind, EngineProfile, Measurement,
        ProgramArtifact, ProgramHandle, TransformOutcome,
    };

    struct MinimalEngine;

    impl CompilerEngine for MinimalEngine {
        fn profile(&self) -> EngineProfile {
            EngineProfile {
                engine_id: "minimal".to_string(),
                compiler_version: "0.0.1".to_string(),
            }
        }

        fn load_program(&self, _artifact: &ProgramArtifact) -> Result<ProgramHandle, EngineError> {
            Ok(ProgramHandle::new(1))
        }

        fn apply_transform(
            &self,
            _program: &ProgramHandle,
            _action_id: &str,
        ) -> Result<TransformOutcome, EngineError> {
            Ok(TransformOutcome::unchanged())
        }

        fn measure(
            &self,
            _program: &ProgramHandle,
            metric: &str,
        ) -> Result<Measurement, EngineError> {
            Err(EngineError::new(EngineErrorKind::UnknownMetric, metric))
        }

        fn clone_program(&self, program: &ProgramHandle) -> Result<ProgramHandle, EngineError> {
            Ok(ProgramHandle::new(program.id() + 1))
        }
    }

    #[test]
    fn engines_are_atomic_unless_they_say_otherwise() {
        assert!(MinimalEngine.atomic_transforms());
    }

    #[test]
    fn default_release_accepts_any_handle() {
        let engine = MinimalEngine;
        let program = engine
            .load_program(&ProgramArtifact::new("benchmark://minimal/a", "int main() {}"))
            .expect("minimal engine loads anything");
        engine.release_program(program);
    }

    #[test]
    fn engine_error_display_names_the_failing_operation() {
        let error = EngineError::new(EngineErrorKind::Transform, "pass crashed");
        assert_eq!(error.kind(), EngineErrorKind::Transform);
        assert_eq!(error.message(), "pass crashed");
        assert_eq!(error.to_string(), "transform failed: pass crashed");
    }

    #[test]
    fn artifact_error_display_includes_uri() {
        let error = ArtifactError::new("file:///missing.c", "no such file");
        assert_eq!(error.uri(), "file:///missing.c");
        assert_eq!(error.to_string(), "file:///missing.c: no such file");
    }

    #[test]
    fn clone_produces_a_distinct_handle() {
        let engine = MinimalEngine;
        let original = ProgramHandle::new(4);
        let copy = engine
            .clone_program(&original)
            .expect("minimal engine clones");
        assert_ne!(original, copy);
    }

    #[test]
    fn transform_outcome_constructors_set_changed_flag() {
        assert!(TransformOutcome::changed().changed);
        assert!(!TransformOutcome::unchanged().changed);
    }
}
