//! LLVM-style backend: per-pass flags, optimization levels and IR-derived observations.

use std::sync::Arc;

use compiler_engine::{CompilerEngine, EngineError, ProgramHandle};

use crate::session::SessionBackend;
use crate::spaces::{ActionSpace, Event, ObservationSpace, SpaceDescriptor, SpaceError};

/// Published observation name and the engine metric behind it.
const OBSERVATIONS: [(&str, &str); 5] = [
    ("Ir", "ir"),
    ("IrInstructionCount", "instcount"),
    ("Features", "features"),
    ("ObjectTextSizeBytes", "size"),
    ("Runtime", "runtime"),
];

const FEATURE_COUNT: usize = 3;
const FEATURE_MAX: i64 = 100_000;

pub struct LlvmBackend {
    action_spaces: Arc<[ActionSpace]>,
    observation_spaces: Arc<[ObservationSpace]>,
    episode_length: Option<u64>,
}

impl LlvmBackend {
    pub fn new(
        action_spaces: Arc<[ActionSpace]>,
        episode_length: Option<u64>,
    ) -> Result<Self, SpaceError> {
        let observation_spaces = vec![
            ObservationSpace::new("Ir", SpaceDescriptor::string(0, None)?)
                .with_default_observation(""),
            ObservationSpace::new("IrInstructionCount", SpaceDescriptor::int_scalar(Some(0), None)?)
                .with_default_observation(0_i64),
            ObservationSpace::new(
                "Features",
                SpaceDescriptor::int_box(
                    vec![FEATURE_COUNT],
                    vec![0; FEATURE_COUNT],
                    vec![FEATURE_MAX; FEATURE_COUNT],
                )?,
            ),
            ObservationSpace::new(
                "ObjectTextSizeBytes",
                SpaceDescriptor::double_scalar(Some(0.0), None)?,
            )
            .with_platform_dependent(true),
            ObservationSpace::new("Runtime", SpaceDescriptor::double_scalar(Some(0.0), None)?)
                .with_deterministic(false)
                .with_platform_dependent(true),
        ];

        Ok(Self {
            action_spaces,
            observation_spaces: observation_spaces.into(),
            episode_length,
        })
    }

    fn metric_for(name: &str) -> Option<&'static str> {
        OBSERVATIONS
            .iter()
            .find(|(observation, _)| *observation == name)
            .map(|(_, metric)| *metric)
    }
}

impl SessionBackend for LlvmBackend {
    fn name(&self) -> &str {
        "llvm"
    }

    fn action_spaces(&self) -> Arc<[ActionSpace]> {
        Arc::clone(&self.action_spaces)
    }

    fn observation_spaces(&self) -> Arc<[ObservationSpace]> {
        Arc::clone(&self.observation_spaces)
    }

    fn compute_observation(
        &self,
        engine: &dyn CompilerEngine,
        program: &ProgramHandle,
        space: &ObservationSpace,
    ) -> Result<Event, EngineError> {
        let metric = Self::metric_for(&space.name).unwrap_or(space.name.as_str());
        engine.measure(program, metric).map(Event::from)
    }

    fn end_of_episode(&self, actions_applied: u64) -> bool {
        super::budget_exhausted(self.episode_length, actions_applied)
    }
}
