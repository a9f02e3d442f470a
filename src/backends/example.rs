//! Minimal backend with three opaque actions and three observations.

use std::sync::Arc;

use crate::session::SessionBackend;
use crate::spaces::{ActionSpace, ObservationSpace, SpaceDescriptor, SpaceError};

pub const IR: &str = "ir";
pub const FEATURES: &str = "features";
pub const RUNTIME: &str = "runtime";

/// Length of the `features` vector.
pub const FEATURE_COUNT: usize = 3;

pub struct ExampleBackend {
    action_spaces: Arc<[ActionSpace]>,
    observation_spaces: Arc<[ObservationSpace]>,
    episode_length: Option<u64>,
}

impl ExampleBackend {
    pub fn new(
        action_spaces: Arc<[ActionSpace]>,
        episode_length: Option<u64>,
    ) -> Result<Self, SpaceError> {
        let observation_spaces = vec![
            ObservationSpace::new(IR, SpaceDescriptor::string(0, None)?)
                .with_default_observation(""),
            ObservationSpace::new(
                FEATURES,
                SpaceDescriptor::int_box(
                    vec![FEATURE_COUNT],
                    vec![-100; FEATURE_COUNT],
                    vec![100; FEATURE_COUNT],
                )?,
            ),
            ObservationSpace::new(RUNTIME, SpaceDescriptor::double_scalar(Some(0.0), None)?)
                .with_deterministic(false)
                .with_platform_dependent(true)
                .with_default_observation(0.0_f64),
        ];

        Ok(Self {
            action_spaces,
            observation_spaces: observation_spaces.into(),
            episode_length,
        })
    }
}

impl SessionBackend for ExampleBackend {
    fn name(&self) -> &str {
        "example"
    }

    fn action_spaces(&self) -> Arc<[ActionSpace]> {
        Arc::clone(&self.action_spaces)
    }

    fn observation_spaces(&self) -> Arc<[ObservationSpace]> {
        Arc::clone(&self.observation_spaces)
    }

    fn end_of_episode(&self, actions_applied: u64) -> bool {
        super::budget_exhausted(self.episode_length, actions_applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spaces::{DescriptorKind, Event};

    fn backend(episode_length: Option<u64>) -> ExampleBackend {
        ExampleBackend::new(Arc::from(Vec::new()), episode_length).expect("valid spaces")
    }

    #[test]
    fn publishes_ir_features_and_runtime() {
        let backend = backend(None);
        let spaces = backend.observation_spaces();
        let summary: Vec<_> = spaces
            .iter()
            .map(|space| (space.name.as_str(), space.descriptor.kind(), space.deterministic))
            .collect();

        assert_eq!(
            summary,
            vec![
                (IR, DescriptorKind::StringValue, true),
                (FEATURES, DescriptorKind::IntTensor, true),
                (RUNTIME, DescriptorKind::DoubleScalar, false),
            ]
        );
        assert!(spaces[2].platform_dependent);
        assert_eq!(spaces[2].default_observation, Some(Event::Double(0.0)));
    }

    #[test]
    fn episode_budget_is_optional() {
        assert!(!backend(None).end_of_episode(1_000));
        assert!(!backend(Some(3)).end_of_episode(2));
        assert!(backend(Some(3)).end_of_episode(3));
    }
}
