use serde::{Deserialize, Serialize};

use super::descriptor::SpaceDescriptor;
use super::event::Event;

/// Named domain of actions a session accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActionSpace {
    pub name: String,
    pub descriptor: SpaceDescriptor,
}

impl ActionSpace {
    #[must_use]
    pub fn new(name: impl Into<String>, descriptor: SpaceDescriptor) -> Self {
        Self {
            name: name.into(),
            descriptor,
        }
    }
}

/// Named domain of a signal a session can measure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObservationSpace {
    pub name: String,
    pub descriptor: SpaceDescriptor,
    /// False when repeated reads of unchanged state may differ (e.g. timings).
    pub deterministic: bool,
    /// True when the value's scale is not portable across machines.
    pub platform_dependent: bool,
    /// Value a client may substitute when the service cannot be reached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_observation: Option<Event>,
}

impl ObservationSpace {
    /// Creates a deterministic, platform-independent space without a default value.
    #[must_use]
    pub fn new(name: impl Into<String>, descriptor: SpaceDescriptor) -> Self {
        Self {
            name: name.into(),
            descriptor,
            deterministic: true,
            platform_dependent: false,
            default_observation: None,
        }
    }

    #[must_use]
    pub fn with_deterministic(mut self, deterministic: bool) -> Self {
        self.deterministic = deterministic;
        self
    }

    #[must_use]
    pub fn with_platform_dependent(mut self, platform_dependent: bool) -> Self {
        self.platform_dependent = platform_dependent;
        self
    }

    #[must_use]
    pub fn with_default_observation(mut self, value: impl Into<Event>) -> Self {
        self.default_observation = Some(value.into());
        self
    }
}

/// Returns the first name that appears twice, if any.
pub fn first_duplicate_name<'a>(names: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    let mut seen = std::collections::HashSet::new();
    names.into_iter().find(|name| !seen.insert(*name))
}
