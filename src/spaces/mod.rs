//! Space Descriptor Model: typed schemas for action and observation domains, and the
//! event values that inhabit them.

pub mod descriptor;
pub mod event;
pub mod space;

pub use descriptor::{
    DescriptorKind, LengthRange, NameList, ScalarBounds, ScalarRange, SpaceDescriptor,
    SpaceError, SpaceViolation, TensorBounds, TensorBox,
};
pub use event::{element_count, DoubleTensor, Event, EventKind, Int64Tensor};
pub use space::{first_duplicate_name, ActionSpace, ObservationSpace};
