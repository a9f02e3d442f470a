//! Typed, self-describing schema of one action or observation domain.
//!
//! Every payload type keeps its fields private and is only reachable through a
//! validating constructor, so a [`SpaceDescriptor`] that exists is always well formed.
//! Decoding from the wire re-runs the same validation.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::event::{element_count, DoubleTensor, Event, EventKind, Int64Tensor};

/// Constructor-time validation failure of a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpaceError {
    #[error("name list must not be empty")]
    EmptyDomain,

    #[error("name '{name}' appears more than once")]
    DuplicateName { name: String },

    /// `expected` saturates at `usize::MAX` when the shape's element count overflows.
    #[error("shape {shape:?} holds {expected} elements but low has {low} and high has {high}")]
    ShapeMismatch {
        shape: Vec<usize>,
        expected: usize,
        low: usize,
        high: usize,
    },

    #[error("invalid bounds: {reason}")]
    InvalidBounds { reason: String },
}

/// Reason a value does not belong to a descriptor's domain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpaceViolation {
    #[error("expected a {expected} value, got {found}")]
    WrongVariant {
        expected: EventKind,
        found: EventKind,
    },

    #[error("index {index} is outside [0, {len})")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("value {value} is outside {bounds}")]
    OutOfBounds { value: String, bounds: String },

    #[error("tensor shape {found:?} does not match {expected:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("string length {length} is outside {range}")]
    LengthOutOfRange { length: usize, range: String },
}

/// Variant tag of a [`SpaceDescriptor`].
///
/// The tag of a published space never changes within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptorKind {
    NamedDiscrete,
    IntScalar,
    DoubleScalar,
    IntTensor,
    DoubleTensor,
    StringValue,
    CommandlineFlagSet,
}

impl DescriptorKind {
    /// The only [`Event`] variant a space of this kind accepts.
    #[must_use]
    pub fn event_kind(self) -> EventKind {
        match self {
            Self::NamedDiscrete | Self::CommandlineFlagSet | Self::IntScalar => EventKind::Int64,
            Self::DoubleScalar => EventKind::Double,
            Self::IntTensor => EventKind::Int64Tensor,
            Self::DoubleTensor => EventKind::DoubleTensor,
            Self::StringValue => EventKind::String,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct NameListRepr {
    names: Vec<String>,
}

/// Ordered, non-empty, pairwise-distinct list of choice names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "NameListRepr", into = "NameListRepr")]
pub struct NameList {
    names: Vec<String>,
}

impl NameList {
    pub fn new<I, S>(names: I) -> Result<Self, SpaceError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(SpaceError::EmptyDomain);
        }

        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(SpaceError::DuplicateName { name: name.clone() });
            }
        }

        Ok(Self { names })
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|candidate| candidate == name)
    }

    fn resolve(&self, index: i64) -> Result<(usize, &str), SpaceViolation> {
        usize::try_from(index)
            .ok()
            .and_then(|position| self.get(position).map(|name| (position, name)))
            .ok_or(SpaceViolation::IndexOutOfRange {
                index,
                len: self.len(),
            })
    }
}

impl TryFrom<NameListRepr> for NameList {
    type Error = SpaceError;

    fn try_from(repr: NameListRepr) -> Result<Self, Self::Error> {
        Self::new(repr.names)
    }
}

impl From<NameList> for NameListRepr {
    fn from(list: NameList) -> Self {
        Self { names: list.names }
    }
}

/// Scalar bounds on the wire. An absent bound is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum ScalarBounds {
    Int { min: Option<i64>, max: Option<i64> },
    Double { min: Option<f64>, max: Option<f64> },
}

/// Validated numeric range for a single int or double value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ScalarBounds", into = "ScalarBounds")]
pub struct ScalarRange {
    bounds: ScalarBounds,
}

impl ScalarRange {
    pub fn int(min: Option<i64>, max: Option<i64>) -> Result<Self, SpaceError> {
        Self::try_from(ScalarBounds::Int { min, max })
    }

    pub fn double(min: Option<f64>, max: Option<f64>) -> Result<Self, SpaceError> {
        Self::try_from(ScalarBounds::Double { min, max })
    }

    #[must_use]
    pub fn bounds(&self) -> ScalarBounds {
        self.bounds
    }

    fn check(&self, value: &Event) -> Result<(), SpaceViolation> {
        match (self.bounds, value) {
            (ScalarBounds::Int { min, max }, Event::Int64(value)) => {
                if min.is_some_and(|min| *value < min) || max.is_some_and(|max| *value > max) {
                    return Err(SpaceViolation::OutOfBounds {
                        value: value.to_string(),
                        bounds: describe_range(min, max),
                    });
                }
                Ok(())
            }
            (ScalarBounds::Double { min, max }, Event::Double(value)) => {
                if !within_double(*value, min, max) {
                    return Err(SpaceViolation::OutOfBounds {
                        value: value.to_string(),
                        bounds: describe_range(min, max),
                    });
                }
                Ok(())
            }
            (bounds, other) => Err(SpaceViolation::WrongVariant {
                expected: match bounds {
                    ScalarBounds::Int { .. } => EventKind::Int64,
                    ScalarBounds::Double { .. } => EventKind::Double,
                },
                found: other.kind(),
            }),
        }
    }
}

impl TryFrom<ScalarBounds> for ScalarRange {
    type Error = SpaceError;

    fn try_from(bounds: ScalarBounds) -> Result<Self, Self::Error> {
        match bounds {
            ScalarBounds::Int {
                min: Some(min),
                max: Some(max),
            } if min > max => {
                return Err(SpaceError::InvalidBounds {
                    reason: format!("min {min} is greater than max {max}"),
                })
            }
            ScalarBounds::Double { min, max } => {
                let finite = |bound: Option<f64>| bound.map_or(true, f64::is_finite);
                if !finite(min) || !finite(max) {
                    return Err(SpaceError::InvalidBounds {
                        reason: "bounds must be finite; leave a side unset for no bound"
                            .to_string(),
                    });
                }
                if let (Some(min), Some(max)) = (min, max) {
                    if min > max {
                        return Err(SpaceError::InvalidBounds {
                            reason: format!("min {min} is greater than max {max}"),
                        });
                    }
                }
            }
            ScalarBounds::Int { .. } => {}
        }

        Ok(Self { bounds })
    }
}

impl From<ScalarRange> for ScalarBounds {
    fn from(range: ScalarRange) -> Self {
        range.bounds
    }
}

/// Elementwise tensor bounds on the wire, flattened in row-major order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum TensorBounds {
    Int { low: Vec<i64>, high: Vec<i64> },
    Double { low: Vec<f64>, high: Vec<f64> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct TensorBoxRepr {
    shape: Vec<usize>,
    bounds: TensorBounds,
}

/// Validated N-dimensional box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TensorBoxRepr", into = "TensorBoxRepr")]
pub struct TensorBox {
    shape: Vec<usize>,
    bounds: TensorBounds,
}

impl TensorBox {
    pub fn int(shape: Vec<usize>, low: Vec<i64>, high: Vec<i64>) -> Result<Self, SpaceError> {
        Self::try_from(TensorBoxRepr {
            shape,
            bounds: TensorBounds::Int { low, high },
        })
    }

    pub fn double(shape: Vec<usize>, low: Vec<f64>, high: Vec<f64>) -> Result<Self, SpaceError> {
        Self::try_from(TensorBoxRepr {
            shape,
            bounds: TensorBounds::Double { low, high },
        })
    }

    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[must_use]
    pub fn bounds(&self) -> &TensorBounds {
        &self.bounds
    }

    fn check(&self, value: &Event) -> Result<(), SpaceViolation> {
        match (&self.bounds, value) {
            (TensorBounds::Int { low, high }, Event::Int64Tensor(tensor)) => {
                self.check_shape(&tensor.shape, tensor.values.len())?;
                check_elements(&tensor.values, low, high, |value, low, high| {
                    value >= low && value <= high
                })
            }
            (TensorBounds::Double { low, high }, Event::DoubleTensor(tensor)) => {
                self.check_shape(&tensor.shape, tensor.values.len())?;
                check_elements(&tensor.values, low, high, |value, low, high| {
                    value >= low && value <= high
                })
            }
            (bounds, other) => Err(SpaceViolation::WrongVariant {
                expected: match bounds {
                    TensorBounds::Int { .. } => EventKind::Int64Tensor,
                    TensorBounds::Double { .. } => EventKind::DoubleTensor,
                },
                found: other.kind(),
            }),
        }
    }

    // The shape comparison runs first so a client shape is never multiplied out
    // unless it already equals the validated one.
    fn check_shape(&self, shape: &[usize], len: usize) -> Result<(), SpaceViolation> {
        if shape != self.shape.as_slice() || element_count(shape) != Some(len) {
            return Err(SpaceViolation::ShapeMismatch {
                expected: self.shape.clone(),
                found: shape.to_vec(),
            });
        }
        Ok(())
    }
}

impl TryFrom<TensorBoxRepr> for TensorBox {
    type Error = SpaceError;

    fn try_from(repr: TensorBoxRepr) -> Result<Self, Self::Error> {
        let expected = element_count(&repr.shape);
        let (low_len, high_len) = match &repr.bounds {
            TensorBounds::Int { low, high } => (low.len(), high.len()),
            TensorBounds::Double { low, high } => (low.len(), high.len()),
        };
        if expected != Some(low_len) || expected != Some(high_len) {
            return Err(SpaceError::ShapeMismatch {
                shape: repr.shape,
                expected: expected.unwrap_or(usize::MAX),
                low: low_len,
                high: high_len,
            });
        }

        if let TensorBounds::Double { low, high } = &repr.bounds {
            if let Some(position) = low
                .iter()
                .zip(high)
                .position(|(l, h)| !l.is_finite() || !h.is_finite())
            {
                return Err(SpaceError::InvalidBounds {
                    reason: format!("element {position} has a non-finite bound"),
                });
            }
        }

        let inverted = match &repr.bounds {
            TensorBounds::Int { low, high } => low.iter().zip(high).position(|(l, h)| l > h),
            TensorBounds::Double { low, high } => low.iter().zip(high).position(|(l, h)| l > h),
        };
        if let Some(position) = inverted {
            return Err(SpaceError::InvalidBounds {
                reason: format!("element {position} has low greater than high"),
            });
        }

        Ok(Self {
            shape: repr.shape,
            bounds: repr.bounds,
        })
    }
}

impl From<TensorBox> for TensorBoxRepr {
    fn from(tensor: TensorBox) -> Self {
        Self {
            shape: tensor.shape,
            bounds: tensor.bounds,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct LengthRangeRepr {
    min: usize,
    max: Option<usize>,
}

/// Validated `(min, max)` character-length range of a string space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LengthRangeRepr", into = "LengthRangeRepr")]
pub struct LengthRange {
    min: usize,
    max: Option<usize>,
}

impl LengthRange {
    pub fn new(min: usize, max: Option<usize>) -> Result<Self, SpaceError> {
        Self::try_from(LengthRangeRepr { min, max })
    }

    #[must_use]
    pub fn min(&self) -> usize {
        self.min
    }

    #[must_use]
    pub fn max(&self) -> Option<usize> {
        self.max
    }

    fn check(&self, value: &Event) -> Result<(), SpaceViolation> {
        let Event::String(text) = value else {
            return Err(SpaceViolation::WrongVariant {
                expected: EventKind::String,
                found: value.kind(),
            });
        };

        let length = text.chars().count();
        if length < self.min || self.max.is_some_and(|max| length > max) {
            return Err(SpaceViolation::LengthOutOfRange {
                length,
                range: describe_range(Some(self.min), self.max),
            });
        }
        Ok(())
    }
}

impl TryFrom<LengthRangeRepr> for LengthRange {
    type Error = SpaceError;

    fn try_from(repr: LengthRangeRepr) -> Result<Self, Self::Error> {
        if let Some(max) = repr.max {
            if max < repr.min {
                return Err(SpaceError::InvalidBounds {
                    reason: format!("max length {max} is below min length {}", repr.min),
                });
            }
        }
        Ok(Self {
            min: repr.min,
            max: repr.max,
        })
    }
}

impl From<LengthRange> for LengthRangeRepr {
    fn from(range: LengthRange) -> Self {
        Self {
            min: range.min,
            max: range.max,
        }
    }
}

/// One legal domain of action or observation values.
///
/// Equality is structural. Discrete and flag spaces are indexed by `Int64` events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpaceDescriptor {
    NamedDiscrete(NameList),
    BoundedScalar(ScalarRange),
    BoundedTensor(TensorBox),
    StringValue(LengthRange),
    CommandlineFlagSet(NameList),
}

impl SpaceDescriptor {
    pub fn named_discrete<I, S>(names: I) -> Result<Self, SpaceError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        NameList::new(names).map(Self::NamedDiscrete)
    }

    pub fn commandline_flags<I, S>(names: I) -> Result<Self, SpaceError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        NameList::new(names).map(Self::CommandlineFlagSet)
    }

    pub fn int_scalar(min: Option<i64>, max: Option<i64>) -> Result<Self, SpaceError> {
        ScalarRange::int(min, max).map(Self::BoundedScalar)
    }

    pub fn double_scalar(min: Option<f64>, max: Option<f64>) -> Result<Self, SpaceError> {
        ScalarRange::double(min, max).map(Self::BoundedScalar)
    }

    pub fn int_box(shape: Vec<usize>, low: Vec<i64>, high: Vec<i64>) -> Result<Self, SpaceError> {
        TensorBox::int(shape, low, high).map(Self::BoundedTensor)
    }

    pub fn double_box(
        shape: Vec<usize>,
        low: Vec<f64>,
        high: Vec<f64>,
    ) -> Result<Self, SpaceError> {
        TensorBox::double(shape, low, high).map(Self::BoundedTensor)
    }

    pub fn string(min_length: usize, max_length: Option<usize>) -> Result<Self, SpaceError> {
        LengthRange::new(min_length, max_length).map(Self::StringValue)
    }

    #[must_use]
    pub fn kind(&self) -> DescriptorKind {
        match self {
            Self::NamedDiscrete(_) => DescriptorKind::NamedDiscrete,
            Self::BoundedScalar(range) => match range.bounds() {
                ScalarBounds::Int { .. } => DescriptorKind::IntScalar,
                ScalarBounds::Double { .. } => DescriptorKind::DoubleScalar,
            },
            Self::BoundedTensor(tensor) => match tensor.bounds() {
                TensorBounds::Int { .. } => DescriptorKind::IntTensor,
                TensorBounds::Double { .. } => DescriptorKind::DoubleTensor,
            },
            Self::StringValue(_) => DescriptorKind::StringValue,
            Self::CommandlineFlagSet(_) => DescriptorKind::CommandlineFlagSet,
        }
    }

    /// Choice names of discrete and flag spaces.
    #[must_use]
    pub fn names(&self) -> Option<&NameList> {
        match self {
            Self::NamedDiscrete(names) | Self::CommandlineFlagSet(names) => Some(names),
            _ => None,
        }
    }

    /// True when `value` carries the variant this space produces or accepts.
    #[must_use]
    pub fn accepts_kind(&self, value: &Event) -> bool {
        self.kind().event_kind() == value.kind()
    }

    /// Checks that `value` lies in this domain: right variant, in range, right shape.
    pub fn check(&self, value: &Event) -> Result<(), SpaceViolation> {
        match self {
            Self::NamedDiscrete(names) | Self::CommandlineFlagSet(names) => match value {
                Event::Int64(index) => names.resolve(*index).map(|_| ()),
                other => Err(SpaceViolation::WrongVariant {
                    expected: EventKind::Int64,
                    found: other.kind(),
                }),
            },
            Self::BoundedScalar(range) => range.check(value),
            Self::BoundedTensor(tensor) => tensor.check(value),
            Self::StringValue(range) => range.check(value),
        }
    }

    /// Resolves an `Int64` index event to its choice in a discrete or flag space.
    #[must_use]
    pub fn choice(&self, value: &Event) -> Option<(usize, &str)> {
        let names = self.names()?;
        names.resolve(value.as_int64()?).ok()
    }
}

impl fmt::Display for DescriptorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NamedDiscrete => "named_discrete",
            Self::IntScalar => "int_scalar",
            Self::DoubleScalar => "double_scalar",
            Self::IntTensor => "int_tensor",
            Self::DoubleTensor => "double_tensor",
            Self::StringValue => "string_value",
            Self::CommandlineFlagSet => "commandline_flag_set",
        };
        f.write_str(name)
    }
}

fn within_double(value: f64, min: Option<f64>, max: Option<f64>) -> bool {
    if value.is_nan() {
        return false;
    }
    min.map_or(true, |min| value >= min) && max.map_or(true, |max| value <= max)
}

fn check_elements<T: Copy + fmt::Display>(
    values: &[T],
    low: &[T],
    high: &[T],
    within: impl Fn(T, T, T) -> bool,
) -> Result<(), SpaceViolation> {
    for (position, ((value, low), high)) in values.iter().zip(low).zip(high).enumerate() {
        if !within(*value, *low, *high) {
            return Err(SpaceViolation::OutOfBounds {
                value: format!("{value} at element {position}"),
                bounds: format!("[{low}, {high}]"),
            });
        }
    }
    Ok(())
}

fn describe_range<T: fmt::Display>(min: Option<T>, max: Option<T>) -> String {
    let min = min.map_or_else(|| "-inf".to_string(), |min| min.to_string());
    let max = max.map_or_else(|| "+inf".to_string(), |max| max.to_string());
    format!("[{min}, {max}]")
}
