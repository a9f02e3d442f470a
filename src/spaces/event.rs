use std::fmt;

use compiler_engine::Measurement;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Row-major tensor of 64-bit integers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Int64Tensor {
    pub shape: Vec<usize>,
    pub values: Vec<i64>,
}

impl Int64Tensor {
    #[must_use]
    pub fn new(shape: Vec<usize>, values: Vec<i64>) -> Self {
        Self { shape, values }
    }

    /// True when the flat value count matches the shape.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        element_count(&self.shape) == Some(self.values.len())
    }
}

/// Row-major tensor of doubles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DoubleTensor {
    pub shape: Vec<usize>,
    pub values: Vec<f64>,
}

impl DoubleTensor {
    #[must_use]
    pub fn new(shape: Vec<usize>, values: Vec<f64>) -> Self {
        Self { shape, values }
    }

    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        element_count(&self.shape) == Some(self.values.len())
    }
}

/// One action or observation value. Exactly one variant is populated per call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Event {
    Int64(i64),
    Double(f64),
    String(String),
    Int64Tensor(Int64Tensor),
    DoubleTensor(DoubleTensor),
    Bytes(Vec<u8>),
    /// Arbitrary-typed payload for backends with structured observations.
    Any(Value),
}

/// Variant tag of an [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Int64,
    Double,
    String,
    Int64Tensor,
    DoubleTensor,
    Bytes,
    Any,
}

impl EventKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Int64 => "int64",
            Self::Double => "double",
            Self::String => "string",
            Self::Int64Tensor => "int64_tensor",
            Self::DoubleTensor => "double_tensor",
            Self::Bytes => "bytes",
            Self::Any => "any",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Event {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Int64(_) => EventKind::Int64,
            Self::Double(_) => EventKind::Double,
            Self::String(_) => EventKind::String,
            Self::Int64Tensor(_) => EventKind::Int64Tensor,
            Self::DoubleTensor(_) => EventKind::DoubleTensor,
            Self::Bytes(_) => EventKind::Bytes,
            Self::Any(_) => EventKind::Any,
        }
    }

    #[must_use]
    pub fn as_int64(&self) -> Option<i64> {
        match self {
            Self::Int64(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Self::Double(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }
}

impl From<i64> for Event {
    fn from(value: i64) -> Self {
        Self::Int64(value)
    }
}

impl From<f64> for Event {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<String> for Event {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for Event {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<Measurement> for Event {
    fn from(measurement: Measurement) -> Self {
        match measurement {
            Measurement::Int64(value) => Self::Int64(value),
            Measurement::Double(value) => Self::Double(value),
            Measurement::Text(value) => Self::String(value),
            Measurement::Int64Tensor { shape, values } => {
                Self::Int64Tensor(Int64Tensor { shape, values })
            }
            Measurement::DoubleTensor { shape, values } => {
                Self::DoubleTensor(DoubleTensor { shape, values })
            }
            Measurement::Bytes(value) => Self::Bytes(value),
            Measurement::Opaque(value) => Self::Any(value),
        }
    }
}

/// Number of elements described by a shape, or `None` when the product overflows.
/// The empty shape is a scalar.
#[must_use]
pub fn element_count(shape: &[usize]) -> Option<usize> {
    shape
        .iter()
        .try_fold(1usize, |count, &dim| count.checked_mul(dim))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn measurements_map_onto_matching_event_variants() {
        assert_eq!(Event::from(Measurement::Int64(3)), Event::Int64(3));
        assert_eq!(
            Event::from(Measurement::Text("ir".to_string())),
            Event::String("ir".to_string())
        );
        assert_eq!(
            Event::from(Measurement::Int64Tensor {
                shape: vec![2],
                values: vec![1, 2],
            }),
            Event::Int64Tensor(Int64Tensor::new(vec![2], vec![1, 2]))
        );
        assert_eq!(
            Event::from(Measurement::Opaque(json!({"k": 1}))).kind(),
            EventKind::Any
        );
    }

    #[test]
    fn tensor_well_formedness_uses_shape_product() {
        assert!(Int64Tensor::new(vec![2, 3], vec![0; 6]).is_well_formed());
        assert!(!Int64Tensor::new(vec![2, 3], vec![0; 5]).is_well_formed());
        assert!(DoubleTensor::new(Vec::new(), vec![1.0]).is_well_formed());
        assert!(!Int64Tensor::new(vec![usize::MAX, 2], Vec::new()).is_well_formed());
        assert_eq!(element_count(&[usize::MAX, 2]), None);
        assert_eq!(element_count(&[4, 0, usize::MAX]), Some(0));
    }

    #[test]
    fn event_wire_format_is_externally_tagged() {
        let encoded = serde_json::to_value(Event::Int64(2)).expect("encode");
        assert_eq!(encoded, json!({"int64": 2}));

        let decoded: Event =
            serde_json::from_value(json!({"string": "hello"})).expect("decode");
        assert_eq!(decoded.as_str(), Some("hello"));
    }
}
