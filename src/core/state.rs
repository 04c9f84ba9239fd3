//! Payload and provenance types shared by nodes and registry records.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Opaque node payload.
///
/// Serialized untagged, so a persisted document reads as plain JSON values
/// (`null`, `0.5`, `[1.0, 2.0]`, `"text"`, or any other structure).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeState {
    #[default]
    Unset,
    Scalar(f64),
    Array(Vec<f64>),
    Text(String),
    Other(serde_json::Value),
}

impl NodeState {
    pub fn is_unset(&self) -> bool {
        matches!(self, NodeState::Unset)
    }

    /// `false` when a scalar or array element is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        match self {
            NodeState::Scalar(v) => v.is_finite(),
            NodeState::Array(values) => values.iter().all(|v| v.is_finite()),
            NodeState::Unset | NodeState::Text(_) | NodeState::Other(_) => true,
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            NodeState::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    /// Value a node emits when it fires while holding this state.
    ///
    /// Scalars emit themselves, arrays their mean (0.0 when empty), every
    /// other payload emits 1.0.
    pub fn pulse_value(&self) -> f64 {
        match self {
            NodeState::Scalar(v) => *v,
            NodeState::Array(values) if values.is_empty() => 0.0,
            NodeState::Array(values) => values.iter().sum::<f64>() / values.len() as f64,
            NodeState::Text(_) | NodeState::Other(_) | NodeState::Unset => 1.0,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            NodeState::Unset => "unset",
            NodeState::Scalar(_) => "scalar",
            NodeState::Array(_) => "array",
            NodeState::Text(_) => "text",
            NodeState::Other(_) => "other",
        }
    }

    /// Normalize an arbitrary JSON value into the narrowest variant.
    pub fn from_json(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => NodeState::Unset,
            Value::Number(n) => match n.as_f64() {
                Some(v) => NodeState::Scalar(v),
                None => NodeState::Other(Value::Number(n)),
            },
            Value::String(s) => NodeState::Text(s),
            Value::Array(items) => {
                let numbers: Option<Vec<f64>> = items.iter().map(Value::as_f64).collect();
                match numbers {
                    Some(values) => NodeState::Array(values),
                    None => NodeState::Other(Value::Array(items)),
                }
            }
            other => NodeState::Other(other),
        }
    }
}

impl From<f64> for NodeState {
    fn from(v: f64) -> Self {
        NodeState::Scalar(v)
    }
}

impl From<i32> for NodeState {
    fn from(v: i32) -> Self {
        NodeState::Scalar(f64::from(v))
    }
}

impl From<Vec<f64>> for NodeState {
    fn from(values: Vec<f64>) -> Self {
        NodeState::Array(values)
    }
}

impl From<&str> for NodeState {
    fn from(s: &str) -> Self {
        NodeState::Text(s.to_string())
    }
}

impl From<String> for NodeState {
    fn from(s: String) -> Self {
        NodeState::Text(s)
    }
}

impl From<serde_json::Value> for NodeState {
    fn from(value: serde_json::Value) -> Self {
        NodeState::from_json(value)
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeState::Unset => f.write_str("unset"),
            NodeState::Scalar(v) => write!(f, "{v}"),
            NodeState::Array(values) => write!(f, "{values:?}"),
            NodeState::Text(s) => f.write_str(s),
            NodeState::Other(v) => write!(f, "{v}"),
        }
    }
}

/// Free-form provenance metadata carried by records and nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub origin: String,
    pub reason: String,
    pub owner: String,
    pub kind: String,
}

impl Default for Provenance {
    /// Defaults used when a label is registered directly.
    fn default() -> Self {
        Self::new("user", "init", "unknown", "general")
    }
}

impl Provenance {
    pub fn new(
        origin: impl Into<String>,
        reason: impl Into<String>,
        owner: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            origin: origin.into(),
            reason: reason.into(),
            owner: owner.into(),
            kind: kind.into(),
        }
    }

    /// Defaults used when a node is constructed.
    pub fn node_default() -> Self {
        Self::new("architect", "init", "system", "general")
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    /// Name of the first field that differs from `other`, if any.
    pub fn first_difference(&self, other: &Provenance) -> Option<&'static str> {
        if self.origin != other.origin {
            Some("origin")
        } else if self.reason != other.reason {
            Some("reason")
        } else if self.owner != other.owner {
            Some("owner")
        } else if self.kind != other.kind {
            Some("kind")
        } else {
            None
        }
    }
}
