//! ParamValue: runtime instances stored in a parameter slot.
//! Numeric slots are either `Int` or `Float`; the two never convert into each other.

use serde::{Deserialize, Serialize};

/// Coarse kind of a parameter value, used for introspection and quick dispatch.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Int,
    Float,
    Bool,
    Text,
    Choice,
}

/// A selected variant of a named enumeration (e.g. `SensorModel::Orient3`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    /// Name of the enumeration type the variant belongs to.
    pub ty: String,
    pub variant: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum ParamValue {
    /// Signed integer (rates, seeds, counts)
    Int(i32),

    /// Scalar float
    Float(f32),

    /// Boolean flag
    Bool(bool),

    /// Free text
    Text(String),

    /// Enumeration variant, tagged with its type name
    Choice(Choice),
}

impl ParamValue {
    #[inline]
    pub fn kind(&self) -> ValueKind {
        match self {
            ParamValue::Int(_) => ValueKind::Int,
            ParamValue::Float(_) => ValueKind::Float,
            ParamValue::Bool(_) => ValueKind::Bool,
            ParamValue::Text(_) => ValueKind::Text,
            ParamValue::Choice(_) => ValueKind::Choice,
        }
    }

    /// Full type label. Two values are assignable to the same slot iff their labels match;
    /// choice values include their enumeration name (`choice<SensorModel>`).
    pub fn type_label(&self) -> String {
        match self {
            ParamValue::Int(_) => "int".to_string(),
            ParamValue::Float(_) => "float".to_string(),
            ParamValue::Bool(_) => "bool".to_string(),
            ParamValue::Text(_) => "text".to_string(),
            ParamValue::Choice(c) => format!("choice<{}>", c.ty),
        }
    }

    pub fn choice(ty: impl Into<String>, variant: impl Into<String>) -> Self {
        ParamValue::Choice(Choice {
            ty: ty.into(),
            variant: variant.into(),
        })
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f32> for ParamValue {
    fn from(v: f32) -> Self {
        ParamValue::Float(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(v)
    }
}
