//! JSON bridge for parameter overrides and snapshots.
//!
//! Overrides are applied strictly against the registered slot type:
//! - int slots take JSON integers that fit in `i32`
//! - float slots take any JSON number
//! - bool slots take JSON booleans, text slots JSON strings
//! - choice slots take the variant name as a JSON string

use serde_json::{Map, Value as JsonValue};

use crate::{ParamValue, ParameterError, ParameterSet};

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "json null",
        JsonValue::Bool(_) => "json bool",
        JsonValue::Number(n) if n.is_f64() => "json float",
        JsonValue::Number(_) => "json integer",
        JsonValue::String(_) => "json string",
        JsonValue::Array(_) => "json array",
        JsonValue::Object(_) => "json object",
    }
}

fn convert(
    params: &ParameterSet,
    name: &str,
    raw: &JsonValue,
) -> Result<ParamValue, ParameterError> {
    let slot = params
        .parameter(name)
        .ok_or_else(|| ParameterError::NotFound {
            name: name.to_string(),
        })?;
    let converted = match (&slot.default, raw) {
        (ParamValue::Int(_), JsonValue::Number(n)) => n
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .map(ParamValue::Int),
        (ParamValue::Float(_), JsonValue::Number(n)) => {
            n.as_f64().map(|v| ParamValue::Float(v as f32))
        }
        (ParamValue::Bool(_), JsonValue::Bool(b)) => Some(ParamValue::Bool(*b)),
        (ParamValue::Text(_), JsonValue::String(s)) => Some(ParamValue::Text(s.clone())),
        (ParamValue::Choice(c), JsonValue::String(s)) => Some(ParamValue::choice(&c.ty, s)),
        _ => None,
    };
    converted.ok_or_else(|| ParameterError::TypeMismatch {
        name: name.to_string(),
        expected: slot.type_label(),
        actual: json_kind(raw).to_string(),
    })
}

/// Apply a `{ "name": value, ... }` object onto `params`.
///
/// Every entry is validated before any is written, so a failing override leaves the set
/// untouched.
pub fn apply_json(params: &mut ParameterSet, overrides: &JsonValue) -> Result<(), ParameterError> {
    let obj = overrides.as_object().ok_or(ParameterError::NotAnObject)?;
    let mut staged = params.clone();
    for (name, raw) in obj {
        let value = convert(&staged, name, raw)?;
        staged.set_value(name, value)?;
    }
    *params = staged;
    Ok(())
}

/// Snapshot current values as a plain `{ "name": value }` object.
pub fn to_json(params: &ParameterSet) -> JsonValue {
    let mut out = Map::new();
    for p in params.iter() {
        let v = match &p.value {
            ParamValue::Int(i) => JsonValue::from(*i),
            ParamValue::Float(f) => JsonValue::from(*f as f64),
            ParamValue::Bool(b) => JsonValue::Bool(*b),
            ParamValue::Text(s) => JsonValue::String(s.clone()),
            ParamValue::Choice(c) => JsonValue::String(c.variant.clone()),
        };
        out.insert(p.name.clone(), v);
    }
    JsonValue::Object(out)
}
