//! Parameter registry: named, typed, defaulted configuration slots.
//!
//! A slot's type is fixed when it is registered. Reads go through [`ParamType`] and fail
//! with [`ParameterError::TypeMismatch`] instead of coercing between kinds.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value::{ParamValue, ValueKind};

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ParameterError {
    #[error("parameter '{name}' not found")]
    NotFound { name: String },

    #[error("type mismatch for parameter '{name}': expected {expected}, found {actual}")]
    TypeMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("parameter '{name}' registered twice")]
    Duplicate { name: String },

    #[error("parameter '{name}' does not accept choice '{variant}'")]
    UnknownChoice { name: String, variant: String },

    #[error("parameter overrides must be a JSON object")]
    NotAnObject,
}

/// Rust types that can live in a parameter slot.
///
/// Implemented for `i32`, `f32`, `bool`, `String`, and for enumerations through
/// [`impl_choice_param!`](crate::impl_choice_param).
pub trait ParamType: Sized {
    /// Label compared against [`ParamValue::type_label`].
    fn type_label() -> String;
    fn from_param(value: &ParamValue) -> Option<Self>;
    fn into_param(self) -> ParamValue;

    /// Allowed variant names, for enumeration types.
    fn choices() -> Option<&'static [&'static str]> {
        None
    }
}

impl ParamType for i32 {
    fn type_label() -> String {
        "int".to_string()
    }
    fn from_param(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }
    fn into_param(self) -> ParamValue {
        ParamValue::Int(self)
    }
}

impl ParamType for f32 {
    fn type_label() -> String {
        "float".to_string()
    }
    fn from_param(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::Float(v) => Some(*v),
            _ => None,
        }
    }
    fn into_param(self) -> ParamValue {
        ParamValue::Float(self)
    }
}

impl ParamType for bool {
    fn type_label() -> String {
        "bool".to_string()
    }
    fn from_param(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
    fn into_param(self) -> ParamValue {
        ParamValue::Bool(self)
    }
}

impl ParamType for String {
    fn type_label() -> String {
        "text".to_string()
    }
    fn from_param(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::Text(v) => Some(v.clone()),
            _ => None,
        }
    }
    fn into_param(self) -> ParamValue {
        ParamValue::Text(self)
    }
}

/// Make a fieldless enum usable as a choice parameter.
///
/// Generates `VARIANTS`, `as_str` and `from_name` on the enum and a [`ParamType`] impl
/// whose values are tagged with the enum's name.
#[macro_export]
macro_rules! impl_choice_param {
    ($ty:ident { $($variant:ident),+ $(,)? }) => {
        impl $ty {
            pub const VARIANTS: &'static [&'static str] = &[$(stringify!($variant)),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => stringify!($variant),)+
                }
            }

            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $(stringify!($variant) => Some($ty::$variant),)+
                    _ => None,
                }
            }
        }

        impl $crate::ParamType for $ty {
            fn type_label() -> String {
                format!("choice<{}>", stringify!($ty))
            }

            fn from_param(value: &$crate::ParamValue) -> Option<Self> {
                match value {
                    $crate::ParamValue::Choice(c) if c.ty == stringify!($ty) => {
                        Self::from_name(&c.variant)
                    }
                    _ => None,
                }
            }

            fn into_param(self) -> $crate::ParamValue {
                $crate::ParamValue::choice(stringify!($ty), self.as_str())
            }

            fn choices() -> Option<&'static [&'static str]> {
                Some(Self::VARIANTS)
            }
        }
    };
}

/// A single named slot with its default, current value and UI metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: ParamValue,
    pub default: ParamValue,
    #[serde(default)]
    pub doc: String,
    /// Allowed variant names for choice parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
}

impl Parameter {
    pub fn new<T: ParamType>(name: impl Into<String>, default: T) -> Self {
        let default = default.into_param();
        Self {
            name: name.into(),
            value: default.clone(),
            default,
            doc: String::new(),
            choices: T::choices().map(|c| c.iter().map(|s| s.to_string()).collect()),
        }
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    #[inline]
    pub fn kind(&self) -> ValueKind {
        self.default.kind()
    }

    pub fn type_label(&self) -> String {
        self.default.type_label()
    }

    pub fn is_default(&self) -> bool {
        self.value == self.default
    }
}

/// Ordered collection of parameters owned by one virtualizer instance.
///
/// Iteration follows registration order so UIs list parameters the way the owner
/// declared them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    params: IndexMap<String, Parameter>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parameter, rejecting a name that is already taken.
    pub fn try_insert(&mut self, parameter: Parameter) -> Result<(), ParameterError> {
        if self.params.contains_key(&parameter.name) {
            return Err(ParameterError::Duplicate {
                name: parameter.name,
            });
        }
        self.params.insert(parameter.name.clone(), parameter);
        Ok(())
    }

    /// Builder form of [`try_insert`](Self::try_insert) for constructors.
    ///
    /// # Panics
    /// Panics if `parameter.name` is already registered; a constructor declaring the
    /// same name twice is a programming error.
    pub fn with(mut self, parameter: Parameter) -> Self {
        if let Err(err) = self.try_insert(parameter) {
            panic!("{err}");
        }
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.values()
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.params.get(name)
    }

    fn slot(&self, name: &str) -> Result<&Parameter, ParameterError> {
        self.params.get(name).ok_or_else(|| ParameterError::NotFound {
            name: name.to_string(),
        })
    }

    /// Read a parameter as `T`. The stored type must be exactly `T`.
    pub fn get<T: ParamType>(&self, name: &str) -> Result<T, ParameterError> {
        let slot = self.slot(name)?;
        T::from_param(&slot.value).ok_or_else(|| ParameterError::TypeMismatch {
            name: name.to_string(),
            expected: T::type_label(),
            actual: slot.type_label(),
        })
    }

    /// Typed write; the slot keeps its registered type.
    pub fn set<T: ParamType>(&mut self, name: &str, value: T) -> Result<(), ParameterError> {
        self.set_value(name, value.into_param())
    }

    /// Untyped write used by UIs and JSON overrides.
    pub fn set_value(&mut self, name: &str, value: ParamValue) -> Result<(), ParameterError> {
        let slot = self
            .params
            .get_mut(name)
            .ok_or_else(|| ParameterError::NotFound {
                name: name.to_string(),
            })?;
        let expected = slot.type_label();
        let actual = value.type_label();
        if expected != actual {
            return Err(ParameterError::TypeMismatch {
                name: name.to_string(),
                expected,
                actual,
            });
        }
        if let (ParamValue::Choice(choice), Some(choices)) = (&value, &slot.choices) {
            if !choices.iter().any(|c| c == &choice.variant) {
                return Err(ParameterError::UnknownChoice {
                    name: name.to_string(),
                    variant: choice.variant.clone(),
                });
            }
        }
        slot.value = value;
        Ok(())
    }

    pub fn reset(&mut self, name: &str) -> Result<(), ParameterError> {
        let slot = self
            .params
            .get_mut(name)
            .ok_or_else(|| ParameterError::NotFound {
                name: name.to_string(),
            })?;
        slot.value = slot.default.clone();
        Ok(())
    }

    pub fn reset_all(&mut self) {
        for slot in self.params.values_mut() {
            slot.value = slot.default.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Mode {
        Fast,
        Slow,
    }
    crate::impl_choice_param!(Mode { Fast, Slow });

    fn sample() -> ParameterSet {
        ParameterSet::new()
            .with(Parameter::new("Rate", 60i32).doc("samples per second"))
            .with(Parameter::new("Gain", 0.5f32))
            .with(Parameter::new("Mode", Mode::Fast))
    }

    #[test]
    fn typed_reads() {
        let params = sample();
        assert_eq!(params.get::<i32>("Rate").unwrap(), 60);
        assert_eq!(params.get::<f32>("Gain").unwrap(), 0.5);
        assert_eq!(params.get::<Mode>("Mode").unwrap(), Mode::Fast);
    }

    #[test]
    fn numeric_kinds_do_not_coerce() {
        let params = sample();
        let err = params.get::<f32>("Rate").unwrap_err();
        assert_eq!(
            err,
            ParameterError::TypeMismatch {
                name: "Rate".into(),
                expected: "float".into(),
                actual: "int".into(),
            }
        );
    }

    #[test]
    fn missing_name_is_not_found() {
        let params = sample();
        assert!(matches!(
            params.get::<i32>("Nope"),
            Err(ParameterError::NotFound { .. })
        ));
    }

    #[test]
    fn duplicate_is_rejected() {
        let mut params = sample();
        let err = params.try_insert(Parameter::new("Rate", 30i32)).unwrap_err();
        assert_eq!(err, ParameterError::Duplicate { name: "Rate".into() });
        assert_eq!(params.get::<i32>("Rate").unwrap(), 60);
    }

    #[test]
    #[should_panic(expected = "registered twice")]
    fn duplicate_in_builder_panics() {
        let _ = ParameterSet::new()
            .with(Parameter::new("Rate", 60i32))
            .with(Parameter::new("Rate", 30i32));
    }

    #[test]
    fn set_keeps_type_and_reset_restores_default() {
        let mut params = sample();
        params.set("Rate", 120i32).unwrap();
        assert_eq!(params.get::<i32>("Rate").unwrap(), 120);
        assert!(params.set("Rate", true).is_err());
        params.reset("Rate").unwrap();
        assert!(params.parameter("Rate").unwrap().is_default());
    }

    #[test]
    fn choice_values_are_validated() {
        let mut params = sample();
        params.set("Mode", Mode::Slow).unwrap();
        assert_eq!(params.get::<Mode>("Mode").unwrap(), Mode::Slow);
        let err = params
            .set_value("Mode", ParamValue::choice("Mode", "Medium"))
            .unwrap_err();
        assert!(matches!(err, ParameterError::UnknownChoice { .. }));
        assert_eq!(
            params.parameter("Mode").unwrap().choices.as_deref(),
            Some(&["Fast".to_string(), "Slow".to_string()][..])
        );
    }

    #[test]
    fn iteration_follows_registration_order() {
        let params = sample();
        let names: Vec<&str> = params.names().collect();
        assert_eq!(names, vec!["Rate", "Gain", "Mode"]);
    }
}
