//! trackvirt-api-core: typed parameter values and blend math (engine-agnostic).

pub mod blend;
pub mod json;
pub mod parameter;
pub mod value;

pub use parameter::{ParamType, Parameter, ParameterError, ParameterSet};
pub use value::{Choice, ParamValue, ValueKind};
