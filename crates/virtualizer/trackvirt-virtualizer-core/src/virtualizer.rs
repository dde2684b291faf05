//! The virtualizer contract.

use trackvirt_animation_core::AnimationCurve;
use trackvirt_api_core::{ParamType, Parameter, ParameterError, ParameterSet};

use crate::error::ReconstructionError;
use crate::tracker::TrackerHandle;

/// Name of the parameter every virtualizer carries; its value names the output curve.
pub const NAME_PARAM: &str = "Name";

/// A pose-reconstruction strategy.
///
/// Instances own their parameters. `create_output_animation` is a blocking batch call;
/// it either returns a complete curve or fails without one.
pub trait Virtualizer: Send + Sync {
    /// Registry key of the concrete type.
    fn type_name(&self) -> &'static str;

    fn parameters(&self) -> &ParameterSet;

    fn parameters_mut(&mut self) -> &mut ParameterSet;

    /// Independent copy with the same parameter values.
    fn clone_box(&self) -> Box<dyn Virtualizer>;

    fn create_output_animation(
        &self,
        tracker: &dyn TrackerHandle,
    ) -> Result<AnimationCurve, ReconstructionError>;
}

impl Clone for Box<dyn Virtualizer> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

impl std::fmt::Debug for dyn Virtualizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Virtualizer")
            .field("type", &self.type_name())
            .field("parameters", self.parameters())
            .finish()
    }
}

impl dyn Virtualizer {
    pub fn get<T: ParamType>(&self, name: &str) -> Result<T, ParameterError> {
        self.parameters().get(name)
    }

    pub fn set<T: ParamType>(&mut self, name: &str, value: T) -> Result<(), ParameterError> {
        self.parameters_mut().set(name, value)
    }

    /// Apply a JSON object of parameter overrides; see [`trackvirt_api_core::json::apply_json`].
    pub fn configure(&mut self, overrides: &serde_json::Value) -> Result<(), ParameterError> {
        trackvirt_api_core::json::apply_json(self.parameters_mut(), overrides)
    }

    /// Value of the `Name` parameter.
    pub fn name(&self) -> Result<String, ParameterError> {
        self.get::<String>(NAME_PARAM)
    }
}

/// Parameter set with the parameters every virtualizer shares.
pub fn base_parameters() -> ParameterSet {
    ParameterSet::new().with(
        Parameter::new(NAME_PARAM, "unnamed".to_string()).doc("Name given to the output curve."),
    )
}
