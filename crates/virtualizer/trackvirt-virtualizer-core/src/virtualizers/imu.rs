//! Simulated inertial tracking with sparse absolute corrections.
//!
//! Ground truth is fed to the external estimator; its drifting output is corrected by
//! checkpoint offsets and resampled at the output rate (see [`crate::drift`]).

use std::sync::Arc;

use log::info;
use trackvirt_animation_core::AnimationCurve;
use trackvirt_api_core::{impl_choice_param, Parameter, ParameterSet};

use super::positive_rate;
use crate::drift::{check_animation_length, compute_checkpoints, resample, sample_ground_truth};
use crate::error::ReconstructionError;
use crate::estimator::{parse_estimator_output, EstimatorConfig, EstimatorInput};
use crate::runtime::{EstimatorRuntime, RuntimeLease};
use crate::tracker::TrackerHandle;
use crate::virtualizer::{base_parameters, Virtualizer, NAME_PARAM};

pub const INPUT_SAMPLING_RATE: &str = "Input Sampling Rate";
pub const CHECKPOINT_RATE: &str = "Checkpoint Rate";
pub const ESTIMATOR_UPDATE_RATE: &str = "Estimator Update Rate";
pub const OUTPUT_SAMPLING_RATE: &str = "Output Sampling Rate";
pub const SENSOR_MODEL: &str = "Sensor Model";
pub const ORIENTATION_FILTER: &str = "Orientation Filter";
pub const CALIBRATE: &str = "Calibrate";

/// Estimator noise and bias model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorModel {
    Ideal = 0,
    Orient3 = 1,
}
impl_choice_param!(SensorModel { Ideal, Orient3 });

/// Estimator-side orientation fusion filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrientationFilter {
    GyroIntegrator = 0,
    OrientCF = 1,
    YunEKF = 2,
    BachmannCF = 3,
}
impl_choice_param!(OrientationFilter {
    GyroIntegrator,
    OrientCF,
    YunEKF,
    BachmannCF
});

/// Holds a lease on its estimator runtime for as long as it lives.
#[derive(Clone, Debug)]
pub struct ImuSimTrackingVirtualizer {
    params: ParameterSet,
    lease: RuntimeLease,
}

impl ImuSimTrackingVirtualizer {
    pub const TYPE_NAME: &'static str = "IMUSimTrackingVirtualizer";

    /// Uses the process-wide child-process estimator.
    pub fn new() -> Self {
        Self::with_runtime(&EstimatorRuntime::process_default())
    }

    pub fn with_runtime(runtime: &Arc<EstimatorRuntime>) -> Self {
        Self {
            params: Self::default_parameters(),
            lease: runtime.acquire(),
        }
    }

    pub fn boxed() -> Box<dyn Virtualizer> {
        Box::new(Self::new())
    }

    pub fn default_parameters() -> ParameterSet {
        base_parameters()
            .with(
                Parameter::new(INPUT_SAMPLING_RATE, 60i32)
                    .doc("Ground-truth samples per second fed to the estimator."),
            )
            .with(
                Parameter::new(CHECKPOINT_RATE, 120i32)
                    .doc("Absolute corrections per second."),
            )
            .with(
                Parameter::new(ESTIMATOR_UPDATE_RATE, 366i32)
                    .doc("Estimator internal update frequency in Hz."),
            )
            .with(
                Parameter::new(OUTPUT_SAMPLING_RATE, 60i32)
                    .doc("Samples per second in the output curve."),
            )
            .with(Parameter::new(SENSOR_MODEL, SensorModel::Ideal))
            .with(Parameter::new(
                ORIENTATION_FILTER,
                OrientationFilter::GyroIntegrator,
            ))
            .with(Parameter::new(CALIBRATE, false).doc("Run the estimator's calibration pass."))
    }

    pub fn runtime(&self) -> &Arc<EstimatorRuntime> {
        self.lease.runtime()
    }

    pub fn estimator_config(&self) -> Result<EstimatorConfig, ReconstructionError> {
        let sensor_model: SensorModel = self.params.get(SENSOR_MODEL)?;
        let orientation_filter: OrientationFilter = self.params.get(ORIENTATION_FILTER)?;
        Ok(EstimatorConfig {
            update_rate: positive_rate(&self.params, ESTIMATOR_UPDATE_RATE)?,
            sensor_model: sensor_model as i32,
            orientation_filter: orientation_filter as i32,
            calibrate: self.params.get(CALIBRATE)?,
        })
    }
}

impl Default for ImuSimTrackingVirtualizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Virtualizer for ImuSimTrackingVirtualizer {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn parameters(&self) -> &ParameterSet {
        &self.params
    }

    fn parameters_mut(&mut self) -> &mut ParameterSet {
        &mut self.params
    }

    fn clone_box(&self) -> Box<dyn Virtualizer> {
        Box::new(self.clone())
    }

    fn create_output_animation(
        &self,
        tracker: &dyn TrackerHandle,
    ) -> Result<AnimationCurve, ReconstructionError> {
        check_animation_length(tracker.animation_length())?;
        let input_rate: i32 = self.params.get(INPUT_SAMPLING_RATE)?;
        let samples = sample_ground_truth(tracker, input_rate)?;

        let checkpoint_rate = positive_rate(&self.params, CHECKPOINT_RATE)?;
        let output_rate = positive_rate(&self.params, OUTPUT_SAMPLING_RATE)?;
        let config = self.estimator_config()?;
        let name: String = self.params.get(NAME_PARAM)?;

        let input = EstimatorInput::new(&samples, &config);
        let raw = self.lease.invoke(&input)?;
        let estimate = parse_estimator_output(&raw)?;
        info!(
            "{}: estimator returned {} of {} samples",
            Self::TYPE_NAME,
            estimate.len(),
            samples.len()
        );

        let checkpoints = compute_checkpoints(tracker, &estimate, checkpoint_rate)?;
        resample(tracker, &estimate, &checkpoints, output_rate, &name)
    }
}
