//! Concrete virtualizers.

pub mod imu;
pub mod noise;
pub mod perfect;

pub use imu::{ImuSimTrackingVirtualizer, OrientationFilter, SensorModel};
pub use noise::NoiseTrackingVirtualizer;
pub use perfect::PerfectTrackingVirtualizer;

use trackvirt_api_core::ParameterSet;

use crate::error::ReconstructionError;

/// Read an integer rate parameter that must be strictly positive.
pub(crate) fn positive_rate(params: &ParameterSet, name: &str) -> Result<i32, ReconstructionError> {
    let rate: i32 = params.get(name)?;
    if rate > 0 {
        Ok(rate)
    } else {
        Err(ReconstructionError::invalid_parameter(
            name,
            format!("must be positive, got {rate}"),
        ))
    }
}
