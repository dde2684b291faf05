//! Ground truth passed through unchanged.

use trackvirt_animation_core::{AnimationCurve, Keyframe};
use trackvirt_api_core::blend::ONE_VEC3;
use trackvirt_api_core::{Parameter, ParameterSet};

use super::positive_rate;
use crate::drift::check_animation_length;
use crate::error::ReconstructionError;
use crate::tracker::TrackerHandle;
use crate::virtualizer::{base_parameters, Virtualizer, NAME_PARAM};

pub const SAMPLE_RATE: &str = "SampleRate";

#[derive(Clone, Debug)]
pub struct PerfectTrackingVirtualizer {
    params: ParameterSet,
}

impl PerfectTrackingVirtualizer {
    pub const TYPE_NAME: &'static str = "PerfectTrackingVirtualizer";

    pub fn new() -> Self {
        Self {
            params: base_parameters()
                .with(Parameter::new(SAMPLE_RATE, 60i32).doc("Output samples per second.")),
        }
    }

    pub fn boxed() -> Box<dyn Virtualizer> {
        Box::new(Self::new())
    }
}

impl Default for PerfectTrackingVirtualizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Virtualizer for PerfectTrackingVirtualizer {
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
        let length = tracker.animation_length();
        check_animation_length(length)?;
        let rate = positive_rate(&self.params, SAMPLE_RATE)?;
        let name: String = self.params.get(NAME_PARAM)?;

        // Includes the closing sample at u = 1.
        let frames = length * rate as f32;
        let last = frames.ceil() as usize;
        let mut curve = AnimationCurve::new(name);
        for i in 0..=last {
            let u = (i as f32 / frames).min(1.0);
            let time = u * length;
            if curve.positions.last().is_some_and(|k| k.time >= time) {
                continue;
            }
            curve
                .positions
                .push(Keyframe::new(time, tracker.position(u)));
            curve
                .rotations
                .push(Keyframe::new(time, tracker.rotation(u)));
        }
        curve.scalings.push(Keyframe::new(0.0, ONE_VEC3));
        curve.scalings.push(Keyframe::new(length, ONE_VEC3));
        Ok(curve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::CurveTracker;

    fn line(length: f32) -> CurveTracker {
        let mut curve = AnimationCurve::new("line");
        curve.push_position(0.0, [0.0, 0.0, 0.0]).unwrap();
        curve.push_position(length, [length, 0.0, 0.0]).unwrap();
        CurveTracker::new(curve)
    }

    #[test]
    fn samples_include_both_ends() {
        let mut v = PerfectTrackingVirtualizer::new();
        v.params.set(SAMPLE_RATE, 4i32).unwrap();
        let curve = v.create_output_animation(&line(1.0)).unwrap();
        let times: Vec<f32> = curve.positions.iter().map(|k| k.time).collect();
        assert_eq!(times, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(curve.positions[4].value, [1.0, 0.0, 0.0]);
        assert_eq!(curve.name, "unnamed");
    }

    #[test]
    fn fractional_frame_count_clamps_last_sample() {
        let mut v = PerfectTrackingVirtualizer::new();
        v.params.set(SAMPLE_RATE, 3i32).unwrap();
        let curve = v.create_output_animation(&line(1.5)).unwrap();
        // 4.5 frames: i = 0..=5, the last clamped to u = 1.
        assert_eq!(curve.positions.len(), 6);
        assert_eq!(curve.positions.last().unwrap().time, 1.5);
        assert!(curve.validate().is_ok());
    }

    #[test]
    fn non_positive_rate_is_invalid() {
        let mut v = PerfectTrackingVirtualizer::new();
        v.params.set(SAMPLE_RATE, 0i32).unwrap();
        assert!(matches!(
            v.create_output_animation(&line(1.0)),
            Err(ReconstructionError::InvalidParameter { .. })
        ));
    }
}
