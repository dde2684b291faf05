//! Ground truth with seeded random jitter.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::PI;
use trackvirt_animation_core::{AnimationCurve, Keyframe};
use trackvirt_api_core::blend::{
    add_vec3, normalize_quat, normalize_vec3, quat_from_euler, quat_mul, scale_vec3, ONE_VEC3,
};
use trackvirt_api_core::{Parameter, ParameterSet};

use super::positive_rate;
use crate::drift::check_animation_length;
use crate::error::ReconstructionError;
use crate::tracker::TrackerHandle;
use crate::virtualizer::{base_parameters, Virtualizer, NAME_PARAM};

pub const NOISE_STRENGTH: &str = "NoiseStrength";
pub const RANDOM_SEED: &str = "RandomSeed";
pub const SAMPLE_RATE: &str = "SampleRate";

#[derive(Clone, Debug)]
pub struct NoiseTrackingVirtualizer {
    params: ParameterSet,
}

impl NoiseTrackingVirtualizer {
    pub const TYPE_NAME: &'static str = "NoiseTrackingVirtualizer";

    pub fn new() -> Self {
        Self {
            params: base_parameters()
                .with(
                    Parameter::new(NOISE_STRENGTH, 0.0f32)
                        .doc("Position jitter in units; rotation jitter as a fraction of pi."),
                )
                .with(Parameter::new(RANDOM_SEED, 0i32))
                .with(Parameter::new(SAMPLE_RATE, 30i32).doc("Output samples per second.")),
        }
    }

    pub fn boxed() -> Box<dyn Virtualizer> {
        Box::new(Self::new())
    }
}

impl Default for NoiseTrackingVirtualizer {
    fn default() -> Self {
        Self::new()
    }
}

fn random_vec3(rng: &mut StdRng) -> [f32; 3] {
    [
        rng.random_range(-1.0..1.0),
        rng.random_range(-1.0..1.0),
        rng.random_range(-1.0..1.0),
    ]
}

impl Virtualizer for NoiseTrackingVirtualizer {
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
        let strength: f32 = self.params.get(NOISE_STRENGTH)?;
        let seed: i32 = self.params.get(RANDOM_SEED)?;
        let name: String = self.params.get(NAME_PARAM)?;

        // Same seed, same jitter, on every call.
        let mut rng = StdRng::seed_from_u64(seed as u32 as u64);

        let frames = length * rate as f32;
        let mut curve = AnimationCurve::new(name);
        for i in 0..=frames.floor() as usize {
            let position_jitter = scale_vec3(normalize_vec3(random_vec3(&mut rng)), strength);
            let rotation_jitter = quat_from_euler(scale_vec3(random_vec3(&mut rng), strength * PI));

            let u = (i as f32 / frames).min(1.0);
            let time = u * length;
            if curve.positions.last().is_some_and(|k| k.time >= time) {
                continue;
            }
            curve.positions.push(Keyframe::new(
                time,
                add_vec3(tracker.position(u), position_jitter),
            ));
            curve.rotations.push(Keyframe::new(
                time,
                normalize_quat(quat_mul(tracker.rotation(u), rotation_jitter)),
            ));
        }
        curve.scalings.push(Keyframe::new(0.0, ONE_VEC3));
        curve.scalings.push(Keyframe::new(length, ONE_VEC3));
        Ok(curve)
    }
}
