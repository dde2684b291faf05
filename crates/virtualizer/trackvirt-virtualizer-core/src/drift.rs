//! Drift-correction resampling.
//!
//! The estimator's dense output drifts; sparse checkpoints measure how far it is from
//! ground truth, and each output sample is the estimate corrected by the offset of the
//! checkpoint interval it falls in. Output times the estimator did not cover fall back
//! to ground truth.

use log::debug;
use trackvirt_animation_core::{AnimationCurve, Keyframe};
use trackvirt_api_core::blend::{
    add_vec3, canonical_quat, normalize_quat, quat_inverse, quat_mul, sub_vec3, ONE_VEC3,
};

use crate::error::ReconstructionError;
use crate::estimator::EstimatedTrajectory;
use crate::tracker::TrackerHandle;

/// The estimator's numerical method is undefined below this many input samples.
pub const MIN_GROUND_TRUTH_SAMPLES: usize = 5;

/// One dense ground-truth sample, rotation renormalized.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroundTruthSample {
    pub time: f32,
    pub position: [f32; 3],
    pub rotation: [f32; 4],
}

/// Ground truth minus estimate at one checkpoint time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Checkpoint {
    pub time: f32,
    pub position_offset: [f32; 3],
    /// Shortest-arc rotation taking the estimate to ground truth.
    pub rotation_offset: [f32; 4],
}

/// `floor(rate * length)`, zero for non-positive products.
pub fn sample_count(rate: i32, length: f32) -> usize {
    let n = (rate as f64 * length as f64).floor();
    if n > 0.0 {
        n as usize
    } else {
        0
    }
}

pub fn check_animation_length(length: f32) -> Result<(), ReconstructionError> {
    if length > 0.0 && length.is_finite() {
        Ok(())
    } else {
        Err(ReconstructionError::InvalidAnimationLength { length })
    }
}

fn ground_truth_at(tracker: &dyn TrackerHandle, u: f32) -> ([f32; 3], [f32; 4]) {
    (tracker.position(u), normalize_quat(tracker.rotation(u)))
}

/// Sample the tracker uniformly over `[0, length)` at `rate` samples per second.
pub fn sample_ground_truth(
    tracker: &dyn TrackerHandle,
    rate: i32,
) -> Result<Vec<GroundTruthSample>, ReconstructionError> {
    let length = tracker.animation_length();
    check_animation_length(length)?;

    let count = sample_count(rate, length);
    if count < MIN_GROUND_TRUTH_SAMPLES {
        return Err(ReconstructionError::InsufficientSamples {
            samples: count,
            minimum: MIN_GROUND_TRUTH_SAMPLES,
        });
    }

    let samples: Vec<GroundTruthSample> = (0..count)
        .map(|i| {
            let u = i as f32 / count as f32;
            let (position, rotation) = ground_truth_at(tracker, u);
            GroundTruthSample {
                time: u * length,
                position,
                rotation,
            }
        })
        .collect();
    debug!("ground truth: {} samples over {length}s", samples.len());
    Ok(samples)
}

/// Checkpoints from the first estimated time, every `1 / rate` seconds, while before the
/// last estimated time. A single-instant estimate still gets one checkpoint; an estimate
/// reaching outside the clip is malformed.
pub fn compute_checkpoints(
    tracker: &dyn TrackerHandle,
    estimate: &EstimatedTrajectory,
    rate: i32,
) -> Result<Vec<Checkpoint>, ReconstructionError> {
    let length = tracker.animation_length();
    check_animation_length(length)?;
    if rate <= 0 {
        return Err(ReconstructionError::invalid_parameter(
            "Checkpoint Rate",
            format!("must be positive, got {rate}"),
        ));
    }
    let (first, last) = match (estimate.first_time(), estimate.last_time()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(ReconstructionError::malformed("estimator returned no samples")),
    };
    estimate.check_span(length)?;

    let step = 1.0 / rate as f64;
    let mut checkpoints = Vec::new();
    for i in 0usize.. {
        let time = (first as f64 + i as f64 * step) as f32;
        if i > 0 && time >= last {
            break;
        }
        let (gt_position, gt_rotation) = ground_truth_at(tracker, time / length);
        let est_position = estimate.position_at(time);
        let est_rotation = estimate.rotation_at(time);
        checkpoints.push(Checkpoint {
            time,
            position_offset: sub_vec3(gt_position, est_position),
            rotation_offset: canonical_quat(normalize_quat(quat_mul(
                gt_rotation,
                quat_inverse(est_rotation),
            ))),
        });
    }
    debug!("drift: {} checkpoints over [{first}, {last}]", checkpoints.len());
    Ok(checkpoints)
}

/// Checkpoint whose interval contains `time`: the last one at or before it, the first one
/// for earlier times.
pub fn checkpoint_for(checkpoints: &[Checkpoint], time: f32) -> Option<&Checkpoint> {
    let idx = checkpoints
        .partition_point(|c| c.time <= time)
        .saturating_sub(1);
    checkpoints.get(idx)
}

/// Build the output curve at `rate` samples per second over `[0, length)`.
pub fn resample(
    tracker: &dyn TrackerHandle,
    estimate: &EstimatedTrajectory,
    checkpoints: &[Checkpoint],
    rate: i32,
    name: &str,
) -> Result<AnimationCurve, ReconstructionError> {
    let length = tracker.animation_length();
    check_animation_length(length)?;
    if rate <= 0 {
        return Err(ReconstructionError::invalid_parameter(
            "Output Sampling Rate",
            format!("must be positive, got {rate}"),
        ));
    }

    let count = sample_count(rate, length);
    let mut curve = AnimationCurve::new(name);
    curve.positions.reserve(count);
    curve.rotations.reserve(count);
    let mut corrected = 0usize;

    for i in 0..count {
        let u = i as f32 / count as f32;
        let time = u * length;

        let (position, rotation) = match checkpoint_for(checkpoints, time) {
            Some(checkpoint) if estimate.covers(time) => {
                corrected += 1;
                (
                    add_vec3(estimate.position_at(time), checkpoint.position_offset),
                    normalize_quat(quat_mul(
                        estimate.rotation_at(time),
                        checkpoint.rotation_offset,
                    )),
                )
            }
            _ => ground_truth_at(tracker, u),
        };
        curve.positions.push(Keyframe::new(time, position));
        curve.rotations.push(Keyframe::new(time, rotation));
    }

    curve.scalings.push(Keyframe::new(0.0, ONE_VEC3));
    curve.scalings.push(Keyframe::new(length, ONE_VEC3));

    debug!(
        "resample: {count} output samples, {corrected} corrected, {} from ground truth",
        count - corrected
    );
    Ok(curve)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use trackvirt_api_core::blend::IDENTITY_QUAT;

    struct Slide {
        length: f32,
    }

    impl TrackerHandle for Slide {
        fn animation_length(&self) -> f32 {
            self.length
        }
        fn position(&self, u: f32) -> [f32; 3] {
            [u * self.length, 1.0, 0.0]
        }
        fn rotation(&self, _u: f32) -> [f32; 4] {
            // Deliberately unnormalized.
            [0.0, 0.0, 0.0, 2.0]
        }
    }

    fn echo(samples: &[GroundTruthSample], dx: f32) -> EstimatedTrajectory {
        EstimatedTrajectory {
            positions: samples
                .iter()
                .map(|s| Keyframe::new(s.time, add_vec3(s.position, [dx, 0.0, 0.0])))
                .collect(),
            rotations: samples
                .iter()
                .map(|s| Keyframe::new(s.time, s.rotation))
                .collect(),
        }
    }

    #[test]
    fn too_few_samples_rejected() {
        let tracker = Slide { length: 0.5 };
        let err = sample_ground_truth(&tracker, 8).unwrap_err();
        assert_eq!(
            err,
            ReconstructionError::InsufficientSamples {
                samples: 4,
                minimum: 5
            }
        );
        assert!(sample_ground_truth(&tracker, 10).is_ok());
    }

    #[test]
    fn zero_length_rejected() {
        let tracker = Slide { length: 0.0 };
        assert!(matches!(
            sample_ground_truth(&tracker, 60),
            Err(ReconstructionError::InvalidAnimationLength { .. })
        ));
    }

    #[test]
    fn ground_truth_is_uniform_and_normalized() {
        let tracker = Slide { length: 2.0 };
        let samples = sample_ground_truth(&tracker, 5).unwrap();
        assert_eq!(samples.len(), 10);
        assert_eq!(samples[0].time, 0.0);
        assert_relative_eq!(samples[9].time, 1.8, epsilon = 1e-6);
        assert!(samples.iter().all(|s| s.rotation == IDENTITY_QUAT));
    }

    #[test]
    fn checkpoints_step_until_last_estimate() {
        let tracker = Slide { length: 1.0 };
        let samples = sample_ground_truth(&tracker, 10).unwrap();
        let checkpoints = compute_checkpoints(&tracker, &echo(&samples, 0.0), 4).unwrap();
        let times: Vec<f32> = checkpoints.iter().map(|c| c.time).collect();
        assert_eq!(times, vec![0.0, 0.25, 0.5, 0.75]);
    }

    #[test]
    fn single_instant_estimate_gets_one_checkpoint() {
        let tracker = Slide { length: 1.0 };
        let estimate = EstimatedTrajectory {
            positions: vec![Keyframe::new(0.5, [0.5, 1.0, 0.0])],
            rotations: vec![Keyframe::new(0.5, IDENTITY_QUAT)],
        };
        let checkpoints = compute_checkpoints(&tracker, &estimate, 10).unwrap();
        assert_eq!(checkpoints.len(), 1);
        assert_eq!(checkpoints[0].time, 0.5);
    }

    #[test]
    fn perfect_estimate_gives_identity_offsets() {
        let tracker = Slide { length: 2.0 };
        let samples = sample_ground_truth(&tracker, 30).unwrap();
        let estimate = echo(&samples, 0.0);
        let checkpoints = compute_checkpoints(&tracker, &estimate, 7).unwrap();
        for c in &checkpoints {
            for v in c.position_offset {
                assert_relative_eq!(v, 0.0, epsilon = 1e-5);
            }
            assert_eq!(c.rotation_offset, IDENTITY_QUAT);
        }
    }

    #[test]
    fn checkpoint_lookup_holds_previous_offset() {
        let cp = |time| Checkpoint {
            time,
            position_offset: [time, 0.0, 0.0],
            rotation_offset: IDENTITY_QUAT,
        };
        let checkpoints = [cp(0.0), cp(1.0), cp(2.0)];
        assert_eq!(checkpoint_for(&checkpoints, -0.5).unwrap().time, 0.0);
        assert_eq!(checkpoint_for(&checkpoints, 0.99).unwrap().time, 0.0);
        assert_eq!(checkpoint_for(&checkpoints, 1.0).unwrap().time, 1.0);
        assert_eq!(checkpoint_for(&checkpoints, 7.0).unwrap().time, 2.0);
        assert!(checkpoint_for(&[], 1.0).is_none());
    }

    #[test]
    fn uncovered_times_fall_back_to_ground_truth() {
        let tracker = Slide { length: 1.0 };
        let samples = sample_ground_truth(&tracker, 20).unwrap();
        // Estimate covers [0.25, 0.75] only, with a drift the offsets cannot see.
        let mut estimate = echo(&samples[5..=15], 0.0);
        let checkpoints = compute_checkpoints(&tracker, &estimate, 2).unwrap();
        for key in estimate.positions.iter_mut() {
            key.value[2] += 3.0;
        }

        let curve = resample(&tracker, &estimate, &checkpoints, 20, "out").unwrap();
        assert_eq!(curve.name, "out");
        assert_eq!(curve.positions.len(), 20);
        for key in &curve.positions {
            let expected_z = if (0.25..=0.75).contains(&key.time) { 3.0 } else { 0.0 };
            assert_relative_eq!(key.value[2], expected_z, epsilon = 1e-5);
        }
        assert_eq!(curve.scalings.len(), 2);
        assert_eq!(curve.scalings[1], Keyframe::new(1.0, ONE_VEC3));
        assert!(curve.validate().is_ok());
    }
}
