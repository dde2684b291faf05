//! Trajectory estimator adapter.
//!
//! Marshals dense ground-truth samples into the estimator's input record and turns its
//! result back into typed key sequences.
//!
//! Axis conventions at the boundary:
//! - Positions cross in estimator order `x, z, y` (the estimator's up axis is our `y`).
//! - Input rotations are component bundles `w, x, y, z`; result rotations are per-sample
//!   `[w, x, y, z]`. Inside the crate quaternions are `[x, y, z, w]`.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use trackvirt_animation_core::{sample_quat, sample_vec3, Keyframe, QuatKey, VectorKey};
use trackvirt_api_core::blend::{normalize_quat, IDENTITY_QUAT, ZERO_VEC3};

use crate::drift::GroundTruthSample;
use crate::error::ReconstructionError;

/// Settings forwarded to the estimator verbatim.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimatorConfig {
    /// Internal update frequency in Hz.
    pub update_rate: i32,
    pub sensor_model: i32,
    pub orientation_filter: i32,
    pub calibrate: bool,
}

/// Input record handed to an [`EstimatorBackend`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EstimatorInput {
    /// Seconds per internal estimator step.
    pub sampling_period: f64,
    pub timestamps: Vec<f64>,
    /// Component sequences in estimator axis order: x, z, y.
    pub positions: [Vec<f64>; 3],
    /// Component sequences w, x, y, z.
    pub rotations: [Vec<f64>; 4],
    pub sensor_model: i32,
    pub orientation_filter: i32,
    pub calibrate: bool,
}

impl EstimatorInput {
    pub fn new(samples: &[GroundTruthSample], config: &EstimatorConfig) -> Self {
        let n = samples.len();
        let mut timestamps = Vec::with_capacity(n);
        let mut positions: [Vec<f64>; 3] = Default::default();
        let mut rotations: [Vec<f64>; 4] = Default::default();
        for bundle in positions.iter_mut() {
            bundle.reserve(n);
        }
        for bundle in rotations.iter_mut() {
            bundle.reserve(n);
        }

        for s in samples {
            timestamps.push(s.time as f64);
            let [px, py, pz] = s.position;
            positions[0].push(px as f64);
            positions[1].push(pz as f64);
            positions[2].push(py as f64);
            let [qx, qy, qz, qw] = s.rotation;
            rotations[0].push(qw as f64);
            rotations[1].push(qx as f64);
            rotations[2].push(qy as f64);
            rotations[3].push(qz as f64);
        }

        Self {
            sampling_period: 1.0 / config.update_rate as f64,
            timestamps,
            positions,
            rotations,
            sensor_model: config.sensor_model,
            orientation_filter: config.orientation_filter,
            calibrate: config.calibrate,
        }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// Narrow seam around the external estimator.
///
/// `activate`/`deactivate` bracket the backend's process-wide lifetime and are driven by
/// [`EstimatorRuntime`](crate::runtime::EstimatorRuntime); `invoke` runs one estimation.
pub trait EstimatorBackend: Send + Sync {
    fn name(&self) -> &str {
        "estimator"
    }

    fn activate(&self) -> Result<(), ReconstructionError> {
        Ok(())
    }

    fn deactivate(&self) {}

    /// Run the estimator. The raw result is validated by [`parse_estimator_output`].
    fn invoke(&self, input: &EstimatorInput) -> Result<JsonValue, ReconstructionError>;
}

/// Slack allowed past the clip end for estimator timestamps, in seconds.
pub const SPAN_TOLERANCE: f32 = 1e-3;

/// Estimator output as key sequences sharing one strictly increasing time base.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EstimatedTrajectory {
    pub positions: Vec<VectorKey>,
    pub rotations: Vec<QuatKey>,
}

impl EstimatedTrajectory {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn first_time(&self) -> Option<f32> {
        self.positions.first().map(|k| k.time)
    }

    pub fn last_time(&self) -> Option<f32> {
        self.positions.last().map(|k| k.time)
    }

    /// True when some sample lies at or before `t` and some sample at or after it.
    pub fn covers(&self, t: f32) -> bool {
        match (self.first_time(), self.last_time()) {
            (Some(first), Some(last)) => first <= t && t <= last,
            _ => false,
        }
    }

    /// Reject estimates that reach outside `[0, length]`.
    pub fn check_span(&self, length: f32) -> Result<(), ReconstructionError> {
        let (first, last) = match (self.first_time(), self.last_time()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(ReconstructionError::malformed("estimator returned no samples")),
        };
        if first < -SPAN_TOLERANCE || last > length + SPAN_TOLERANCE {
            return Err(ReconstructionError::malformed(format!(
                "estimated span [{first}, {last}] lies outside the clip [0, {length}]"
            )));
        }
        Ok(())
    }

    pub fn position_at(&self, t: f32) -> [f32; 3] {
        sample_vec3(&self.positions, t).unwrap_or(ZERO_VEC3)
    }

    pub fn rotation_at(&self, t: f32) -> [f32; 4] {
        sample_quat(&self.rotations, t).unwrap_or(IDENTITY_QUAT)
    }
}

fn field<'a>(result: &'a JsonValue, key: &str) -> Result<&'a JsonValue, ReconstructionError> {
    result
        .get(key)
        .ok_or_else(|| ReconstructionError::malformed(format!("missing field '{key}'")))
}

fn as_list<'a>(value: &'a JsonValue, what: &str) -> Result<&'a [JsonValue], ReconstructionError> {
    value
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| ReconstructionError::malformed(format!("{what} is not a list")))
}

fn as_number(value: &JsonValue, what: &str) -> Result<f32, ReconstructionError> {
    let n = value
        .as_f64()
        .ok_or_else(|| ReconstructionError::malformed(format!("{what} is not a number")))?;
    let n = n as f32;
    if n.is_finite() {
        Ok(n)
    } else {
        Err(ReconstructionError::malformed(format!("{what} is not finite")))
    }
}

fn as_components<const N: usize>(
    value: &JsonValue,
    what: &str,
) -> Result<[f32; N], ReconstructionError> {
    let list = as_list(value, what)?;
    if list.len() != N {
        return Err(ReconstructionError::malformed(format!(
            "{what} has {} components, expected {N}",
            list.len()
        )));
    }
    let mut out = [0.0; N];
    for (slot, v) in out.iter_mut().zip(list) {
        *slot = as_number(v, what)?;
    }
    Ok(out)
}

/// Validate a raw estimator result.
///
/// Accepts `[timestamps, rotations, positions]` or an object with those three keys.
/// Samples whose timestamp does not strictly increase over the last accepted one are
/// dropped; an empty result is malformed.
pub fn parse_estimator_output(
    result: &JsonValue,
) -> Result<EstimatedTrajectory, ReconstructionError> {
    let (timestamps, rotations, positions) = match result {
        JsonValue::Null => {
            return Err(ReconstructionError::EstimatorCallFailed {
                reason: "estimator returned no result".to_string(),
            })
        }
        JsonValue::Array(parts) => match parts.as_slice() {
            [t, r, p] => (t, r, p),
            other => {
                return Err(ReconstructionError::malformed(format!(
                    "expected 3 result values, got {}",
                    other.len()
                )))
            }
        },
        JsonValue::Object(_) => (
            field(result, "timestamps")?,
            field(result, "rotations")?,
            field(result, "positions")?,
        ),
        _ => {
            return Err(ReconstructionError::malformed(
                "result is neither a list nor an object",
            ))
        }
    };

    let timestamps = as_list(timestamps, "timestamps")?;
    let rotations = as_list(rotations, "rotations")?;
    let positions = as_list(positions, "positions")?;

    if timestamps.is_empty() {
        return Err(ReconstructionError::malformed("estimator returned no samples"));
    }
    if rotations.len() != timestamps.len() || positions.len() != timestamps.len() {
        return Err(ReconstructionError::malformed(format!(
            "{} timestamps but {} rotations and {} positions",
            timestamps.len(),
            rotations.len(),
            positions.len()
        )));
    }

    let mut trajectory = EstimatedTrajectory {
        positions: Vec::with_capacity(timestamps.len()),
        rotations: Vec::with_capacity(timestamps.len()),
    };
    let mut dropped = 0usize;

    for ((t, r), p) in timestamps.iter().zip(rotations).zip(positions) {
        let time = as_number(t, "timestamp")?;
        let [w, x, y, z] = as_components::<4>(r, "rotation")?;
        let [px, pz, py] = as_components::<3>(p, "position")?;

        if trajectory.last_time().is_some_and(|last| time <= last) {
            dropped += 1;
            continue;
        }
        trajectory.positions.push(Keyframe::new(time, [px, py, pz]));
        trajectory
            .rotations
            .push(Keyframe::new(time, normalize_quat([x, y, z, w])));
    }

    if dropped > 0 {
        warn!(
            "estimator output: dropped {dropped} of {} samples with non-increasing timestamps",
            timestamps.len()
        );
    }
    debug!("estimator output: {} samples accepted", trajectory.len());
    Ok(trajectory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample(time: f32) -> GroundTruthSample {
        GroundTruthSample {
            time,
            position: [1.0, 2.0, 3.0],
            rotation: [0.0, 0.0, 0.0, 1.0],
        }
    }

    #[test]
    fn input_permutes_axes() {
        let config = EstimatorConfig {
            update_rate: 100,
            sensor_model: 1,
            orientation_filter: 3,
            calibrate: true,
        };
        let input = EstimatorInput::new(&[sample(0.0), sample(0.5)], &config);
        assert_eq!(input.len(), 2);
        assert!((input.sampling_period - 0.01).abs() < 1e-12);
        assert_eq!(input.positions[0], vec![1.0, 1.0]);
        assert_eq!(input.positions[1], vec![3.0, 3.0]);
        assert_eq!(input.positions[2], vec![2.0, 2.0]);
        assert_eq!(input.rotations[0], vec![1.0, 1.0]);
        assert_eq!(input.timestamps, vec![0.0, 0.5]);
        assert_eq!((input.sensor_model, input.orientation_filter), (1, 3));
    }

    #[test]
    fn parses_tuple_and_object_forms() {
        let tuple = json!([[0.0, 1.0], [[1, 0, 0, 0], [1, 0, 0, 0]], [[1, 3, 2], [4, 6, 5]]]);
        let object = json!({
            "timestamps": [0.0, 1.0],
            "rotations": [[1, 0, 0, 0], [1, 0, 0, 0]],
            "positions": [[1, 3, 2], [4, 6, 5]],
        });
        let a = parse_estimator_output(&tuple).unwrap();
        let b = parse_estimator_output(&object).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.positions[0].value, [1.0, 2.0, 3.0]);
        assert_eq!(a.positions[1].value, [4.0, 5.0, 6.0]);
        assert_eq!(a.rotations[0].value, IDENTITY_QUAT);
        assert!(a.covers(0.5));
        assert!(!a.covers(1.5));
    }

    #[test]
    fn rotation_components_reorder_to_xyzw() {
        let result = json!([[0.0], [[0.0, 0.0, 1.0, 0.0]], [[0, 0, 0]]]);
        let t = parse_estimator_output(&result).unwrap();
        assert_eq!(t.rotations[0].value, [0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn empty_result_is_malformed() {
        let err = parse_estimator_output(&json!([[], [], []])).unwrap_err();
        assert!(matches!(err, ReconstructionError::MalformedEstimatorResult { .. }));
    }

    #[test]
    fn null_result_is_call_failure() {
        let err = parse_estimator_output(&JsonValue::Null).unwrap_err();
        assert!(matches!(err, ReconstructionError::EstimatorCallFailed { .. }));
    }

    #[test]
    fn wrong_arity_and_missing_fields_are_malformed() {
        for bad in [
            json!([[0.0], [[1, 0, 0, 0]]]),
            json!({"timestamps": [0.0], "positions": [[0, 0, 0]]}),
            json!([[0.0], [[1, 0, 0]], [[0, 0, 0]]]),
            json!([[0.0, 1.0], [[1, 0, 0, 0]], [[0, 0, 0]]]),
            json!([["a"], [[1, 0, 0, 0]], [[0, 0, 0]]]),
            json!([[1e300], [[1, 0, 0, 0]], [[0, 0, 0]]]),
            json!(42),
        ] {
            let err = parse_estimator_output(&bad).unwrap_err();
            assert!(
                matches!(err, ReconstructionError::MalformedEstimatorResult { .. }),
                "{bad} -> {err:?}"
            );
        }
    }

    #[test]
    fn span_outside_clip_is_malformed() {
        let at = |times: &[f32]| EstimatedTrajectory {
            positions: times.iter().map(|&t| Keyframe::new(t, ZERO_VEC3)).collect(),
            rotations: times.iter().map(|&t| Keyframe::new(t, IDENTITY_QUAT)).collect(),
        };
        assert!(at(&[0.0, 1.0]).check_span(1.0).is_ok());
        assert!(at(&[0.0, 1.0005]).check_span(1.0).is_ok());
        for bad in [at(&[0.0, 1000.0]), at(&[-50.0, -40.0]), at(&[-0.5, 0.5]), at(&[])] {
            assert!(matches!(
                bad.check_span(1.0),
                Err(ReconstructionError::MalformedEstimatorResult { .. })
            ));
        }
    }

    #[test]
    fn non_increasing_timestamps_are_dropped() {
        let result = json!([
            [0.0, 0.5, 0.5, 0.25, 1.0],
            [[1, 0, 0, 0], [1, 0, 0, 0], [1, 0, 0, 0], [1, 0, 0, 0], [1, 0, 0, 0]],
            [[0, 0, 0], [1, 0, 0], [9, 0, 0], [9, 0, 0], [2, 0, 0]]
        ]);
        let t = parse_estimator_output(&result).unwrap();
        let times: Vec<f32> = t.positions.iter().map(|k| k.time).collect();
        assert_eq!(times, vec![0.0, 0.5, 1.0]);
        assert_eq!(t.position_at(0.75), [1.5, 0.0, 0.0]);
    }
}
