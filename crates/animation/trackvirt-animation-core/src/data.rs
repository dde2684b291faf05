//! Animation curve data model.
//!
//! Three independent key sequences (position, rotation, scale), each strictly increasing
//! in time. Times are in seconds.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use trackvirt_api_core::blend::{IDENTITY_QUAT, ONE_VEC3, ZERO_VEC3};

use crate::sampling::{sample_quat, sample_vec3};

/// A single timed key.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Keyframe<V> {
    /// Seconds from the start of the clip.
    pub time: f32,
    pub value: V,
}

impl<V> Keyframe<V> {
    pub fn new(time: f32, value: V) -> Self {
        Self { time, value }
    }
}

/// Position or scale key.
pub type VectorKey = Keyframe<[f32; 3]>;

/// Rotation key, quaternion `[x, y, z, w]`.
pub type QuatKey = Keyframe<[f32; 4]>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Position,
    Rotation,
    Scale,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Channel::Position => "position",
            Channel::Rotation => "rotation",
            Channel::Scale => "scale",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CurveError {
    #[error("{channel} key {index} at t={time} does not follow t={previous}")]
    NonMonotonic {
        channel: Channel,
        index: usize,
        time: f32,
        previous: f32,
    },

    #[error("{channel} key {index} is not finite")]
    NonFinite { channel: Channel, index: usize },

    #[error("curve json: {0}")]
    Json(String),
}

impl From<serde_json::Error> for CurveError {
    fn from(err: serde_json::Error) -> Self {
        CurveError::Json(err.to_string())
    }
}

fn check_key<const N: usize>(
    channel: Channel,
    keys: &[Keyframe<[f32; N]>],
    index: usize,
    key: &Keyframe<[f32; N]>,
) -> Result<(), CurveError> {
    if !key.time.is_finite() || key.value.iter().any(|c| !c.is_finite()) {
        return Err(CurveError::NonFinite { channel, index });
    }
    if let Some(prev) = index.checked_sub(1).and_then(|i| keys.get(i)) {
        if key.time <= prev.time {
            return Err(CurveError::NonMonotonic {
                channel,
                index,
                time: key.time,
                previous: prev.time,
            });
        }
    }
    Ok(())
}

fn validate_channel<const N: usize>(
    channel: Channel,
    keys: &[Keyframe<[f32; N]>],
) -> Result<(), CurveError> {
    for (index, key) in keys.iter().enumerate() {
        check_key(channel, keys, index, key)?;
    }
    Ok(())
}

fn push_checked<const N: usize>(
    channel: Channel,
    keys: &mut Vec<Keyframe<[f32; N]>>,
    key: Keyframe<[f32; N]>,
) -> Result<(), CurveError> {
    check_key(channel, keys, keys.len(), &key)?;
    keys.push(key);
    Ok(())
}

/// Time-keyed pose curve.
///
/// Fields are public for bulk construction; `push_*` and [`validate`](Self::validate)
/// enforce the strict ordering invariant.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct AnimationCurve {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub positions: Vec<VectorKey>,
    #[serde(default)]
    pub rotations: Vec<QuatKey>,
    #[serde(default)]
    pub scalings: Vec<VectorKey>,
}

impl AnimationCurve {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn push_position(&mut self, time: f32, value: [f32; 3]) -> Result<(), CurveError> {
        push_checked(Channel::Position, &mut self.positions, Keyframe::new(time, value))
    }

    pub fn push_rotation(&mut self, time: f32, value: [f32; 4]) -> Result<(), CurveError> {
        push_checked(Channel::Rotation, &mut self.rotations, Keyframe::new(time, value))
    }

    pub fn push_scale(&mut self, time: f32, value: [f32; 3]) -> Result<(), CurveError> {
        push_checked(Channel::Scale, &mut self.scalings, Keyframe::new(time, value))
    }

    /// Check every channel for finite values and strictly increasing times.
    pub fn validate(&self) -> Result<(), CurveError> {
        validate_channel(Channel::Position, &self.positions)?;
        validate_channel(Channel::Rotation, &self.rotations)?;
        validate_channel(Channel::Scale, &self.scalings)
    }

    /// Position at `time`; the origin when the channel is empty.
    pub fn position_at(&self, time: f32) -> [f32; 3] {
        sample_vec3(&self.positions, time).unwrap_or(ZERO_VEC3)
    }

    /// Rotation at `time`; identity when the channel is empty.
    pub fn rotation_at(&self, time: f32) -> [f32; 4] {
        sample_quat(&self.rotations, time).unwrap_or(IDENTITY_QUAT)
    }

    /// Scale at `time`; unit scale when the channel is empty.
    pub fn scale_at(&self, time: f32) -> [f32; 3] {
        sample_vec3(&self.scalings, time).unwrap_or(ONE_VEC3)
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() && self.rotations.is_empty() && self.scalings.is_empty()
    }

    /// Last key time across all channels (0 for an empty curve).
    pub fn end_time(&self) -> f32 {
        [
            self.positions.last().map(|k| k.time),
            self.rotations.last().map(|k| k.time),
            self.scalings.last().map(|k| k.time),
        ]
        .into_iter()
        .flatten()
        .fold(0.0, f32::max)
    }

    pub fn from_json_str(json: &str) -> Result<Self, CurveError> {
        let curve: AnimationCurve = serde_json::from_str(json)?;
        curve.validate()?;
        Ok(curve)
    }

    pub fn to_json_string(&self) -> Result<String, CurveError> {
        Ok(serde_json::to_string(self)?)
    }
}
