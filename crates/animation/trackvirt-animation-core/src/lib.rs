//! Trackvirt Animation Core
//!
//! Sparse, time-keyed pose curves (position / rotation / scale) and the clamped
//! interpolation used to read them back at arbitrary times.

pub mod data;
pub mod sampling;

pub use data::{AnimationCurve, Channel, CurveError, Keyframe, QuatKey, VectorKey};
pub use sampling::{sample_quat, sample_vec3};
