//! Key sequence sampling.
//!
//! - Vectors blend linearly; rotations slerp along the shortest arc.
//! - A query at an exact key time returns the stored value unchanged.
//! - Queries before the first key or after the last key clamp to that key.
//! - An empty sequence yields `None`; callers pick the neutral value.

use crate::data::Keyframe;
use trackvirt_api_core::blend::{lerp_vec3, slerp};

/// Find the segment `[i, i+1]` containing `t` and return `(i, i+1, local_t)`.
/// Edge cases:
/// - `t` before the first key (or NaN) returns `(0, 0, 0)`.
/// - `t` at or after the last key returns `(last, last, 0)`.
/// - `t` exactly on a key returns `(i, i, 0)`.
///
/// `keys` must be non-empty and strictly increasing in time.
fn find_segment<V>(keys: &[Keyframe<V>], t: f32) -> (usize, usize, f32) {
    let n = keys.len();
    if n == 1 || !(t > keys[0].time) {
        return (0, 0, 0.0);
    }
    if t >= keys[n - 1].time {
        return (n - 1, n - 1, 0.0);
    }
    // First key strictly after t; lies in 1..n-1 given the checks above.
    let hi = keys.partition_point(|k| k.time <= t);
    let lo = hi - 1;
    if keys[lo].time == t {
        return (lo, lo, 0.0);
    }
    let t0 = keys[lo].time;
    let t1 = keys[hi].time;
    let denom = (t1 - t0).max(f32::EPSILON);
    (lo, hi, ((t - t0) / denom).clamp(0.0, 1.0))
}

/// Sample a position or scale sequence at `t` seconds.
pub fn sample_vec3(keys: &[Keyframe<[f32; 3]>], t: f32) -> Option<[f32; 3]> {
    if keys.is_empty() {
        return None;
    }
    let (i0, i1, lt) = find_segment(keys, t);
    if i0 == i1 {
        return Some(keys[i0].value);
    }
    Some(lerp_vec3(keys[i0].value, keys[i1].value, lt))
}

/// Sample a rotation sequence at `t` seconds. Interpolated results are unit length.
pub fn sample_quat(keys: &[Keyframe<[f32; 4]>], t: f32) -> Option<[f32; 4]> {
    if keys.is_empty() {
        return None;
    }
    let (i0, i1, lt) = find_segment(keys, t);
    if i0 == i1 {
        return Some(keys[i0].value);
    }
    Some(slerp(keys[i0].value, keys[i1].value, lt))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(times: &[f32]) -> Vec<Keyframe<()>> {
        times.iter().map(|&t| Keyframe::new(t, ())).collect()
    }

    #[test]
    fn segment_lookup() {
        let k = keys(&[0.0, 1.0, 3.0]);
        assert_eq!(find_segment(&k, -1.0), (0, 0, 0.0));
        assert_eq!(find_segment(&k, 0.0), (0, 0, 0.0));
        assert_eq!(find_segment(&k, 0.5), (0, 1, 0.5));
        assert_eq!(find_segment(&k, 1.0), (1, 1, 0.0));
        assert_eq!(find_segment(&k, 2.0), (1, 2, 0.5));
        assert_eq!(find_segment(&k, 3.0), (2, 2, 0.0));
        assert_eq!(find_segment(&k, 9.0), (2, 2, 0.0));
    }

    #[test]
    fn nan_query_clamps_to_first() {
        let k = keys(&[0.0, 1.0]);
        assert_eq!(find_segment(&k, f32::NAN), (0, 0, 0.0));
    }

    #[test]
    fn single_key_is_constant() {
        let k = vec![Keyframe::new(0.5, [1.0, 2.0, 3.0])];
        assert_eq!(sample_vec3(&k, -10.0), Some([1.0, 2.0, 3.0]));
        assert_eq!(sample_vec3(&k, 10.0), Some([1.0, 2.0, 3.0]));
    }

    #[test]
    fn empty_is_none() {
        assert_eq!(sample_vec3(&[], 0.0), None);
        assert_eq!(sample_quat(&[], 0.0), None);
    }
}
