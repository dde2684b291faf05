//! Ground-truth pose sources.

use trackvirt_animation_core::AnimationCurve;

/// A ground-truth pose as a function of normalized time `u` in `[0, 1]`.
///
/// Implementations are queried at arbitrary times, in any order, any number of times, and
/// must answer consistently.
pub trait TrackerHandle {
    fn name(&self) -> &str {
        "tracker"
    }

    /// Clip length in seconds.
    fn animation_length(&self) -> f32;

    fn position(&self, u: f32) -> [f32; 3];

    /// Orientation `[x, y, z, w]`. Callers renormalize before use.
    fn rotation(&self, u: f32) -> [f32; 4];
}

/// Reads an [`AnimationCurve`] as a tracker: `u` maps to `u * length` seconds.
#[derive(Clone, Debug)]
pub struct CurveTracker {
    curve: AnimationCurve,
    length: f32,
}

impl CurveTracker {
    /// Length taken from the curve's last key.
    pub fn new(curve: AnimationCurve) -> Self {
        let length = curve.end_time();
        Self { curve, length }
    }

    pub fn with_length(curve: AnimationCurve, length: f32) -> Self {
        Self { curve, length }
    }

    pub fn curve(&self) -> &AnimationCurve {
        &self.curve
    }
}

impl TrackerHandle for CurveTracker {
    fn name(&self) -> &str {
        &self.curve.name
    }

    fn animation_length(&self) -> f32 {
        self.length
    }

    fn position(&self, u: f32) -> [f32; 3] {
        self.curve.position_at(u * self.length)
    }

    fn rotation(&self, u: f32) -> [f32; 4] {
        self.curve.rotation_at(u * self.length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_time_scales_to_curve_seconds() {
        let mut curve = AnimationCurve::new("walk");
        curve.push_position(0.0, [0.0, 0.0, 0.0]).unwrap();
        curve.push_position(4.0, [4.0, 0.0, 0.0]).unwrap();
        let tracker = CurveTracker::new(curve);
        assert_eq!(tracker.name(), "walk");
        assert_eq!(tracker.animation_length(), 4.0);
        assert_eq!(tracker.position(0.25), [1.0, 0.0, 0.0]);
        assert_eq!(tracker.position(1.0), [4.0, 0.0, 0.0]);
        assert_eq!(tracker.rotation(0.5), [0.0, 0.0, 0.0, 1.0]);
    }
}
