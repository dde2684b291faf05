//! Closed-form trackers.

use trackvirt_api_core::blend::{add_vec3, quat_from_euler, scale_vec3};
use trackvirt_virtualizer_core::TrackerHandle;

/// Constant velocity plus constant yaw rate.
///
/// Linear between any two samples, so resampling it through interpolated keys is exact.
#[derive(Clone, Debug)]
pub struct Slide {
    pub length: f32,
    pub start: [f32; 3],
    /// Units per second.
    pub velocity: [f32; 3],
    /// Radians per second about +Y.
    pub yaw_rate: f32,
}

impl Slide {
    pub fn new(length: f32) -> Self {
        Self {
            length,
            start: [0.0, 1.0, 0.0],
            velocity: [0.5, 0.0, -0.25],
            yaw_rate: 0.3,
        }
    }
}

impl TrackerHandle for Slide {
    fn name(&self) -> &str {
        "slide"
    }

    fn animation_length(&self) -> f32 {
        self.length
    }

    fn position(&self, u: f32) -> [f32; 3] {
        add_vec3(self.start, scale_vec3(self.velocity, u * self.length))
    }

    fn rotation(&self, u: f32) -> [f32; 4] {
        quat_from_euler([0.0, self.yaw_rate * u * self.length, 0.0])
    }
}

/// Circle in the XZ plane, facing along the path; rotations are returned unnormalized.
#[derive(Clone, Debug)]
pub struct Orbit {
    pub length: f32,
    pub radius: f32,
    /// Full turns over the clip.
    pub turns: f32,
}

impl Orbit {
    pub fn new(length: f32) -> Self {
        Self {
            length,
            radius: 2.0,
            turns: 1.0,
        }
    }

    fn angle(&self, u: f32) -> f32 {
        u * self.turns * std::f32::consts::TAU
    }
}

impl TrackerHandle for Orbit {
    fn name(&self) -> &str {
        "orbit"
    }

    fn animation_length(&self) -> f32 {
        self.length
    }

    fn position(&self, u: f32) -> [f32; 3] {
        let a = self.angle(u);
        [self.radius * a.cos(), 1.5, self.radius * a.sin()]
    }

    fn rotation(&self, u: f32) -> [f32; 4] {
        let q = quat_from_euler([0.0, -self.angle(u), 0.0]);
        scale4(q, 1.5)
    }
}

fn scale4(q: [f32; 4], s: f32) -> [f32; 4] {
    [q[0] * s, q[1] * s, q[2] * s, q[3] * s]
}
