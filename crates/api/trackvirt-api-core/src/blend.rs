//! Blending utilities for pose components.
//! - f32 linear interpolation for scalars and vector components
//! - quaternion slerp (shortest-arc, renormalized)
//! - quaternion products, inverses and canonical forms used by drift offsets
//!
//! Quaternions are stored as `[x, y, z, w]`.

pub const IDENTITY_QUAT: [f32; 4] = [0.0, 0.0, 0.0, 1.0];
pub const ZERO_VEC3: [f32; 3] = [0.0, 0.0, 0.0];
pub const ONE_VEC3: [f32; 3] = [1.0, 1.0, 1.0];

/// Linear interpolation for f32
#[inline]
pub fn lerp_f(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[inline]
pub fn lerp_vec3(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    [lerp_f(a[0], b[0], t), lerp_f(a[1], b[1], t), lerp_f(a[2], b[2], t)]
}

#[inline]
pub fn add_vec3(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

#[inline]
pub fn sub_vec3(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
pub fn scale_vec3(a: [f32; 3], s: f32) -> [f32; 3] {
    [a[0] * s, a[1] * s, a[2] * s]
}

#[inline]
pub fn length_vec3(a: [f32; 3]) -> f32 {
    (a[0] * a[0] + a[1] * a[1] + a[2] * a[2]).sqrt()
}

/// Unit vector in the direction of `a`; the zero vector stays zero.
#[inline]
pub fn normalize_vec3(a: [f32; 3]) -> [f32; 3] {
    let len = length_vec3(a);
    if len > 0.0 {
        scale_vec3(a, len.recip())
    } else {
        ZERO_VEC3
    }
}

#[inline]
pub fn quat_dot(a: [f32; 4], b: [f32; 4]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2] + a[3] * b[3]
}

#[inline]
pub fn quat_norm(q: [f32; 4]) -> f32 {
    quat_dot(q, q).sqrt()
}

/// Normalize a quaternion; a zero quaternion maps to identity.
#[inline]
pub fn normalize_quat(q: [f32; 4]) -> [f32; 4] {
    let mag = quat_norm(q);
    if mag == 0.0 || !mag.is_finite() {
        IDENTITY_QUAT
    } else {
        [q[0] / mag, q[1] / mag, q[2] / mag, q[3] / mag]
    }
}

/// Hamilton product `a * b` (apply `b` first, then `a`).
#[inline]
pub fn quat_mul(a: [f32; 4], b: [f32; 4]) -> [f32; 4] {
    let [ax, ay, az, aw] = a;
    let [bx, by, bz, bw] = b;
    [
        aw * bx + ax * bw + ay * bz - az * by,
        aw * by - ax * bz + ay * bw + az * bx,
        aw * bz + ax * by - ay * bx + az * bw,
        aw * bw - ax * bx - ay * by - az * bz,
    ]
}

#[inline]
pub fn quat_conjugate(q: [f32; 4]) -> [f32; 4] {
    [-q[0], -q[1], -q[2], q[3]]
}

/// Multiplicative inverse; equals the conjugate for unit quaternions.
#[inline]
pub fn quat_inverse(q: [f32; 4]) -> [f32; 4] {
    let n2 = quat_dot(q, q);
    if n2 == 0.0 {
        return IDENTITY_QUAT;
    }
    let c = quat_conjugate(q);
    [c[0] / n2, c[1] / n2, c[2] / n2, c[3] / n2]
}

/// Representative with non-negative `w`: the same rotation expressed along the shorter arc.
#[inline]
pub fn canonical_quat(q: [f32; 4]) -> [f32; 4] {
    if q[3] < 0.0 {
        [-q[0], -q[1], -q[2], -q[3]]
    } else {
        q
    }
}

/// Quaternion from Euler angles in radians, rotating about X, then Y, then Z.
pub fn quat_from_euler(euler: [f32; 3]) -> [f32; 4] {
    let (sx, cx) = (euler[0] * 0.5).sin_cos();
    let (sy, cy) = (euler[1] * 0.5).sin_cos();
    let (sz, cz) = (euler[2] * 0.5).sin_cos();
    let qx = [sx, 0.0, 0.0, cx];
    let qy = [0.0, sy, 0.0, cy];
    let qz = [0.0, 0.0, sz, cz];
    quat_mul(qz, quat_mul(qy, qx))
}

/// Rotation angle (radians, in `[0, pi]`) between two orientations.
pub fn quat_angle_between(a: [f32; 4], b: [f32; 4]) -> f32 {
    let d = quat_dot(normalize_quat(a), normalize_quat(b)).abs().min(1.0);
    2.0 * d.acos()
}

/// Slerp between two quaternions along the shortest arc; output is unit length.
pub fn slerp(q1: [f32; 4], q2: [f32; 4], t: f32) -> [f32; 4] {
    let qa = normalize_quat(q1);
    let mut qb = normalize_quat(q2);

    let mut dot = quat_dot(qa, qb);

    // Negate one end so the path never takes the long way round.
    if dot < 0.0 {
        qb = [-qb[0], -qb[1], -qb[2], -qb[3]];
        dot = -dot;
    }

    // Nearly parallel: fall back to normalized lerp.
    const DOT_THRESHOLD: f32 = 0.9995;
    if dot > DOT_THRESHOLD {
        let res = [
            lerp_f(qa[0], qb[0], t),
            lerp_f(qa[1], qb[1], t),
            lerp_f(qa[2], qb[2], t),
            lerp_f(qa[3], qb[3], t),
        ];
        return normalize_quat(res);
    }

    let theta_0 = dot.clamp(-1.0, 1.0).acos();
    let theta = theta_0 * t;
    let sin_theta = theta.sin();
    let sin_theta_0 = theta_0.sin();

    let s0 = (theta_0 - theta).sin() / sin_theta_0;
    let s1 = sin_theta / sin_theta_0;

    normalize_quat([
        s0 * qa[0] + s1 * qb[0],
        s0 * qa[1] + s1 * qb[1],
        s0 * qa[2] + s1 * qb[2],
        s0 * qa[3] + s1 * qb[3],
    ])
}
