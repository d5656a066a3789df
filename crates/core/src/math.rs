//! Small math helpers shared by the animator, IK solver and identity code.
//!
//! Smoothing here is frame-rate aware: every "approach" call takes `dt` and a
//! rate and moves at most the full remaining distance, so a long frame never
//! overshoots the target.

use std::f32::consts::PI;

use glam::{EulerRot, Quat, Vec3};

/// Blend factor for exponential-style smoothing, `min(1, dt * rate)`.
#[inline]
pub fn smoothing_factor(dt: f32, rate: f32) -> f32 {
    (dt * rate).clamp(0.0, 1.0)
}

/// Move `current` toward `target` by `min(1, dt * rate)` of the gap.
#[inline]
pub fn approach(current: f32, target: f32, dt: f32, rate: f32) -> f32 {
    current + (target - current) * smoothing_factor(dt, rate)
}

/// Vector version of [`approach`].
#[inline]
pub fn approach_vec3(current: Vec3, target: Vec3, dt: f32, rate: f32) -> Vec3 {
    current + (target - current) * smoothing_factor(dt, rate)
}

/// Normalize angle difference to [-π, π].
#[inline]
pub fn normalize_angle_diff(mut angle: f32) -> f32 {
    if !angle.is_finite() {
        return 0.0;
    }
    while angle > PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Normalize `v`, falling back to `fallback` when `v` is (nearly) zero or
/// not finite. Never divides by zero.
#[inline]
pub fn normalize_or(v: Vec3, fallback: Vec3) -> Vec3 {
    v.try_normalize().unwrap_or(fallback)
}

/// Euler angles stored as `(pitch, yaw, roll)` in a `Vec3`, converted with
/// yaw applied first.
#[inline]
pub fn euler_to_quat(angles: Vec3) -> Quat {
    Quat::from_euler(EulerRot::YXZ, angles.y, angles.x, angles.z)
}

/// Largest absolute per-axis angular difference between two euler triples.
#[inline]
pub fn max_angle_error(a: Vec3, b: Vec3) -> f32 {
    let d = a - b;
    normalize_angle_diff(d.x)
        .abs()
        .max(normalize_angle_diff(d.y).abs())
        .max(normalize_angle_diff(d.z).abs())
}

/// Simple polynomial string hash (`h = h * 31 + byte`, wrapping).
///
/// Stable across platforms and processes, so every observer derives the
/// same value from the same id without coordination.
#[inline]
pub fn polynomial_hash(s: &str) -> u32 {
    s.bytes()
        .fold(0u32, |h, b| h.wrapping_mul(31).wrapping_add(u32::from(b)))
}

/// Continue a polynomial hash with more bytes.
#[inline]
pub fn polynomial_hash_continue(seed: u32, s: &str) -> u32 {
    s.bytes()
        .fold(seed, |h, b| h.wrapping_mul(31).wrapping_add(u32::from(b)))
}

/// Half-sine envelope: 0 at t=0, 1 at t=0.5, 0 at t=1.
#[inline]
pub fn sine_envelope(t: f32) -> f32 {
    (t.clamp(0.0, 1.0) * PI).sin()
}

/// True when every component of `v` is finite.
#[inline]
pub fn is_finite_vec3(v: Vec3) -> bool {
    v.x.is_finite() && v.y.is_finite() && v.z.is_finite()
}
