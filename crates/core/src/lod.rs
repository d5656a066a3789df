//! Visibility and level-of-detail policy for remote avatars.
//!
//! Implements:
//! - View frustum extracted once per tick from the camera's view-projection
//! - Close-range buffer so avatars next to the camera never pop in
//! - Distance bands mapping to animation skip intervals
//! - Per-entity phase offsets so expensive checks spread across ticks
//!
//! Only animation and attachment visuals are throttled here. Position and
//! health are synced every tick regardless of what this module decides.

use glam::{Mat4, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::math::polynomial_hash;

/// A plane `n·p + d = 0` with `n` pointing into the frustum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub d: f32,
}

impl Plane {
    fn from_row(row: Vec4) -> Self {
        let normal = row.truncate();
        let len = normal.length();
        if len > f32::EPSILON {
            Self {
                normal: normal / len,
                d: row.w / len,
            }
        } else {
            // Degenerate projection row: accept everything.
            Self {
                normal: Vec3::ZERO,
                d: f32::MAX,
            }
        }
    }

    #[inline]
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.d
    }
}

/// Six-plane view frustum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    planes: [Plane; 6],
}

impl Frustum {
    /// Extract planes from a view-projection matrix with a [0, 1] depth
    /// range (glam `perspective_rh` / wgpu convention).
    pub fn from_view_projection(view_projection: Mat4) -> Self {
        let r0 = view_projection.row(0);
        let r1 = view_projection.row(1);
        let r2 = view_projection.row(2);
        let r3 = view_projection.row(3);

        Self {
            planes: [
                Plane::from_row(r3 + r0), // left
                Plane::from_row(r3 - r0), // right
                Plane::from_row(r3 + r1), // bottom
                Plane::from_row(r3 - r1), // top
                Plane::from_row(r2),      // near
                Plane::from_row(r3 - r2), // far
            ],
        }
    }

    /// Whether a sphere touches the frustum.
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.signed_distance(center) >= -radius)
    }
}

/// Distance bands and their animation skip intervals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LodPolicy {
    /// Below this distance avatars animate every tick.
    pub near_distance: f32,
    /// Below this distance (and above near) avatars skip `mid_skip` ticks.
    pub far_distance: f32,
    pub near_skip: u32,
    pub mid_skip: u32,
    pub far_skip: u32,
    /// Radius around the camera where avatars count as visible even
    /// outside the frustum.
    pub buffer_radius: f32,
    /// Bounding sphere radius used for frustum tests.
    pub entity_radius: f32,
}

impl Default for LodPolicy {
    fn default() -> Self {
        Self {
            near_distance: 30.0,
            far_distance: 80.0,
            near_skip: 0,
            mid_skip: 1,
            far_skip: 3,
            buffer_radius: 4.0,
            entity_radius: 1.2,
        }
    }
}

/// Visibility decision for one entity this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Visibility {
    pub distance: f32,
    pub in_frustum: bool,
    pub in_buffer: bool,
}

impl Visibility {
    pub fn is_visible(&self) -> bool {
        self.in_frustum || self.in_buffer
    }
}

impl LodPolicy {
    /// Frustum + buffer visibility test.
    pub fn visibility(&self, frustum: &Frustum, camera_pos: Vec3, center: Vec3) -> Visibility {
        let distance = camera_pos.distance(center);
        Visibility {
            distance,
            in_frustum: frustum.intersects_sphere(center, self.entity_radius),
            in_buffer: distance <= self.buffer_radius,
        }
    }

    /// Ticks to skip between animation updates at `distance`.
    ///
    /// Monotonic: a greater distance never yields a smaller interval.
    pub fn skip_interval(&self, distance: f32) -> u32 {
        if distance < self.near_distance {
            self.near_skip
        } else if distance < self.far_distance {
            self.mid_skip.max(self.near_skip)
        } else {
            self.far_skip.max(self.mid_skip).max(self.near_skip)
        }
    }

    /// Skip interval for a visibility result; `None` when culled (no
    /// animation work at all). Occluded avatars fall back to the far band.
    pub fn skip_for(&self, visibility: &Visibility, occluded: bool) -> Option<u32> {
        if !visibility.is_visible() {
            return None;
        }
        if occluded && !visibility.in_buffer {
            return Some(self.skip_interval(visibility.distance.max(self.far_distance)));
        }
        Some(self.skip_interval(visibility.distance))
    }
}

/// Whether a throttled job with `skip` ticks between runs is due.
#[inline]
pub fn is_due(tick: u64, phase_offset: u32, skip: u32) -> bool {
    let period = u64::from(skip) + 1;
    (tick + u64::from(phase_offset)) % period == 0
}

/// Stable per-entity phase offset for staggering work.
pub fn phase_offset_for(id: &str) -> u32 {
    polynomial_hash(id) % 64
}

/// Modulo cadences (in ticks) for the expensive per-entity checks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaggerCadence {
    pub occlusion: u32,
    pub obstruction: u32,
    pub weapon_diff: u32,
    pub identity: u32,
}

impl Default for StaggerCadence {
    fn default() -> Self {
        Self {
            occlusion: 6,
            obstruction: 4,
            weapon_diff: 10,
            identity: 30,
        }
    }
}

impl StaggerCadence {
    /// Whether a job with `cadence` ticks between runs is due for an entity.
    #[inline]
    pub fn due(tick: u64, phase_offset: u32, cadence: u32) -> bool {
        is_due(tick, phase_offset, cadence.saturating_sub(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera_frustum() -> (Frustum, Vec3) {
        let eye = Vec3::new(0.0, 1.7, 0.0);
        let view = Mat4::look_at_rh(eye, eye + Vec3::NEG_Z, Vec3::Y);
        let proj = Mat4::perspective_rh(70f32.to_radians(), 16.0 / 9.0, 0.1, 500.0);
        (Frustum::from_view_projection(proj * view), eye)
    }

    #[test]
    fn test_frustum_front_and_back() {
        let (frustum, _) = camera_frustum();
        assert!(frustum.intersects_sphere(Vec3::new(0.0, 1.7, -20.0), 1.0));
        assert!(!frustum.intersects_sphere(Vec3::new(0.0, 1.7, 20.0), 1.0));
        assert!(!frustum.intersects_sphere(Vec3::new(0.0, 1.7, -900.0), 1.0));
        assert!(!frustum.intersects_sphere(Vec3::new(200.0, 1.7, -10.0), 1.0));
    }

    #[test]
    fn test_buffer_radius_counts_as_visible() {
        let (frustum, eye) = camera_frustum();
        let policy = LodPolicy::default();
        // Right behind the camera
        let vis = policy.visibility(&frustum, eye, eye + Vec3::new(0.0, 0.0, 2.0));
        assert!(!vis.in_frustum);
        assert!(vis.is_visible());
    }

    #[test]
    fn test_skip_interval_bands() {
        let policy = LodPolicy::default();
        assert_eq!(policy.skip_interval(5.0), 0);
        assert_eq!(policy.skip_interval(29.9), 0);
        assert_eq!(policy.skip_interval(30.0), 1);
        assert_eq!(policy.skip_interval(79.9), 1);
        assert_eq!(policy.skip_interval(80.0), 3);
        assert_eq!(policy.skip_interval(1000.0), 3);
    }

    #[test]
    fn test_skip_interval_monotonic() {
        let policy = LodPolicy::default();
        let mut last = 0;
        for i in 0..2000 {
            let skip = policy.skip_interval(i as f32 * 0.1);
            assert!(skip >= last);
            last = skip;
        }
    }

    #[test]
    fn test_culled_has_no_interval() {
        let (frustum, eye) = camera_frustum();
        let policy = LodPolicy::default();
        let vis = policy.visibility(&frustum, eye, Vec3::new(0.0, 1.7, 150.0));
        assert_eq!(policy.skip_for(&vis, false), None);
    }

    #[test]
    fn test_occluded_uses_far_band() {
        let (frustum, eye) = camera_frustum();
        let policy = LodPolicy::default();
        let vis = policy.visibility(&frustum, eye, Vec3::new(0.0, 1.7, -10.0));
        assert_eq!(policy.skip_for(&vis, false), Some(0));
        assert_eq!(policy.skip_for(&vis, true), Some(3));
    }

    #[test]
    fn test_stagger_spreads_work() {
        // Eight entities with distinct phases, cadence 4: about two run per tick.
        let phases: Vec<u32> = (0..8).collect();
        for tick in 0..16u64 {
            let due = phases
                .iter()
                .filter(|&&p| StaggerCadence::due(tick, p, 4))
                .count();
            assert_eq!(due, 2);
        }
    }

    #[test]
    fn test_is_due_period() {
        let runs = (0..12u64).filter(|&t| is_due(t, 5, 3)).count();
        assert_eq!(runs, 3);
        assert!((0..12u64).all(|t| is_due(t, 7, 0)));
    }

    #[test]
    fn test_phase_offset_stable() {
        assert_eq!(phase_offset_for("abc"), phase_offset_for("abc"));
        assert!(phase_offset_for("abc") < 64);
    }
}
