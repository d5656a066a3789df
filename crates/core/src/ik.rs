//! Analytic two-bone inverse kinematics.
//!
//! Solves a shoulder -> elbow -> wrist chain in closed form with the law of
//! cosines. The pole (hint) point picks which way the elbow bends.
//!
//! Bones point along [`BONE_AXIS`] in their local space. The solver returns
//! the upper joint rotation (world, and relative to an optional parent) and
//! the lower joint's local rotation about the bend axis.
//!
//! The solver itself holds no state. Callers own an [`IkScratch`] per chain
//! so two entities never share intermediate values.

use std::f32::consts::PI;

use glam::{Quat, Vec3};

use crate::math::normalize_or;

/// Canonical bone direction in joint-local space.
pub const BONE_AXIS: Vec3 = Vec3::NEG_Y;

/// Fraction of full reach the chain is allowed to extend to.
/// Keeps the elbow off the singular fully-locked configuration.
pub const MAX_REACH_FRACTION: f32 = 0.999;

/// Shortest distance the solver works with; below this the target is
/// treated as coincident with the root.
const MIN_DISTANCE: f32 = 1e-4;

/// Link lengths of a two-bone chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IkChain {
    pub upper_len: f32,
    pub lower_len: f32,
}

impl IkChain {
    pub fn new(upper_len: f32, lower_len: f32) -> Self {
        Self {
            upper_len,
            lower_len,
        }
    }

    /// Full extension length.
    pub fn reach(&self) -> f32 {
        self.upper_len + self.lower_len
    }
}

/// Per-chain working values, reused across solves.
///
/// Also remembers the last bend normal so a pole hint that becomes collinear
/// with the target keeps bending the same way instead of flipping.
#[derive(Debug, Clone, Copy)]
pub struct IkScratch {
    pub direction: Vec3,
    pub hint_direction: Vec3,
    pub bend_normal: Vec3,
    pub distance: f32,
    has_normal: bool,
}

impl Default for IkScratch {
    fn default() -> Self {
        Self {
            direction: BONE_AXIS,
            hint_direction: Vec3::Z,
            bend_normal: Vec3::X,
            distance: 0.0,
            has_normal: false,
        }
    }
}

/// Result of a solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IkSolution {
    /// Upper joint rotation in world space.
    pub upper_world: Quat,
    /// Upper joint rotation relative to the parent (equals `upper_world`
    /// when there is no parent).
    pub upper_local: Quat,
    /// Lower joint rotation relative to the upper joint.
    pub lower_local: Quat,
    /// Bend at the elbow, `π - interior angle`. Zero when fully extended.
    pub elbow_bend: f32,
    /// World-space elbow position.
    pub elbow: Vec3,
    /// World-space end-effector position after forward kinematics.
    pub end_effector: Vec3,
}

/// Solve the chain rooted at `root` toward `target`, bending toward `pole`.
///
/// `parent_rotation` is the world rotation of the bone the chain hangs from
/// (e.g. the torso); when given, `upper_local` is expressed relative to it.
pub fn solve(
    chain: &IkChain,
    root: Vec3,
    target: Vec3,
    pole: Vec3,
    parent_rotation: Option<Quat>,
    scratch: &mut IkScratch,
) -> IkSolution {
    let l1 = chain.upper_len.max(MIN_DISTANCE);
    let l2 = chain.lower_len.max(MIN_DISTANCE);

    // 1. Direction and clamped distance
    let to_target = target - root;
    scratch.direction = normalize_or(to_target, BONE_AXIS);
    let raw_distance = to_target.length();
    let raw_distance = if raw_distance.is_finite() { raw_distance } else { 0.0 };
    scratch.distance = raw_distance.clamp(MIN_DISTANCE, MAX_REACH_FRACTION * (l1 + l2));
    let d = scratch.distance;

    // 2. Law of cosines
    let cos_shoulder = ((l1 * l1 + d * d - l2 * l2) / (2.0 * l1 * d)).clamp(-1.0, 1.0);
    let shoulder_angle = cos_shoulder.acos();
    let cos_elbow = ((l1 * l1 + l2 * l2 - d * d) / (2.0 * l1 * l2)).clamp(-1.0, 1.0);
    let elbow_interior = cos_elbow.acos();
    let elbow_bend = PI - elbow_interior;

    // 3. Bend plane from target direction and hint
    scratch.hint_direction = normalize_or(pole - root, scratch.hint_direction);
    let normal = scratch.direction.cross(scratch.hint_direction);
    scratch.bend_normal = match normal.try_normalize() {
        Some(n) => {
            scratch.has_normal = true;
            n
        }
        None if scratch.has_normal
            && scratch.bend_normal.dot(scratch.direction).abs() < 0.999 =>
        {
            // Hint collinear with target: keep the previous plane, re-orthogonalized.
            normalize_or(
                scratch.bend_normal
                    - scratch.direction * scratch.bend_normal.dot(scratch.direction),
                scratch.direction.any_orthonormal_vector(),
            )
        }
        None => scratch.direction.any_orthonormal_vector(),
    };
    let n = scratch.bend_normal;

    // 4. Upper joint: base aim, then bend toward the hint about the plane normal
    let base = Quat::from_rotation_arc(BONE_AXIS, scratch.direction);
    let upper_world = (Quat::from_axis_angle(n, shoulder_angle) * base).normalize();
    let upper_local = match parent_rotation {
        Some(parent) => (parent.inverse() * upper_world).normalize(),
        None => upper_world,
    };

    // 5. Lower joint: single-axis rotation about the plane normal in upper-local space
    let local_axis = normalize_or(upper_world.inverse() * n, Vec3::X);
    let lower_local = Quat::from_axis_angle(local_axis, -elbow_bend);

    let elbow = root + upper_world * (BONE_AXIS * l1);
    let end_effector = elbow + (upper_world * lower_local) * (BONE_AXIS * l2);

    IkSolution {
        upper_world,
        upper_local,
        lower_local,
        elbow_bend,
        elbow,
        end_effector,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solve_fresh(chain: IkChain, root: Vec3, target: Vec3, pole: Vec3) -> IkSolution {
        let mut scratch = IkScratch::default();
        solve(&chain, root, target, pole, None, &mut scratch)
    }

    #[test]
    fn test_reachable_target_is_hit() {
        let chain = IkChain::new(1.0, 1.0);
        let targets = [
            Vec3::new(0.5, -1.0, 0.3),
            Vec3::new(1.2, 0.4, -0.2),
            Vec3::new(0.0, 0.0, 1.5),
            Vec3::new(-0.3, -0.3, -0.3),
        ];
        for target in targets {
            let sol = solve_fresh(chain, Vec3::ZERO, target, Vec3::new(0.0, 0.0, -1.0));
            assert!(
                (sol.end_effector - target).length() < 1e-3,
                "target {target:?} got {:?}",
                sol.end_effector
            );
        }
    }

    #[test]
    fn test_unreachable_target_fully_extends() {
        // Shoulder at origin, target 2 below, l1 = l2 = 1.
        let chain = IkChain::new(1.0, 1.0);
        let sol = solve_fresh(chain, Vec3::ZERO, Vec3::new(0.0, -2.0, 0.0), Vec3::Z);
        assert!((sol.end_effector - Vec3::new(0.0, -1.998, 0.0)).length() < 1e-3);
        assert!(sol.elbow_bend < 0.1, "elbow bend {}", sol.elbow_bend);

        let far = solve_fresh(chain, Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0), Vec3::Y);
        assert!((far.end_effector - Vec3::new(1.998, 0.0, 0.0)).length() < 1e-3);
    }

    #[test]
    fn test_elbow_bends_toward_pole() {
        let chain = IkChain::new(1.0, 1.0);
        let target = Vec3::new(0.0, -1.2, 0.0);

        let front = solve_fresh(chain, Vec3::ZERO, target, Vec3::new(0.0, -0.5, 1.0));
        assert!(front.elbow.z > 0.1, "elbow {:?}", front.elbow);

        let back = solve_fresh(chain, Vec3::ZERO, target, Vec3::new(0.0, -0.5, -1.0));
        assert!(back.elbow.z < -0.1, "elbow {:?}", back.elbow);
    }

    #[test]
    fn test_degenerate_target_at_root() {
        let chain = IkChain::new(0.3, 0.25);
        let sol = solve_fresh(chain, Vec3::ONE, Vec3::ONE, Vec3::ONE);
        assert!(sol.end_effector.is_finite());
        assert!(sol.upper_world.is_finite());
        assert!(sol.lower_local.is_finite());
    }

    #[test]
    fn test_parent_relative_rotation() {
        let chain = IkChain::new(1.0, 1.0);
        let parent = Quat::from_rotation_y(0.7);
        let mut scratch = IkScratch::default();
        let sol = solve(
            &chain,
            Vec3::ZERO,
            Vec3::new(0.8, -0.8, 0.2),
            Vec3::Z,
            Some(parent),
            &mut scratch,
        );
        let recomposed = parent * sol.upper_local;
        assert!(recomposed.angle_between(sol.upper_world) < 1e-4);
    }

    #[test]
    fn test_collinear_hint_keeps_previous_plane() {
        let chain = IkChain::new(1.0, 1.0);
        let mut scratch = IkScratch::default();
        let target = Vec3::new(0.0, -1.2, 0.0);

        let pole = Vec3::new(0.0, -0.5, 1.0);
        let first = solve(&chain, Vec3::ZERO, target, pole, None, &mut scratch);
        // Pole straight along the target direction
        let pole = Vec3::new(0.0, -3.0, 0.0);
        let second = solve(&chain, Vec3::ZERO, target, pole, None, &mut scratch);
        assert!((first.elbow - second.elbow).length() < 1e-4);
    }

    #[test]
    fn test_scratch_isolation() {
        let chain = IkChain::new(1.0, 1.0);
        let mut a = IkScratch::default();
        let mut b = IkScratch::default();
        let sa = solve(&chain, Vec3::ZERO, Vec3::new(0.5, -1.0, 0.0), Vec3::Z, None, &mut a);
        let _ = solve(&chain, Vec3::ZERO, Vec3::new(-1.0, 0.2, 0.4), Vec3::X, None, &mut b);
        let sa2 = solve(&chain, Vec3::ZERO, Vec3::new(0.5, -1.0, 0.0), Vec3::Z, None, &mut a);
        assert_eq!(sa.end_effector, sa2.end_effector);
    }
}
