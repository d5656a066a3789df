//! Locomotion state selection and base pose targets.
//!
//! States are mutually exclusive and picked by priority:
//! prone > sliding > crouch (moving | idle) > sprint > walk > idle.
//! Each state produces body offset, torso/head angles and leg joint angles
//! from a gait phase the animator advances by `dt * anim_rate`.

use std::f32::consts::{PI, TAU};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::{AnimatorInput, BodyPose, LegAngles};

/// Gait states, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LocomotionState {
    Prone,
    Sliding,
    CrouchMoving,
    CrouchIdle,
    Sprint,
    Walk,
    #[default]
    Idle,
}

impl LocomotionState {
    /// Pick the state for this tick's replicated flags and estimated motion.
    pub fn select(input: &AnimatorInput) -> Self {
        let moving = input.is_moving();
        if input.prone {
            LocomotionState::Prone
        } else if input.sliding {
            LocomotionState::Sliding
        } else if input.crouching {
            if moving {
                LocomotionState::CrouchMoving
            } else {
                LocomotionState::CrouchIdle
            }
        } else if input.sprinting && moving {
            LocomotionState::Sprint
        } else if moving {
            LocomotionState::Walk
        } else {
            LocomotionState::Idle
        }
    }

    /// Whether the gait cycle runs in this state.
    pub fn is_moving(self) -> bool {
        matches!(
            self,
            LocomotionState::CrouchMoving | LocomotionState::Sprint | LocomotionState::Walk
        )
    }

    /// Gait cycle speed (radians of phase per second) at the reference speed.
    fn cycle_rate(self) -> f32 {
        match self {
            LocomotionState::Prone => TAU * 0.6,
            LocomotionState::Sliding => 0.0,
            LocomotionState::CrouchMoving => TAU * 1.2,
            LocomotionState::CrouchIdle => TAU * 0.25,
            LocomotionState::Sprint => TAU * 2.4,
            LocomotionState::Walk => TAU * 1.8,
            LocomotionState::Idle => TAU * 0.25,
        }
    }

    /// Phase advance rate, scaled by how fast the avatar actually moves.
    pub fn anim_rate(self, speed: f32, reference_speed: f32) -> f32 {
        let base = self.cycle_rate();
        if self.is_moving() || self == LocomotionState::Prone {
            let scale = if reference_speed > 0.0 {
                (speed / reference_speed).clamp(0.5, 2.0)
            } else {
                1.0
            };
            base * scale
        } else {
            base
        }
    }
}

fn legs(left_hip: f32, left_knee: f32, right_hip: f32, right_knee: f32) -> [LegAngles; 2] {
    [
        LegAngles {
            hip: left_hip,
            knee: left_knee,
        },
        LegAngles {
            hip: right_hip,
            knee: right_knee,
        },
    ]
}

/// Base targets for `state` at gait `phase`, before look/lean and overlays.
pub fn base_targets(state: LocomotionState, phase: f32, input: &AnimatorInput) -> BodyPose {
    let s = phase.sin();
    let s_opp = (phase + PI).sin();
    let moving_prone = input.is_moving();

    match state {
        LocomotionState::Prone => {
            let crawl = if moving_prone { 0.25 } else { 0.0 };
            BodyPose {
                body_offset: Vec3::new(0.0, -0.8, 0.35),
                torso: Vec3::new(-1.35, 0.0, 0.0),
                head: Vec3::new(1.1, 0.0, 0.0),
                legs: legs(
                    0.05 + crawl * s,
                    0.1 + crawl * s.max(0.0),
                    0.05 + crawl * s_opp,
                    0.1 + crawl * s_opp.max(0.0),
                ),
            }
        }
        LocomotionState::Sliding => BodyPose {
            body_offset: Vec3::new(0.0, -0.55, 0.0),
            torso: Vec3::new(0.35, 0.0, 0.0),
            head: Vec3::new(-0.2, 0.0, 0.0),
            legs: legs(-1.25, 0.15, 0.2, 1.45),
        },
        LocomotionState::CrouchMoving => BodyPose {
            body_offset: Vec3::new(0.0, -0.38 + 0.015 * (2.0 * phase).sin().abs(), 0.0),
            torso: Vec3::new(-0.3, 0.0, 0.0),
            head: Vec3::new(0.15, 0.0, 0.0),
            legs: legs(
                -0.95 + 0.35 * s,
                1.45 + 0.3 * s.max(0.0),
                -0.95 + 0.35 * s_opp,
                1.45 + 0.3 * s_opp.max(0.0),
            ),
        },
        LocomotionState::CrouchIdle => BodyPose {
            body_offset: Vec3::new(0.0, -0.42 + 0.004 * s, 0.0),
            torso: Vec3::new(-0.22 + 0.01 * s, 0.0, 0.0),
            head: Vec3::new(0.1, 0.0, 0.0),
            legs: legs(-1.1, 1.7, -0.6, 1.2),
        },
        LocomotionState::Sprint => BodyPose {
            body_offset: Vec3::new(0.0, 0.05 * (2.0 * phase).sin().abs(), 0.0),
            torso: Vec3::new(-0.32, 0.0, 0.0),
            head: Vec3::new(0.2, 0.0, 0.0),
            legs: legs(
                0.9 * s,
                1.3 * (phase - PI / 2.0).sin().max(0.0),
                0.9 * s_opp,
                1.3 * (phase + PI / 2.0).sin().max(0.0),
            ),
        },
        LocomotionState::Walk => BodyPose {
            body_offset: Vec3::new(0.0, 0.025 * (2.0 * phase).sin().abs(), 0.0),
            torso: Vec3::new(-0.06, 0.0, 0.0),
            head: Vec3::ZERO,
            legs: legs(
                0.45 * s,
                0.65 * (-s).max(0.0),
                0.45 * s_opp,
                0.65 * (-s_opp).max(0.0),
            ),
        },
        LocomotionState::Idle => BodyPose {
            // Breathing
            body_offset: Vec3::new(0.0, 0.004 * s, 0.0),
            torso: Vec3::new(0.012 * s, 0.0, 0.0),
            head: Vec3::ZERO,
            legs: legs(0.0, 0.02, 0.0, 0.02),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> AnimatorInput {
        AnimatorInput::default()
    }

    #[test]
    fn test_priority_order() {
        let mut i = input();
        i.velocity = Vec3::new(4.0, 0.0, 0.0);
        i.prone = true;
        i.sliding = true;
        i.crouching = true;
        i.sprinting = true;
        assert_eq!(LocomotionState::select(&i), LocomotionState::Prone);
        i.prone = false;
        assert_eq!(LocomotionState::select(&i), LocomotionState::Sliding);
        i.sliding = false;
        assert_eq!(LocomotionState::select(&i), LocomotionState::CrouchMoving);
        i.crouching = false;
        assert_eq!(LocomotionState::select(&i), LocomotionState::Sprint);
        i.sprinting = false;
        assert_eq!(LocomotionState::select(&i), LocomotionState::Walk);
        i.velocity = Vec3::ZERO;
        assert_eq!(LocomotionState::select(&i), LocomotionState::Idle);
        i.crouching = true;
        assert_eq!(LocomotionState::select(&i), LocomotionState::CrouchIdle);
    }

    #[test]
    fn test_sprint_flag_without_motion_is_idle() {
        let mut i = input();
        i.sprinting = true;
        assert_eq!(LocomotionState::select(&i), LocomotionState::Idle);
    }

    #[test]
    fn test_anim_rate_scales_with_speed() {
        let slow = LocomotionState::Walk.anim_rate(2.0, 4.5);
        let fast = LocomotionState::Walk.anim_rate(7.0, 4.5);
        assert!(fast > slow);
        // Clamped
        assert_eq!(
            LocomotionState::Walk.anim_rate(100.0, 4.5),
            LocomotionState::Walk.anim_rate(9.0, 4.5)
        );
        assert_eq!(LocomotionState::Sliding.anim_rate(8.0, 4.5), 0.0);
    }

    #[test]
    fn test_walk_legs_alternate() {
        let pose = base_targets(LocomotionState::Walk, PI / 2.0, &input());
        assert!(pose.legs[0].hip > 0.0);
        assert!(pose.legs[1].hip < 0.0);
    }

    #[test]
    fn test_crouch_lowers_body() {
        let crouch = base_targets(LocomotionState::CrouchIdle, 0.0, &input());
        let idle = base_targets(LocomotionState::Idle, 0.0, &input());
        assert!(crouch.body_offset.y < idle.body_offset.y - 0.3);
    }
}
