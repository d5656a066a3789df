//! Per-entity procedural animation.
//!
//! Each tick the animator:
//! 1. Picks a locomotion state and advances the gait phase
//! 2. Builds pose targets (locomotion + look + lean)
//! 3. Smooths the persistent pose toward the targets
//! 4. Layers flinch and swing overlays on top
//! 5. Places the weapon anchor and solves both arms with two-bone IK
//!
//! Targets are rebuilt every tick and never stored; only the smoothed pose,
//! the gait phase and overlay timers persist between ticks.

pub mod hand_pose;
pub mod locomotion;
pub mod overlay;

use std::f32::consts::TAU;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::hits::BodyPart;
use crate::ik::{self, IkChain, IkScratch, IkSolution};
use crate::math::{approach, approach_vec3, euler_to_quat, is_finite_vec3, max_angle_error};
use crate::weapon::{WeaponCategory, WeaponVisualConfig};

pub use hand_pose::HoldStance;
pub use locomotion::LocomotionState;
pub use overlay::{Flinch, HandOffset, Swing, SwingKind};

/// Horizontal speed above which an avatar counts as moving.
pub const MOVING_SPEED: f32 = 0.3;

/// Pelvis height above the root when standing.
pub const HIP_HEIGHT: f32 = 0.95;
/// Chest pivot height above the pelvis.
pub const CHEST_ABOVE_HIP: f32 = 0.5;
/// Shoulder offset from the pelvis, right side. Left is mirrored.
const SHOULDER: Vec3 = Vec3::new(0.2, CHEST_ABOVE_HIP, 0.0);
/// Elbow hint offset from the shoulder, right side: out, down, back.
const ELBOW_HINT: Vec3 = Vec3::new(0.35, -0.6, 0.25);
/// Relaxed hand position from the pelvis, right side.
const RELAXED_HAND: Vec3 = Vec3::new(0.24, -0.02, -0.1);

/// Smoothing and overlay tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationTuning {
    /// Smoothing rate while moving or sliding.
    pub moving_rate: f32,
    /// Smoothing rate at rest.
    pub rest_rate: f32,
    /// Smoothing rate forced when the torso is far from its target.
    pub snap_rate: f32,
    /// Torso error (radians) that forces `snap_rate`.
    pub snap_threshold: f32,
    pub flinch_duration: f32,
    pub swing_duration: f32,
    /// Speed at which gait cycles play at their nominal rate.
    pub reference_speed: f32,
    pub upper_arm_length: f32,
    pub forearm_length: f32,
}

impl Default for AnimationTuning {
    fn default() -> Self {
        Self {
            moving_rate: 12.0,
            rest_rate: 6.0,
            snap_rate: 25.0,
            snap_threshold: 0.5,
            flinch_duration: 0.2,
            swing_duration: 0.4,
            reference_speed: 4.5,
            upper_arm_length: 0.33,
            forearm_length: 0.31,
        }
    }
}

/// Replicated and locally derived inputs for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AnimatorInput {
    pub prone: bool,
    pub sliding: bool,
    pub crouching: bool,
    pub ads: bool,
    pub sprinting: bool,
    pub pitch: f32,
    pub yaw: f32,
    pub lean: f32,
    /// Estimated world velocity.
    pub velocity: Vec3,
    /// Distance to the nearest obstacle ahead of the weapon, if probed.
    pub obstruction: Option<f32>,
}

impl AnimatorInput {
    /// Horizontal speed.
    pub fn speed(&self) -> f32 {
        let v = Vec3::new(self.velocity.x, 0.0, self.velocity.z);
        let s = v.length();
        if s.is_finite() {
            s
        } else {
            0.0
        }
    }

    pub fn is_moving(&self) -> bool {
        self.speed() > MOVING_SPEED
    }

    /// Sideways speed relative to facing, positive to the right.
    pub fn strafe_speed(&self) -> f32 {
        let right = Quat::from_rotation_y(finite_or_zero(self.yaw)) * Vec3::X;
        let s = self.velocity.dot(right);
        finite_or_zero(s)
    }

    fn sanitized(&self) -> Self {
        Self {
            pitch: finite_or_zero(self.pitch).clamp(-1.5, 1.5),
            yaw: finite_or_zero(self.yaw),
            lean: finite_or_zero(self.lean).clamp(-1.0, 1.0),
            velocity: if is_finite_vec3(self.velocity) {
                self.velocity
            } else {
                Vec3::ZERO
            },
            obstruction: self.obstruction.filter(|d| d.is_finite()),
            ..*self
        }
    }
}

fn finite_or_zero(v: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/// Hip and knee angles for one leg.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LegAngles {
    pub hip: f32,
    pub knee: f32,
}

/// Joint values the animator smooths. Angles are euler `(pitch, yaw, roll)`
/// relative to the avatar root; `legs` is `[left, right]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BodyPose {
    pub body_offset: Vec3,
    pub torso: Vec3,
    pub head: Vec3,
    pub legs: [LegAngles; 2],
}

impl BodyPose {
    fn approach(&mut self, target: &BodyPose, dt: f32, rate: f32) {
        self.body_offset = approach_vec3(self.body_offset, target.body_offset, dt, rate);
        self.torso = approach_vec3(self.torso, target.torso, dt, rate);
        self.head = approach_vec3(self.head, target.head, dt, rate);
        for (leg, goal) in self.legs.iter_mut().zip(target.legs.iter()) {
            leg.hip = approach(leg.hip, goal.hip, dt, rate);
            leg.knee = approach(leg.knee, goal.knee, dt, rate);
        }
    }
}

/// Position plus rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl Transform {
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.translation + self.rotation * point
    }
}

/// Everything a renderer needs to pose one avatar for a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AvatarPose {
    pub locomotion: LocomotionState,
    pub stance: HoldStance,
    pub root_position: Vec3,
    pub root_rotation: Quat,
    /// Smoothed pose with overlays applied.
    pub body: BodyPose,
    pub pelvis: Vec3,
    pub torso_rotation: Quat,
    pub head_rotation: Quat,
    pub weapon_anchor: Transform,
    pub right_hand_target: Vec3,
    pub left_hand_target: Vec3,
    pub right_arm: IkSolution,
    pub left_arm: IkSolution,
}

/// Procedural animation state for one remote avatar.
#[derive(Debug, Clone)]
pub struct ProceduralAnimator {
    tuning: AnimationTuning,
    pose: BodyPose,
    locomotion: LocomotionState,
    phase: f32,
    time: f32,
    flinch: Flinch,
    swing: Swing,
    arm: IkChain,
    right_scratch: IkScratch,
    left_scratch: IkScratch,
}

impl ProceduralAnimator {
    pub fn new(tuning: AnimationTuning) -> Self {
        Self {
            tuning,
            pose: BodyPose::default(),
            locomotion: LocomotionState::Idle,
            phase: 0.0,
            time: 0.0,
            flinch: Flinch::default(),
            swing: Swing::default(),
            arm: IkChain::new(tuning.upper_arm_length, tuning.forearm_length),
            right_scratch: IkScratch::default(),
            left_scratch: IkScratch::default(),
        }
    }

    pub fn locomotion(&self) -> LocomotionState {
        self.locomotion
    }

    pub fn pose(&self) -> &BodyPose {
        &self.pose
    }

    pub fn flinch(&self) -> &Flinch {
        &self.flinch
    }

    pub fn swing(&self) -> &Swing {
        &self.swing
    }

    /// Start a hit reaction. `local_direction` is the hit's travel
    /// direction in avatar space.
    pub fn trigger_flinch(&mut self, part: BodyPart, local_direction: Vec3) {
        self.flinch
            .trigger(part, local_direction, self.tuning.flinch_duration);
    }

    pub fn trigger_swing(&mut self, kind: SwingKind) {
        self.swing.trigger(kind, self.tuning.swing_duration);
    }

    /// Rate used to approach `target` this tick.
    fn smoothing_rate(&self, target: &BodyPose, state: LocomotionState) -> f32 {
        if max_angle_error(self.pose.torso, target.torso) > self.tuning.snap_threshold {
            self.tuning.snap_rate
        } else if state.is_moving() || state == LocomotionState::Sliding {
            self.tuning.moving_rate
        } else {
            self.tuning.rest_rate
        }
    }

    /// Advance by `dt` and produce this tick's pose.
    pub fn update(
        &mut self,
        root: Vec3,
        input: &AnimatorInput,
        weapon: Option<&WeaponVisualConfig>,
        dt: f32,
    ) -> AvatarPose {
        let dt = finite_or_zero(dt).max(0.0);
        let input = input.sanitized();

        // 1. State and phase
        let state = LocomotionState::select(&input);
        self.locomotion = state;
        let rate = state.anim_rate(input.speed(), self.tuning.reference_speed);
        self.phase = (self.phase + dt * rate) % TAU;
        self.time = (self.time + dt) % 3600.0;

        // 2. Targets
        let mut target = locomotion::base_targets(state, self.phase, &input);
        let pitch_share = if state == LocomotionState::Prone { 0.1 } else { 0.3 };
        target.torso.x += input.pitch * pitch_share;
        target.torso.y += (-input.strafe_speed() * 0.03).clamp(-0.25, 0.25);
        target.torso.z -= input.lean * 0.35;
        target.head.x += input.pitch * 0.6;
        target.body_offset.x += input.lean * 0.15;

        // 3. Smoothing
        let smoothing = self.smoothing_rate(&target, state);
        self.pose.approach(&target, dt, smoothing);

        // 4. Overlays
        let mut body = self.pose;
        self.flinch.apply(&mut body);
        let swing = self.swing.hand_offset();
        let swing_kind = self.swing.active_kind();
        self.flinch.advance(dt);
        self.swing.advance(dt);

        // 5. World placement
        let root_rotation = Quat::from_rotation_y(input.yaw);
        let torso_rotation = root_rotation * euler_to_quat(body.torso);
        let head_rotation = torso_rotation * euler_to_quat(body.head);
        let pelvis = root + root_rotation * (Vec3::new(0.0, HIP_HEIGHT, 0.0) + body.body_offset);
        let chest = pelvis + torso_rotation * Vec3::new(0.0, CHEST_ABOVE_HIP, 0.0);

        let stance = HoldStance::select(&input);
        let category = weapon.map_or(WeaponCategory::Rifle, |w| w.category);
        let hand = hand_pose::hand_pose(category, stance);
        let mut local = hand.offset + hand_pose::pitch_correction(input.pitch) + swing.translation;
        if let Some(w) = weapon {
            local += hand_pose::secondary_motion(w, self.time, self.phase, state.is_moving());
        }
        let aim_rotation = root_rotation * Quat::from_rotation_x(input.pitch);
        let weapon_anchor = Transform {
            translation: chest + aim_rotation * local,
            rotation: aim_rotation * euler_to_quat(hand.rotation + swing.rotation),
        };

        let mirror = Vec3::new(-1.0, 1.0, 1.0);
        let relaxed_right = pelvis + torso_rotation * RELAXED_HAND;
        let relaxed_left = pelvis + torso_rotation * (RELAXED_HAND * mirror);

        let right_hand_target =
            weapon.map_or(relaxed_right, |w| weapon_anchor.transform_point(w.grip_point));
        let left_hand_target = match weapon {
            Some(w) if w.category.two_handed() && swing_kind != Some(SwingKind::Throw) => w
                .support_point
                .map_or(relaxed_left, |p| weapon_anchor.transform_point(p)),
            _ => relaxed_left,
        };

        // 6. Arms
        let right_shoulder = pelvis + torso_rotation * SHOULDER;
        let left_shoulder = pelvis + torso_rotation * (SHOULDER * mirror);
        let right_arm = ik::solve(
            &self.arm,
            right_shoulder,
            right_hand_target,
            right_shoulder + torso_rotation * ELBOW_HINT,
            Some(torso_rotation),
            &mut self.right_scratch,
        );
        let left_arm = ik::solve(
            &self.arm,
            left_shoulder,
            left_hand_target,
            left_shoulder + torso_rotation * (ELBOW_HINT * mirror),
            Some(torso_rotation),
            &mut self.left_scratch,
        );

        AvatarPose {
            locomotion: state,
            stance,
            root_position: root,
            root_rotation,
            body,
            pelvis,
            torso_rotation,
            head_rotation,
            weapon_anchor,
            right_hand_target,
            left_hand_target,
            right_arm,
            left_arm,
        }
    }
}

impl Default for ProceduralAnimator {
    fn default() -> Self {
        Self::new(AnimationTuning::default())
    }
}
