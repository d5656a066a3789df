//! Short additive motions layered over the locomotion pose.
//!
//! - Flinch: decaying hit reaction, `(remaining / duration)^2`
//! - Swing: melee stab or throw arc under a half-sine envelope

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::hits::BodyPart;
use crate::math::{normalize_or, sine_envelope};

use super::BodyPose;

/// Additive hit reaction.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Flinch {
    remaining: f32,
    duration: f32,
    part: BodyPart,
    /// +1 when pushed backward (hit from the front), -1 otherwise.
    front_sign: f32,
    /// Lateral push direction in avatar space, -1..1.
    lateral: f32,
}

impl Flinch {
    /// Start (or restart) a flinch. `local_direction` is the direction the
    /// hit travelled, in avatar space (forward is -Z).
    pub fn trigger(&mut self, part: BodyPart, local_direction: Vec3, duration: f32) {
        let dir = normalize_or(local_direction, Vec3::Z);
        self.remaining = duration;
        self.duration = duration;
        self.part = part;
        self.front_sign = if dir.z >= 0.0 { 1.0 } else { -1.0 };
        self.lateral = dir.x.clamp(-1.0, 1.0);
    }

    pub fn is_active(&self) -> bool {
        self.remaining > 0.0
    }

    /// Current strength, 1 at trigger and 0 once expired.
    pub fn intensity(&self) -> f32 {
        if self.duration <= 0.0 || self.remaining <= 0.0 {
            return 0.0;
        }
        let t = self.remaining / self.duration;
        t * t
    }

    pub fn advance(&mut self, dt: f32) {
        self.remaining = (self.remaining - dt).max(0.0);
    }

    /// Add the flinch to `pose`.
    pub fn apply(&self, pose: &mut BodyPose) {
        let k = self.intensity();
        if k <= 0.0 {
            return;
        }
        let w = self.part.flinch_weight();

        pose.torso.x += self.front_sign * 0.35 * w * k;
        pose.torso.z -= self.lateral * 0.2 * w * k;
        pose.body_offset.x += self.lateral * 0.06 * k;
        pose.body_offset.z += self.front_sign * 0.04 * k;

        match self.part {
            BodyPart::Head => pose.head.x += self.front_sign * 0.5 * k,
            BodyPart::Legs => pose.body_offset.y -= 0.05 * k,
            BodyPart::LeftArm => pose.torso.y += 0.15 * k,
            BodyPart::RightArm => pose.torso.y -= 0.15 * k,
            BodyPart::Torso => {}
        }
    }
}

/// Which swing curve to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwingKind {
    /// Knife stab straight forward.
    Melee,
    /// Overhead arc ending in a wrist flick.
    Throw,
}

/// Offset applied to the weapon hand during a swing, in chest space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HandOffset {
    pub translation: Vec3,
    /// Euler `(pitch, yaw, roll)`.
    pub rotation: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Swing {
    kind: Option<SwingKind>,
    elapsed: f32,
    duration: f32,
}

impl Swing {
    pub fn trigger(&mut self, kind: SwingKind, duration: f32) {
        self.kind = Some(kind);
        self.elapsed = 0.0;
        self.duration = duration.max(f32::EPSILON);
    }

    pub fn active_kind(&self) -> Option<SwingKind> {
        self.kind
    }

    pub fn advance(&mut self, dt: f32) {
        if self.kind.is_none() {
            return;
        }
        self.elapsed += dt;
        if self.elapsed >= self.duration {
            self.kind = None;
            self.elapsed = 0.0;
        }
    }

    /// Normalized progress 0..1, `None` when idle.
    pub fn progress(&self) -> Option<f32> {
        self.kind.map(|_| (self.elapsed / self.duration).clamp(0.0, 1.0))
    }

    pub fn hand_offset(&self) -> HandOffset {
        let (Some(kind), Some(u)) = (self.kind, self.progress()) else {
            return HandOffset::default();
        };
        let env = sine_envelope(u);
        match kind {
            SwingKind::Melee => HandOffset {
                translation: Vec3::new(0.0, 0.05 * env, -0.35 * env),
                rotation: Vec3::new(-0.2 * env, 0.0, 0.0),
            },
            SwingKind::Throw => HandOffset {
                // Behind the shoulder early, forward and down late.
                translation: Vec3::new(0.05 * env, 0.3 * env, (0.25 - 0.7 * u) * env),
                rotation: Vec3::new(-1.2 * u * u * env, 0.0, 0.3 * env),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flinch_decays_quadratically() {
        let mut f = Flinch::default();
        f.trigger(BodyPart::Torso, Vec3::Z, 0.2);
        assert!((f.intensity() - 1.0).abs() < 1e-6);
        f.advance(0.1);
        assert!((f.intensity() - 0.25).abs() < 1e-6);
        f.advance(0.2);
        assert_eq!(f.intensity(), 0.0);
        assert!(!f.is_active());
    }

    #[test]
    fn test_flinch_front_back_flip_torque() {
        let mut front = Flinch::default();
        front.trigger(BodyPart::Torso, Vec3::Z, 0.2);
        let mut back = Flinch::default();
        back.trigger(BodyPart::Torso, Vec3::NEG_Z, 0.2);

        let mut a = BodyPose::default();
        let mut b = BodyPose::default();
        front.apply(&mut a);
        back.apply(&mut b);
        assert!(a.torso.x > 0.0);
        assert!(b.torso.x < 0.0);
    }

    #[test]
    fn test_flinch_lateral_bias() {
        let mut f = Flinch::default();
        f.trigger(BodyPart::Torso, Vec3::new(1.0, 0.0, 0.0), 0.2);
        let mut pose = BodyPose::default();
        f.apply(&mut pose);
        assert!(pose.body_offset.x > 0.0);
    }

    #[test]
    fn test_head_flinch_stronger_than_legs() {
        let mut head = Flinch::default();
        head.trigger(BodyPart::Head, Vec3::Z, 0.2);
        let mut legs = Flinch::default();
        legs.trigger(BodyPart::Legs, Vec3::Z, 0.2);
        let mut a = BodyPose::default();
        let mut b = BodyPose::default();
        head.apply(&mut a);
        legs.apply(&mut b);
        assert!(a.torso.x > b.torso.x);
        assert!(a.head.x > 0.0);
    }

    #[test]
    fn test_swing_envelope_returns_to_rest() {
        let mut s = Swing::default();
        s.trigger(SwingKind::Melee, 0.4);
        s.advance(0.2);
        let peak = s.hand_offset();
        assert!((peak.translation.z + 0.35).abs() < 1e-4);
        s.advance(0.2);
        assert_eq!(s.active_kind(), None);
        assert_eq!(s.hand_offset(), HandOffset::default());
    }

    #[test]
    fn test_throw_differs_from_stab() {
        let mut stab = Swing::default();
        stab.trigger(SwingKind::Melee, 0.4);
        let mut throw = Swing::default();
        throw.trigger(SwingKind::Throw, 0.4);
        stab.advance(0.1);
        throw.advance(0.1);
        // Throw starts high and behind; stab goes straight forward.
        assert!(throw.hand_offset().translation.y > stab.hand_offset().translation.y);
        assert!(throw.hand_offset().translation.z > 0.0);
        assert!(stab.hand_offset().translation.z < 0.0);
    }
}
