//! Client-side visual effects for remote avatars.
//!
//! These effects are NOT synced across clients. Each observer derives them
//! from the same replicated state (fire stamps, hit queues, broadcasts), so
//! every client shows the same thing without re-broadcasting.

use glam::Vec3;
use mirage_core::animator::{SwingKind, Transform};
use mirage_core::hits::BodyPart;
use mirage_core::weapon::{CyclingAction, ShellKind, WeaponCategory, WeaponVisualConfig};

/// Visual effect requested from the scene.
#[derive(Debug, Clone, PartialEq)]
pub enum EffectEvent {
    /// Flash at the muzzle, sized by the weapon's declared intensity/scale.
    MuzzleFlash {
        entity_id: String,
        position: Vec3,
        direction: Vec3,
        intensity: f32,
        scale: f32,
    },
    /// Spent casing thrown out to the right of the weapon.
    ShellEject {
        entity_id: String,
        position: Vec3,
        velocity: Vec3,
        kind: ShellKind,
    },
    /// Slide/bolt offset along the weapon's back axis.
    ActionTravel { entity_id: String, travel: f32 },
    /// Bullet impact.
    Impact {
        position: Vec3,
        normal: Vec3,
        body_part: Option<BodyPart>,
    },
    /// Ragdoll spawned in place of a rig.
    Ragdoll {
        entity_id: String,
        position: Vec3,
        impulse: Vec3,
    },
    /// Grenade or other thrown item leaving a hand.
    ThrownItem {
        thrower_id: String,
        item_id: String,
        origin: Vec3,
        velocity: Vec3,
    },
}

/// Receives effect events; implemented by the scene.
pub trait EffectsSink {
    fn spawn(&mut self, event: EffectEvent);
}

/// What a fire observation turned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireResult {
    /// No new shot since last poll.
    Idle,
    /// A shot from a firearm; effects were emitted if visible.
    Shot,
    /// Melee or throw: the animator overlay plays instead.
    Swing(SwingKind),
}

/// Slide/bolt travel for one shot, fit inside the weapon's fire interval.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct CycleAnimator {
    elapsed: f32,
    duration: f32,
    hold: f32,
    travel: f32,
    active: bool,
}

impl CycleAnimator {
    fn start(&mut self, action: &CyclingAction, fire_interval: f32) {
        let travel = action.travel();
        if travel <= 0.0 {
            self.active = false;
            return;
        }
        self.hold = match action {
            CyclingAction::Bolt { hold, .. } => hold.max(0.0),
            _ => 0.0,
        };
        // Leave a little slack so a full cycle finishes before the next shot.
        self.duration = (fire_interval * 0.8).max(0.03);
        self.hold = self.hold.min(self.duration * 0.5);
        self.travel = travel;
        self.elapsed = 0.0;
        self.active = true;
    }

    /// Advance and return the current offset, `None` when idle.
    fn advance(&mut self, dt: f32) -> Option<f32> {
        if !self.active {
            return None;
        }
        self.elapsed += dt;
        if self.elapsed >= self.duration {
            self.active = false;
            return Some(0.0);
        }
        let moving = self.duration - self.hold;
        let back = moving * 0.3;
        let t = self.elapsed;
        let offset = if t < back {
            t / back
        } else if t < back + self.hold {
            1.0
        } else {
            1.0 - (t - back - self.hold) / (moving - back)
        };
        Some(offset.clamp(0.0, 1.0) * self.travel)
    }
}

/// Per-entity fire detection and weapon effects.
///
/// Fire is detected from a monotonically increasing timestamp rather than
/// an edge-triggered flag, so a missed poll cannot lose or duplicate a shot.
#[derive(Debug, Clone, Default)]
pub struct VisualEffectsBridge {
    last_fired_at: Option<f64>,
    cycle: CycleAnimator,
}

impl VisualEffectsBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_fired_at(&self) -> Option<f64> {
        self.last_fired_at
    }

    /// Record `fired_at`; `true` only on a genuine increase. The first
    /// observed stamp is a baseline.
    pub fn observe(&mut self, fired_at: Option<f64>) -> bool {
        let Some(stamp) = fired_at else {
            return false;
        };
        match self.last_fired_at {
            None => {
                self.last_fired_at = Some(stamp);
                false
            }
            Some(last) if stamp > last => {
                self.last_fired_at = Some(stamp);
                true
            }
            Some(_) => false,
        }
    }

    /// Poll the fire stamp and emit effects for a new shot.
    ///
    /// Effects are emitted only when `anchor` is given (the avatar has a
    /// current pose and is visible); the stamp is consumed either way.
    pub fn poll(
        &mut self,
        entity_id: &str,
        fired_at: Option<f64>,
        weapon: Option<&WeaponVisualConfig>,
        anchor: Option<&Transform>,
        sink: &mut dyn EffectsSink,
    ) -> FireResult {
        if !self.observe(fired_at) {
            return FireResult::Idle;
        }
        let Some(weapon) = weapon else {
            return FireResult::Idle;
        };

        match weapon.category {
            WeaponCategory::Knife => return FireResult::Swing(SwingKind::Melee),
            WeaponCategory::Throwable => return FireResult::Swing(SwingKind::Throw),
            _ => {}
        }

        self.cycle.start(&weapon.action, weapon.fire_interval);

        let Some(anchor) = anchor else {
            return FireResult::Shot;
        };
        let forward = anchor.rotation * Vec3::NEG_Z;

        if !weapon.muzzle.is_silent() {
            sink.spawn(EffectEvent::MuzzleFlash {
                entity_id: entity_id.to_owned(),
                position: anchor.transform_point(weapon.muzzle.offset),
                direction: forward,
                intensity: weapon.muzzle.intensity,
                scale: weapon.muzzle.scale,
            });
        }

        if weapon.shell != ShellKind::None {
            let right = anchor.rotation * Vec3::X;
            let up = anchor.rotation * Vec3::Y;
            sink.spawn(EffectEvent::ShellEject {
                entity_id: entity_id.to_owned(),
                position: anchor.transform_point(Vec3::new(0.03, 0.02, -0.05)),
                velocity: right * 1.8 + up * 1.2,
                kind: weapon.shell,
            });
        }

        FireResult::Shot
    }

    /// Step slide/bolt travel. Emits an [`EffectEvent::ActionTravel`] while a
    /// cycle plays and once more when it returns to rest.
    pub fn advance(&mut self, entity_id: &str, dt: f32, sink: &mut dyn EffectsSink) {
        if let Some(travel) = self.cycle.advance(dt) {
            sink.spawn(EffectEvent::ActionTravel {
                entity_id: entity_id.to_owned(),
                travel,
            });
        }
    }

    /// Stop any slide/bolt cycle in progress.
    pub fn stop_cycle(&mut self) {
        self.cycle = CycleAnimator::default();
    }
}
