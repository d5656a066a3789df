//! One remote participant's local record.

use glam::{Quat, Vec3};
use mirage_core::animator::{AnimatorInput, AvatarPose, ProceduralAnimator, Transform};
use mirage_core::health::{HealthBar, HealthBarConfig};
use mirage_core::hits::{BodyPart, ProcessedIds};
use mirage_core::identity::{self, Identity, TeamRegistry};
use mirage_core::lod::phase_offset_for;
use mirage_core::math::{approach_vec3, is_finite_vec3};
use mirage_core::weapon::WeaponVisualConfig;
use mirage_protocol::{EntitySnapshot, RagdollPayload};
use thiserror::Error;

use crate::config::AvatarConfig;
use crate::effects::{EffectsSink, FireResult, VisualEffectsBridge};
use crate::render::RigHandle;
use crate::replication::RemoteHandle;

/// Shown when no name has been replicated.
pub const NAME_PLACEHOLDER: &str = "Unknown";

/// Position jumps faster than this (units/s) count as teleports.
const TELEPORT_SPEED: f32 = 50.0;
const VELOCITY_SMOOTHING: f32 = 10.0;

#[derive(Debug, Error)]
pub enum EntityError {
    #[error("entity {id}: non-finite replicated position {position:?}")]
    NonFinitePosition { id: String, position: Vec3 },

    #[error("entity {id}: no visual rig")]
    MissingRig { id: String },
}

/// ACTIVE (alive or dead by health) or RAGDOLLED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Active,
    Ragdolled,
}

/// Replicated stance flags kept for hitbox shaping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stance {
    pub prone: bool,
    pub crouching: bool,
    pub sliding: bool,
}

/// Oriented box for the local player's shot raycasts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hitbox<'a> {
    pub entity_id: &'a str,
    pub part: BodyPart,
    pub center: Vec3,
    pub half_extents: Vec3,
    pub rotation: Quat,
}

/// Smoothed velocity from position deltas.
#[derive(Debug, Clone, Copy, Default)]
struct VelocityEstimator {
    last: Option<Vec3>,
    velocity: Vec3,
}

impl VelocityEstimator {
    fn update(&mut self, position: Vec3, dt: f32) -> Vec3 {
        if dt > 0.0 {
            if let Some(last) = self.last {
                let raw = (position - last) / dt;
                self.velocity = if raw.length() > TELEPORT_SPEED {
                    Vec3::ZERO
                } else {
                    approach_vec3(self.velocity, raw, dt, VELOCITY_SMOOTHING)
                };
            }
            self.last = Some(position);
        }
        self.velocity
    }
}

pub struct RemoteEntity {
    handle: Box<dyn RemoteHandle>,
    id: String,
    name: String,
    team: Option<u32>,
    identity: Identity,
    pub(crate) rig: Option<RigHandle>,
    pub(crate) lifecycle: Lifecycle,
    health: HealthBar,
    position: Vec3,
    yaw: f32,
    stance: Stance,
    velocity: VelocityEstimator,
    pub(crate) animator: ProceduralAnimator,
    pub(crate) effects: VisualEffectsBridge,
    pub(crate) processed: ProcessedIds,
    pub(crate) weapon: Option<WeaponVisualConfig>,
    pub(crate) loadout: Option<u32>,
    phase_offset: u32,
    /// Time since the animator last ran.
    pub(crate) pending_dt: f32,
    pub(crate) occluded: bool,
    pub(crate) obstruction: Option<f32>,
    pub(crate) visible: bool,
    pub(crate) last_pose: Option<AvatarPose>,
    pub(crate) last_ragdoll_stamp: Option<f64>,
    /// Newer ragdoll payload seen while still alive.
    pub(crate) pending_ragdoll: Option<RagdollPayload>,
    /// Ragdolled and seen dead since; the next alive reading respawns.
    pub(crate) respawn_armed: bool,
    /// No tick has run yet.
    pub(crate) fresh: bool,
    kills: u32,
    deaths: u32,
    death_counted: bool,
    dead_since_count: bool,
    /// Set after the first logged step failure; cleared on success.
    pub(crate) failing: bool,
}

impl std::fmt::Debug for RemoteEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteEntity")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("team", &self.team)
            .field("lifecycle", &self.lifecycle)
            .field("health", &self.health)
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}

impl RemoteEntity {
    pub(crate) fn new(
        handle: Box<dyn RemoteHandle>,
        config: &AvatarConfig,
        teams: &TeamRegistry,
    ) -> Self {
        let id = handle.id().to_owned();
        let identity = identity::resolve(&id, None, config.combat.mode, teams);
        Self {
            handle,
            phase_offset: phase_offset_for(&id),
            name: NAME_PLACEHOLDER.to_owned(),
            team: None,
            identity,
            rig: None,
            lifecycle: Lifecycle::Active,
            health: HealthBar::default(),
            position: Vec3::ZERO,
            yaw: 0.0,
            stance: Stance::default(),
            velocity: VelocityEstimator::default(),
            animator: ProceduralAnimator::new(config.animation),
            effects: VisualEffectsBridge::new(),
            processed: ProcessedIds::new(),
            weapon: None,
            loadout: None,
            pending_dt: 0.0,
            occluded: false,
            obstruction: None,
            visible: false,
            last_pose: None,
            last_ragdoll_stamp: None,
            pending_ragdoll: None,
            respawn_armed: false,
            fresh: true,
            kills: 0,
            deaths: 0,
            death_counted: false,
            dead_since_count: false,
            failing: false,
            id,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replicated team, `None` if absent.
    pub fn team(&self) -> Option<u32> {
        self.team
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn health(&self) -> f32 {
        self.health.current()
    }

    /// Lagging health-bar value.
    pub fn displayed_health(&self) -> f32 {
        self.health.displayed()
    }

    pub fn is_alive(&self) -> bool {
        !self.health.is_dead()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity.velocity
    }

    pub fn kills(&self) -> u32 {
        self.kills
    }

    pub fn deaths(&self) -> u32 {
        self.deaths
    }

    pub fn weapon(&self) -> Option<&WeaponVisualConfig> {
        self.weapon.as_ref()
    }

    /// Whether the entity passed the visibility test on the last tick.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn last_pose(&self) -> Option<&AvatarPose> {
        self.last_pose.as_ref()
    }

    pub fn rig(&self) -> Option<RigHandle> {
        self.rig
    }

    pub fn phase_offset(&self) -> u32 {
        self.phase_offset
    }

    pub fn processed_hits(&self) -> &ProcessedIds {
        &self.processed
    }

    pub(crate) fn read_snapshot(&self) -> EntitySnapshot {
        EntitySnapshot::read(|key| self.handle.get_state(key))
    }

    /// Position and health; runs every tick regardless of LOD.
    pub(crate) fn sync(
        &mut self,
        snapshot: &EntitySnapshot,
        dt: f32,
        health_bar: &HealthBarConfig,
    ) -> Result<(), EntityError> {
        if let Some(position) = snapshot.position {
            if !is_finite_vec3(position) {
                return Err(EntityError::NonFinitePosition {
                    id: self.id.clone(),
                    position,
                });
            }
            self.position = position;
        }
        self.velocity.update(self.position, dt);
        self.yaw = snapshot.yaw;
        self.stance = Stance {
            prone: snapshot.prone,
            crouching: snapshot.crouching,
            sliding: snapshot.sliding,
        };

        self.health.update(snapshot.health, dt, health_bar);
        if self.death_counted {
            if self.health.is_dead() {
                self.dead_since_count = true;
            } else if self.dead_since_count {
                // Back alive after the counted death: next death counts.
                self.death_counted = false;
                self.dead_since_count = false;
            }
        }
        Ok(())
    }

    /// Re-resolve name and identity. Returns `true` if anything changed.
    pub(crate) fn revalidate_identity(
        &mut self,
        snapshot: &EntitySnapshot,
        config: &AvatarConfig,
        teams: &TeamRegistry,
    ) -> bool {
        let name = snapshot.name.as_deref().unwrap_or(NAME_PLACEHOLDER);
        let identity = identity::resolve(&self.id, snapshot.team, config.combat.mode, teams);
        let changed = name != self.name || snapshot.team != self.team || identity != self.identity;
        if changed {
            self.name = name.to_owned();
            self.team = snapshot.team;
            self.identity = identity;
        }
        changed
    }

    /// Count a death once per life. Returns `false` for a duplicate.
    pub(crate) fn record_death(&mut self) -> bool {
        if self.death_counted {
            return false;
        }
        self.deaths += 1;
        self.death_counted = true;
        self.dead_since_count = self.health.is_dead();
        true
    }

    pub(crate) fn record_kill(&mut self) {
        self.kills += 1;
    }

    pub(crate) fn poll_fire(
        &mut self,
        fired_at: Option<f64>,
        anchor: Option<&Transform>,
        sink: &mut dyn EffectsSink,
    ) -> FireResult {
        self.effects
            .poll(&self.id, fired_at, self.weapon.as_ref(), anchor, sink)
    }

    pub(crate) fn advance_effects(&mut self, dt: f32, sink: &mut dyn EffectsSink) {
        self.effects.advance(&self.id, dt, sink);
    }

    /// Run the animator for `dt` and keep the result.
    pub(crate) fn animate(&mut self, input: &AnimatorInput, dt: f32) -> &AvatarPose {
        let pose = self
            .animator
            .update(self.position, input, self.weapon.as_ref(), dt);
        self.last_pose.insert(pose)
    }

    /// Head, torso and legs boxes for the current stance.
    pub fn hitboxes(&self) -> [Hitbox<'_>; 3] {
        let rotation = Quat::from_rotation_y(self.yaw);
        let layout: [(BodyPart, Vec3, Vec3); 3] = if self.stance.prone {
            [
                (BodyPart::Head, Vec3::new(0.0, 0.25, -0.6), Vec3::splat(0.12)),
                (BodyPart::Torso, Vec3::new(0.0, 0.2, -0.1), Vec3::new(0.25, 0.18, 0.35)),
                (BodyPart::Legs, Vec3::new(0.0, 0.15, 0.6), Vec3::new(0.2, 0.15, 0.45)),
            ]
        } else if self.stance.crouching || self.stance.sliding {
            [
                (BodyPart::Head, Vec3::new(0.0, 1.2, -0.05), Vec3::splat(0.12)),
                (BodyPart::Torso, Vec3::new(0.0, 0.85, 0.0), Vec3::new(0.24, 0.28, 0.16)),
                (BodyPart::Legs, Vec3::new(0.0, 0.3, 0.0), Vec3::new(0.18, 0.3, 0.2)),
            ]
        } else {
            [
                (BodyPart::Head, Vec3::new(0.0, 1.62, 0.0), Vec3::splat(0.12)),
                (BodyPart::Torso, Vec3::new(0.0, 1.2, 0.0), Vec3::new(0.24, 0.3, 0.14)),
                (BodyPart::Legs, Vec3::new(0.0, 0.45, 0.0), Vec3::new(0.18, 0.45, 0.14)),
            ]
        };
        layout.map(|(part, offset, half_extents)| Hitbox {
            entity_id: &self.id,
            part,
            center: self.position + rotation * offset,
            half_extents,
            rotation,
        })
    }
}
