//! Per-frame driver for every remote avatar.
//!
//! Each [`RemoteEntityRegistry::tick`] drains queued session events, then
//! walks the entities once. Root placement and health run for every entity
//! every tick. Animation runs on a distance-based cadence when visible, and
//! the expensive checks (occlusion, obstruction, weapon diff, identity) run
//! on their own staggered cadences. A failure in one entity's step skips
//! that entity for the tick and never touches the others.

use std::collections::HashMap;
use std::f32::consts::TAU;

use glam::{Quat, Vec3};
use mirage_core::animator::{AnimatorInput, SwingKind};
use mirage_core::hits::{HitEvent, HitOutcome, HitReconciler, Observer, Shooter};
use mirage_core::identity::{Identity, TeamRegistry};
use mirage_core::lod::{self, Frustum, StaggerCadence};
use mirage_core::math::normalize_or;
use mirage_core::weapon::{loadout_hash, WeaponCatalog};
use mirage_protocol::{decode_broadcast, BroadcastEvent, DeathEvent, ThrowEvent};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, trace, warn};

use crate::config::AvatarConfig;
use crate::effects::{EffectEvent, EffectsSink, FireResult};
use crate::entity::{EntityError, Hitbox, Lifecycle, RemoteEntity};
use crate::feedback::{DamageReport, LocalFeedback, LocalObserver};
use crate::render::{CameraSnapshot, LineOfSight, SceneBackend};
use crate::replication::{RemoteHandle, SessionEvent, SessionInbox, SessionSender};

/// Height of the visibility sphere's center above the feet.
const BODY_CENTER_HEIGHT: f32 = 0.9;
/// Origin of the forward obstruction probe, roughly weapon height.
const PROBE_HEIGHT: f32 = 1.35;
const PROBE_DISTANCE: f32 = 1.5;

/// Collaborators borrowed for one tick.
pub struct FrameContext<'a> {
    pub camera: CameraSnapshot,
    pub scene: &'a mut dyn SceneBackend,
    pub effects: &'a mut dyn EffectsSink,
    pub feedback: &'a mut dyn LocalFeedback,
    /// Static geometry for occlusion and obstruction; `None` skips both.
    pub line_of_sight: Option<&'a dyn LineOfSight>,
}

/// Scoreboard row.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySummary<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub team: Option<u32>,
    pub identity: &'a Identity,
    pub health: f32,
    pub displayed_health: f32,
    pub alive: bool,
    pub kills: u32,
    pub deaths: u32,
}

pub struct RemoteEntityRegistry {
    config: AvatarConfig,
    catalog: WeaponCatalog,
    teams: TeamRegistry,
    reconciler: HitReconciler,
    entities: Vec<RemoteEntity>,
    index: HashMap<String, usize>,
    local: LocalObserver,
    inbox: SessionInbox,
    rng: StdRng,
    tick: u64,
}

impl RemoteEntityRegistry {
    pub fn new(config: AvatarConfig, local: LocalObserver) -> Self {
        Self {
            catalog: config.weapon_catalog(),
            teams: config.team_registry(),
            reconciler: HitReconciler::new(config.combat),
            config,
            entities: Vec::new(),
            index: HashMap::new(),
            local,
            inbox: SessionInbox::new(),
            rng: StdRng::from_entropy(),
            tick: 0,
        }
    }

    /// Deterministic ragdoll impulses.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn config(&self) -> &AvatarConfig {
        &self.config
    }

    pub fn catalog(&self) -> &WeaponCatalog {
        &self.catalog
    }

    /// Producer for session callbacks. Events are applied on the next tick.
    pub fn session_sender(&self) -> SessionSender {
        self.inbox.sender()
    }

    pub fn local(&self) -> &LocalObserver {
        &self.local
    }

    pub fn local_mut(&mut self) -> &mut LocalObserver {
        &mut self.local
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn entity(&self, id: &str) -> Option<&RemoteEntity> {
        self.index.get(id).map(|&i| &self.entities[i])
    }

    pub fn entities(&self) -> impl Iterator<Item = &RemoteEntity> + '_ {
        self.entities.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.entities.iter().map(RemoteEntity::id)
    }

    pub fn summaries(&self) -> impl Iterator<Item = EntitySummary<'_>> + '_ {
        self.entities.iter().map(|e| EntitySummary {
            id: e.id(),
            name: e.name(),
            team: e.team(),
            identity: e.identity(),
            health: e.health(),
            displayed_health: e.displayed_health(),
            alive: e.is_alive(),
            kills: e.kills(),
            deaths: e.deaths(),
        })
    }

    /// Hitboxes of every visible, standing, living avatar.
    pub fn visible_hitboxes(&self) -> Vec<Hitbox<'_>> {
        self.entities
            .iter()
            .filter(|e| e.is_visible() && e.lifecycle() == Lifecycle::Active && e.is_alive())
            .flat_map(RemoteEntity::hitboxes)
            .collect()
    }

    /// Start tracking a participant. A duplicate id or the local player's
    /// own id is ignored.
    pub fn add_entity(
        &mut self,
        handle: Box<dyn RemoteHandle>,
        scene: &mut dyn SceneBackend,
    ) -> bool {
        let id = handle.id().to_owned();
        if id == self.local.id {
            debug!(entity = %id, "ignoring join for the local player");
            return false;
        }
        if self.index.contains_key(&id) {
            debug!(entity = %id, "duplicate join ignored");
            return false;
        }

        let mut entity = RemoteEntity::new(handle, &self.config, &self.teams);
        entity.rig = scene.create_rig(&id, entity.identity());
        if entity.rig.is_none() {
            warn!(entity = %id, "scene could not create a rig, will retry");
        }
        info!(entity = %id, team = entity.identity().team_id, "remote entity joined");

        self.index.insert(id, self.entities.len());
        self.entities.push(entity);
        true
    }

    /// Stop tracking a participant. A live, standing avatar leaves a
    /// ragdoll behind with a randomized push.
    pub fn remove_entity(
        &mut self,
        id: &str,
        scene: &mut dyn SceneBackend,
        effects: &mut dyn EffectsSink,
    ) -> bool {
        let Some(i) = self.index.remove(id) else {
            debug!(entity = %id, "leave for unknown entity");
            return false;
        };
        let entity = self.entities.swap_remove(i);
        if let Some(moved) = self.entities.get(i) {
            self.index.insert(moved.id().to_owned(), i);
        }

        if entity.lifecycle() == Lifecycle::Active && entity.is_alive() {
            let impulse = self.leave_impulse();
            effects.spawn(EffectEvent::Ragdoll {
                entity_id: entity.id().to_owned(),
                position: entity.position(),
                impulse,
            });
        }
        if let Some(rig) = entity.rig() {
            scene.destroy_rig(rig);
        }
        info!(entity = %id, kills = entity.kills(), deaths = entity.deaths(), "remote entity left");
        true
    }

    /// Dispose every rig without ragdolls (session teardown).
    pub fn remove_all(&mut self, scene: &mut dyn SceneBackend) {
        for entity in self.entities.drain(..) {
            if let Some(rig) = entity.rig() {
                scene.destroy_rig(rig);
            }
        }
        self.index.clear();
        info!("all remote entities removed");
    }

    fn leave_impulse(&mut self) -> Vec3 {
        let ragdoll = self.config.ragdoll;
        let angle: f32 = self.rng.gen_range(0.0..TAU);
        let jitter = if ragdoll.jitter > 0.0 {
            self.rng.gen_range(0.0..ragdoll.jitter)
        } else {
            0.0
        };
        let push = ragdoll.base_impulse + jitter;
        Vec3::new(angle.cos() * push, ragdoll.upward_impulse, angle.sin() * push)
    }

    fn team_of(&self, id: &str) -> Option<u32> {
        self.index
            .get(id)
            .map(|&i| self.entities[i].identity().team_id)
    }

    /// Advance every remote avatar by `dt` seconds.
    pub fn tick(&mut self, dt: f32, frame: &mut FrameContext<'_>) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.tick += 1;
        self.drain_session(frame);

        let frustum = Frustum::from_view_projection(frame.camera.view_projection);
        let mut queues = Vec::new();
        for i in 0..self.entities.len() {
            let hits = match self.step_entity(i, dt, &frustum, frame) {
                Ok(hits) => {
                    let entity = &mut self.entities[i];
                    if entity.failing {
                        entity.failing = false;
                        debug!(entity = %entity.id(), "entity recovered");
                    }
                    hits
                }
                Err(err) => {
                    let entity = &mut self.entities[i];
                    if entity.failing {
                        debug!(entity = %entity.id(), error = %err, "entity still failing");
                    } else {
                        entity.failing = true;
                        warn!(entity = %entity.id(), error = %err, "skipping entity this tick");
                    }
                    continue;
                }
            };
            if !hits.is_empty() {
                queues.push((i, hits));
            }
        }

        // After every entity has synced, so target teams are current.
        for (i, hits) in queues {
            let outcomes = self.reconcile_hits(i, &hits);
            self.apply_outcomes(i, outcomes, frame);
        }
    }

    fn drain_session(&mut self, frame: &mut FrameContext<'_>) {
        let events: Vec<SessionEvent> = self.inbox.drain().collect();
        for event in events {
            match event {
                SessionEvent::Join(handle) => {
                    self.add_entity(handle, frame.scene);
                }
                SessionEvent::Leave { id } => {
                    self.remove_entity(&id, frame.scene, frame.effects);
                }
                SessionEvent::Broadcast {
                    sender_id,
                    name,
                    payload,
                } => match decode_broadcast(&name, &payload) {
                    Ok(BroadcastEvent::Death(death)) => self.handle_death(&sender_id, death, frame),
                    Ok(BroadcastEvent::Throw(throw)) => self.handle_throw(&sender_id, throw, frame),
                    Err(err) => {
                        warn!(
                            entity = %sender_id,
                            event = %name,
                            error = %err,
                            "dropping malformed broadcast"
                        );
                    }
                },
            }
        }
    }

    fn handle_death(&mut self, victim_id: &str, death: DeathEvent, frame: &mut FrameContext<'_>) {
        let counted = if victim_id == self.local.id {
            self.local.record_death()
        } else if let Some(&i) = self.index.get(victim_id) {
            self.entities[i].record_death()
        } else {
            debug!(entity = %victim_id, "death for unknown entity");
            return;
        };
        if !counted {
            debug!(entity = %victim_id, "duplicate death ignored");
            return;
        }
        info!(entity = %victim_id, killer = ?death.killer_id, "death");

        let Some(killer) = death.killer_id.as_deref() else {
            return;
        };
        if killer == victim_id {
            return;
        }
        if killer == self.local.id {
            self.local.record_kill();
            frame.feedback.on_kill_confirmed(victim_id);
        } else if let Some(&k) = self.index.get(killer) {
            self.entities[k].record_kill();
        }
    }

    fn handle_throw(&mut self, thrower_id: &str, throw: ThrowEvent, frame: &mut FrameContext<'_>) {
        let Some(&i) = self.index.get(thrower_id) else {
            debug!(entity = %thrower_id, item = %throw.item_id, "throw from unknown entity");
            return;
        };
        let entity = &mut self.entities[i];
        if !entity.processed.insert(&throw.dedupe_key(thrower_id)) {
            debug!(entity = %thrower_id, item = %throw.item_id, "duplicate throw ignored");
            return;
        }

        if entity.animator.swing().active_kind() != Some(SwingKind::Throw) {
            entity.animator.trigger_swing(SwingKind::Throw);
        }
        frame.effects.spawn(EffectEvent::ThrownItem {
            thrower_id: thrower_id.to_owned(),
            item_id: throw.item_id,
            origin: throw.origin,
            velocity: throw.velocity,
        });
    }

    /// One entity's tick. Returns its replicated hit queue for
    /// reconciliation.
    fn step_entity(
        &mut self,
        i: usize,
        dt: f32,
        frustum: &Frustum,
        frame: &mut FrameContext<'_>,
    ) -> Result<Vec<HitEvent>, EntityError> {
        let tick = self.tick;
        let Self {
            config,
            catalog,
            teams,
            entities,
            ..
        } = self;
        let entity = &mut entities[i];
        let snapshot = entity.read_snapshot();

        // Every tick: root and health
        entity.sync(&snapshot, dt, &config.health_bar)?;
        let rig = match entity.rig {
            Some(rig) => rig,
            None => {
                let rig = frame
                    .scene
                    .create_rig(entity.id(), entity.identity())
                    .ok_or_else(|| EntityError::MissingRig {
                        id: entity.id().to_owned(),
                    })?;
                entity.rig = Some(rig);
                rig
            }
        };
        frame.scene.place_rig(rig, entity.position(), entity.yaw());
        frame
            .scene
            .set_health(rig, entity.health(), entity.displayed_health());

        let phase = entity.phase_offset();
        let fresh = entity.fresh;
        entity.fresh = false;

        // Hits already queued on join were applied before this record
        // existed (earlier session, reconnect).
        if fresh {
            for hit in &snapshot.hits {
                entity.processed.insert(&hit.id);
            }
        }

        // Identity
        if fresh || StaggerCadence::due(tick, phase, config.stagger.identity) {
            if entity.revalidate_identity(&snapshot, config, teams) || fresh {
                frame.scene.set_identity(rig, entity.name(), entity.identity());
                debug!(
                    entity = %entity.id(),
                    name = %entity.name(),
                    team = entity.identity().team_id,
                    "identity resolved"
                );
            }
        }

        // Weapon
        if fresh || StaggerCadence::due(tick, phase, config.stagger.weapon_diff) {
            let weapon_id = snapshot.weapon_id.as_deref();
            let hash = loadout_hash(weapon_id.unwrap_or(""), &snapshot.attachments);
            if entity.loadout != Some(hash) {
                entity.loadout = Some(hash);
                entity.weapon = weapon_id.map(|id| catalog.resolve(id, &snapshot.attachments));
                entity.effects.stop_cycle();
                frame.scene.equip_weapon(rig, entity.weapon.as_ref());
                debug!(
                    entity = %entity.id(),
                    weapon = weapon_id.unwrap_or("none"),
                    "weapon equipped"
                );
            }
        }

        // Ragdoll and respawn. A payload present on join belongs to an
        // earlier life unless the entity is already dead; later payloads
        // wait until health reaches zero.
        if let Some(payload) = snapshot.ragdoll {
            let newer = match entity.last_ragdoll_stamp {
                Some(last) => payload.stamp > last,
                None => !fresh || !entity.is_alive(),
            };
            entity.last_ragdoll_stamp = Some(
                entity
                    .last_ragdoll_stamp
                    .map_or(payload.stamp, |last| last.max(payload.stamp)),
            );
            if newer && entity.lifecycle == Lifecycle::Active {
                entity.pending_ragdoll = Some(payload);
            }
        }
        if entity.lifecycle == Lifecycle::Active && !entity.is_alive() {
            if let Some(payload) = entity.pending_ragdoll.take() {
                entity.lifecycle = Lifecycle::Ragdolled;
                entity.respawn_armed = true;
                entity.effects.stop_cycle();
                frame.scene.set_rig_visible(rig, false);
                frame.effects.spawn(EffectEvent::Ragdoll {
                    entity_id: entity.id().to_owned(),
                    position: payload.point.unwrap_or(entity.position()),
                    impulse: payload.impulse,
                });
                info!(entity = %entity.id(), stamp = payload.stamp, "ragdolled");
            }
        }
        if entity.lifecycle == Lifecycle::Ragdolled {
            if !entity.is_alive() {
                entity.respawn_armed = true;
            } else if entity.respawn_armed {
                entity.lifecycle = Lifecycle::Active;
                entity.respawn_armed = false;
                entity.last_pose = None;
                frame.scene.set_rig_visible(rig, true);
                info!(entity = %entity.id(), "respawned");
            }
        }
        let active = entity.lifecycle == Lifecycle::Active;

        // Visibility and LOD
        let camera = frame.camera.position;
        let center = entity.position() + Vec3::Y * BODY_CENTER_HEIGHT;
        let visibility = config.lod.visibility(frustum, camera, center);
        if visibility.in_frustum && !visibility.in_buffer {
            if let Some(los) = frame.line_of_sight {
                if fresh || StaggerCadence::due(tick, phase, config.stagger.occlusion) {
                    entity.occluded = !los.is_clear(camera, center);
                }
            }
        } else {
            entity.occluded = false;
        }
        entity.visible = visibility.is_visible();
        let skip = config.lod.skip_for(&visibility, entity.occluded);

        // Fire
        let anchor = if entity.visible && active {
            entity.last_pose.as_ref().map(|pose| pose.weapon_anchor)
        } else {
            None
        };
        let fired = entity.poll_fire(snapshot.fired_at, anchor.as_ref(), frame.effects);
        if let FireResult::Swing(kind) = fired {
            if active {
                entity.animator.trigger_swing(kind);
            }
        }

        // Animation
        entity.pending_dt += dt;
        let Some(skip) = skip else {
            trace!(entity = %entity.id(), distance = visibility.distance, "culled");
            return Ok(snapshot.hits);
        };
        if !active || !lod::is_due(tick, phase, skip) {
            return Ok(snapshot.hits);
        }
        trace!(
            entity = %entity.id(),
            distance = visibility.distance,
            skip,
            occluded = entity.occluded,
            "animating"
        );

        match frame.line_of_sight {
            Some(los) => {
                if fresh || StaggerCadence::due(tick, phase, config.stagger.obstruction) {
                    let origin = entity.position() + Vec3::Y * PROBE_HEIGHT;
                    let forward = Quat::from_rotation_y(entity.yaw()) * Vec3::NEG_Z;
                    entity.obstruction = los.cast_ray(origin, forward, PROBE_DISTANCE);
                }
            }
            None => entity.obstruction = None,
        }

        let input = AnimatorInput {
            prone: snapshot.prone,
            sliding: snapshot.sliding,
            crouching: snapshot.crouching,
            ads: snapshot.ads,
            sprinting: snapshot.sprinting,
            pitch: snapshot.pitch,
            yaw: entity.yaw(),
            lean: snapshot.lean,
            velocity: entity.velocity(),
            obstruction: entity.obstruction,
        };
        let step = std::mem::take(&mut entity.pending_dt);
        let pose = entity.animate(&input, step);
        frame.scene.apply_pose(rig, pose);
        entity.advance_effects(step, frame.effects);

        Ok(snapshot.hits)
    }

    fn reconcile_hits(&mut self, i: usize, hits: &[HitEvent]) -> Vec<HitOutcome> {
        let mut processed = std::mem::take(&mut self.entities[i].processed);
        let outcomes = {
            let shooter = &self.entities[i];
            self.reconciler.reconcile(
                &mut processed,
                Shooter {
                    id: shooter.id(),
                    team_id: shooter.identity().team_id,
                },
                Observer {
                    id: &self.local.id,
                    team_id: self.local.team_id,
                },
                hits,
                |id| self.team_of(id),
            )
        };
        self.entities[i].processed = processed;
        outcomes
    }

    fn apply_outcomes(
        &mut self,
        shooter: usize,
        outcomes: Vec<HitOutcome>,
        frame: &mut FrameContext<'_>,
    ) {
        let shooter_position = self.entities[shooter].position();
        for outcome in outcomes {
            match outcome {
                HitOutcome::LocalDamage { event, shooter_id } => {
                    let health_after = self.local.apply_damage(event.damage);
                    debug!(
                        entity = %shooter_id,
                        hit = %event.id,
                        damage = event.damage,
                        health = health_after,
                        "local player hit"
                    );
                    frame.feedback.on_local_damage(&DamageReport {
                        hit_id: event.id,
                        shooter_id,
                        damage: event.damage,
                        body_part: event.body_part,
                        origin: event.origin,
                        stealth: event.stealth,
                        health_after,
                    });
                }
                HitOutcome::RemoteFlinch { target_id, event } => {
                    if let Some(&t) = self.index.get(&target_id) {
                        let target = &mut self.entities[t];
                        let from = event.origin.unwrap_or(shooter_position);
                        let chest = target.position() + Vec3::Y * 1.2;
                        let travel = normalize_or(chest - from, -event.normal);
                        let local = Quat::from_rotation_y(target.yaw()).inverse() * travel;
                        if target.lifecycle() == Lifecycle::Active {
                            target.animator.trigger_flinch(event.body_part, local);
                        }
                    }
                    frame.effects.spawn(EffectEvent::Impact {
                        position: event.position,
                        normal: event.normal,
                        body_part: Some(event.body_part),
                    });
                }
                HitOutcome::Impact { event } => {
                    frame.effects.spawn(EffectEvent::Impact {
                        position: event.position,
                        normal: event.normal,
                        body_part: None,
                    });
                }
                HitOutcome::Blocked { event } => {
                    trace!(hit = %event.id, "hit blocked by combat rules");
                }
            }
        }
    }
}

impl std::fmt::Debug for RemoteEntityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteEntityRegistry")
            .field("entities", &self.entities)
            .field("local", &self.local)
            .field("tick", &self.tick)
            .finish_non_exhaustive()
    }
}
