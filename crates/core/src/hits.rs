//! Idempotent hit application.
//!
//! Every remote entity replicates a short list of its most recent hit events.
//! Observers scan those lists every tick and apply each event id at most
//! once. Nothing is re-broadcast: all observers read the same lists and reach
//! the same visual outcome on their own, which is why an id gate is enough.
//!
//! Kill and score bookkeeping do NOT come through here; they use the separate
//! death notification channel.

use std::collections::{HashSet, VecDeque};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::identity::GameMode;

/// Maximum ids remembered per entity before the oldest are evicted.
pub const MAX_PROCESSED_IDS: usize = 100;

/// Body region a hit landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyPart {
    Head,
    #[default]
    Torso,
    LeftArm,
    RightArm,
    Legs,
}

impl BodyPart {
    /// Parse a replicated body part name. Unknown names land on the torso.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "head" | "neck" => BodyPart::Head,
            "leftarm" | "left_arm" | "arm_l" => BodyPart::LeftArm,
            "rightarm" | "right_arm" | "arm_r" => BodyPart::RightArm,
            "legs" | "leg" | "leftleg" | "rightleg" | "left_leg" | "right_leg" => BodyPart::Legs,
            _ => BodyPart::Torso,
        }
    }

    /// How strongly a flinch on this part moves the upper body.
    pub fn flinch_weight(self) -> f32 {
        match self {
            BodyPart::Head => 1.3,
            BodyPart::Torso => 1.0,
            BodyPart::LeftArm | BodyPart::RightArm => 0.6,
            BodyPart::Legs => 0.4,
        }
    }
}

/// A replicated hit event after decoding.
///
/// Missing sub-fields decode to zero effect (no damage, no impulse).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HitEvent {
    /// Globally unique token.
    pub id: String,
    pub position: Vec3,
    pub normal: Vec3,
    pub target_id: Option<String>,
    pub damage: f32,
    pub body_part: BodyPart,
    pub impulse: Vec3,
    pub stealth: bool,
    pub origin: Option<Vec3>,
    pub timestamp: f64,
}

/// Bounded set of already-applied ids. Oldest entries are evicted first.
#[derive(Debug, Clone)]
pub struct ProcessedIds {
    order: VecDeque<String>,
    seen: HashSet<String>,
    capacity: usize,
}

impl ProcessedIds {
    pub fn new() -> Self {
        Self::with_capacity(MAX_PROCESSED_IDS)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            order: VecDeque::with_capacity(capacity + 1),
            seen: HashSet::with_capacity(capacity + 1),
            capacity: capacity.max(1),
        }
    }

    /// Record `id`. Returns `true` the first time an id is seen.
    pub fn insert(&mut self, id: &str) -> bool {
        if self.seen.contains(id) {
            return false;
        }
        self.seen.insert(id.to_owned());
        self.order.push_back(id.to_owned());
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.seen.clear();
    }
}

impl Default for ProcessedIds {
    fn default() -> Self {
        Self::new()
    }
}

/// Match rules that decide whether damage applies between two players.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatRules {
    pub mode: GameMode,
    pub friendly_fire: bool,
}

impl CombatRules {
    /// Whether a hit from `shooter` on `victim` counts.
    ///
    /// Self-hits (own grenade) always count. Teammates only when friendly
    /// fire is on. Free-for-all has no teammates.
    pub fn allows(
        &self,
        shooter_id: &str,
        shooter_team: u32,
        victim_id: &str,
        victim_team: u32,
    ) -> bool {
        if shooter_id == victim_id || self.mode.is_ffa() || self.friendly_fire {
            return true;
        }
        shooter_team != victim_team
    }
}

/// Who fired the hits being reconciled.
#[derive(Debug, Clone, Copy)]
pub struct Shooter<'a> {
    pub id: &'a str,
    pub team_id: u32,
}

/// The local observer.
#[derive(Debug, Clone, Copy)]
pub struct Observer<'a> {
    pub id: &'a str,
    pub team_id: u32,
}

/// What to do with one newly seen hit event.
#[derive(Debug, Clone, PartialEq)]
pub enum HitOutcome {
    /// Damage the local observer and notify feedback.
    LocalDamage { event: HitEvent, shooter_id: String },
    /// Flinch another remote entity and spawn an impact effect there.
    RemoteFlinch { target_id: String, event: HitEvent },
    /// Hit with no (known) living target: world impact only.
    Impact { event: HitEvent },
    /// Blocked by friendly-fire rules. Still consumed.
    Blocked { event: HitEvent },
}

/// Stateless reconciler; state lives in each entity's [`ProcessedIds`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HitReconciler {
    pub rules: CombatRules,
}

impl HitReconciler {
    pub fn new(rules: CombatRules) -> Self {
        Self { rules }
    }

    /// Scan `queue` and return outcomes for ids not yet in `processed`.
    ///
    /// `team_of` resolves a remote target's team; `None` means the target is
    /// not a known remote entity. Events are handled independently, in queue
    /// order, with no coalescing of same-victim events.
    pub fn reconcile<F>(
        &self,
        processed: &mut ProcessedIds,
        shooter: Shooter<'_>,
        observer: Observer<'_>,
        queue: &[HitEvent],
        team_of: F,
    ) -> Vec<HitOutcome>
    where
        F: Fn(&str) -> Option<u32>,
    {
        let mut outcomes = Vec::new();

        for event in queue {
            if !processed.insert(&event.id) {
                continue;
            }

            let outcome = match event.target_id.as_deref() {
                Some(target) if target == observer.id => {
                    if self
                        .rules
                        .allows(shooter.id, shooter.team_id, observer.id, observer.team_id)
                    {
                        HitOutcome::LocalDamage {
                            event: event.clone(),
                            shooter_id: shooter.id.to_owned(),
                        }
                    } else {
                        tracing::trace!(
                            hit = %event.id,
                            shooter = %shooter.id,
                            "friendly fire blocked"
                        );
                        HitOutcome::Blocked { event: event.clone() }
                    }
                }
                Some(target) => match team_of(target) {
                    Some(team) if self.rules.allows(shooter.id, shooter.team_id, target, team) => {
                        HitOutcome::RemoteFlinch {
                            target_id: target.to_owned(),
                            event: event.clone(),
                        }
                    }
                    Some(_) => HitOutcome::Blocked { event: event.clone() },
                    None => HitOutcome::Impact { event: event.clone() },
                },
                None => HitOutcome::Impact { event: event.clone() },
            };
            outcomes.push(outcome);
        }

        outcomes
    }
}
