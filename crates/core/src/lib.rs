//! Mirage Core - Remote Avatar Logic
//!
//! This crate turns other participants' replicated state into plausible
//! avatars. Everything here is pure: no scene graph, no transport, no clock.
//! The client crate owns the collaborators and drives these pieces once per
//! frame.
//!
//! # Pieces
//!
//! - [`identity`]: entity id + team context -> team, colour, glyph
//! - [`ik`]: analytic two-bone inverse kinematics
//! - [`animator`]: per-entity procedural animation (locomotion, overlays,
//!   weapon-hand targeting, arm IK)
//! - [`hits`]: bounded processed-id set and idempotent hit reconciliation
//! - [`health`]: lagging "damage ghost" health bar
//! - [`lod`]: frustum culling, distance LOD and staggered cadences
//! - [`weapon`]: per-weapon visual configuration and loadout hashing

pub mod animator;
pub mod health;
pub mod hits;
pub mod identity;
pub mod ik;
pub mod lod;
pub mod math;
pub mod weapon;

pub use animator::{
    AnimationTuning, AnimatorInput, AvatarPose, BodyPose, LocomotionState, ProceduralAnimator,
    SwingKind, Transform,
};
pub use health::{HealthBar, HealthBarConfig};
pub use hits::{
    BodyPart, CombatRules, HitEvent, HitOutcome, HitReconciler, Observer, ProcessedIds, Shooter,
    MAX_PROCESSED_IDS,
};
pub use identity::{GameMode, Identity, Rgb, TeamRegistry};
pub use ik::{IkChain, IkScratch, IkSolution};
pub use lod::{Frustum, LodPolicy, StaggerCadence, Visibility};
pub use weapon::{
    loadout_hash, CyclingAction, MuzzleFlash, ShellKind, WeaponCatalog, WeaponCategory, WeaponKey,
    WeaponVisualConfig,
};
