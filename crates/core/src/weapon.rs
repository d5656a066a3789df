//! Weapon visual configuration.
//!
//! Every weapon resolves to a [`WeaponVisualConfig`] where every field has a
//! named default. Nothing is inferred from the presence or absence of a key:
//! a suppressed weapon declares a zero muzzle flash, a knife declares no shell.
//!
//! The catalog is an index-addressed table. An entity keeps its own resolved
//! copy (attachments applied); re-equipping replaces that copy and rebuilds
//! the rig instead of mutating shared entries.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::math::{polynomial_hash, polynomial_hash_continue};

/// Broad weapon family. Drives hand poses and which fire effects apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponCategory {
    #[default]
    Rifle,
    Pistol,
    Shotgun,
    Knife,
    Throwable,
}

impl WeaponCategory {
    /// Melee and throwables swing instead of producing muzzle effects.
    pub fn is_swing(self) -> bool {
        matches!(self, WeaponCategory::Knife | WeaponCategory::Throwable)
    }

    /// Whether the off hand rests on the weapon.
    pub fn two_handed(self) -> bool {
        matches!(self, WeaponCategory::Rifle | WeaponCategory::Shotgun | WeaponCategory::Pistol)
    }
}

/// Spent-casing type ejected on fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShellKind {
    #[default]
    None,
    Pistol,
    Rifle,
    Shotgun,
}

/// Reciprocating part animated on fire.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum CyclingAction {
    #[default]
    None,
    /// Pistol slide: travels back `travel` units and returns.
    Slide { travel: f32 },
    /// Bolt or pump: travels back `travel` units, held briefly, returns.
    Bolt { travel: f32, hold: f32 },
}

impl CyclingAction {
    pub fn travel(&self) -> f32 {
        match *self {
            CyclingAction::None => 0.0,
            CyclingAction::Slide { travel } | CyclingAction::Bolt { travel, .. } => travel,
        }
    }
}

/// Muzzle flash declaration. Zero intensity or scale is a fully silent,
/// valid declaration (suppressors).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MuzzleFlash {
    pub intensity: f32,
    pub scale: f32,
    /// Offset of the muzzle from the weapon anchor.
    pub offset: Vec3,
}

impl Default for MuzzleFlash {
    fn default() -> Self {
        Self {
            intensity: 1.0,
            scale: 1.0,
            offset: Vec3::new(0.0, 0.03, -0.55),
        }
    }
}

impl MuzzleFlash {
    pub fn is_silent(&self) -> bool {
        self.intensity <= 0.0 || self.scale <= 0.0
    }
}

/// A sinusoid used for idle sway and movement bob.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Oscillator {
    pub frequency: f32,
    pub amplitude: f32,
}

impl Default for Oscillator {
    fn default() -> Self {
        Self {
            frequency: 1.0,
            amplitude: 0.005,
        }
    }
}

/// Full visual description of a weapon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponVisualConfig {
    pub id: String,
    pub category: WeaponCategory,
    pub muzzle: MuzzleFlash,
    pub shell: ShellKind,
    pub action: CyclingAction,
    /// Seconds between shots; the cycling animation fits inside it.
    pub fire_interval: f32,
    /// Where the firing hand grips, relative to the weapon anchor.
    pub grip_point: Vec3,
    /// Where the support hand rests, relative to the weapon anchor.
    /// `None` for one-handed holds.
    pub support_point: Option<Vec3>,
    pub sway: Oscillator,
    pub bob: Oscillator,
}

impl Default for WeaponVisualConfig {
    fn default() -> Self {
        Self::rifle("rifle")
    }
}

impl WeaponVisualConfig {
    pub fn rifle(id: &str) -> Self {
        Self {
            id: id.to_owned(),
            category: WeaponCategory::Rifle,
            muzzle: MuzzleFlash::default(),
            shell: ShellKind::Rifle,
            action: CyclingAction::Bolt {
                travel: 0.04,
                hold: 0.0,
            },
            fire_interval: 0.1,
            grip_point: Vec3::new(0.0, -0.06, 0.08),
            support_point: Some(Vec3::new(0.0, -0.04, -0.28)),
            sway: Oscillator {
                frequency: 0.8,
                amplitude: 0.006,
            },
            bob: Oscillator {
                frequency: 1.0,
                amplitude: 0.02,
            },
        }
    }

    pub fn pistol(id: &str) -> Self {
        Self {
            id: id.to_owned(),
            category: WeaponCategory::Pistol,
            muzzle: MuzzleFlash {
                intensity: 0.7,
                scale: 0.6,
                offset: Vec3::new(0.0, 0.04, -0.18),
            },
            shell: ShellKind::Pistol,
            action: CyclingAction::Slide { travel: 0.03 },
            fire_interval: 0.15,
            grip_point: Vec3::new(0.0, -0.05, 0.02),
            support_point: Some(Vec3::new(-0.02, -0.06, 0.03)),
            sway: Oscillator {
                frequency: 1.1,
                amplitude: 0.008,
            },
            bob: Oscillator {
                frequency: 1.0,
                amplitude: 0.015,
            },
        }
    }

    pub fn shotgun(id: &str) -> Self {
        Self {
            id: id.to_owned(),
            category: WeaponCategory::Shotgun,
            muzzle: MuzzleFlash {
                intensity: 1.6,
                scale: 1.4,
                offset: Vec3::new(0.0, 0.03, -0.65),
            },
            shell: ShellKind::Shotgun,
            action: CyclingAction::Bolt {
                travel: 0.12,
                hold: 0.08,
            },
            fire_interval: 0.8,
            grip_point: Vec3::new(0.0, -0.06, 0.1),
            support_point: Some(Vec3::new(0.0, -0.05, -0.35)),
            sway: Oscillator {
                frequency: 0.7,
                amplitude: 0.007,
            },
            bob: Oscillator {
                frequency: 0.9,
                amplitude: 0.025,
            },
        }
    }

    pub fn knife(id: &str) -> Self {
        Self {
            id: id.to_owned(),
            category: WeaponCategory::Knife,
            muzzle: MuzzleFlash {
                intensity: 0.0,
                scale: 0.0,
                offset: Vec3::ZERO,
            },
            shell: ShellKind::None,
            action: CyclingAction::None,
            fire_interval: 0.5,
            grip_point: Vec3::ZERO,
            support_point: None,
            sway: Oscillator {
                frequency: 1.2,
                amplitude: 0.01,
            },
            bob: Oscillator {
                frequency: 1.0,
                amplitude: 0.03,
            },
        }
    }

    pub fn throwable(id: &str) -> Self {
        Self {
            category: WeaponCategory::Throwable,
            fire_interval: 1.0,
            ..Self::knife(id)
        }
    }

    /// Fallback for ids the catalog does not know: a rifle under that id.
    pub fn fallback(id: &str) -> Self {
        Self::rifle(id)
    }

    /// Apply attachment modifiers. Returns a new config; the catalog entry
    /// is never mutated.
    pub fn with_attachments(&self, attachments: &[String]) -> Self {
        let mut config = self.clone();
        for attachment in attachments {
            match attachment.as_str() {
                "suppressor" | "silencer" => {
                    config.muzzle.intensity = 0.0;
                    config.muzzle.scale = 0.0;
                    config.muzzle.offset.z -= 0.15;
                }
                "compensator" | "flash_hider" => {
                    config.muzzle.intensity *= 0.5;
                }
                "extended_barrel" => {
                    config.muzzle.offset.z -= 0.08;
                }
                _ => {}
            }
        }
        config
    }
}

/// Index into a [`WeaponCatalog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeaponKey(pub usize);

/// Table of known weapons.
#[derive(Debug, Clone)]
pub struct WeaponCatalog {
    entries: Vec<WeaponVisualConfig>,
}

impl Default for WeaponCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl WeaponCatalog {
    pub fn empty() -> Self {
        Self { entries: Vec::new() }
    }

    /// The stock weapon set.
    pub fn builtin() -> Self {
        let mut catalog = Self::empty();
        catalog.insert(WeaponVisualConfig::rifle("rifle_ak"));
        catalog.insert(WeaponVisualConfig::rifle("rifle_m4"));
        catalog.insert(WeaponVisualConfig {
            action: CyclingAction::Bolt {
                travel: 0.09,
                hold: 0.25,
            },
            fire_interval: 1.2,
            muzzle: MuzzleFlash {
                intensity: 1.4,
                scale: 1.2,
                offset: Vec3::new(0.0, 0.03, -0.8),
            },
            ..WeaponVisualConfig::rifle("sniper_bolt")
        });
        catalog.insert(WeaponVisualConfig {
            fire_interval: 0.07,
            ..WeaponVisualConfig::rifle("smg")
        });
        catalog.insert(WeaponVisualConfig::pistol("pistol"));
        catalog.insert(WeaponVisualConfig::shotgun("shotgun_pump"));
        catalog.insert(WeaponVisualConfig::knife("knife"));
        catalog.insert(WeaponVisualConfig::throwable("frag_grenade"));
        catalog.insert(WeaponVisualConfig::throwable("smoke_grenade"));
        catalog
    }

    /// Insert or replace by id.
    pub fn insert(&mut self, config: WeaponVisualConfig) -> WeaponKey {
        if let Some(index) = self.entries.iter().position(|e| e.id == config.id) {
            self.entries[index] = config;
            WeaponKey(index)
        } else {
            self.entries.push(config);
            WeaponKey(self.entries.len() - 1)
        }
    }

    pub fn key_of(&self, id: &str) -> Option<WeaponKey> {
        self.entries.iter().position(|e| e.id == id).map(WeaponKey)
    }

    pub fn get(&self, key: WeaponKey) -> Option<&WeaponVisualConfig> {
        self.entries.get(key.0)
    }

    /// Config for `id` with `attachments` applied, falling back to a rifle
    /// for unknown ids.
    pub fn resolve(&self, id: &str, attachments: &[String]) -> WeaponVisualConfig {
        match self.key_of(id).and_then(|k| self.get(k)) {
            Some(base) => base.with_attachments(attachments),
            None => {
                tracing::debug!(weapon = %id, "unknown weapon id, using fallback visuals");
                WeaponVisualConfig::fallback(id).with_attachments(attachments)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Hash of a loadout (weapon id + attachments). Attachment order does not
/// matter.
pub fn loadout_hash(weapon_id: &str, attachments: &[String]) -> u32 {
    let mut sorted: Vec<&str> = attachments.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted
        .iter()
        .fold(polynomial_hash(weapon_id), |h, a| {
            polynomial_hash_continue(h.wrapping_mul(31).wrapping_add(u32::from(b'|')), a)
        })
}
