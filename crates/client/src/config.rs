//! Avatar configuration.
//!
//! Every section defaults to the values the avatar system was tuned with,
//! so a TOML file only needs to name what it overrides:
//!
//! ```toml
//! [lod]
//! far_distance = 120.0
//!
//! [combat]
//! mode = "free_for_all"
//!
//! [[weapons]]
//! id = "marksman"
//! category = "rifle"
//! fire_interval = 0.4
//! ```

use std::path::Path;

use mirage_core::animator::AnimationTuning;
use mirage_core::health::HealthBarConfig;
use mirage_core::hits::CombatRules;
use mirage_core::identity::{TeamInfo, TeamRegistry};
use mirage_core::lod::{LodPolicy, StaggerCadence};
use mirage_core::weapon::{WeaponCatalog, WeaponVisualConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid avatar config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Impulse applied to a ragdoll spawned when a live player disconnects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagdollConfig {
    /// Horizontal push (units/s), in a random direction.
    pub base_impulse: f32,
    /// Upward component.
    pub upward_impulse: f32,
    /// Random extra magnitude added to the horizontal push, 0..jitter.
    pub jitter: f32,
}

impl Default for RagdollConfig {
    fn default() -> Self {
        Self {
            base_impulse: 1.5,
            upward_impulse: 1.0,
            jitter: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AvatarConfig {
    pub lod: LodPolicy,
    pub stagger: StaggerCadence,
    pub health_bar: HealthBarConfig,
    pub combat: CombatRules,
    pub ragdoll: RagdollConfig,
    pub animation: AnimationTuning,
    /// Teams beyond the two built-in ones.
    pub teams: Vec<TeamInfo>,
    /// Extra or overriding weapon visuals, merged into the built-in catalog.
    pub weapons: Vec<WeaponVisualConfig>,
}

impl AvatarConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Built-in weapons with this config's entries inserted on top.
    pub fn weapon_catalog(&self) -> WeaponCatalog {
        let mut catalog = WeaponCatalog::builtin();
        for weapon in &self.weapons {
            catalog.insert(weapon.clone());
        }
        catalog
    }

    pub fn team_registry(&self) -> TeamRegistry {
        let mut registry = TeamRegistry::new();
        for team in &self.teams {
            registry.insert(team.clone());
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirage_core::identity::{GameMode, Rgb};
    use mirage_core::weapon::WeaponCategory;

    #[test]
    fn test_empty_file_is_default() {
        let config = AvatarConfig::from_toml_str("").unwrap();
        assert_eq!(config, AvatarConfig::default());
        assert_eq!(config.lod.near_distance, 30.0);
        assert_eq!(config.health_bar.grace_seconds, 0.5);
        assert_eq!(config.animation.flinch_duration, 0.2);
    }

    #[test]
    fn test_partial_override() {
        let config = AvatarConfig::from_toml_str(
            r#"
            [lod]
            far_distance = 120.0

            [combat]
            mode = "free_for_all"
            friendly_fire = true
            "#,
        )
        .unwrap();
        assert_eq!(config.lod.far_distance, 120.0);
        assert_eq!(config.lod.near_distance, 30.0);
        assert_eq!(config.combat.mode, GameMode::FreeForAll);
        assert!(config.combat.friendly_fire);
        assert_eq!(config.stagger, StaggerCadence::default());
    }

    #[test]
    fn test_weapons_merge_into_catalog() {
        let config = AvatarConfig::from_toml_str(
            r#"
            [[weapons]]
            id = "marksman"
            category = "rifle"
            fire_interval = 0.4

            [[weapons]]
            id = "pistol"
            category = "pistol"
            fire_interval = 0.05
            "#,
        )
        .unwrap();
        let builtin = WeaponCatalog::builtin();
        let catalog = config.weapon_catalog();
        assert_eq!(catalog.len(), builtin.len() + 1);

        let pistol = catalog.resolve("pistol", &[]);
        assert_eq!(pistol.fire_interval, 0.05);
        assert_eq!(catalog.resolve("marksman", &[]).category, WeaponCategory::Rifle);
    }

    #[test]
    fn test_extra_teams() {
        let config = AvatarConfig::from_toml_str(
            r#"
            [[teams]]
            id = 2
            name = "Green"
            color = 4437377
            "#,
        )
        .unwrap();
        let teams = config.team_registry();
        assert_eq!(teams.get(2).map(|t| t.color), Some(Rgb(0x43_B5_81)));
    }

    #[test]
    fn test_parse_error() {
        let err = AvatarConfig::from_toml_str("[lod\nnear = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = AvatarConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
