//! Typed view of one remote entity's replicated state.
//!
//! Read fresh every tick. Absent or malformed keys fall back to defaults:
//! no name, no team, full health, zeroed look angles, flags off.

use glam::Vec3;
use mirage_core::health::HealthBar;
use mirage_core::hits::HitEvent;

use crate::events::{decode_hit_queue, decode_ragdoll, RagdollPayload};
use crate::{keys, StateValue};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EntitySnapshot {
    pub name: Option<String>,
    pub team: Option<u32>,
    pub health: f32,
    /// Raw replicated position; not validated here.
    pub position: Option<Vec3>,
    pub yaw: f32,
    pub pitch: f32,
    pub lean: f32,
    pub prone: bool,
    pub sliding: bool,
    pub crouching: bool,
    pub ads: bool,
    pub sprinting: bool,
    pub weapon_id: Option<String>,
    pub attachments: Vec<String>,
    pub fired_at: Option<f64>,
    pub hits: Vec<HitEvent>,
    pub ragdoll: Option<RagdollPayload>,
}

impl EntitySnapshot {
    /// Read every key through `get`, which returns `None` for absent keys.
    pub fn read<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<StateValue>,
    {
        let f32_or = |key: &str, default: f32| {
            get(key)
                .and_then(|v| v.as_f32())
                .filter(|v| v.is_finite())
                .unwrap_or(default)
        };
        let flag = |key: &str| get(key).and_then(|v| v.as_bool()).unwrap_or(false);

        Self {
            name: get(keys::NAME)
                .and_then(|v| v.as_str().map(str::to_owned))
                .filter(|s| !s.is_empty()),
            team: get(keys::TEAM).and_then(|v| v.as_u32()),
            health: f32_or(keys::HEALTH, HealthBar::FULL).max(0.0),
            position: get(keys::POSITION).and_then(|v| v.as_vec3()),
            yaw: f32_or(keys::YAW, 0.0),
            pitch: f32_or(keys::PITCH, 0.0),
            lean: f32_or(keys::LEAN, 0.0),
            prone: flag(keys::PRONE),
            sliding: flag(keys::SLIDING),
            crouching: flag(keys::CROUCHING),
            ads: flag(keys::ADS),
            sprinting: flag(keys::SPRINTING),
            weapon_id: get(keys::WEAPON)
                .and_then(|v| v.as_str().map(str::to_owned))
                .filter(|s| !s.is_empty()),
            attachments: get(keys::ATTACHMENTS)
                .map(|v| v.as_string_list())
                .unwrap_or_default(),
            fired_at: get(keys::FIRED_AT)
                .and_then(|v| v.as_f64())
                .filter(|t| t.is_finite()),
            hits: get(keys::HITS)
                .map(|v| decode_hit_queue(&v))
                .unwrap_or_default(),
            ragdoll: get(keys::RAGDOLL).and_then(|v| decode_ragdoll(&v)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(state: serde_json::Value) -> EntitySnapshot {
        let state = StateValue::from_json(state).unwrap();
        EntitySnapshot::read(|key| state.get(key).cloned())
    }

    #[test]
    fn test_empty_state_defaults() {
        let s = snapshot(json!({}));
        assert_eq!(s.name, None);
        assert_eq!(s.team, None);
        assert_eq!(s.health, 100.0);
        assert_eq!(s.position, None);
        assert!(!s.prone && !s.ads);
        assert!(s.hits.is_empty());
        assert!(s.fired_at.is_none());
    }

    #[test]
    fn test_full_state() {
        let s = snapshot(json!({
            "name": "Vex",
            "team": 1,
            "health": 64,
            "pos": [3, 0, -4],
            "yaw": 1.2,
            "crouch": true,
            "ads": 1,
            "weapon": "pistol",
            "attachments": ["suppressor"],
            "firedAt": 1001.5,
            "hits": [{"id": "h1", "targetId": "self", "dmg": 30}],
            "ragdoll": {"stamp": 2, "impulse": [0, 1, 0]},
        }));
        assert_eq!(s.name.as_deref(), Some("Vex"));
        assert_eq!(s.team, Some(1));
        assert_eq!(s.health, 64.0);
        assert_eq!(s.position, Some(Vec3::new(3.0, 0.0, -4.0)));
        assert!(s.crouching && s.ads);
        assert_eq!(s.weapon_id.as_deref(), Some("pistol"));
        assert_eq!(s.attachments, vec!["suppressor"]);
        assert_eq!(s.fired_at, Some(1001.5));
        assert_eq!(s.hits.len(), 1);
        assert_eq!(s.ragdoll.map(|r| r.stamp), Some(2.0));
    }

    #[test]
    fn test_garbled_values_default() {
        let s = snapshot(json!({
            "name": 5,
            "team": "blue",
            "health": "lots",
            "pos": "here",
            "hits": {"id": "x"},
        }));
        assert_eq!(s.name, None);
        assert_eq!(s.team, None);
        assert_eq!(s.health, 100.0);
        assert_eq!(s.position, None);
        assert!(s.hits.is_empty());
    }
}
