//! Decoders from replicated values to typed events.
//!
//! Hit queues and ragdoll payloads are replicated *state*: decoding is
//! tolerant and never fails. Broadcast events (`ON_DEATH`, `ON_THROW`) are
//! strict and return [`SchemaError`] on a bad payload.

use glam::Vec3;
use mirage_core::hits::{BodyPart, HitEvent};
use mirage_core::math::{polynomial_hash, polynomial_hash_continue};

use crate::keys;
use crate::{SchemaError, StateValue};

/// Prefix of ids synthesized for hit entries without a usable id.
pub const FINGERPRINT_PREFIX: &str = "fp:";

fn vec3_field(entry: &StateValue, names: &[&str]) -> Option<Vec3> {
    entry.get_any(names).and_then(StateValue::as_vec3)
}

fn hit_id(entry: &StateValue) -> String {
    let raw = entry.get("id").and_then(|v| match v {
        StateValue::Text(s) if !s.trim().is_empty() => Some(s.clone()),
        StateValue::Number(n) if n.is_finite() => Some(format!("{n}")),
        _ => None,
    });
    raw.unwrap_or_else(|| {
        // Same garbled entry -> same id, so it is applied exactly once.
        let canonical = entry.to_json_string();
        let h = polynomial_hash_continue(polynomial_hash(&canonical), FINGERPRINT_PREFIX);
        format!("{FINGERPRINT_PREFIX}{h:08x}")
    })
}

/// Decode one hit-queue entry. Non-object entries are ignored; missing
/// sub-fields default to zero effect.
pub fn decode_hit_event(entry: &StateValue) -> Option<HitEvent> {
    entry.as_map()?;

    let damage = entry
        .get_any(&["dmg", "damage"])
        .and_then(StateValue::as_f32)
        .filter(|d| d.is_finite())
        .unwrap_or(0.0)
        .max(0.0);

    Some(HitEvent {
        id: hit_id(entry),
        position: vec3_field(entry, &["pos", "position", "point"]).unwrap_or(Vec3::ZERO),
        normal: vec3_field(entry, &["normal", "n"]).unwrap_or(Vec3::ZERO),
        target_id: entry
            .get_any(&["targetId", "target"])
            .and_then(StateValue::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_owned),
        damage,
        body_part: entry
            .get_any(&["part", "bodyPart"])
            .and_then(StateValue::as_str)
            .map(BodyPart::from_name)
            .unwrap_or_default(),
        impulse: vec3_field(entry, &["impulse"]).unwrap_or(Vec3::ZERO),
        stealth: entry
            .get("stealth")
            .and_then(StateValue::as_bool)
            .unwrap_or(false),
        origin: vec3_field(entry, &["origin", "from"]),
        timestamp: entry
            .get_any(&["t", "timestamp"])
            .and_then(StateValue::as_f64)
            .unwrap_or(0.0),
    })
}

/// Decode a replicated hit queue. Anything that is not a list decodes empty.
pub fn decode_hit_queue(value: &StateValue) -> Vec<HitEvent> {
    value
        .as_list()
        .map(|items| items.iter().filter_map(decode_hit_event).collect())
        .unwrap_or_default()
}

/// Encode a hit event in the shape [`decode_hit_event`] reads.
pub fn encode_hit_event(event: &HitEvent) -> StateValue {
    let part = match event.body_part {
        BodyPart::Head => "head",
        BodyPart::Torso => "torso",
        BodyPart::LeftArm => "left_arm",
        BodyPart::RightArm => "right_arm",
        BodyPart::Legs => "legs",
    };
    StateValue::map([
        ("id", StateValue::from(event.id.as_str())),
        ("pos", event.position.into()),
        ("normal", event.normal.into()),
        ("targetId", event.target_id.clone().into()),
        ("dmg", event.damage.into()),
        ("part", part.into()),
        ("impulse", event.impulse.into()),
        ("stealth", event.stealth.into()),
        ("origin", event.origin.into()),
        ("t", event.timestamp.into()),
    ])
}

/// Replicated request to ragdoll an entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RagdollPayload {
    /// Monotonic; a payload is new only when its stamp increases.
    pub stamp: f64,
    pub impulse: Vec3,
    pub point: Option<Vec3>,
}

/// Tolerant: a payload without a numeric stamp is ignored.
pub fn decode_ragdoll(value: &StateValue) -> Option<RagdollPayload> {
    let stamp = value
        .get_any(&["stamp", "t"])
        .and_then(StateValue::as_f64)
        .filter(|s| s.is_finite())?;
    Some(RagdollPayload {
        stamp,
        impulse: vec3_field(value, &["impulse"]).unwrap_or(Vec3::ZERO),
        point: vec3_field(value, &["point", "pos"]),
    })
}

/// `ON_DEATH` payload.
#[derive(Debug, Clone, PartialEq)]
pub struct DeathEvent {
    /// `None` for environmental deaths (`killerId: null`).
    pub killer_id: Option<String>,
}

/// `ON_THROW` payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ThrowEvent {
    pub origin: Vec3,
    pub velocity: Vec3,
    pub item_id: String,
}

impl ThrowEvent {
    /// Stable key for de-duplicating at-least-once deliveries.
    pub fn dedupe_key(&self, thrower_id: &str) -> String {
        let q = |v: Vec3| {
            format!(
                "{},{},{}",
                (v.x * 100.0).round() as i64,
                (v.y * 100.0).round() as i64,
                (v.z * 100.0).round() as i64
            )
        };
        format!(
            "throw:{thrower_id}:{}:{}:{}",
            self.item_id,
            q(self.origin),
            q(self.velocity)
        )
    }
}

/// A decoded broadcast event.
#[derive(Debug, Clone, PartialEq)]
pub enum BroadcastEvent {
    Death(DeathEvent),
    Throw(ThrowEvent),
}

fn required<'a>(
    payload: &'a StateValue,
    event: &'static str,
    field: &'static str,
) -> Result<&'a StateValue, SchemaError> {
    payload
        .get(field)
        .ok_or(SchemaError::MissingField { event, field })
}

fn required_vec3(
    payload: &StateValue,
    event: &'static str,
    field: &'static str,
) -> Result<Vec3, SchemaError> {
    required(payload, event, field)?
        .as_vec3()
        .filter(|v| v.is_finite())
        .ok_or(SchemaError::WrongShape { event, field })
}

pub fn decode_death(payload: &StateValue) -> Result<DeathEvent, SchemaError> {
    const EVENT: &str = keys::ON_DEATH;
    if payload.as_map().is_none() {
        return Err(SchemaError::NotAnObject { event: EVENT });
    }
    let killer_id = match required(payload, EVENT, "killerId")? {
        StateValue::Null => None,
        StateValue::Text(s) if s.is_empty() => None,
        StateValue::Text(s) => Some(s.clone()),
        _ => {
            return Err(SchemaError::WrongShape {
                event: EVENT,
                field: "killerId",
            })
        }
    };
    Ok(DeathEvent { killer_id })
}

pub fn decode_throw(payload: &StateValue) -> Result<ThrowEvent, SchemaError> {
    const EVENT: &str = keys::ON_THROW;
    if payload.as_map().is_none() {
        return Err(SchemaError::NotAnObject { event: EVENT });
    }
    let origin = required_vec3(payload, EVENT, "origin")?;
    let velocity = required_vec3(payload, EVENT, "velocity")?;
    let item_id = required(payload, EVENT, "itemId")?
        .as_str()
        .filter(|s| !s.is_empty())
        .ok_or(SchemaError::WrongShape {
            event: EVENT,
            field: "itemId",
        })?
        .to_owned();
    Ok(ThrowEvent {
        origin,
        velocity,
        item_id,
    })
}

/// Decode a named broadcast event.
pub fn decode_broadcast(name: &str, payload: &StateValue) -> Result<BroadcastEvent, SchemaError> {
    match name {
        keys::ON_DEATH => decode_death(payload).map(BroadcastEvent::Death),
        keys::ON_THROW => decode_throw(payload).map(BroadcastEvent::Throw),
        other => Err(SchemaError::UnknownEvent(other.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn value(v: serde_json::Value) -> StateValue {
        StateValue::from_json(v).unwrap()
    }

    #[test]
    fn test_full_hit_entry() {
        let hit = decode_hit_event(&value(json!({
            "id": "a1",
            "pos": [1, 2, 3],
            "normal": [0, 0, 1],
            "targetId": "self",
            "dmg": 30,
            "part": "head",
            "impulse": [0, 0, -2],
            "stealth": true,
            "origin": [0, 1.7, 10],
            "t": 12.5,
        })))
        .unwrap();
        assert_eq!(hit.id, "a1");
        assert_eq!(hit.target_id.as_deref(), Some("self"));
        assert_eq!(hit.damage, 30.0);
        assert_eq!(hit.body_part, BodyPart::Head);
        assert!(hit.stealth);
        assert_eq!(hit.origin, Some(Vec3::new(0.0, 1.7, 10.0)));
        assert_eq!(hit.timestamp, 12.5);
    }

    #[test]
    fn test_missing_fields_default_to_zero_effect() {
        let hit = decode_hit_event(&value(json!({"id": "x", "targetId": "self"}))).unwrap();
        assert_eq!(hit.damage, 0.0);
        assert_eq!(hit.impulse, Vec3::ZERO);
        assert_eq!(hit.body_part, BodyPart::Torso);
        assert_eq!(hit.origin, None);
    }

    #[test]
    fn test_garbled_damage_is_zero() {
        let hit = decode_hit_event(&value(json!({"id": "x", "dmg": "lots"}))).unwrap();
        assert_eq!(hit.damage, 0.0);
        let negative = decode_hit_event(&value(json!({"id": "y", "dmg": -5}))).unwrap();
        assert_eq!(negative.damage, 0.0);
    }

    #[test]
    fn test_garbled_id_fingerprint_is_stable() {
        let entry = value(json!({"id": {"oops": 1}, "targetId": "self", "dmg": 10}));
        let a = decode_hit_event(&entry).unwrap();
        let b = decode_hit_event(&entry).unwrap();
        assert!(a.id.starts_with(FINGERPRINT_PREFIX));
        assert_eq!(a.id, b.id);

        let other = value(json!({"targetId": "self", "dmg": 11}));
        assert_ne!(decode_hit_event(&other).unwrap().id, a.id);
    }

    #[test]
    fn test_numeric_id_accepted() {
        let hit = decode_hit_event(&value(json!({"id": 17}))).unwrap();
        assert_eq!(hit.id, "17");
    }

    #[test]
    fn test_queue_skips_non_objects() {
        let queue = decode_hit_queue(&value(json!([{"id": "a"}, 5, null, {"id": "b"}])));
        let ids: Vec<_> = queue.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert!(decode_hit_queue(&value(json!("nope"))).is_empty());
    }

    #[test]
    fn test_encoded_hit_decodes() {
        let hit = HitEvent {
            id: "z9".into(),
            target_id: Some("bob".into()),
            damage: 12.0,
            body_part: BodyPart::Legs,
            origin: Some(Vec3::Y),
            ..Default::default()
        };
        assert_eq!(decode_hit_event(&encode_hit_event(&hit)), Some(hit));
    }

    #[test]
    fn test_ragdoll_requires_stamp() {
        assert!(decode_ragdoll(&value(json!({"impulse": [1, 0, 0]}))).is_none());
        let r = decode_ragdoll(&value(json!({"stamp": 3, "impulse": [1, 0, 0]}))).unwrap();
        assert_eq!(r.stamp, 3.0);
        assert_eq!(r.impulse, Vec3::X);
        assert_eq!(r.point, None);
    }

    #[test]
    fn test_death_event() {
        let e = decode_broadcast(keys::ON_DEATH, &value(json!({"killerId": "p2"}))).unwrap();
        assert_eq!(
            e,
            BroadcastEvent::Death(DeathEvent {
                killer_id: Some("p2".into())
            })
        );
        let env = decode_death(&value(json!({"killerId": null}))).unwrap();
        assert_eq!(env.killer_id, None);
        assert!(matches!(
            decode_death(&value(json!({}))),
            Err(SchemaError::MissingField { field: "killerId", .. })
        ));
    }

    #[test]
    fn test_throw_event_strict() {
        let ok = decode_throw(&value(json!({
            "origin": [0, 1.5, 0],
            "velocity": [0, 3, -10],
            "itemId": "frag_grenade",
        })))
        .unwrap();
        assert_eq!(ok.item_id, "frag_grenade");

        let missing = decode_throw(&value(json!({"velocity": [0, 0, 0], "itemId": "x"})));
        assert!(matches!(
            missing,
            Err(SchemaError::MissingField { field: "origin", .. })
        ));

        let wrong = decode_throw(&value(json!({
            "origin": "here",
            "velocity": [0, 0, 0],
            "itemId": "x"
        })));
        assert!(matches!(wrong, Err(SchemaError::WrongShape { field: "origin", .. })));

        assert!(matches!(
            decode_throw(&value(json!([1, 2, 3]))),
            Err(SchemaError::NotAnObject { .. })
        ));
    }

    #[test]
    fn test_unknown_broadcast() {
        assert!(matches!(
            decode_broadcast("ON_DANCE", &StateValue::Null),
            Err(SchemaError::UnknownEvent(_))
        ));
    }

    #[test]
    fn test_throw_dedupe_key_stable() {
        let e = ThrowEvent {
            origin: Vec3::new(1.0, 2.0, 3.0),
            velocity: Vec3::new(0.0, 5.0, -9.0),
            item_id: "smoke_grenade".into(),
        };
        assert_eq!(e.dedupe_key("p1"), e.clone().dedupe_key("p1"));
        assert_ne!(e.dedupe_key("p1"), e.dedupe_key("p2"));
    }
}
