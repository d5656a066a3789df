//! Dynamically typed replicated value.
//!
//! The session transport mirrors JSON-like data, so values are modelled the
//! same way. Accessors are forgiving: they return `None` on a shape
//! mismatch instead of failing, and callers pick a default.

use std::collections::BTreeMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::SchemaError;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<StateValue>),
    Map(BTreeMap<String, StateValue>),
}

impl StateValue {
    pub fn from_json_str(json: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self, SchemaError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Canonical JSON text. Map keys are sorted, so equal values always
    /// produce equal text.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn is_null(&self) -> bool {
        matches!(self, StateValue::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            StateValue::Number(n) => Some(*n),
            StateValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        self.as_f64().map(|n| n as f32)
    }

    /// Booleans, plus numbers (non-zero is true).
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            StateValue::Bool(b) => Some(*b),
            StateValue::Number(n) => Some(*n != 0.0),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            StateValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Non-negative integral numbers (or numeric text) as `u32`.
    pub fn as_u32(&self) -> Option<u32> {
        let n = self.as_f64()?;
        if n.is_finite() && n >= 0.0 && n.fract() == 0.0 && n <= f64::from(u32::MAX) {
            Some(n as u32)
        } else {
            None
        }
    }

    pub fn as_list(&self) -> Option<&[StateValue]> {
        match self {
            StateValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, StateValue>> {
        match self {
            StateValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Field lookup on a map value.
    pub fn get(&self, key: &str) -> Option<&StateValue> {
        self.as_map()?.get(key)
    }

    /// First present field among `keys`.
    pub fn get_any(&self, keys: &[&str]) -> Option<&StateValue> {
        keys.iter().find_map(|k| self.get(k))
    }

    /// `[x, y, z]` or `{x, y, z}`.
    pub fn as_vec3(&self) -> Option<Vec3> {
        match self {
            StateValue::List(items) if items.len() >= 3 => Some(Vec3::new(
                items[0].as_f32()?,
                items[1].as_f32()?,
                items[2].as_f32()?,
            )),
            StateValue::Map(_) => Some(Vec3::new(
                self.get("x")?.as_f32()?,
                self.get("y")?.as_f32()?,
                self.get("z")?.as_f32()?,
            )),
            _ => None,
        }
    }

    /// List of strings; non-string entries are skipped.
    pub fn as_string_list(&self) -> Vec<String> {
        self.as_list()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_owned))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Build a map value from key/value pairs.
    pub fn map<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, StateValue)>,
        K: Into<String>,
    {
        StateValue::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl From<bool> for StateValue {
    fn from(v: bool) -> Self {
        StateValue::Bool(v)
    }
}

impl From<f64> for StateValue {
    fn from(v: f64) -> Self {
        StateValue::Number(v)
    }
}

impl From<f32> for StateValue {
    fn from(v: f32) -> Self {
        StateValue::Number(f64::from(v))
    }
}

impl From<u32> for StateValue {
    fn from(v: u32) -> Self {
        StateValue::Number(f64::from(v))
    }
}

impl From<&str> for StateValue {
    fn from(v: &str) -> Self {
        StateValue::Text(v.to_owned())
    }
}

impl From<String> for StateValue {
    fn from(v: String) -> Self {
        StateValue::Text(v)
    }
}

impl From<Vec3> for StateValue {
    fn from(v: Vec3) -> Self {
        StateValue::List(vec![v.x.into(), v.y.into(), v.z.into()])
    }
}

impl From<Vec<StateValue>> for StateValue {
    fn from(v: Vec<StateValue>) -> Self {
        StateValue::List(v)
    }
}

impl<T: Into<StateValue>> From<Option<T>> for StateValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(StateValue::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_shapes() {
        let v = StateValue::from_json(json!({
            "name": "ghost",
            "hp": 75,
            "alive": true,
            "pos": [1.0, 2.0, 3.5],
            "missing": null,
        }))
        .unwrap();
        assert_eq!(v.get("name").and_then(StateValue::as_str), Some("ghost"));
        assert_eq!(v.get("hp").and_then(StateValue::as_f32), Some(75.0));
        assert_eq!(v.get("alive").and_then(StateValue::as_bool), Some(true));
        assert_eq!(
            v.get("pos").and_then(StateValue::as_vec3),
            Some(Vec3::new(1.0, 2.0, 3.5))
        );
        assert!(v.get("missing").is_some_and(StateValue::is_null));
        assert!(v.get("absent").is_none());
    }

    #[test]
    fn test_vec3_from_object() {
        let v = StateValue::from_json(json!({"x": 1, "y": -2, "z": 0.5})).unwrap();
        assert_eq!(v.as_vec3(), Some(Vec3::new(1.0, -2.0, 0.5)));
        let short = StateValue::from_json(json!([1, 2])).unwrap();
        assert_eq!(short.as_vec3(), None);
    }

    #[test]
    fn test_lenient_scalars() {
        assert_eq!(StateValue::from("42").as_f32(), Some(42.0));
        assert_eq!(StateValue::from(1.0f64).as_bool(), Some(true));
        assert_eq!(StateValue::from(2.0f64).as_u32(), Some(2));
        assert_eq!(StateValue::from(-1.0f64).as_u32(), None);
        assert_eq!(StateValue::from(1.5f64).as_u32(), None);
        assert_eq!(StateValue::from("x").as_bool(), None);
    }

    #[test]
    fn test_string_list_skips_garbage() {
        let v = StateValue::from_json(json!(["suppressor", 3, null, "scope"])).unwrap();
        assert_eq!(v.as_string_list(), vec!["suppressor", "scope"]);
        assert!(StateValue::Null.as_string_list().is_empty());
    }

    #[test]
    fn test_canonical_json_sorted() {
        let a = StateValue::from_json(json!({"b": 1, "a": 2})).unwrap();
        let b = StateValue::from_json(json!({"a": 2, "b": 1})).unwrap();
        assert_eq!(a.to_json_string(), b.to_json_string());
    }

    #[test]
    fn test_bad_json_is_error() {
        assert!(StateValue::from_json_str("{not json").is_err());
    }
}
