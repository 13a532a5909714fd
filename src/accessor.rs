//! Fixed-shape state record and the accessor that guards it.
//!
//! All reads and writes of a manager's state go through [`Accessor`], so the
//! manager can attach persistence to `set` without call sites knowing about it.
//! The key set is fixed when the record is built; values change, keys never do.

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use thiserror::Error;

/// Error types for record construction and conversion
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("state must serialize to an object, got {0}")]
    NotAnObject(&'static str),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Read/write choke point over a fixed-shape record
pub trait Accessor {
    /// Current value for `key`
    fn get(&self, key: &str) -> Option<&Value>;

    /// Write `value` under `key` in place.
    ///
    /// Returns `false`, leaving the record untouched, when `key` is not part of
    /// the shape.
    fn set(&mut self, key: &str, value: Value) -> bool;

    /// Whether `key` is part of the shape
    fn has(&self, key: &str) -> bool;
}

/// Ordered mapping from field names to JSON values
///
/// Iteration order is insertion order, i.e. the order the initial value's
/// fields were serialized in.
#[derive(Debug, Clone, PartialEq)]
pub struct StateRecord {
    fields: Map<String, Value>,
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl StateRecord {
    /// Build a record from any value that serializes to an object
    pub fn from_serializable<T: Serialize + ?Sized>(initial: &T) -> Result<Self, RecordError> {
        match serde_json::to_value(initial)? {
            Value::Object(fields) => Ok(StateRecord { fields }),
            other => Err(RecordError::NotAnObject(kind_of(&other))),
        }
    }

    /// Field names in record order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Field values in record order
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Shallow-merge previously stored fields over this record
    ///
    /// Only keys already in the shape are taken; everything else in `loaded`
    /// is ignored. Returns how many fields were overwritten.
    pub fn merge(&mut self, loaded: Map<String, Value>) -> usize {
        let mut merged = 0;
        for (key, value) in loaded {
            if let Some(slot) = self.fields.get_mut(&key) {
                *slot = value;
                merged += 1;
            }
        }
        merged
    }

    /// Canonical serialized form (compact JSON, record order)
    pub fn to_json(&self) -> Result<String, RecordError> {
        Ok(serde_json::to_string(&self.fields)?)
    }

    /// Typed snapshot of the whole record
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, RecordError> {
        Ok(serde_json::from_value(Value::Object(self.fields.clone()))?)
    }
}

impl Accessor for StateRecord {
    fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    fn set(&mut self, key: &str, value: Value) -> bool {
        match self.fields.get_mut(key) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    fn has(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Prefs {
        theme: String,
        columns: u32,
        pinned: Vec<String>,
    }

    fn prefs() -> Prefs {
        Prefs {
            theme: "dark".into(),
            columns: 3,
            pinned: vec![],
        }
    }

    #[test]
    fn test_keys_follow_field_order() {
        let record = StateRecord::from_serializable(&prefs()).unwrap();
        let keys: Vec<&str> = record.keys().collect();
        assert_eq!(keys, vec!["theme", "columns", "pinned"]);
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(matches!(
            StateRecord::from_serializable(&42),
            Err(RecordError::NotAnObject("a number"))
        ));
        assert!(matches!(
            StateRecord::from_serializable(&vec![1, 2]),
            Err(RecordError::NotAnObject("an array"))
        ));
    }

    #[test]
    fn test_get_set_has() {
        let mut record = StateRecord::from_serializable(&prefs()).unwrap();

        assert_eq!(record.get("columns"), Some(&json!(3)));
        assert!(record.set("columns", json!(5)));
        assert_eq!(record.get("columns"), Some(&json!(5)));

        assert!(record.has("theme"));
        assert!(!record.has("missing"));
    }

    #[test]
    fn test_set_unknown_key_leaves_shape_fixed() {
        let mut record = StateRecord::from_serializable(&prefs()).unwrap();

        assert!(!record.set("extra", json!(true)));
        assert!(!record.has("extra"));
        assert_eq!(record.len(), 3);
    }

    #[test]
    fn test_merge_is_shallow_and_shape_preserving() {
        let mut record = StateRecord::from_serializable(&json!({"a": 1, "b": 2})).unwrap();

        let loaded = json!({"a": 99, "z": "ignored"});
        let Value::Object(loaded) = loaded else {
            unreachable!()
        };

        assert_eq!(record.merge(loaded), 1);
        assert_eq!(record.get("a"), Some(&json!(99)));
        assert_eq!(record.get("b"), Some(&json!(2)));
        assert!(!record.has("z"));
    }

    #[test]
    fn test_merge_keeps_record_order() {
        let mut record = StateRecord::from_serializable(&json!({"a": 1, "b": 2})).unwrap();
        let Value::Object(loaded) = json!({"b": 20, "a": 10}) else {
            unreachable!()
        };
        record.merge(loaded);

        assert_eq!(record.to_json().unwrap(), r#"{"a":10,"b":20}"#);
    }

    #[test]
    fn test_typed_snapshot() {
        let mut record = StateRecord::from_serializable(&prefs()).unwrap();
        record.set("theme", json!("light"));

        let snapshot: Prefs = record.deserialize().unwrap();
        assert_eq!(snapshot.theme, "light");
        assert_eq!(snapshot.columns, 3);
    }

    #[test]
    fn test_typed_snapshot_surfaces_type_drift() {
        let mut record = StateRecord::from_serializable(&prefs()).unwrap();
        record.set("columns", json!("three"));

        assert!(record.deserialize::<Prefs>().is_err());
    }
}
