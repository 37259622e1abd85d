//! The attribute bag every `DataGrid` carries: a keyed map of small typed
//! values, not a full array, matching the original system's per-grid
//! metadata (`TypeName`, `Units`, `Latitude`, `Longitude`, `Height`,
//! `Time`, `FractionalTime`, ...).

use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum AttributeValue {
    Str(String),
    Float(f64),
    Int(i32),
    Long(i64),
}

impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Float(f) => Some(*f),
            AttributeValue::Int(i) => Some(*i as f64),
            AttributeValue::Long(l) => Some(*l as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(i) => Some(*i as i64),
            AttributeValue::Long(l) => Some(*l),
            _ => None,
        }
    }
}

/// Well-known attribute keys used across the pipeline.
pub mod keys {
    pub const TYPE_NAME: &str = "TypeName";
    pub const UNITS: &str = "Units";
    pub const LATITUDE: &str = "Latitude";
    pub const LONGITUDE: &str = "Longitude";
    pub const HEIGHT: &str = "Height";
    pub const TIME: &str = "Time";
    pub const FRACTIONAL_TIME: &str = "FractionalTime";
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AttributeBag {
    values: HashMap<String, AttributeValue>,
}

impl AttributeBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: AttributeValue) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.values.get(key)
    }

    pub fn set_str(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.set(key, AttributeValue::Str(value.into()));
    }

    pub fn set_f64(&mut self, key: impl Into<String>, value: f64) {
        self.set(key, AttributeValue::Float(value));
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(AttributeValue::as_str)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(AttributeValue::as_f64)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(AttributeValue::as_i64)
    }

    pub fn type_name(&self) -> Option<&str> {
        self.get_str(keys::TYPE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_typed_values() {
        let mut bag = AttributeBag::new();
        bag.set_str(keys::TYPE_NAME, "Reflectivity");
        bag.set_f64(keys::LATITUDE, 35.333);
        bag.set(keys::HEIGHT, AttributeValue::Long(442));

        assert_eq!(bag.type_name(), Some("Reflectivity"));
        assert_eq!(bag.get_f64(keys::LATITUDE), Some(35.333));
        assert_eq!(bag.get_i64(keys::HEIGHT), Some(442));
        assert_eq!(bag.get_str("missing"), None);
    }
}
