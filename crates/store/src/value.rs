//! Typed values crossing the graph-store boundary.

use std::collections::{BTreeMap, HashMap};

use serde_json::Number;

use crate::error::StoreError;

/// A single typed value in a query parameter or result cell.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Int(i64),
    Float(f64),
    List(Vec<Value>),
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Numeric accessor; integers widen to float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(value) => Some(*value),
            Value::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(values) => Some(values),
            _ => None,
        }
    }

    pub fn into_json(self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Text(text) => serde_json::Value::String(text),
            Value::Int(value) => serde_json::Value::Number(value.into()),
            Value::Float(value) => Number::from_f64(value)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::List(values) => {
                serde_json::Value::Array(values.into_iter().map(Value::into_json).collect())
            }
        }
    }

    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(flag) => Value::Int(i64::from(*flag)),
            serde_json::Value::Number(number) => {
                if let Some(int) = number.as_i64() {
                    Value::Int(int)
                } else {
                    Value::Float(number.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(text) => Value::Text(text.clone()),
            serde_json::Value::Array(values) => {
                Value::List(values.iter().map(Value::from_json).collect())
            }
            // Node/relationship maps are never requested; flatten to text.
            serde_json::Value::Object(_) => Value::Text(json.to_string()),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::List(values.into_iter().map(Into::into).collect())
    }
}

/// Named query parameters. Ordered so serialized queries are reproducible.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Params {
    values: BTreeMap<String, Value>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn into_json(self) -> serde_json::Value {
        serde_json::Value::Object(
            self.values.into_iter().map(|(name, value)| (name, value.into_json())).collect(),
        )
    }
}

/// One result row: declared output names mapped to typed values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    columns: HashMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.columns.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns.get(name)
    }

    pub fn require_text(&self, query: &'static str, name: &str) -> Result<&str, StoreError> {
        self.get(name).and_then(Value::as_text).ok_or_else(|| StoreError::Decode {
            query,
            message: format!("expected text column `{name}`"),
        })
    }

    pub fn require_i64(&self, query: &'static str, name: &str) -> Result<i64, StoreError> {
        self.get(name).and_then(Value::as_i64).ok_or_else(|| StoreError::Decode {
            query,
            message: format!("expected integer column `{name}`"),
        })
    }

    pub fn require_f64(&self, query: &'static str, name: &str) -> Result<f64, StoreError> {
        self.get(name).and_then(Value::as_f64).ok_or_else(|| StoreError::Decode {
            query,
            message: format!("expected numeric column `{name}`"),
        })
    }

    pub fn opt_text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_text)
    }
}

#[cfg(test)]
mod tests {
    use super::{Params, Row, Value};

    #[test]
    fn numeric_accessor_widens_integers() {
        assert_eq!(Value::Int(3).as_f64(), Some(3.0));
        assert_eq!(Value::Float(1.5).as_f64(), Some(1.5));
        assert_eq!(Value::Text("3".to_string()).as_f64(), None);
    }

    #[test]
    fn json_round_trip_preserves_shape() {
        let value = Value::List(vec![Value::Text("p-1".to_string()), Value::Int(2)]);
        let json = value.clone().into_json();
        assert_eq!(Value::from_json(&json), value);
    }

    #[test]
    fn params_serialize_in_name_order() {
        let params = Params::new().set("zeta", 1i64).set("alpha", "x");
        let names: Vec<&str> = params.names().collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn row_require_reports_missing_columns() {
        let row = Row::new().insert("id", "p-1");
        assert!(row.require_text("q", "id").is_ok());
        assert!(row.require_f64("q", "weight").is_err());
    }
}
