use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A component value: primitive, fixed-size array, or nested object.
///
/// This is a closed union; the schema decides which variant a given component
/// accepts. Objects use BTreeMap for deterministic field iteration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl Value {
    /// Short type label used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    /// Convert a JSON value into a store value.
    ///
    /// Returns `None` if the tree contains a JSON null anywhere: the store
    /// models absence as a missing component, not a null value.
    pub fn from_json(json: serde_json::Value) -> Option<Value> {
        match json {
            serde_json::Value::Null => None,
            serde_json::Value::Bool(b) => Some(Value::Bool(b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Value::Int(i))
                } else {
                    n.as_f64().map(Value::Float)
                }
            }
            serde_json::Value::String(s) => Some(Value::Text(s)),
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(Value::from_json)
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
            serde_json::Value::Object(fields) => fields
                .into_iter()
                .map(|(k, v)| Value::from_json(v).map(|v| (k, v)))
                .collect::<Option<BTreeMap<_, _>>>()
                .map(Value::Object),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

/// A full row of component values keyed by component name.
pub type ComponentValues = BTreeMap<String, Value>;

/// One entry of a partial update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PatchOp {
    /// Write this value, adding the component if absent.
    Set(Value),
    /// Remove the component from the entity.
    Remove,
}

/// A partial update keyed by component name.
pub type Patch = BTreeMap<String, PatchOp>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_json_maps_primitives() {
        assert_eq!(Value::from_json(json!(true)), Some(Value::Bool(true)));
        assert_eq!(Value::from_json(json!(3)), Some(Value::Int(3)));
        assert_eq!(Value::from_json(json!(1.5)), Some(Value::Float(1.5)));
        assert_eq!(
            Value::from_json(json!("hi")),
            Some(Value::Text("hi".into()))
        );
    }

    #[test]
    fn from_json_maps_nested() {
        let v = Value::from_json(json!({"x": 1, "y": [2.0, 3.0]})).unwrap();
        let Value::Object(fields) = v else {
            panic!("expected object");
        };
        assert_eq!(fields["x"], Value::Int(1));
        assert_eq!(
            fields["y"],
            Value::Array(vec![Value::Float(2.0), Value::Float(3.0)])
        );
    }

    #[test]
    fn from_json_rejects_null_anywhere() {
        assert_eq!(Value::from_json(json!(null)), None);
        assert_eq!(Value::from_json(json!([1, null])), None);
        assert_eq!(Value::from_json(json!({"a": null})), None);
    }

    #[test]
    fn value_kind_labels() {
        assert_eq!(Value::Int(1).kind(), "int");
        assert_eq!(Value::Object(BTreeMap::new()).kind(), "object");
    }
}
