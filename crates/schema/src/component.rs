use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use cellspace_common::Value;

use crate::{ID_COMPONENT, SchemaError, check_value};

/// Storage type of a component: primitive, fixed-size array, or nested object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ComponentType {
    Bool,
    Int,
    Float,
    Text,
    /// Fixed-length array of a single element type.
    Array { elem: Box<ComponentType>, len: usize },
    /// Nested object with a fixed field set.
    Object { fields: BTreeMap<String, ComponentType> },
}

impl ComponentType {
    /// The zero-ish value newly inserted rows receive when the caller does
    /// not supply one and no explicit default was registered.
    pub fn default_value(&self) -> Value {
        match self {
            ComponentType::Bool => Value::Bool(false),
            ComponentType::Int => Value::Int(0),
            ComponentType::Float => Value::Float(0.0),
            ComponentType::Text => Value::Text(String::new()),
            ComponentType::Array { elem, len } => {
                Value::Array(vec![elem.default_value(); *len])
            }
            ComponentType::Object { fields } => Value::Object(
                fields
                    .iter()
                    .map(|(name, ty)| (name.clone(), ty.default_value()))
                    .collect(),
            ),
        }
    }

    /// Whether a value matches this type exactly.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (ComponentType::Bool, Value::Bool(_)) => true,
            (ComponentType::Int, Value::Int(_)) => true,
            (ComponentType::Float, Value::Float(_)) => true,
            (ComponentType::Text, Value::Text(_)) => true,
            (ComponentType::Array { elem, len }, Value::Array(items)) => {
                items.len() == *len && items.iter().all(|v| elem.accepts(v))
            }
            (ComponentType::Object { fields }, Value::Object(values)) => {
                fields.len() == values.len()
                    && fields.iter().all(|(name, ty)| {
                        values.get(name).is_some_and(|v| ty.accepts(v))
                    })
            }
            _ => false,
        }
    }

    /// Human-readable type description for error messages.
    pub fn describe(&self) -> String {
        match self {
            ComponentType::Bool => "bool".into(),
            ComponentType::Int => "int".into(),
            ComponentType::Float => "float".into(),
            ComponentType::Text => "text".into(),
            ComponentType::Array { elem, len } => {
                format!("[{}; {}]", elem.describe(), len)
            }
            ComponentType::Object { fields } => {
                let names: Vec<&str> = fields.keys().map(String::as_str).collect();
                format!("object{{{}}}", names.join(", "))
            }
        }
    }
}

/// A registered component: its storage type and default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDef {
    pub ty: ComponentType,
    pub default: Value,
}

/// Immutable name -> component registry, built once at store construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    components: BTreeMap<String, ComponentDef>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Look up a component definition.
    pub fn component(&self, name: &str) -> Option<&ComponentDef> {
        self.components.get(name)
    }

    /// Look up a component definition, failing on unregistered names.
    pub fn require(&self, name: &str) -> Result<&ComponentDef, SchemaError> {
        self.components
            .get(name)
            .ok_or_else(|| SchemaError::UnknownComponent(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    /// Registered component names in deterministic order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }

    /// Validate a value against the registered type of `name`.
    pub fn check(&self, name: &str, value: &Value) -> Result<(), SchemaError> {
        let def = self.require(name)?;
        check_value(name, &def.ty, value)
    }
}

/// Collects component registrations; all validation happens in [`build`].
///
/// [`build`]: SchemaBuilder::build
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    entries: Vec<(String, ComponentType, Option<Value>)>,
}

impl SchemaBuilder {
    /// Register a component with the type's zero default.
    pub fn component(mut self, name: &str, ty: ComponentType) -> Self {
        self.entries.push((name.to_string(), ty, None));
        self
    }

    /// Register a component with an explicit default value.
    pub fn component_with_default(
        mut self,
        name: &str,
        ty: ComponentType,
        default: Value,
    ) -> Self {
        self.entries.push((name.to_string(), ty, Some(default)));
        self
    }

    /// Validate all registrations and produce the immutable schema.
    pub fn build(self) -> Result<Schema, SchemaError> {
        let mut components = BTreeMap::new();
        for (name, ty, default) in self.entries {
            if name == ID_COMPONENT {
                return Err(SchemaError::Reserved(name));
            }
            let default = match default {
                Some(value) => {
                    check_value(&name, &ty, &value)?;
                    value
                }
                None => ty.default_value(),
            };
            let def = ComponentDef { ty, default };
            if components.insert(name.clone(), def).is_some() {
                return Err(SchemaError::Duplicate(name));
            }
        }
        Ok(Schema { components })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vec3() -> ComponentType {
        ComponentType::Object {
            fields: BTreeMap::from([
                ("x".to_string(), ComponentType::Float),
                ("y".to_string(), ComponentType::Float),
                ("z".to_string(), ComponentType::Float),
            ]),
        }
    }

    #[test]
    fn builder_registers_components() {
        let schema = Schema::builder()
            .component("position", vec3())
            .component("name", ComponentType::Text)
            .build()
            .unwrap();
        assert!(schema.contains("position"));
        assert!(schema.contains("name"));
        assert!(!schema.contains("velocity"));
    }

    #[test]
    fn builder_rejects_reserved_id() {
        let err = Schema::builder()
            .component("id", ComponentType::Int)
            .build()
            .unwrap_err();
        assert_eq!(err, SchemaError::Reserved("id".to_string()));
    }

    #[test]
    fn builder_rejects_duplicates() {
        let err = Schema::builder()
            .component("hp", ComponentType::Int)
            .component("hp", ComponentType::Float)
            .build()
            .unwrap_err();
        assert_eq!(err, SchemaError::Duplicate("hp".to_string()));
    }

    #[test]
    fn builder_checks_explicit_default() {
        let err = Schema::builder()
            .component_with_default("hp", ComponentType::Int, Value::Text("full".into()))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::TypeMismatch { .. }));
    }

    #[test]
    fn default_values_match_types() {
        assert_eq!(ComponentType::Int.default_value(), Value::Int(0));
        assert_eq!(
            ComponentType::Array {
                elem: Box::new(ComponentType::Float),
                len: 2
            }
            .default_value(),
            Value::Array(vec![Value::Float(0.0), Value::Float(0.0)])
        );
        let Value::Object(fields) = vec3().default_value() else {
            panic!("expected object default");
        };
        assert_eq!(fields.len(), 3);
        assert_eq!(fields["x"], Value::Float(0.0));
    }

    #[test]
    fn accepts_enforces_array_length() {
        let ty = ComponentType::Array {
            elem: Box::new(ComponentType::Int),
            len: 2,
        };
        assert!(ty.accepts(&Value::Array(vec![Value::Int(1), Value::Int(2)])));
        assert!(!ty.accepts(&Value::Array(vec![Value::Int(1)])));
        assert!(!ty.accepts(&Value::Array(vec![Value::Int(1), Value::Bool(true)])));
    }

    #[test]
    fn accepts_enforces_object_fields() {
        let ty = vec3();
        let good = vec3().default_value();
        assert!(ty.accepts(&good));

        let Value::Object(mut fields) = vec3().default_value() else {
            unreachable!()
        };
        fields.remove("z");
        assert!(!ty.accepts(&Value::Object(fields.clone())));
        fields.insert("z".to_string(), Value::Float(0.0));
        fields.insert("w".to_string(), Value::Float(0.0));
        assert!(!ty.accepts(&Value::Object(fields)));
    }

    #[test]
    fn schema_check_reports_component_name() {
        let schema = Schema::builder()
            .component("hp", ComponentType::Int)
            .build()
            .unwrap();
        let err = schema.check("hp", &Value::Bool(true)).unwrap_err();
        assert_eq!(
            err,
            SchemaError::TypeMismatch {
                component: "hp".to_string(),
                expected: "int".to_string(),
                got: "bool",
            }
        );
        assert!(matches!(
            schema.check("mana", &Value::Int(1)),
            Err(SchemaError::UnknownComponent(_))
        ));
    }
}
