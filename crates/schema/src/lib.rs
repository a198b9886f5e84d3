//! Component schemas and schema-typed column storage.
//!
//! Every component referenced anywhere in the store must be registered here
//! once, at store construction; the schema is immutable afterward.
//!
//! # Invariants
//! - The component name `"id"` is reserved for the implicit entity id column.
//! - A `Column` only ever holds values matching its declared `ComponentType`;
//!   every write is validated.

mod column;
mod component;

pub use column::Column;
pub use component::{ComponentDef, ComponentType, Schema, SchemaBuilder};

use cellspace_common::Value;

/// The reserved name of the implicit entity id column.
pub const ID_COMPONENT: &str = "id";

/// Errors from schema registration and typed storage.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("id is required")]
    IdRequired,
    #[error("unknown component: {0}")]
    UnknownComponent(String),
    #[error("component {component}: expected {expected}, got {got}")]
    TypeMismatch {
        component: String,
        expected: String,
        got: &'static str,
    },
    #[error("component name {0:?} is reserved")]
    Reserved(String),
    #[error("duplicate component: {0}")]
    Duplicate(String),
    #[error("component {component}: row {row} out of bounds (len {len})")]
    RowOutOfBounds {
        component: String,
        row: usize,
        len: usize,
    },
}

/// Validate a value against a component type, naming the component in errors.
pub(crate) fn check_value(
    component: &str,
    ty: &ComponentType,
    value: &Value,
) -> Result<(), SchemaError> {
    if ty.accepts(value) {
        Ok(())
    } else {
        Err(SchemaError::TypeMismatch {
            component: component.to_string(),
            expected: ty.describe(),
            got: value.kind(),
        })
    }
}
