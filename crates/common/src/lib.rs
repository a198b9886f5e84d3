//! Shared types for the cellspace entity/component store.
//!
//! # Invariants
//! - Entity and archetype ids are opaque; callers never construct meaningful
//!   values, they only receive them from the store.
//! - `Value` is a closed union: every component value anywhere in the store
//!   is one of its variants, checked against the registered schema.

mod types;
mod value;

pub use types::{ArchetypeId, EntityId};
pub use value::{ComponentValues, Patch, PatchOp, Value};
