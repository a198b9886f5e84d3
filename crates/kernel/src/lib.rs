//! Entity store kernel: archetype tables, entity locations, migration, queries.
//!
//! # Invariants
//! - Every live entity has exactly one location, and the row it points at
//!   holds that entity's id.
//! - All columns of an archetype have identical row counts at all times.
//! - Row removal compacts via swap-with-last; the moved entity's location is
//!   corrected in the same operation.
//! - All state mutations flow through explicit operations on [`Core`] or
//!   [`Store`].

mod archetype;
mod core;
mod error;
mod locations;
mod store;

pub use archetype::Archetype;
pub use core::Core;
pub use error::CoreError;
pub use locations::{EntityLocation, LocationTable};
pub use store::{Resource, SelectOptions, Store, StoreOptions};
