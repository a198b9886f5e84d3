use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use cellspace_common::{ArchetypeId, EntityId};

/// Where an entity currently lives: which archetype table, which row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityLocation {
    pub archetype: ArchetypeId,
    pub row: usize,
}

/// Maps every live entity to its location.
///
/// Mutated exclusively by the core during insert/update/delete/migration;
/// callers only read. BTreeMap for deterministic iteration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationTable {
    locations: BTreeMap<EntityId, EntityLocation>,
}

impl LocationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an entity's location. None means the entity does not exist.
    pub fn locate(&self, entity: EntityId) -> Option<EntityLocation> {
        self.locations.get(&entity).copied()
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Live entities in deterministic order.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.locations.keys().copied()
    }

    pub(crate) fn set(&mut self, entity: EntityId, location: EntityLocation) {
        self.locations.insert(entity, location);
    }

    pub(crate) fn remove(&mut self, entity: EntityId) -> Option<EntityLocation> {
        self.locations.remove(&entity)
    }
}
