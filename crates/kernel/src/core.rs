use std::collections::{BTreeMap, BTreeSet};

use cellspace_common::{ArchetypeId, ComponentValues, EntityId, Patch, PatchOp};
use cellspace_schema::{ID_COMPONENT, Schema, SchemaError};

use crate::archetype::Archetype;
use crate::error::CoreError;
use crate::locations::{EntityLocation, LocationTable};

/// The authoritative entity store.
///
/// Owns the schema, all archetype tables, the entity location table, and the
/// entity-id allocator. All mutations go through explicit operations;
/// consumers (rendering, replication) only read via [`read`],
/// [`query_archetypes`], and archetype accessors.
///
/// [`read`]: Core::read
/// [`query_archetypes`]: Core::query_archetypes
#[derive(Debug, Clone)]
pub struct Core {
    schema: Schema,
    archetypes: Vec<Archetype>,
    by_components: BTreeMap<BTreeSet<String>, ArchetypeId>,
    locations: LocationTable,
    next_entity: u32,
}

impl Core {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            archetypes: Vec::new(),
            by_components: BTreeMap::new(),
            locations: LocationTable::new(),
            next_entity: 0,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The location table (read-only; mutated only by this core).
    pub fn locations(&self) -> &LocationTable {
        &self.locations
    }

    /// Return the archetype for the given component set, creating it on
    /// first request.
    ///
    /// The set must contain `"id"` and only registered components. Requests
    /// with the same elements return the same archetype regardless of order;
    /// archetypes are never destroyed.
    pub fn ensure_archetype<I>(&mut self, components: I) -> Result<ArchetypeId, CoreError>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let components: BTreeSet<String> =
            components.into_iter().map(Into::into).collect();
        if !components.contains(ID_COMPONENT) {
            return Err(SchemaError::IdRequired.into());
        }
        if let Some(&id) = self.by_components.get(&components) {
            return Ok(id);
        }

        let id = ArchetypeId(self.archetypes.len() as u32);
        let table = Archetype::new(id, components.clone(), &self.schema)?;
        self.archetypes.push(table);
        self.by_components.insert(components, id);
        tracing::debug!(archetype = id.0, "created archetype");
        Ok(id)
    }

    /// Read-only access to an archetype table.
    pub fn archetype(&self, id: ArchetypeId) -> Result<&Archetype, CoreError> {
        self.archetypes
            .get(id.0 as usize)
            .ok_or(CoreError::UnknownArchetype(id))
    }

    /// All archetypes in creation order.
    pub fn archetypes(&self) -> impl Iterator<Item = &Archetype> {
        self.archetypes.iter()
    }

    /// Insert a new entity into an archetype, returning its fresh id.
    ///
    /// Unsupplied components of the archetype receive their registered
    /// defaults.
    pub fn insert(
        &mut self,
        archetype: ArchetypeId,
        values: &ComponentValues,
    ) -> Result<EntityId, CoreError> {
        let entity = EntityId(self.next_entity);
        self.insert_with(entity, archetype, values)?;
        Ok(entity)
    }

    /// Insert a row for a specific entity id (undo/redo replay path).
    ///
    /// Fails if the entity already exists. The allocator is bumped past the
    /// supplied id so fresh inserts never collide with replayed ones.
    pub fn insert_with(
        &mut self,
        entity: EntityId,
        archetype: ArchetypeId,
        values: &ComponentValues,
    ) -> Result<(), CoreError> {
        if self.locations.locate(entity).is_some() {
            return Err(CoreError::EntityExists(entity));
        }
        if archetype.0 as usize >= self.archetypes.len() {
            return Err(CoreError::UnknownArchetype(archetype));
        }
        let row = self.archetypes[archetype.0 as usize].push_row(
            entity,
            values,
            &self.schema,
        )?;
        self.locations.set(entity, EntityLocation { archetype, row });
        self.next_entity = self.next_entity.max(entity.0 + 1);
        Ok(())
    }

    /// Where an entity currently lives, or None if it does not exist.
    pub fn locate(&self, entity: EntityId) -> Option<EntityLocation> {
        self.locations.locate(entity)
    }

    /// Snapshot all component values of an entity, including `id`.
    ///
    /// Returns None for a non-existent entity; reads never fail.
    pub fn read(&self, entity: EntityId) -> Option<ComponentValues> {
        let location = self.locations.locate(entity)?;
        self.archetypes
            .get(location.archetype.0 as usize)?
            .row_values(location.row)
    }

    /// Apply a partial update to an entity.
    ///
    /// `Set` writes a value, adding the component if the current archetype
    /// lacks it; `Remove` drops the component. If the resulting component
    /// set differs from the current archetype's, the entity's row migrates
    /// to the (possibly new) matching archetype and the vacated row is
    /// compacted. Updating a non-existent entity is an error: the caller
    /// claimed prior state that is not there.
    pub fn update(&mut self, entity: EntityId, patch: &Patch) -> Result<(), CoreError> {
        let location = self
            .locations
            .locate(entity)
            .ok_or(CoreError::EntityNotFound(entity))?;

        for (name, op) in patch {
            if name == ID_COMPONENT {
                return Err(SchemaError::Reserved(name.clone()).into());
            }
            if let PatchOp::Set(value) = op {
                self.schema.check(name, value)?;
            }
        }

        let source = location.archetype;
        let source_idx = source.0 as usize;
        let current = self.archetypes[source_idx].components().clone();
        let mut target = current.clone();
        for (name, op) in patch {
            match op {
                PatchOp::Set(_) => {
                    target.insert(name.clone());
                }
                PatchOp::Remove => {
                    target.remove(name);
                }
            }
        }

        if target == current {
            // Component set unchanged: write in place.
            let table = &mut self.archetypes[source_idx];
            for (name, op) in patch {
                if let PatchOp::Set(value) = op {
                    table.write(location.row, name, value.clone())?;
                }
            }
            return Ok(());
        }

        // Migrate: copy retained values into the target archetype, then
        // compact the source row.
        let mut values = self.archetypes[source_idx]
            .row_values(location.row)
            .ok_or(CoreError::EntityNotFound(entity))?;
        values.remove(ID_COMPONENT);
        for (name, op) in patch {
            match op {
                PatchOp::Set(value) => {
                    values.insert(name.clone(), value.clone());
                }
                PatchOp::Remove => {
                    values.remove(name);
                }
            }
        }

        let destination = self.ensure_archetype(target)?;
        let row = self.archetypes[destination.0 as usize].push_row(
            entity,
            &values,
            &self.schema,
        )?;
        if let Some(moved) = self.archetypes[source_idx].swap_remove_row(location.row) {
            self.locations.set(
                moved,
                EntityLocation {
                    archetype: source,
                    row: location.row,
                },
            );
        }
        self.locations.set(
            entity,
            EntityLocation {
                archetype: destination,
                row,
            },
        );
        tracing::debug!(
            entity = entity.0,
            from = source.0,
            to = destination.0,
            "migrated entity"
        );
        Ok(())
    }

    /// Delete an entity. Deliberate no-op if it does not exist.
    pub fn delete(&mut self, entity: EntityId) {
        let Some(location) = self.locations.remove(entity) else {
            return;
        };
        let moved =
            self.archetypes[location.archetype.0 as usize].swap_remove_row(location.row);
        if let Some(moved) = moved {
            self.locations.set(
                moved,
                EntityLocation {
                    archetype: location.archetype,
                    row: location.row,
                },
            );
        }
        tracing::debug!(
            entity = entity.0,
            archetype = location.archetype.0,
            "deleted entity"
        );
    }

    /// Every archetype whose component set contains all of `include` and
    /// none of `exclude`. The two sets must be disjoint.
    pub fn query_archetypes(
        &self,
        include: &[&str],
        exclude: &[&str],
    ) -> Result<Vec<ArchetypeId>, CoreError> {
        for name in include {
            if exclude.contains(name) {
                return Err(CoreError::OverlappingQuery((*name).to_string()));
            }
        }
        Ok(self
            .archetypes
            .iter()
            .filter(|table| {
                include.iter().all(|name| table.contains(name))
                    && exclude.iter().all(|name| !table.contains(name))
            })
            .map(Archetype::id)
            .collect())
    }
}
