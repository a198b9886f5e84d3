use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use cellspace_common::{ArchetypeId, ComponentValues, EntityId, Value};
use cellspace_schema::{Column, ID_COMPONENT, Schema, SchemaError};

use crate::error::CoreError;

/// One columnar table storing every entity that currently has exactly this
/// component set.
///
/// The component set is canonical (order-independent) and always contains
/// `"id"`. The id column is a dense `Vec<EntityId>`; every other component
/// owns one schema-typed [`Column`]. Rows append at the end; removal moves
/// the last row into the freed slot so storage stays densely packed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Archetype {
    id: ArchetypeId,
    components: BTreeSet<String>,
    columns: BTreeMap<String, Column>,
    ids: Vec<EntityId>,
}

impl Archetype {
    /// Build an empty table for the given canonical component set.
    ///
    /// The set must contain `"id"`; every other member must be registered in
    /// the schema.
    pub(crate) fn new(
        id: ArchetypeId,
        components: BTreeSet<String>,
        schema: &Schema,
    ) -> Result<Self, SchemaError> {
        if !components.contains(ID_COMPONENT) {
            return Err(SchemaError::IdRequired);
        }
        let mut columns = BTreeMap::new();
        for name in &components {
            if name == ID_COMPONENT {
                continue;
            }
            let def = schema.require(name)?;
            columns.insert(name.clone(), Column::new(name, def.ty.clone()));
        }
        Ok(Self {
            id,
            components,
            columns,
            ids: Vec::new(),
        })
    }

    pub fn id(&self) -> ArchetypeId {
        self.id
    }

    /// The canonical component set, including `"id"`.
    pub fn components(&self) -> &BTreeSet<String> {
        &self.components
    }

    pub fn contains(&self, component: &str) -> bool {
        self.components.contains(component)
    }

    /// Number of rows (live entities) in this table.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Entities in row order.
    pub fn entities(&self) -> &[EntityId] {
        &self.ids
    }

    pub fn entity_at(&self, row: usize) -> Option<EntityId> {
        self.ids.get(row).copied()
    }

    /// Read-only access to one component column.
    pub fn column(&self, component: &str) -> Option<&Column> {
        self.columns.get(component)
    }

    /// Snapshot all component values of one row, including `id`.
    pub fn row_values(&self, row: usize) -> Option<ComponentValues> {
        let entity = self.entity_at(row)?;
        let mut values = ComponentValues::new();
        values.insert(ID_COMPONENT.to_string(), Value::Int(i64::from(entity.0)));
        for (name, column) in &self.columns {
            values.insert(name.clone(), column.get(row)?.clone());
        }
        Some(values)
    }

    /// Append a full row for `entity`.
    ///
    /// Supplied values must belong to this archetype's component set and
    /// match their schema types; unsupplied components receive their
    /// registered defaults. Returns the new row index.
    pub(crate) fn push_row(
        &mut self,
        entity: EntityId,
        values: &ComponentValues,
        schema: &Schema,
    ) -> Result<usize, CoreError> {
        // Validate everything up front so the pushes below cannot leave
        // columns with mismatched lengths.
        for (name, value) in values {
            if name == ID_COMPONENT {
                return Err(SchemaError::Reserved(name.clone()).into());
            }
            if !self.columns.contains_key(name) {
                return Err(CoreError::ComponentNotInArchetype {
                    component: name.clone(),
                    archetype: self.id,
                });
            }
            schema.check(name, value)?;
        }

        let row = self.ids.len();
        for (name, column) in &mut self.columns {
            let value = match values.get(name) {
                Some(value) => value.clone(),
                None => schema.require(name)?.default.clone(),
            };
            column.push(value)?;
        }
        self.ids.push(entity);
        Ok(row)
    }

    /// Overwrite one component of an existing row.
    pub(crate) fn write(
        &mut self,
        row: usize,
        component: &str,
        value: Value,
    ) -> Result<(), CoreError> {
        let column = self.columns.get_mut(component).ok_or_else(|| {
            CoreError::ComponentNotInArchetype {
                component: component.to_string(),
                archetype: self.id,
            }
        })?;
        column.set(row, value)?;
        Ok(())
    }

    /// Remove a row, compacting by moving the last row into its slot.
    ///
    /// Returns the entity that now occupies `row` (the previous last row's
    /// entity), or None if the removed row was the last one. The caller must
    /// fix that entity's location.
    pub(crate) fn swap_remove_row(&mut self, row: usize) -> Option<EntityId> {
        debug_assert!(row < self.ids.len());
        let last = self.ids.len() - 1;
        for column in self.columns.values_mut() {
            column.swap_remove(row);
        }
        self.ids.swap_remove(row);
        if row < last { Some(self.ids[row]) } else { None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellspace_schema::ComponentType;

    fn schema() -> Schema {
        Schema::builder()
            .component("hp", ComponentType::Int)
            .component_with_default("name", ComponentType::Text, Value::Text("unnamed".into()))
            .build()
            .unwrap()
    }

    fn table(schema: &Schema) -> Archetype {
        let components: BTreeSet<String> =
            ["id", "hp", "name"].iter().map(|s| s.to_string()).collect();
        Archetype::new(ArchetypeId(0), components, schema).unwrap()
    }

    #[test]
    fn new_requires_id() {
        let schema = schema();
        let components: BTreeSet<String> = ["hp".to_string()].into_iter().collect();
        let err = Archetype::new(ArchetypeId(0), components, &schema).unwrap_err();
        assert_eq!(err, SchemaError::IdRequired);
    }

    #[test]
    fn push_row_fills_defaults() {
        let schema = schema();
        let mut table = table(&schema);
        let values = ComponentValues::from([("hp".to_string(), Value::Int(5))]);
        let row = table.push_row(EntityId(1), &values, &schema).unwrap();
        assert_eq!(row, 0);

        let read = table.row_values(0).unwrap();
        assert_eq!(read["id"], Value::Int(1));
        assert_eq!(read["hp"], Value::Int(5));
        assert_eq!(read["name"], Value::Text("unnamed".into()));
    }

    #[test]
    fn push_row_rejects_foreign_and_reserved_components() {
        let schema = schema();
        let mut table = table(&schema);

        let foreign = ComponentValues::from([("mana".to_string(), Value::Int(1))]);
        assert!(matches!(
            table.push_row(EntityId(1), &foreign, &schema),
            Err(CoreError::ComponentNotInArchetype { .. })
        ));

        let reserved = ComponentValues::from([("id".to_string(), Value::Int(9))]);
        assert!(matches!(
            table.push_row(EntityId(1), &reserved, &schema),
            Err(CoreError::Schema(SchemaError::Reserved(_)))
        ));
        // Failed pushes must not leave partial rows behind.
        assert!(table.is_empty());
        assert_eq!(table.column("hp").unwrap().len(), 0);
    }

    #[test]
    fn swap_remove_row_reports_moved_entity() {
        let schema = schema();
        let mut table = table(&schema);
        for i in 1..=3 {
            let values = ComponentValues::from([("hp".to_string(), Value::Int(i))]);
            table
                .push_row(EntityId(i as u32), &values, &schema)
                .unwrap();
        }

        // Removing the middle row moves entity 3 into row 1.
        assert_eq!(table.swap_remove_row(1), Some(EntityId(3)));
        assert_eq!(table.entities(), &[EntityId(1), EntityId(3)]);
        assert_eq!(table.row_values(1).unwrap()["hp"], Value::Int(3));

        // Removing the last row moves nothing.
        assert_eq!(table.swap_remove_row(1), None);
        assert_eq!(table.entities(), &[EntityId(1)]);
    }
}
