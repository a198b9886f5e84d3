use std::collections::BTreeMap;

use cellspace_common::{ArchetypeId, ComponentValues, EntityId, Patch, PatchOp, Value};
use cellspace_schema::{ID_COMPONENT, Schema};

use crate::archetype::Archetype;
use crate::core::Core;
use crate::error::CoreError;
use crate::locations::EntityLocation;

/// Store construction options: named resource singletons and their initial
/// values. Each resource name must be a registered component.
#[derive(Debug, Clone, Default)]
pub struct StoreOptions {
    pub resources: BTreeMap<String, Value>,
}

/// Options for [`Store::select`].
#[derive(Debug, Clone, Default)]
pub struct SelectOptions {
    pub exclude: Vec<String>,
}

/// Accessor handle for a named resource singleton.
///
/// A resource is the sole row of a private one-entity archetype
/// `{id, <name>}`; the handle reads and writes that single cell through the
/// ordinary entity paths, so resource writes behave exactly like updates.
#[derive(Debug, Clone)]
pub struct Resource {
    name: String,
    entity: EntityId,
}

impl Resource {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The entity backing this resource's one-row archetype.
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn get(&self, store: &Store) -> Option<Value> {
        let mut values = store.read(self.entity)?;
        values.remove(&self.name)
    }

    pub fn set(&self, store: &mut Store, value: Value) -> Result<(), CoreError> {
        let patch = Patch::from([(self.name.clone(), PatchOp::Set(value))]);
        store.update(self.entity, &patch)
    }
}

/// The entity store: a [`Core`] plus named resource singletons and the
/// flattened `select` query.
#[derive(Debug, Clone)]
pub struct Store {
    core: Core,
    resources: BTreeMap<String, Resource>,
}

impl Store {
    /// Build a store over a schema, creating one singleton entity per
    /// configured resource.
    pub fn new(schema: Schema, options: StoreOptions) -> Result<Self, CoreError> {
        let mut core = Core::new(schema);
        let mut resources = BTreeMap::new();
        for (name, initial) in options.resources {
            let archetype =
                core.ensure_archetype([ID_COMPONENT.to_string(), name.clone()])?;
            let values = ComponentValues::from([(name.clone(), initial)]);
            let entity = core.insert(archetype, &values)?;
            resources.insert(name.clone(), Resource { name, entity });
        }
        Ok(Self { core, resources })
    }

    pub fn schema(&self) -> &Schema {
        self.core.schema()
    }

    /// Look up a resource accessor by name.
    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.get(name)
    }

    /// Resource accessors in deterministic order.
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    /// Read a resource's current value.
    pub fn resource_value(&self, name: &str) -> Result<Value, CoreError> {
        let resource = self
            .resources
            .get(name)
            .ok_or_else(|| CoreError::UnknownResource(name.to_string()))?;
        resource
            .get(self)
            .ok_or_else(|| CoreError::UnknownResource(name.to_string()))
    }

    /// Write a resource. Routed through the ordinary update path.
    pub fn set_resource(&mut self, name: &str, value: Value) -> Result<(), CoreError> {
        let resource = self
            .resources
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::UnknownResource(name.to_string()))?;
        resource.set(self, value)
    }

    /// Flatten matching archetypes into one ordered entity list: archetype
    /// iteration order, then row order. Row order is not stable across
    /// migrations.
    pub fn select(
        &self,
        include: &[&str],
        options: &SelectOptions,
    ) -> Result<Vec<EntityId>, CoreError> {
        let exclude: Vec<&str> = options.exclude.iter().map(String::as_str).collect();
        let mut entities = Vec::new();
        for id in self.core.query_archetypes(include, &exclude)? {
            entities.extend_from_slice(self.core.archetype(id)?.entities());
        }
        Ok(entities)
    }

    // Explicit delegation to the core; the transactional layer and external
    // consumers share this one surface.

    pub fn ensure_archetype<I>(&mut self, components: I) -> Result<ArchetypeId, CoreError>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.core.ensure_archetype(components)
    }

    pub fn archetype(&self, id: ArchetypeId) -> Result<&Archetype, CoreError> {
        self.core.archetype(id)
    }

    pub fn archetypes(&self) -> impl Iterator<Item = &Archetype> {
        self.core.archetypes()
    }

    pub fn insert(
        &mut self,
        archetype: ArchetypeId,
        values: &ComponentValues,
    ) -> Result<EntityId, CoreError> {
        self.core.insert(archetype, values)
    }

    pub fn insert_with(
        &mut self,
        entity: EntityId,
        archetype: ArchetypeId,
        values: &ComponentValues,
    ) -> Result<(), CoreError> {
        self.core.insert_with(entity, archetype, values)
    }

    pub fn locate(&self, entity: EntityId) -> Option<EntityLocation> {
        self.core.locate(entity)
    }

    pub fn read(&self, entity: EntityId) -> Option<ComponentValues> {
        self.core.read(entity)
    }

    pub fn update(&mut self, entity: EntityId, patch: &Patch) -> Result<(), CoreError> {
        self.core.update(entity, patch)
    }

    pub fn delete(&mut self, entity: EntityId) {
        self.core.delete(entity)
    }

    pub fn query_archetypes(
        &self,
        include: &[&str],
        exclude: &[&str],
    ) -> Result<Vec<ArchetypeId>, CoreError> {
        self.core.query_archetypes(include, exclude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellspace_schema::ComponentType;

    fn test_schema() -> Schema {
        Schema::builder()
            .component("position", ComponentType::Float)
            .component("hp", ComponentType::Int)
            .component("gravity", ComponentType::Float)
            .component("paused", ComponentType::Bool)
            .build()
            .unwrap()
    }

    fn store_with_resources() -> Store {
        let options = StoreOptions {
            resources: BTreeMap::from([
                ("gravity".to_string(), Value::Float(-9.8)),
                ("paused".to_string(), Value::Bool(false)),
            ]),
        };
        Store::new(test_schema(), options).unwrap()
    }

    #[test]
    fn resources_initialize_with_supplied_values() {
        let store = store_with_resources();
        assert_eq!(
            store.resource_value("gravity").unwrap(),
            Value::Float(-9.8)
        );
        assert_eq!(store.resource_value("paused").unwrap(), Value::Bool(false));
        assert!(matches!(
            store.resource_value("missing"),
            Err(CoreError::UnknownResource(_))
        ));
    }

    #[test]
    fn resource_write_reads_back() {
        let mut store = store_with_resources();
        store
            .set_resource("gravity", Value::Float(-1.6))
            .unwrap();
        assert_eq!(
            store.resource_value("gravity").unwrap(),
            Value::Float(-1.6)
        );

        // The handle reads the same cell.
        let handle = store.resource("gravity").unwrap().clone();
        assert_eq!(handle.get(&store), Some(Value::Float(-1.6)));
    }

    #[test]
    fn resource_is_a_one_row_archetype() {
        let store = store_with_resources();
        let handle = store.resource("paused").unwrap();
        let location = store.locate(handle.entity()).unwrap();
        let table = store.archetype(location.archetype).unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.contains("paused"));
        assert!(table.contains("id"));
    }

    #[test]
    fn select_flattens_in_archetype_then_row_order() {
        let mut store = Store::new(test_schema(), StoreOptions::default()).unwrap();
        let a = store.ensure_archetype(["id", "position"]).unwrap();
        let b = store.ensure_archetype(["id", "position", "hp"]).unwrap();

        let e1 = store.insert(a, &ComponentValues::new()).unwrap();
        let e2 = store.insert(b, &ComponentValues::new()).unwrap();
        let e3 = store.insert(a, &ComponentValues::new()).unwrap();

        let selected = store
            .select(&["position"], &SelectOptions::default())
            .unwrap();
        assert_eq!(selected, vec![e1, e3, e2]);

        let narrowed = store
            .select(
                &["position"],
                &SelectOptions {
                    exclude: vec!["hp".to_string()],
                },
            )
            .unwrap();
        assert_eq!(narrowed, vec![e1, e3]);
    }

    #[test]
    fn resource_creation_requires_registered_component() {
        let options = StoreOptions {
            resources: BTreeMap::from([("unknown".to_string(), Value::Int(0))]),
        };
        assert!(Store::new(test_schema(), options).is_err());
    }
}
