use std::collections::BTreeSet;

use cellspace_common::{ArchetypeId, ComponentValues, EntityId, Patch, PatchOp, Value};
use cellspace_kernel::{CoreError, EntityLocation, SelectOptions, Store};
use cellspace_schema::ID_COMPONENT;
use tracing::{debug, error, info_span};

use crate::ops::WriteOp;

/// Store wrapper that funnels every write through a transaction.
///
/// [`TransactionStore::execute`] runs a closure against a [`Transaction`].
/// If the closure succeeds, the accumulated logs and change sets are
/// returned; if it fails, every write it performed is undone and the error
/// propagates with the store back in its pre-transaction state.
#[derive(Debug)]
pub struct TransactionStore {
    store: Store,
}

impl TransactionStore {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Read-only access between transactions.
    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn into_inner(self) -> Store {
        self.store
    }

    /// Run `f` as one atomic transaction.
    pub fn execute<T, F>(&mut self, f: F) -> Result<TransactionResult<T>, CoreError>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T, CoreError>,
    {
        let _span = info_span!("transaction").entered();
        let mut tx = Transaction::new(&mut self.store);
        match f(&mut tx) {
            Ok(value) => Ok(tx.finish(value)),
            Err(err) => {
                tx.rollback();
                Err(err)
            }
        }
    }

    /// Replay a recorded operation list as one transaction. Undoing a
    /// previous result means applying its undo log; redoing means applying
    /// its redo log.
    pub fn apply(&mut self, ops: &[WriteOp]) -> Result<TransactionResult<()>, CoreError> {
        self.execute(|tx| {
            for op in ops {
                tx.apply(op)?;
            }
            Ok(())
        })
    }
}

/// The outcome of a committed transaction: its value, replay logs, and the
/// entities, components, and archetypes it touched.
///
/// The undo log is ordered last-performed-first, so applying it front to
/// back restores the pre-transaction state. The redo log stays in execution
/// order.
#[derive(Debug, Clone)]
pub struct TransactionResult<T> {
    value: T,
    transient: bool,
    redo: Vec<WriteOp>,
    undo: Vec<WriteOp>,
    changed_entities: BTreeSet<EntityId>,
    changed_components: BTreeSet<String>,
    changed_archetypes: BTreeSet<ArchetypeId>,
}

impl<T> TransactionResult<T> {
    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn into_value(self) -> T {
        self.value
    }

    /// True when the transaction asked to be kept out of undo history.
    pub fn transient(&self) -> bool {
        self.transient
    }

    pub fn redo(&self) -> &[WriteOp] {
        &self.redo
    }

    pub fn undo(&self) -> &[WriteOp] {
        &self.undo
    }

    pub fn changed_entities(&self) -> &BTreeSet<EntityId> {
        &self.changed_entities
    }

    pub fn changed_components(&self) -> &BTreeSet<String> {
        &self.changed_components
    }

    pub fn changed_archetypes(&self) -> &BTreeSet<ArchetypeId> {
        &self.changed_archetypes
    }
}

/// An in-flight transaction. Writes go through to the store immediately;
/// each one is also recorded on the redo log together with its inverse on
/// the undo log, so the whole batch can be unwound or replayed.
#[derive(Debug)]
pub struct Transaction<'a> {
    store: &'a mut Store,
    redo: Vec<WriteOp>,
    // Inverse ops in execution order; reversed into undo order at finish.
    undo: Vec<WriteOp>,
    changed_entities: BTreeSet<EntityId>,
    changed_components: BTreeSet<String>,
    changed_archetypes: BTreeSet<ArchetypeId>,
    transient: bool,
}

impl<'a> Transaction<'a> {
    fn new(store: &'a mut Store) -> Self {
        Self {
            store,
            redo: Vec::new(),
            undo: Vec::new(),
            changed_entities: BTreeSet::new(),
            changed_components: BTreeSet::new(),
            changed_archetypes: BTreeSet::new(),
            transient: false,
        }
    }

    pub fn ensure_archetype<I>(&mut self, components: I) -> Result<ArchetypeId, CoreError>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.store.ensure_archetype(components)
    }

    pub fn locate(&self, entity: EntityId) -> Option<EntityLocation> {
        self.store.locate(entity)
    }

    pub fn read(&self, entity: EntityId) -> Option<ComponentValues> {
        self.store.read(entity)
    }

    pub fn select(
        &self,
        include: &[&str],
        options: &SelectOptions,
    ) -> Result<Vec<EntityId>, CoreError> {
        self.store.select(include, options)
    }

    pub fn resource_value(&self, name: &str) -> Result<Value, CoreError> {
        self.store.resource_value(name)
    }

    /// Insert a new entity and record the write.
    pub fn insert(
        &mut self,
        archetype: ArchetypeId,
        values: ComponentValues,
    ) -> Result<EntityId, CoreError> {
        let entity = self.store.insert(archetype, &values)?;
        let components = self.store.archetype(archetype)?.components().clone();
        self.changed_entities.insert(entity);
        self.changed_components.extend(components.iter().cloned());
        self.changed_archetypes.insert(archetype);
        self.redo.push(WriteOp::Insert {
            entity,
            components,
            values,
        });
        self.undo.push(WriteOp::Delete { entity });
        Ok(entity)
    }

    /// Patch an entity and record the write.
    ///
    /// Consecutive updates to the same entity coalesce into one log entry:
    /// the redo patch takes the latest value for each key, the undo patch
    /// keeps the value each key held before its first update in this
    /// transaction.
    pub fn update(&mut self, entity: EntityId, mut patch: Patch) -> Result<(), CoreError> {
        let before = self
            .store
            .read(entity)
            .ok_or(CoreError::EntityNotFound(entity))?;
        let source = self.store.locate(entity).map(|l| l.archetype);
        self.store.update(entity, &patch)?;
        let destination = self.store.locate(entity).map(|l| l.archetype);

        let mut replaced = Patch::new();
        for name in patch.keys() {
            let inverse = match before.get(name) {
                Some(value) => PatchOp::Set(value.clone()),
                None => PatchOp::Remove,
            };
            replaced.insert(name.clone(), inverse);
        }

        self.changed_entities.insert(entity);
        self.changed_components.extend(patch.keys().cloned());
        self.changed_archetypes.extend(source);
        self.changed_archetypes.extend(destination);

        let coalesced = match (self.redo.last_mut(), self.undo.last_mut()) {
            (
                Some(WriteOp::Update {
                    entity: last_redo,
                    patch: redo_patch,
                }),
                Some(WriteOp::Update {
                    entity: last_undo,
                    patch: undo_patch,
                }),
            ) if *last_redo == entity && *last_undo == entity => {
                redo_patch.extend(std::mem::take(&mut patch));
                for (name, inverse) in std::mem::take(&mut replaced) {
                    undo_patch.entry(name).or_insert(inverse);
                }
                true
            }
            _ => false,
        };
        if !coalesced {
            self.redo.push(WriteOp::Update { entity, patch });
            self.undo.push(WriteOp::Update {
                entity,
                patch: replaced,
            });
        }
        Ok(())
    }

    /// Delete an entity and record the write. Deleting an entity that does
    /// not exist is a no-op and records nothing.
    pub fn delete(&mut self, entity: EntityId) -> Result<(), CoreError> {
        let Some(location) = self.store.locate(entity) else {
            return Ok(());
        };
        let table = self.store.archetype(location.archetype)?;
        let components = table.components().clone();
        let mut values = table
            .row_values(location.row)
            .ok_or(CoreError::EntityNotFound(entity))?;
        values.remove(ID_COMPONENT);

        self.store.delete(entity);
        self.changed_entities.insert(entity);
        self.changed_components.extend(components.iter().cloned());
        self.changed_archetypes.insert(location.archetype);
        self.redo.push(WriteOp::Delete { entity });
        self.undo.push(WriteOp::Insert {
            entity,
            components,
            values,
        });
        Ok(())
    }

    /// Write a resource through the ordinary update path, so the change is
    /// logged and undoable like any other.
    pub fn set_resource(&mut self, name: &str, value: Value) -> Result<(), CoreError> {
        let entity = self
            .store
            .resource(name)
            .ok_or_else(|| CoreError::UnknownResource(name.to_string()))?
            .entity();
        let patch = Patch::from([(name.to_string(), PatchOp::Set(value))]);
        self.update(entity, patch)
    }

    /// Apply a recorded operation. Inserts reuse the recorded entity id, so
    /// replaying a log reproduces the same identities.
    pub fn apply(&mut self, op: &WriteOp) -> Result<(), CoreError> {
        match op {
            WriteOp::Insert {
                entity,
                components,
                values,
            } => {
                let archetype = self.store.ensure_archetype(components.iter().cloned())?;
                self.store.insert_with(*entity, archetype, values)?;
                self.changed_entities.insert(*entity);
                self.changed_components.extend(components.iter().cloned());
                self.changed_archetypes.insert(archetype);
                self.redo.push(op.clone());
                self.undo.push(WriteOp::Delete { entity: *entity });
                Ok(())
            }
            WriteOp::Update { entity, patch } => self.update(*entity, patch.clone()),
            WriteOp::Delete { entity } => self.delete(*entity),
        }
    }

    /// Flag this transaction as transient: callers that keep an undo
    /// history should skip recording its result.
    pub fn mark_transient(&mut self) {
        self.transient = true;
    }

    fn finish<T>(mut self, value: T) -> TransactionResult<T> {
        self.undo.reverse();
        debug!(
            redo = self.redo.len(),
            entities = self.changed_entities.len(),
            "transaction committed"
        );
        TransactionResult {
            value,
            transient: self.transient,
            redo: self.redo,
            undo: self.undo,
            changed_entities: self.changed_entities,
            changed_components: self.changed_components,
            changed_archetypes: self.changed_archetypes,
        }
    }

    fn rollback(self) {
        debug!(ops = self.undo.len(), "rolling back failed transaction");
        // Unwind last-performed-first. A failing step leaves the remaining
        // inverse ops still worth attempting, so log and continue.
        for op in self.undo.iter().rev() {
            if let Err(err) = apply_raw(self.store, op) {
                error!(error = %err, "rollback step failed");
            }
        }
    }
}

fn apply_raw(store: &mut Store, op: &WriteOp) -> Result<(), CoreError> {
    match op {
        WriteOp::Insert {
            entity,
            components,
            values,
        } => {
            let archetype = store.ensure_archetype(components.iter().cloned())?;
            store.insert_with(*entity, archetype, values)
        }
        WriteOp::Update { entity, patch } => store.update(*entity, patch),
        WriteOp::Delete { entity } => {
            store.delete(*entity);
            Ok(())
        }
    }
}
