use std::collections::BTreeSet;

use cellspace_common::{ComponentValues, EntityId, Patch};
use serde::{Deserialize, Serialize};

/// One replayable write against the store.
///
/// Transactions record these on both their redo and undo logs. An `Insert`
/// carries the entity id it created so that replaying the log reproduces the
/// same identities, and undoing a `Delete` restores the original entity
/// rather than allocating a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WriteOp {
    Insert {
        entity: EntityId,
        components: BTreeSet<String>,
        values: ComponentValues,
    },
    Update {
        entity: EntityId,
        patch: Patch,
    },
    Delete {
        entity: EntityId,
    },
}

impl WriteOp {
    /// The entity this operation touches.
    pub fn entity(&self) -> EntityId {
        match self {
            WriteOp::Insert { entity, .. }
            | WriteOp::Update { entity, .. }
            | WriteOp::Delete { entity } => *entity,
        }
    }
}

#[cfg(test)]
mod tests {
    use cellspace_common::{PatchOp, Value};

    use super::*;

    // Logs get shipped to history and replication consumers as JSON.
    #[test]
    fn ops_survive_json_serialization() {
        let op = WriteOp::Update {
            entity: EntityId(3),
            patch: Patch::from([("hp".to_string(), PatchOp::Set(Value::Int(9)))]),
        };
        let json = serde_json::to_string(&op).unwrap();
        let back: WriteOp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, op);
        assert_eq!(back.entity(), EntityId(3));
    }
}
