use serde::{Deserialize, Serialize};

/// Unique identifier for an entity in the store.
///
/// Allocated by the core's entity allocator, monotonically increasing and
/// never reused for the lifetime of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// Identifier for an archetype (one columnar table per component set).
///
/// Assigned in creation order and stable for the lifetime of the store;
/// archetypes are cached and never destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArchetypeId(pub u32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_order_by_inner_value() {
        assert!(EntityId(1) < EntityId(2));
        assert!(ArchetypeId(0) < ArchetypeId(7));
    }
}
