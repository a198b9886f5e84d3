use cellspace_common::{ArchetypeId, EntityId};
use cellspace_schema::SchemaError;

/// Errors from entity store operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoreError {
    #[error("entity not found: {0:?}")]
    EntityNotFound(EntityId),
    #[error("entity already exists: {0:?}")]
    EntityExists(EntityId),
    #[error("unknown archetype: {0:?}")]
    UnknownArchetype(ArchetypeId),
    #[error("component {component:?} is not a member of archetype {archetype:?}")]
    ComponentNotInArchetype {
        component: String,
        archetype: ArchetypeId,
    },
    #[error("query include and exclude sets overlap on {0:?}")]
    OverlappingQuery(String),
    #[error("unknown resource: {0}")]
    UnknownResource(String),
    #[error(transparent)]
    Schema(#[from] SchemaError),
}
