use thiserror::Error;

use crate::{archetype::ArchetypeID, entity::Entity};

/// Broken preconditions reported by the engine.
///
/// None of these are retried internally. They indicate that the caller and the engine disagree about
/// where an entity lives, and continuing would corrupt the slot/column bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("archetype {0} has no lookup list")]
    MissingLookupList(ArchetypeID),

    #[error("entity {entity} is not stored in archetype {archetype}")]
    EntityNotFound {
        archetype: ArchetypeID,
        entity: Entity,
    },

    #[error("entity id {0} is reserved as the hole marker")]
    ReservedEntity(Entity),

    #[error("cannot write slot {slot} of a column holding {len} rows")]
    SlotOutOfBounds { slot: usize, len: usize },

    #[error("archetype filter requires at least one component id")]
    EmptyFilter,
}

pub type EngineResult<T> = Result<T, EngineError>;
