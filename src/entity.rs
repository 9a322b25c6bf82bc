/// Opaque entity identifier. Allocation of entity ids is left to the caller.
pub type Entity = u32;

/// Reserved id meaning "no entity". Lookup lists write it into slots that have been tagged for
/// deletion, so it can never be stored.
pub const INVALID_ENTITY: Entity = 0;
