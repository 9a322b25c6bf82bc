use crate::{
    archetype::{ArchetypeID, ArchetypeRegistry},
    component::ComponentID,
    error::{EngineError, EngineResult},
};

/// Collects every archetype whose component set is a superset of `comp_ids` into `out`, sorted.
///
/// # Implementation
/// Candidates are seeded from the inverted index of the first component, then kept only if the
/// index of every other component also contains them. `out` is cleared first and is meant to be
/// kept by the caller and reused across queries, which also means concurrent queries simply use
/// their own buffers.
///
/// # Errors
/// - If `comp_ids` is empty. There is no sensible "match everything" meaning for this.
pub fn filter_archetypes<R: ArchetypeRegistry + ?Sized>(
    registry: &R,
    comp_ids: &[ComponentID],
    out: &mut Vec<ArchetypeID>,
) -> EngineResult<()> {
    out.clear();

    let Some((&first, rest)) = comp_ids.split_first() else {
        return Err(EngineError::EmptyFilter);
    };

    let Some(candidates) = registry.archetypes_containing(first) else {
        return Ok(());
    };

    for &arche_id in candidates.iter() {
        let in_all = rest.iter().all(|&comp_id| {
            registry
                .archetypes_containing(comp_id)
                .is_some_and(|set| set.contains(&arche_id))
        });

        if in_all {
            out.push(arche_id);
        }
    }

    out.sort_unstable();
    Ok(())
}
