use std::collections::HashMap;

use crate::entity::{Entity, INVALID_ENTITY};

/// Slot bookkeeping for a single archetype
///
/// # Implementation
/// Slots are rows in every column of the archetype. `ids` is the reverse mapping from slot to
/// entity and always has exactly as many entries as each of those columns has rows.
///
/// Deleting is two-phase. [LookupList::tag_deleted] only marks the slot with [INVALID_ENTITY] and
/// records it as a hole, leaving the row data stale, so a delete costs O(1). Holes are handed out
/// again by [LookupList::slot_for], most recently freed first, and whatever is left over is
/// reclaimed in one batch by [LookupList::compact].
pub struct LookupList {
    /// Entity to slot
    index: HashMap<Entity, usize, nohash_hasher::BuildNoHashHasher<Entity>>,

    /// Slot to entity, with [INVALID_ENTITY] marking holes
    ids: Vec<Entity>,

    /// Slots that have been tagged for deletion, in the order they were tagged
    holes: Vec<usize>,
}

impl LookupList {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            index: HashMap::with_capacity_and_hasher(
                capacity,
                nohash_hasher::BuildNoHashHasher::default(),
            ),
            ids: Vec::with_capacity(capacity),
            holes: Vec::new(),
        }
    }

    /// Number of slots, holes included. Matches the row count of every column of the archetype.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn hole_count(&self) -> usize {
        self.holes.len()
    }

    pub fn live_count(&self) -> usize {
        self.ids.len() - self.holes.len()
    }

    pub fn slot_of(&self, entity: Entity) -> Option<usize> {
        self.index.get(&entity).copied()
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.index.contains_key(&entity)
    }

    /// Returns the entity stored at the slot, or `None` for holes and out of bounds slots.
    pub fn entity_at(&self, slot: usize) -> Option<Entity> {
        self.ids
            .get(slot)
            .copied()
            .filter(|&entity| entity != INVALID_ENTITY)
    }

    /// Live entities, in slot order
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.ids
            .iter()
            .copied()
            .filter(|&entity| entity != INVALID_ENTITY)
    }

    /// Returns the slot of the entity, allocating one if it does not have one yet.
    ///
    /// The most recently freed hole is reused first, as its rows are the most likely to still be
    /// in cache. Without holes, a new slot is appended.
    pub fn slot_for(&mut self, entity: Entity) -> usize {
        debug_assert_ne!(entity, INVALID_ENTITY);

        if let Some(&slot) = self.index.get(&entity) {
            return slot;
        }

        let slot = match self.holes.pop() {
            Some(slot) => {
                self.ids[slot] = entity;
                slot
            }
            None => {
                self.ids.push(entity);
                self.ids.len() - 1
            }
        };

        self.index.insert(entity, slot);
        slot
    }

    /// Turns the slot of the entity into a hole, returning it, or `None` if the entity has no slot.
    pub fn tag_deleted(&mut self, entity: Entity) -> Option<usize> {
        let slot = self.index.remove(&entity)?;

        self.ids[slot] = INVALID_ENTITY;
        self.holes.push(slot);

        Some(slot)
    }

    /// Reclaims every hole, returning how many there were.
    ///
    /// `delete_row` is called with each slot whose row has to be swap-removed from every column of
    /// the archetype, in the same order the reverse mapping is updated, which keeps columns and
    /// slots in lockstep. Work is proportional to the number of holes, not the number of rows.
    pub fn compact(&mut self, mut delete_row: impl FnMut(usize)) -> usize {
        let holes = core::mem::take(&mut self.holes);

        for &hole in holes.iter() {
            // Trailing holes are already stale, so popping them is a plain truncation
            while self.ids.last() == Some(&INVALID_ENTITY) {
                self.ids.pop();
                delete_row(self.ids.len());
            }

            // Trimming may already have consumed this hole
            if hole >= self.ids.len() {
                continue;
            }

            let last = self.ids.len() - 1;
            let moved = self.ids[last];
            debug_assert_ne!(moved, INVALID_ENTITY, "trailing holes should have been trimmed");

            self.ids[hole] = moved;
            self.ids.pop();
            self.index.insert(moved, hole);
            delete_row(hole);
        }

        let reclaimed = holes.len();

        // Keep the allocation around for the next batch
        self.holes = holes;
        self.holes.clear();

        reclaimed
    }
}

impl Default for LookupList {
    fn default() -> Self {
        Self::new()
    }
}
