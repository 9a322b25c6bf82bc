use std::collections::{HashMap, HashSet};

use collections::BitSet;

use crate::component::{ComponentID, INVALID_COMPONENT};

/// Unique sequential integer
pub type ArchetypeID = usize;

/// Set of archetypes, as stored in the inverted component index
pub type ArchetypeSet = HashSet<ArchetypeID, nohash_hasher::BuildNoHashHasher<ArchetypeID>>;

/// Maps sets of component ids to stable archetype ids.
///
/// This is the only view the engine has of archetypes: it never inspects how they are stored.
pub trait ArchetypeRegistry {
    /// Returns the archetype for exactly this set of components, minting a new id if the set has
    /// not been seen before. The order of `comp_ids` does not matter and duplicates are ignored.
    fn resolve(&mut self, comp_ids: &[ComponentID]) -> ArchetypeID;

    /// Inverted index: every archetype whose set contains the component
    fn archetypes_containing(&self, comp_id: ComponentID) -> Option<&ArchetypeSet>;

    /// The sorted component ids of the archetype
    fn components_of(&self, arche_id: ArchetypeID) -> Option<&[ComponentID]>;

    /// Incremented every time a new archetype id is minted, so that caches built from the
    /// registry can tell when they are stale.
    fn generation(&self) -> u64;
}

pub struct Archetype {
    pub id: ArchetypeID,

    /// A bitset that represents the component IDs that are present within this archetype,
    /// where the index of each set bit corresponds to the component ID.
    pub component_id_bitset: BitSet,

    /// The same component IDs, sorted
    comp_ids: Vec<ComponentID>,
}

impl Archetype {
    pub fn new(id: ArchetypeID, comp_ids: Vec<ComponentID>, bitset: BitSet) -> Self {
        Self {
            id,
            component_id_bitset: bitset,
            comp_ids,
        }
    }

    pub fn comp_ids(&self) -> &[ComponentID] {
        &self.comp_ids
    }

    pub fn has_component(&self, comp_id: ComponentID) -> bool {
        self.component_id_bitset.test(comp_id)
    }
}

/// The default [ArchetypeRegistry]
pub struct ArchetypeManager {
    /// A map of bitsets to archetype IDs. The bitset represents the component IDs that are present
    ids: HashMap<BitSet, ArchetypeID, ahash::RandomState>,

    /// A table of all archetypes minted so far, indexed by archetype ID
    archetype_table: Vec<Archetype>,

    /// Component ID to the archetypes that contain it
    containing: HashMap<ComponentID, ArchetypeSet, nohash_hasher::BuildNoHashHasher<ComponentID>>,

    generation: u64,
}

impl ArchetypeManager {
    pub fn new() -> Self {
        Self {
            ids: HashMap::with_capacity_and_hasher(8, ahash::RandomState::default()),
            archetype_table: Vec::with_capacity(8),
            containing: HashMap::with_capacity_and_hasher(
                8,
                nohash_hasher::BuildNoHashHasher::default(),
            ),
            generation: 0,
        }
    }

    pub fn get(&self, arche_id: ArchetypeID) -> Option<&Archetype> {
        self.archetype_table.get(arche_id)
    }

    pub fn archetypes(&self) -> &[Archetype] {
        &self.archetype_table
    }

    pub fn len(&self) -> usize {
        self.archetype_table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archetype_table.is_empty()
    }

    /// Creates a new archetype with the given component IDs
    ///
    /// The archetype should not already exist, as no check is performed to ensure that it does not.
    fn create_archetype(&mut self, comp_ids: Vec<ComponentID>, bitset: BitSet) -> ArchetypeID {
        debug_assert!(
            !self.ids.contains_key(&bitset),
            "Archetype with the given component IDs already exists"
        );

        let arche_id = self.archetype_table.len();

        for &comp_id in comp_ids.iter() {
            self.containing.entry(comp_id).or_default().insert(arche_id);
        }

        tracing::trace!(archetype = arche_id, components = ?comp_ids, "minted archetype");

        self.ids.insert(bitset.clone(), arche_id);
        self.archetype_table
            .push(Archetype::new(arche_id, comp_ids, bitset));
        self.generation += 1;

        arche_id
    }
}

impl Default for ArchetypeManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchetypeRegistry for ArchetypeManager {
    fn resolve(&mut self, comp_ids: &[ComponentID]) -> ArchetypeID {
        let mut bitset = BitSet::new();
        for &comp_id in comp_ids.iter() {
            debug_assert_ne!(comp_id, INVALID_COMPONENT, "Invalid component ID in archetype");
            bitset.set(comp_id);
        }

        if let Some(&arche_id) = self.ids.get(&bitset) {
            return arche_id;
        }

        let mut sorted = comp_ids.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        self.create_archetype(sorted, bitset)
    }

    fn archetypes_containing(&self, comp_id: ComponentID) -> Option<&ArchetypeSet> {
        self.containing.get(&comp_id)
    }

    fn components_of(&self, arche_id: ArchetypeID) -> Option<&[ComponentID]> {
        self.archetype_table.get(arche_id).map(Archetype::comp_ids)
    }

    fn generation(&self) -> u64 {
        self.generation
    }
}
