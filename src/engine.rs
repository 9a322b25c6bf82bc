use std::{collections::HashMap, sync::Arc};

use crate::{
    archetype::{ArchetypeID, ArchetypeManager, ArchetypeRegistry},
    bundle::{ComponentSet, IntoComponents},
    component::{storage::StorageTable, Component, ComponentBox, ComponentID, ComponentRegistry},
    config::EngineConfig,
    entity::{Entity, INVALID_ENTITY},
    error::{EngineError, EngineResult},
    filter::filter_archetypes,
    lookup::LookupList,
    snapshot::{EntityRef, EntityRefMut, EntitySnapshot},
};

/// Columnar storage for every archetype in a world
///
/// # Implementation
/// Every archetype gets a [LookupList] that hands out slots, and every component type gets one
/// column store holding a dense column per archetype that uses it. The row of an entity is the
/// same slot in every column of its archetype, so the engine's main job is keeping those columns
/// in lockstep with the lookup list through writes, moves and compaction.
///
/// Which archetype an entity currently lives in is tracked by the caller; every operation takes it
/// as an argument.
pub struct ArchetypeEngine<R: ArchetypeRegistry = ArchetypeManager> {
    config: EngineConfig,
    components: Arc<ComponentRegistry>,
    registry: R,
    lookup: HashMap<ArchetypeID, LookupList, nohash_hasher::BuildNoHashHasher<ArchetypeID>>,
    storages: StorageTable,
}

impl ArchetypeEngine<ArchetypeManager> {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self::with_registry(
            config,
            Arc::new(ComponentRegistry::new()),
            ArchetypeManager::new(),
        )
    }
}

impl Default for ArchetypeEngine<ArchetypeManager> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: ArchetypeRegistry> ArchetypeEngine<R> {
    /// Engines sharing a component registry agree on component ids.
    pub fn with_registry(
        config: EngineConfig,
        components: Arc<ComponentRegistry>,
        registry: R,
    ) -> Self {
        Self {
            config,
            components,
            registry,
            lookup: HashMap::with_hasher(nohash_hasher::BuildNoHashHasher::default()),
            storages: StorageTable::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn component_registry(&self) -> &Arc<ComponentRegistry> {
        &self.components
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Forwarded from the archetype registry. Changes whenever a new archetype is minted.
    pub fn generation(&self) -> u64 {
        self.registry.generation()
    }

    pub fn component_id<C: Component>(&self) -> ComponentID {
        self.components.identify::<C>()
    }

    pub fn component_ids<S: ComponentSet>(&self) -> Vec<ComponentID> {
        S::component_ids(&self.components)
    }

    /// Wraps a value so it can be mixed with values of other types in a single write.
    pub fn component<C: Component>(&self, value: C) -> ComponentBox {
        ComponentBox::of(&self.components, value)
    }

    pub fn archetype_id(&mut self, comp_ids: &[ComponentID]) -> ArchetypeID {
        self.registry.resolve(comp_ids)
    }

    pub fn archetype_of<S: ComponentSet>(&mut self) -> ArchetypeID {
        let comp_ids = S::component_ids(&self.components);
        self.registry.resolve(&comp_ids)
    }

    pub fn slot_of(&self, arche_id: ArchetypeID, entity: Entity) -> Option<usize> {
        self.lookup.get(&arche_id)?.slot_of(entity)
    }

    pub fn contains(&self, arche_id: ArchetypeID, entity: Entity) -> bool {
        self.slot_of(arche_id, entity).is_some()
    }

    /// Entities stored in the archetype, holes excluded
    pub fn live_count(&self, arche_id: ArchetypeID) -> usize {
        self.lookup.get(&arche_id).map_or(0, LookupList::live_count)
    }

    pub fn hole_count(&self, arche_id: ArchetypeID) -> usize {
        self.lookup.get(&arche_id).map_or(0, LookupList::hole_count)
    }

    pub fn entities(&self, arche_id: ArchetypeID) -> impl Iterator<Item = Entity> + '_ {
        self.lookup
            .get(&arche_id)
            .into_iter()
            .flat_map(|lookup| lookup.entities())
    }

    /// Writes the components of the entity into the archetype, returning its slot.
    ///
    /// The entity is given a slot if it does not already have one in the archetype, otherwise its
    /// existing values are overwritten in place. A new entity must be given a value for every
    /// component of the archetype, or its columns would fall out of step.
    ///
    /// # Errors
    /// - If the entity is [INVALID_ENTITY]
    /// - If a column of a supplied component has fewer rows than the slot, which happens when
    ///   earlier writes into the archetype left that component out
    pub fn write(
        &mut self,
        arche_id: ArchetypeID,
        entity: Entity,
        components: impl IntoComponents,
    ) -> EngineResult<usize> {
        if entity == INVALID_ENTITY {
            return Err(EngineError::ReservedEntity(entity));
        }

        let components = components.into_components(&self.components);
        let slot = self.slot_for(arche_id, entity);

        for component in components {
            component.write_into(&mut self.storages, arche_id, slot)?;
        }

        Ok(slot)
    }

    /// Resolves the slot for a write, repacking the archetype first if it has reached the hole
    /// threshold, since compaction moves rows around.
    fn slot_for(&mut self, arche_id: ArchetypeID, entity: Entity) -> usize {
        let capacity = self.config.lookup_capacity;
        let lookup = self.lookup.entry(arche_id).or_insert_with(|| {
            tracing::debug!(archetype = arche_id, "created lookup list");
            LookupList::with_capacity(capacity)
        });

        let holes = lookup.hole_count();
        if holes > 0 && holes >= self.config.hole_threshold {
            compact(arche_id, lookup, &mut self.storages);
        }

        lookup.slot_for(entity)
    }

    /// Adds or replaces components of an entity, moving it to another archetype if its set of
    /// component types changes. Returns the archetype the entity ends up in.
    ///
    /// When the set stays the same only the supplied values are written, in place. Otherwise the
    /// old slot is tagged for deletion and the full merged set is written into the new archetype.
    ///
    /// # Errors
    /// - If the archetype has no lookup list or the entity is not stored in it
    pub fn move_on_recompose(
        &mut self,
        arche_id: ArchetypeID,
        entity: Entity,
        components: impl IntoComponents,
    ) -> EngineResult<ArchetypeID> {
        let slot = self.lookup_slot(arche_id, entity)?;
        let supplied = components.into_components(&self.components);

        let mut comp_ids: Vec<ComponentID> = self
            .storages
            .values()
            .filter(|store| store.has_row(arche_id, slot))
            .map(|store| store.component_id())
            .collect();
        comp_ids.extend(supplied.iter().map(ComponentBox::id));
        comp_ids.sort_unstable();
        comp_ids.dedup();

        let new_arche_id = self.registry.resolve(&comp_ids);

        if new_arche_id == arche_id {
            self.write(arche_id, entity, supplied)?;
            return Ok(arche_id);
        }

        let mut snapshot = self.read_snapshot(arche_id, entity)?;
        snapshot.extend(supplied);

        tracing::trace!(
            entity,
            from = arche_id,
            to = new_arche_id,
            components = snapshot.len(),
            "moving entity"
        );

        self.tag_for_deletion(arche_id, entity)?;
        self.write(new_arche_id, entity, snapshot)?;

        Ok(new_arche_id)
    }

    /// Copies every component of the entity into a snapshot, ordered by component id.
    ///
    /// # Errors
    /// - If the archetype has no lookup list or the entity is not stored in it
    pub fn read_snapshot(
        &self,
        arche_id: ArchetypeID,
        entity: Entity,
    ) -> EngineResult<EntitySnapshot> {
        let slot = self.lookup_slot(arche_id, entity)?;

        let mut snapshot = EntitySnapshot::with_capacity(4);
        for store in self.storages.values() {
            store.read_to_snapshot(arche_id, slot, &mut snapshot);
        }
        snapshot.sort();

        Ok(snapshot)
    }

    /// Like [ArchetypeEngine::read_snapshot], without copying. The engine stays borrowed while the
    /// references are alive.
    pub fn read_snapshot_ref(
        &self,
        arche_id: ArchetypeID,
        entity: Entity,
    ) -> EngineResult<EntityRef<'_>> {
        let slot = self.lookup_slot(arche_id, entity)?;

        let mut view = EntityRef::default();
        for store in self.storages.values() {
            if let Some(value) = store.read_ref(arche_id, slot) {
                view.push(store.component_id(), value);
            }
        }
        view.sort();

        Ok(view)
    }

    pub fn read_snapshot_mut(
        &mut self,
        arche_id: ArchetypeID,
        entity: Entity,
    ) -> EngineResult<EntityRefMut<'_>> {
        let slot = self.lookup_slot(arche_id, entity)?;

        let mut view = EntityRefMut::default();
        for store in self.storages.values_mut() {
            let comp_id = store.component_id();
            if let Some(value) = store.read_mut(arche_id, slot) {
                view.push(comp_id, value);
            }
        }
        view.sort();

        Ok(view)
    }

    /// Returns a single component of the entity, or `None` if the entity or component is absent.
    pub fn read<C: Component>(&self, arche_id: ArchetypeID, entity: Entity) -> Option<&C> {
        let slot = self.slot_of(arche_id, entity)?;
        let comp_id = self.components.get_id::<C>()?;

        self.storages.get::<C>(comp_id)?.read(arche_id, slot)
    }

    pub fn read_mut<C: Component>(
        &mut self,
        arche_id: ArchetypeID,
        entity: Entity,
    ) -> Option<&mut C> {
        let slot = self.slot_of(arche_id, entity)?;
        let comp_id = self.components.get_id::<C>()?;

        self.storages.get_mut::<C>(comp_id)?.read_mut(arche_id, slot)
    }

    /// Turns the slot of the entity into a hole. Its rows stay in place, stale, until the
    /// archetype is compacted.
    ///
    /// # Errors
    /// - If the archetype has no lookup list or the entity is not stored in it
    pub fn tag_for_deletion(&mut self, arche_id: ArchetypeID, entity: Entity) -> EngineResult<()> {
        let lookup = self
            .lookup
            .get_mut(&arche_id)
            .ok_or(EngineError::MissingLookupList(arche_id))?;

        match lookup.tag_deleted(entity) {
            Some(_) => Ok(()),
            None => Err(EngineError::EntityNotFound {
                archetype: arche_id,
                entity,
            }),
        }
    }

    /// Reclaims every hole of the archetype now, rather than waiting for the threshold.
    ///
    /// # Errors
    /// - If the archetype has no lookup list
    pub fn cleanup_holes(&mut self, arche_id: ArchetypeID) -> EngineResult<()> {
        let lookup = self
            .lookup
            .get_mut(&arche_id)
            .ok_or(EngineError::MissingLookupList(arche_id))?;

        compact(arche_id, lookup, &mut self.storages);
        Ok(())
    }

    /// Compacts every archetype that has pending holes.
    pub fn cleanup_all(&mut self) {
        for (&arche_id, lookup) in self.lookup.iter_mut() {
            if lookup.hole_count() > 0 {
                compact(arche_id, lookup, &mut self.storages);
            }
        }
    }

    /// See [filter_archetypes].
    pub fn filter_archetypes(
        &self,
        comp_ids: &[ComponentID],
        out: &mut Vec<ArchetypeID>,
    ) -> EngineResult<()> {
        filter_archetypes(&self.registry, comp_ids, out)
    }

    /// Number of live entities across every archetype containing all of `comp_ids`.
    ///
    /// # Errors
    /// - If `comp_ids` is empty
    pub fn count(&self, comp_ids: &[ComponentID]) -> EngineResult<usize> {
        let mut arche_ids = Vec::new();
        self.filter_archetypes(comp_ids, &mut arche_ids)?;

        Ok(arche_ids
            .iter()
            .map(|&arche_id| self.live_count(arche_id))
            .sum())
    }

    pub fn count_of<S: ComponentSet>(&self) -> EngineResult<usize> {
        self.count(&S::component_ids(&self.components))
    }

    fn lookup_slot(&self, arche_id: ArchetypeID, entity: Entity) -> EngineResult<usize> {
        let lookup = self
            .lookup
            .get(&arche_id)
            .ok_or(EngineError::MissingLookupList(arche_id))?;

        lookup.slot_of(entity).ok_or(EngineError::EntityNotFound {
            archetype: arche_id,
            entity,
        })
    }
}

fn compact(arche_id: ArchetypeID, lookup: &mut LookupList, storages: &mut StorageTable) {
    let rows = lookup.len();
    let reclaimed = lookup.compact(|slot| storages.delete_row(arche_id, slot));

    tracing::debug!(
        archetype = arche_id,
        reclaimed,
        rows_before = rows,
        rows_after = lookup.len(),
        "compacted archetype"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Position {
        x: i32,
        y: i32,
    }

    #[derive(Clone, Debug, PartialEq)]
    struct X(u32);

    #[derive(Clone, Debug, PartialEq)]
    struct Y(u32);

    #[derive(Clone, Debug, PartialEq)]
    struct Z(u32);

    #[test]
    fn write_then_read() {
        let mut engine = ArchetypeEngine::new();
        let arche = engine.archetype_of::<(X, Y)>();

        let slot = engine.write(arche, 5, (X(1), Y(2))).unwrap();
        assert_eq!(slot, 0);

        let snapshot = engine.read_snapshot(arche, 5).unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get::<X>(), Some(&X(1)));
        assert_eq!(snapshot.get::<Y>(), Some(&Y(2)));
        assert_eq!(engine.read::<Y>(arche, 5), Some(&Y(2)));
        assert_eq!(engine.read::<Z>(arche, 5), None);

        // In place update
        engine.write(arche, 5, (Y(9),)).unwrap();
        assert_eq!(engine.read::<Y>(arche, 5), Some(&Y(9)));
        assert_eq!(engine.read::<X>(arche, 5), Some(&X(1)));
        assert_eq!(engine.live_count(arche), 1);
    }

    #[test]
    fn position_scenario() {
        let mut engine = ArchetypeEngine::new();
        let arche = engine.archetype_of::<(Position,)>();

        engine.write(arche, 1, (Position { x: 0, y: 0 },)).unwrap();
        assert_eq!(engine.live_count(arche), 1);

        engine.write(arche, 2, (Position { x: 1, y: 1 },)).unwrap();
        assert_eq!(engine.live_count(arche), 2);

        engine.tag_for_deletion(arche, 1).unwrap();
        engine.cleanup_holes(arche).unwrap();

        assert_eq!(engine.live_count(arche), 1);
        assert_eq!(engine.hole_count(arche), 0);
        assert_eq!(
            engine.read_snapshot(arche, 2).unwrap().get::<Position>(),
            Some(&Position { x: 1, y: 1 })
        );
        assert_eq!(
            engine.read_snapshot(arche, 1).unwrap_err(),
            EngineError::EntityNotFound {
                archetype: arche,
                entity: 1
            }
        );

        let comp_id = engine.component_id::<Position>();
        let column = engine.storages.get::<Position>(comp_id).unwrap().column(arche);
        assert_eq!(column.map(|c| c.len()), Some(1));
    }

    #[test]
    fn tagged_entity_is_absent() {
        let mut engine = ArchetypeEngine::new();
        let arche = engine.archetype_of::<(X,)>();

        engine.write(arche, 1, (X(1),)).unwrap();
        engine.write(arche, 2, (X(2),)).unwrap();
        engine.tag_for_deletion(arche, 1).unwrap();

        assert!(!engine.contains(arche, 1));
        assert_eq!(engine.read::<X>(arche, 1), None);
        assert!(engine.read_snapshot(arche, 1).is_err());
        assert_eq!(engine.live_count(arche), 1);
        assert_eq!(engine.hole_count(arche), 1);
        assert_eq!(engine.entities(arche).collect::<Vec<_>>(), vec![2]);

        assert_eq!(
            engine.tag_for_deletion(arche, 1),
            Err(EngineError::EntityNotFound {
                archetype: arche,
                entity: 1
            })
        );
    }

    #[test]
    fn reused_slot_has_no_stale_data() {
        let mut engine = ArchetypeEngine::new();
        let arche = engine.archetype_of::<(X, Y)>();

        engine.write(arche, 1, (X(1), Y(1))).unwrap();
        engine.write(arche, 2, (X(2), Y(2))).unwrap();

        engine.tag_for_deletion(arche, 1).unwrap();
        let slot = engine.write(arche, 3, (X(3), Y(3))).unwrap();
        assert_eq!(slot, 0);

        let snapshot = engine.read_snapshot(arche, 3).unwrap();
        assert_eq!(snapshot.get::<X>(), Some(&X(3)));
        assert_eq!(snapshot.get::<Y>(), Some(&Y(3)));

        engine.tag_for_deletion(arche, 2).unwrap();
        engine.cleanup_holes(arche).unwrap();
        let slot = engine.write(arche, 4, (X(4), Y(4))).unwrap();
        assert_eq!(slot, 1);
        assert_eq!(engine.read::<X>(arche, 4), Some(&X(4)));
        assert_eq!(engine.read::<X>(arche, 3), Some(&X(3)));
    }

    #[test]
    fn recompose_moves_archetype() {
        let mut engine = ArchetypeEngine::new();
        let a = engine.archetype_of::<(X, Y)>();
        engine.write(a, 1, (X(1), Y(2))).unwrap();
        engine.write(a, 2, (X(5), Y(6))).unwrap();

        let b = engine.move_on_recompose(a, 1, (Z(3),)).unwrap();
        assert_ne!(a, b);
        assert_eq!(b, engine.archetype_of::<(Z, Y, X)>());

        let snapshot = engine.read_snapshot(b, 1).unwrap();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.get::<X>(), Some(&X(1)));
        assert_eq!(snapshot.get::<Y>(), Some(&Y(2)));
        assert_eq!(snapshot.get::<Z>(), Some(&Z(3)));

        assert!(!engine.contains(a, 1));
        assert_eq!(engine.live_count(a), 1);
        assert_eq!(engine.read::<X>(a, 2), Some(&X(5)));
    }

    #[test]
    fn recompose_in_place() {
        let mut engine = ArchetypeEngine::new();
        let a = engine.archetype_of::<(X, Y)>();
        engine.write(a, 1, (X(1), Y(2))).unwrap();

        let generation = engine.generation();
        let same = engine.move_on_recompose(a, 1, (Y(7),)).unwrap();

        assert_eq!(same, a);
        assert_eq!(engine.generation(), generation);
        assert_eq!(engine.slot_of(a, 1), Some(0));
        assert_eq!(engine.hole_count(a), 0);
        assert_eq!(engine.read::<Y>(a, 1), Some(&Y(7)));
        assert_eq!(engine.read::<X>(a, 1), Some(&X(1)));
    }

    #[test]
    fn recompose_requires_membership() {
        let mut engine = ArchetypeEngine::new();
        let a = engine.archetype_of::<(X,)>();

        assert_eq!(
            engine.move_on_recompose(a, 1, (Y(1),)),
            Err(EngineError::MissingLookupList(a))
        );

        engine.write(a, 2, (X(2),)).unwrap();
        assert_eq!(
            engine.move_on_recompose(a, 1, (Y(1),)),
            Err(EngineError::EntityNotFound {
                archetype: a,
                entity: 1
            })
        );
    }

    #[test]
    fn filter_and_count() {
        let mut engine = ArchetypeEngine::new();
        let xy = engine.archetype_of::<(X, Y)>();
        let xyz = engine.archetype_of::<(X, Y, Z)>();
        let z = engine.archetype_of::<(Z,)>();

        for entity in 1..=5 {
            engine.write(xy, entity, (X(entity), Y(entity))).unwrap();
        }
        for entity in 6..=8 {
            engine.write(xyz, entity, (X(entity), Y(entity), Z(entity))).unwrap();
        }
        engine.write(z, 9, (Z(9),)).unwrap();

        engine.tag_for_deletion(xy, 2).unwrap();
        engine.tag_for_deletion(xyz, 7).unwrap();

        let x = engine.component_id::<X>();
        let z_id = engine.component_id::<Z>();

        let mut out = Vec::new();
        engine.filter_archetypes(&[x], &mut out).unwrap();
        assert_eq!(out, vec![xy, xyz]);

        assert_eq!(engine.count(&[x]), Ok(6));
        assert_eq!(engine.count(&[z_id]), Ok(3));
        assert_eq!(engine.count_of::<(X, Z)>(), Ok(2));
        assert_eq!(engine.count(&[]), Err(EngineError::EmptyFilter));

        engine.cleanup_all();
        assert_eq!(engine.count(&[x]), Ok(6));
        assert_eq!(engine.hole_count(xy), 0);
    }

    #[test]
    fn threshold_triggers_compaction() {
        let config = EngineConfig::default().with_hole_threshold(4);
        let mut engine = ArchetypeEngine::with_config(config);
        let arche = engine.archetype_of::<(X,)>();

        for entity in 1..=10 {
            engine.write(arche, entity, (X(entity),)).unwrap();
        }
        for entity in 1..=4 {
            engine.tag_for_deletion(arche, entity).unwrap();
        }
        assert_eq!(engine.hole_count(arche), 4);

        // Compaction runs before the slot is handed out, so the write appends
        let slot = engine.write(arche, 11, (X(11),)).unwrap();
        assert_eq!(engine.hole_count(arche), 0);
        assert_eq!(slot, 6);
        assert_eq!(engine.live_count(arche), 7);

        for entity in 5..=11 {
            assert_eq!(engine.read::<X>(arche, entity), Some(&X(entity)));
        }
    }

    #[test]
    fn write_errors() {
        let mut engine = ArchetypeEngine::new();
        let arche = engine.archetype_of::<(X, Y)>();

        assert_eq!(
            engine.write(arche, INVALID_ENTITY, (X(0), Y(0))),
            Err(EngineError::ReservedEntity(INVALID_ENTITY))
        );

        // The first entity leaves Y out, so the Y column cannot take a second row
        engine.write(arche, 1, (X(1),)).unwrap();
        assert_eq!(
            engine.write(arche, 2, (X(2), Y(2))),
            Err(EngineError::SlotOutOfBounds { slot: 1, len: 0 })
        );
    }

    #[test]
    fn missing_lookup_list() {
        let mut engine = ArchetypeEngine::new();
        let arche = engine.archetype_of::<(X,)>();

        assert_eq!(
            engine.read_snapshot(arche, 1).unwrap_err(),
            EngineError::MissingLookupList(arche)
        );
        assert_eq!(
            engine.tag_for_deletion(arche, 1),
            Err(EngineError::MissingLookupList(arche))
        );
        assert_eq!(
            engine.cleanup_holes(arche),
            Err(EngineError::MissingLookupList(arche))
        );
        assert_eq!(engine.count_of::<(X,)>(), Ok(0));
    }

    #[test]
    fn reference_snapshots() {
        let mut engine = ArchetypeEngine::new();
        let arche = engine.archetype_of::<(X, Y)>();
        engine.write(arche, 1, (X(1), Y(2))).unwrap();

        {
            let mut view = engine.read_snapshot_mut(arche, 1).unwrap();
            assert_eq!(view.len(), 2);
            view.get_mut::<X>().unwrap().0 = 10;
        }

        let view = engine.read_snapshot_ref(arche, 1).unwrap();
        assert_eq!(view.get::<X>(), Some(&X(10)));
        assert_eq!(view.get::<Y>(), Some(&Y(2)));

        let ids: Vec<_> = view.component_ids().collect();
        assert_eq!(ids, engine.component_ids::<(X, Y)>());

        *engine.read_mut::<Y>(arche, 1).unwrap() = Y(20);
        assert_eq!(engine.read::<Y>(arche, 1), Some(&Y(20)));
    }

    #[test]
    fn shared_component_registry() {
        let components = Arc::new(ComponentRegistry::new());
        let mut first = ArchetypeEngine::with_registry(
            EngineConfig::default(),
            components.clone(),
            ArchetypeManager::new(),
        );
        let second = ArchetypeEngine::with_registry(
            EngineConfig::default(),
            components,
            ArchetypeManager::new(),
        );

        assert_eq!(first.component_id::<Y>(), second.component_id::<Y>());

        let arche = first.archetype_of::<(Y,)>();
        let value = second.component(Y(4));
        first.write(arche, 1, value).unwrap();
        assert_eq!(first.read::<Y>(arche, 1), Some(&Y(4)));
    }
}
