use core::any::Any;
use std::collections::HashMap;

use crate::{
    archetype::ArchetypeID,
    error::{EngineError, EngineResult},
    snapshot::EntitySnapshot,
};

use super::{Component, ComponentBox, ComponentID};

/// A dense, growable array of a single component type, belonging to one archetype.
///
/// Rows are addressed by the slots handed out by the archetype's lookup list, so the length of
/// every column of an archetype always matches the length of its lookup list.
pub struct Column<T> {
    values: Vec<T>,
}

impl<T> Column<T> {
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Appends when `slot` equals the length, overwrites when it is smaller.
    ///
    /// # Errors
    /// - If `slot` is past the end by more than one row
    pub fn write(&mut self, slot: usize, value: T) -> EngineResult<()> {
        let len = self.values.len();

        if slot == len {
            self.values.push(value);
        } else if let Some(row) = self.values.get_mut(slot) {
            *row = value;
        } else {
            return Err(EngineError::SlotOutOfBounds { slot, len });
        }

        Ok(())
    }

    pub fn get(&self, slot: usize) -> Option<&T> {
        self.values.get(slot)
    }

    pub fn get_mut(&mut self, slot: usize) -> Option<&mut T> {
        self.values.get_mut(slot)
    }

    /// Moves the last row into `slot` and shrinks by one, dropping the value previously held at
    /// `slot`. Deleting the last row is a plain truncation.
    ///
    /// Out of bounds slots are ignored.
    pub fn delete(&mut self, slot: usize) {
        if slot < self.values.len() {
            self.values.swap_remove(slot);
        }
    }

    pub fn as_slice(&self) -> &[T] {
        &self.values
    }
}

impl<T> Default for Column<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// All columns of a single component type, one per archetype that stores it
pub struct ColumnStore<T> {
    id: ComponentID,
    columns: HashMap<ArchetypeID, Column<T>, nohash_hasher::BuildNoHashHasher<ArchetypeID>>,
}

impl<T: Component> ColumnStore<T> {
    pub fn new(id: ComponentID) -> Self {
        Self {
            id,
            columns: HashMap::with_hasher(nohash_hasher::BuildNoHashHasher::default()),
        }
    }

    pub fn id(&self) -> ComponentID {
        self.id
    }

    /// Writes into the archetype's column, creating the column on first use.
    pub fn write(&mut self, arche_id: ArchetypeID, slot: usize, value: T) -> EngineResult<()> {
        let id = self.id;
        self.columns
            .entry(arche_id)
            .or_insert_with(|| {
                tracing::debug!(
                    component = id,
                    archetype = arche_id,
                    "created column for {}",
                    core::any::type_name::<T>()
                );
                Column::new()
            })
            .write(slot, value)
    }

    pub fn column(&self, arche_id: ArchetypeID) -> Option<&Column<T>> {
        self.columns.get(&arche_id)
    }

    pub fn read(&self, arche_id: ArchetypeID, slot: usize) -> Option<&T> {
        self.columns.get(&arche_id)?.get(slot)
    }

    pub fn read_mut(&mut self, arche_id: ArchetypeID, slot: usize) -> Option<&mut T> {
        self.columns.get_mut(&arche_id)?.get_mut(slot)
    }

    pub fn delete(&mut self, arche_id: ArchetypeID, slot: usize) {
        if let Some(column) = self.columns.get_mut(&arche_id) {
            column.delete(slot);
        }
    }
}

/// The capability every [ColumnStore] exposes regardless of its component type, so the engine can
/// probe and repack all component types of an archetype uniformly.
///
/// Archetypes a store has no column for are reported as absent, never as an error.
pub trait ErasedColumnStore: 'static {
    fn component_id(&self) -> ComponentID;

    fn type_name(&self) -> &'static str;

    fn has_row(&self, arche_id: ArchetypeID, slot: usize) -> bool;

    fn row_count(&self, arche_id: ArchetypeID) -> Option<usize>;

    /// Copies the row into the snapshot, returning whether there was one.
    fn read_to_snapshot(
        &self,
        arche_id: ArchetypeID,
        slot: usize,
        snapshot: &mut EntitySnapshot,
    ) -> bool;

    fn read_ref(&self, arche_id: ArchetypeID, slot: usize) -> Option<&dyn Any>;

    fn read_mut(&mut self, arche_id: ArchetypeID, slot: usize) -> Option<&mut dyn Any>;

    fn delete_row(&mut self, arche_id: ArchetypeID, slot: usize);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> ErasedColumnStore for ColumnStore<T> {
    fn component_id(&self) -> ComponentID {
        self.id
    }

    fn type_name(&self) -> &'static str {
        core::any::type_name::<T>()
    }

    fn has_row(&self, arche_id: ArchetypeID, slot: usize) -> bool {
        self.read(arche_id, slot).is_some()
    }

    fn row_count(&self, arche_id: ArchetypeID) -> Option<usize> {
        self.columns.get(&arche_id).map(Column::len)
    }

    fn read_to_snapshot(
        &self,
        arche_id: ArchetypeID,
        slot: usize,
        snapshot: &mut EntitySnapshot,
    ) -> bool {
        let Some(value) = self.read(arche_id, slot) else {
            return false;
        };

        snapshot.add(ComponentBox::new(self.id, value.clone()));
        true
    }

    fn read_ref(&self, arche_id: ArchetypeID, slot: usize) -> Option<&dyn Any> {
        self.read(arche_id, slot).map(|value| value as &dyn Any)
    }

    fn read_mut(&mut self, arche_id: ArchetypeID, slot: usize) -> Option<&mut dyn Any> {
        ColumnStore::read_mut(self, arche_id, slot).map(|value| value as &mut dyn Any)
    }

    fn delete_row(&mut self, arche_id: ArchetypeID, slot: usize) {
        self.delete(arche_id, slot)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Type-indexed table of every [ColumnStore], keyed by component id.
///
/// # Implementation
/// Typed access always goes through a [ComponentID] obtained from the same registry that
/// produced the stored type, so a store can only be found under the id of its own type. A
/// mismatch therefore means ids from two different registries were mixed, and aborts.
pub struct StorageTable {
    stores: HashMap<
        ComponentID,
        Box<dyn ErasedColumnStore>,
        nohash_hasher::BuildNoHashHasher<ComponentID>,
    >,
}

impl StorageTable {
    pub fn new() -> Self {
        Self {
            stores: HashMap::with_capacity_and_hasher(
                8,
                nohash_hasher::BuildNoHashHasher::default(),
            ),
        }
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    /// # Panics
    /// - If the store registered under `id` holds a different component type
    pub fn get<C: Component>(&self, id: ComponentID) -> Option<&ColumnStore<C>> {
        let store = self.stores.get(&id)?;

        match store.as_any().downcast_ref::<ColumnStore<C>>() {
            Some(store) => Some(store),
            None => storage_type_mismatch::<C>(id, store.type_name()),
        }
    }

    /// # Panics
    /// - If the store registered under `id` holds a different component type
    pub fn get_mut<C: Component>(&mut self, id: ComponentID) -> Option<&mut ColumnStore<C>> {
        let store = self.stores.get_mut(&id)?;
        let type_name = store.type_name();

        match store.as_any_mut().downcast_mut::<ColumnStore<C>>() {
            Some(store) => Some(store),
            None => storage_type_mismatch::<C>(id, type_name),
        }
    }

    /// # Panics
    /// - If the store registered under `id` holds a different component type
    pub fn get_or_insert<C: Component>(&mut self, id: ComponentID) -> &mut ColumnStore<C> {
        let store = self.stores.entry(id).or_insert_with(|| {
            tracing::debug!(
                component = id,
                "created column store for {}",
                core::any::type_name::<C>()
            );
            Box::new(ColumnStore::<C>::new(id))
        });
        let type_name = store.type_name();

        match store.as_any_mut().downcast_mut::<ColumnStore<C>>() {
            Some(store) => store,
            None => storage_type_mismatch::<C>(id, type_name),
        }
    }

    pub fn values(&self) -> impl Iterator<Item = &Box<dyn ErasedColumnStore>> {
        self.stores.values()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn ErasedColumnStore>> {
        self.stores.values_mut()
    }

    /// Issues a swap-remove of `slot` against every column the archetype has.
    pub fn delete_row(&mut self, arche_id: ArchetypeID, slot: usize) {
        for store in self.stores.values_mut() {
            store.delete_row(arche_id, slot);
        }
    }
}

impl Default for StorageTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cold]
#[inline(never)]
#[track_caller]
fn storage_type_mismatch<C>(id: ComponentID, stored: &'static str) -> ! {
    panic!(
        "Column store for component {} holds {}, not {}",
        id,
        stored,
        core::any::type_name::<C>()
    );
}
