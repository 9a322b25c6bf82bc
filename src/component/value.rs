use core::{any::Any, fmt};

use crate::{archetype::ArchetypeID, error::EngineResult};

use super::{storage::StorageTable, Component, ComponentID, ComponentRegistry};

/// Object-safe view of a single component value, implemented for every [Component].
///
/// This is what lets a heterogeneous list of values be driven into their own typed column stores
/// without the engine knowing the concrete types.
trait ErasedValue: Any {
    fn type_name(&self) -> &'static str;

    fn clone_boxed(&self) -> Box<dyn ErasedValue>;

    fn write_into(
        self: Box<Self>,
        id: ComponentID,
        storages: &mut StorageTable,
        arche_id: ArchetypeID,
        slot: usize,
    ) -> EngineResult<()>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<C: Component> ErasedValue for C {
    fn type_name(&self) -> &'static str {
        core::any::type_name::<C>()
    }

    fn clone_boxed(&self) -> Box<dyn ErasedValue> {
        Box::new(self.clone())
    }

    fn write_into(
        self: Box<Self>,
        id: ComponentID,
        storages: &mut StorageTable,
        arche_id: ArchetypeID,
        slot: usize,
    ) -> EngineResult<()> {
        storages.get_or_insert::<C>(id).write(arche_id, slot, *self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// An owned, type-erased component value tagged with its [ComponentID]
pub struct ComponentBox {
    id: ComponentID,
    value: Box<dyn ErasedValue>,
}

impl ComponentBox {
    /// The id must be the one the engine's registry assigned to `C`.
    pub fn new<C: Component>(id: ComponentID, value: C) -> Self {
        Self {
            id,
            value: Box::new(value),
        }
    }

    pub fn of<C: Component>(registry: &ComponentRegistry, value: C) -> Self {
        Self::new(registry.identify::<C>(), value)
    }

    pub fn id(&self) -> ComponentID {
        self.id
    }

    pub fn type_name(&self) -> &'static str {
        (*self.value).type_name()
    }

    pub fn is<C: Component>(&self) -> bool {
        (*self.value).as_any().is::<C>()
    }

    pub fn downcast_ref<C: Component>(&self) -> Option<&C> {
        (*self.value).as_any().downcast_ref::<C>()
    }

    pub fn downcast_mut<C: Component>(&mut self) -> Option<&mut C> {
        (*self.value).as_any_mut().downcast_mut::<C>()
    }

    /// Writes the value into its column for the archetype, at the given slot.
    pub(crate) fn write_into(
        self,
        storages: &mut StorageTable,
        arche_id: ArchetypeID,
        slot: usize,
    ) -> EngineResult<()> {
        self.value.write_into(self.id, storages, arche_id, slot)
    }
}

impl Clone for ComponentBox {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            value: (*self.value).clone_boxed(),
        }
    }
}

impl fmt::Debug for ComponentBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentBox")
            .field("id", &self.id)
            .field("type", &self.type_name())
            .finish()
    }
}
