use core::any::Any;

use crate::component::{Component, ComponentBox, ComponentID};

/// Owned copies of the components of one entity
///
/// Used as the transport between the engine and its callers: reads assemble one, and it can be
/// written back into any archetype since every value carries its own [ComponentID].
#[derive(Clone, Debug, Default)]
pub struct EntitySnapshot {
    components: Vec<ComponentBox>,
}

impl EntitySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            components: Vec::with_capacity(capacity),
        }
    }

    /// Adds the component, replacing any value already held under the same id.
    pub fn add(&mut self, component: ComponentBox) {
        match self.components.iter_mut().find(|c| c.id() == component.id()) {
            Some(existing) => *existing = component,
            None => self.components.push(component),
        }
    }

    pub fn remove(&mut self, id: ComponentID) -> Option<ComponentBox> {
        let index = self.components.iter().position(|c| c.id() == id)?;
        Some(self.components.swap_remove(index))
    }

    pub fn contains(&self, id: ComponentID) -> bool {
        self.components.iter().any(|c| c.id() == id)
    }

    pub fn get<C: Component>(&self) -> Option<&C> {
        self.components.iter().find_map(|c| c.downcast_ref::<C>())
    }

    pub fn get_mut<C: Component>(&mut self) -> Option<&mut C> {
        self.components.iter_mut().find_map(|c| c.downcast_mut::<C>())
    }

    pub fn get_by_id(&self, id: ComponentID) -> Option<&ComponentBox> {
        self.components.iter().find(|c| c.id() == id)
    }

    pub fn component_ids(&self) -> impl Iterator<Item = ComponentID> + '_ {
        self.components.iter().map(ComponentBox::id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ComponentBox> {
        self.components.iter()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub(crate) fn sort(&mut self) {
        self.components.sort_unstable_by_key(ComponentBox::id);
    }

    pub fn into_components(self) -> Vec<ComponentBox> {
        self.components
    }
}

impl Extend<ComponentBox> for EntitySnapshot {
    fn extend<I: IntoIterator<Item = ComponentBox>>(&mut self, iter: I) {
        for component in iter {
            self.add(component);
        }
    }
}

impl FromIterator<ComponentBox> for EntitySnapshot {
    fn from_iter<I: IntoIterator<Item = ComponentBox>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        snapshot.extend(iter);
        snapshot
    }
}

/// In-place references to the components of one entity.
///
/// The borrow of the engine it was read from is held for as long as this lives, so no row can be
/// appended, moved or compacted underneath it.
#[derive(Default)]
pub struct EntityRef<'a> {
    components: Vec<(ComponentID, &'a dyn Any)>,
}

impl<'a> EntityRef<'a> {
    pub(crate) fn push(&mut self, id: ComponentID, value: &'a dyn Any) {
        self.components.push((id, value));
    }

    pub fn get<C: Component>(&self) -> Option<&'a C> {
        self.components
            .iter()
            .find_map(|&(_, value)| value.downcast_ref::<C>())
    }

    pub fn get_by_id(&self, id: ComponentID) -> Option<&'a dyn Any> {
        self.components
            .iter()
            .find(|(c, _)| *c == id)
            .map(|&(_, value)| value)
    }

    pub fn component_ids(&self) -> impl Iterator<Item = ComponentID> + '_ {
        self.components.iter().map(|(id, _)| *id)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub(crate) fn sort(&mut self) {
        self.components.sort_unstable_by_key(|(id, _)| *id);
    }
}

/// Mutable in-place references to the components of one entity. See [EntityRef].
#[derive(Default)]
pub struct EntityRefMut<'a> {
    components: Vec<(ComponentID, &'a mut dyn Any)>,
}

impl<'a> EntityRefMut<'a> {
    pub(crate) fn push(&mut self, id: ComponentID, value: &'a mut dyn Any) {
        self.components.push((id, value));
    }

    pub fn get<C: Component>(&self) -> Option<&C> {
        self.components
            .iter()
            .find_map(|(_, value)| value.downcast_ref::<C>())
    }

    pub fn get_mut<C: Component>(&mut self) -> Option<&mut C> {
        self.components
            .iter_mut()
            .find_map(|(_, value)| value.downcast_mut::<C>())
    }

    pub fn component_ids(&self) -> impl Iterator<Item = ComponentID> + '_ {
        self.components.iter().map(|(id, _)| *id)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub(crate) fn sort(&mut self) {
        self.components.sort_unstable_by_key(|(id, _)| *id);
    }
}
