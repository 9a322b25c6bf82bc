use crate::{
    component::{Component, ComponentBox, ComponentID, ComponentRegistry},
    snapshot::EntitySnapshot,
};

/// Anything that can be turned into a list of type-erased component values to write.
///
/// Implemented for tuples of plain components, so `(Position { .. }, Velocity { .. })` can be
/// passed straight to the engine, as well as for already erased values and snapshots.
pub trait IntoComponents {
    fn into_components(self, registry: &ComponentRegistry) -> Vec<ComponentBox>;
}

impl IntoComponents for () {
    fn into_components(self, _registry: &ComponentRegistry) -> Vec<ComponentBox> {
        Vec::new()
    }
}

impl IntoComponents for ComponentBox {
    fn into_components(self, _registry: &ComponentRegistry) -> Vec<ComponentBox> {
        vec![self]
    }
}

impl IntoComponents for Vec<ComponentBox> {
    fn into_components(self, _registry: &ComponentRegistry) -> Vec<ComponentBox> {
        self
    }
}

impl IntoComponents for EntitySnapshot {
    fn into_components(self, _registry: &ComponentRegistry) -> Vec<ComponentBox> {
        EntitySnapshot::into_components(self)
    }
}

impl<C1: Component> IntoComponents for (C1,) {
    fn into_components(self, registry: &ComponentRegistry) -> Vec<ComponentBox> {
        vec![ComponentBox::of(registry, self.0)]
    }
}

impl<C1: Component, C2: Component> IntoComponents for (C1, C2) {
    fn into_components(self, registry: &ComponentRegistry) -> Vec<ComponentBox> {
        vec![
            ComponentBox::of(registry, self.0),
            ComponentBox::of(registry, self.1),
        ]
    }
}

impl<C1: Component, C2: Component, C3: Component> IntoComponents for (C1, C2, C3) {
    fn into_components(self, registry: &ComponentRegistry) -> Vec<ComponentBox> {
        vec![
            ComponentBox::of(registry, self.0),
            ComponentBox::of(registry, self.1),
            ComponentBox::of(registry, self.2),
        ]
    }
}

impl<C1: Component, C2: Component, C3: Component, C4: Component> IntoComponents
    for (C1, C2, C3, C4)
{
    fn into_components(self, registry: &ComponentRegistry) -> Vec<ComponentBox> {
        vec![
            ComponentBox::of(registry, self.0),
            ComponentBox::of(registry, self.1),
            ComponentBox::of(registry, self.2),
            ComponentBox::of(registry, self.3),
        ]
    }
}

/// A set of component types, named by a tuple, used to resolve archetypes and filter by type.
pub trait ComponentSet {
    fn component_ids(registry: &ComponentRegistry) -> Vec<ComponentID>;
}

impl<C1: Component> ComponentSet for (C1,) {
    fn component_ids(registry: &ComponentRegistry) -> Vec<ComponentID> {
        vec![registry.identify::<C1>()]
    }
}

impl<C1: Component, C2: Component> ComponentSet for (C1, C2) {
    fn component_ids(registry: &ComponentRegistry) -> Vec<ComponentID> {
        vec![registry.identify::<C1>(), registry.identify::<C2>()]
    }
}

impl<C1: Component, C2: Component, C3: Component> ComponentSet for (C1, C2, C3) {
    fn component_ids(registry: &ComponentRegistry) -> Vec<ComponentID> {
        vec![
            registry.identify::<C1>(),
            registry.identify::<C2>(),
            registry.identify::<C3>(),
        ]
    }
}

impl<C1: Component, C2: Component, C3: Component, C4: Component> ComponentSet
    for (C1, C2, C3, C4)
{
    fn component_ids(registry: &ComponentRegistry) -> Vec<ComponentID> {
        vec![
            registry.identify::<C1>(),
            registry.identify::<C2>(),
            registry.identify::<C3>(),
            registry.identify::<C4>(),
        ]
    }
}
