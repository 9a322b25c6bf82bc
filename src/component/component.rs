use core::any::TypeId;
use std::collections::HashMap;

use parking_lot::Mutex;

/// Unique sequential integer, starting at 1
pub type ComponentID = usize;

/// Never handed out by a [ComponentRegistry]
pub const INVALID_COMPONENT: ComponentID = 0;

/// Anything that can be stored in a column. Snapshots hand out copies, hence `Clone`.
pub trait Component: Clone + 'static {}
impl<T: Clone + 'static> Component for T {}

/// Translates component types into [ComponentID]s
///
/// # Implementation
/// The registry is not a process-wide global. Engines that should agree on numbering share one
/// registry through an `Arc`, and the allocate-and-remember step is serialised by a mutex so that
/// engines living on different threads can register types concurrently.
#[derive(Default)]
pub struct ComponentRegistry {
    inner: Mutex<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    ids: HashMap<TypeId, ComponentID, nohash_hasher::BuildNoHashHasher<u64>>,

    /// Type names, where `names[id - 1]` belongs to component `id`
    names: Vec<&'static str>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id of the component type, allocating the next sequential id on first use.
    pub fn identify<C: Component>(&self) -> ComponentID {
        let mut inner = self.inner.lock();

        let type_id = TypeId::of::<C>();
        if let Some(&id) = inner.ids.get(&type_id) {
            return id;
        }

        inner.names.push(core::any::type_name::<C>());
        let id = inner.names.len();
        inner.ids.insert(type_id, id);

        tracing::trace!(id, name = core::any::type_name::<C>(), "registered component");

        id
    }

    /// Returns the id of the component type, if it has been identified before
    pub fn get_id<C: Component>(&self) -> Option<ComponentID> {
        self.inner.lock().ids.get(&TypeId::of::<C>()).copied()
    }

    pub fn name(&self, id: ComponentID) -> Option<&'static str> {
        let index = id.checked_sub(1)?;
        self.inner.lock().names.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    type CompA = u32;
    type CompB = u64;

    #[derive(Clone)]
    struct Position;

    #[test]
    fn component_identification() {
        let registry = ComponentRegistry::new();

        assert_eq!(registry.identify::<CompA>(), 1);
        assert_eq!(registry.identify::<CompB>(), 2);
        assert_eq!(registry.identify::<CompA>(), 1);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn lookup_does_not_allocate() {
        let registry = ComponentRegistry::new();
        assert_eq!(registry.get_id::<Position>(), None);

        let id = registry.identify::<Position>();
        assert_eq!(registry.get_id::<Position>(), Some(id));
        assert_ne!(id, INVALID_COMPONENT);
        assert!(registry.name(id).unwrap().ends_with("Position"));
        assert_eq!(registry.name(INVALID_COMPONENT), None);
    }

    #[test]
    fn shared_between_threads() {
        let registry = Arc::new(ComponentRegistry::new());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    if i % 2 == 0 {
                        (registry.identify::<CompA>(), registry.identify::<CompB>())
                    } else {
                        let b = registry.identify::<CompB>();
                        (registry.identify::<CompA>(), b)
                    }
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for pair in results.iter() {
            assert_eq!(*pair, results[0]);
        }

        assert_eq!(registry.len(), 2);
        let (a, b) = results[0];
        assert_ne!(a, b);
        assert!(a == 1 || a == 2);
        assert!(b == 1 || b == 2);
    }
}
