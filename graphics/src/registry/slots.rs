//! Named-slot store.
//!
//! Values are keyed by the [`TypeId`] of their static type, which may be a
//! trait object (`set::<dyn Factory>(..)`). A lookup for a type with no slot
//! of its own falls back to searching the capability views registered with
//! [`SlotStore::set_view`]. The first view found wins and is cached under the
//! requested key, so later lookups resolve directly.

use std::any::{Any, TypeId, type_name};
use std::sync::Arc;

/// Values the store releases on teardown.
pub trait Disposable: Send + Sync {
    /// Release any GPU or host resources held by the value.
    fn dispose(&self);
}

type Erased = Box<dyn Any + Send + Sync>;

struct View {
    key: TypeId,
    type_name: &'static str,
    value: Erased,
    clone_value: fn(&Erased) -> Erased,
}

struct Slot {
    key: TypeId,
    type_name: &'static str,
    value: Erased,
    views: Vec<View>,
    disposer: Option<Arc<dyn Disposable>>,
    /// Cached result of a fallback search; owned by another slot.
    alias: bool,
}

fn clone_arc<T: ?Sized + Send + Sync + 'static>(value: &Erased) -> Erased {
    match value.downcast_ref::<Arc<T>>() {
        Some(arc) => Box::new(Arc::clone(arc)),
        None => Box::new(()),
    }
}

/// Insertion-ordered map from static type to a shared value.
#[derive(Default)]
pub(crate) struct SlotStore {
    slots: Vec<Slot>,
}

impl SlotStore {
    fn position(&self, key: TypeId) -> Option<usize> {
        self.slots.iter().position(|slot| slot.key == key)
    }

    fn insert(&mut self, slot: Slot) {
        match self.position(slot.key) {
            Some(index) => self.slots[index] = slot,
            None => self.slots.push(slot),
        }
    }

    pub fn set<T: ?Sized + Send + Sync + 'static>(
        &mut self,
        value: Arc<T>,
        disposer: Option<Arc<dyn Disposable>>,
    ) {
        // Cached aliases may point at the value being replaced
        self.slots.retain(|slot| !slot.alias);
        self.insert(Slot {
            key: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            value: Box::new(value),
            views: Vec::new(),
            disposer,
            alias: false,
        });
    }

    /// Attach a capability view of `T`'s value, found by fallback lookups
    /// for `V`. Returns false if `T` has no slot.
    pub fn set_view<T: ?Sized + 'static, V: ?Sized + Send + Sync + 'static>(
        &mut self,
        view: Arc<V>,
    ) -> bool {
        self.slots.retain(|slot| !slot.alias);
        let Some(index) = self.position(TypeId::of::<T>()) else {
            return false;
        };
        let views = &mut self.slots[index].views;
        views.retain(|existing| existing.key != TypeId::of::<V>());
        views.push(View {
            key: TypeId::of::<V>(),
            type_name: type_name::<V>(),
            value: Box::new(view),
            clone_value: clone_arc::<V>,
        });
        true
    }

    pub fn remove<T: ?Sized + 'static>(&mut self) -> bool {
        let key = TypeId::of::<T>();
        self.slots.retain(|slot| !slot.alias);
        let before = self.slots.len();
        self.slots.retain(|slot| slot.key != key);
        self.slots.len() != before
    }

    pub fn get_exact<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.position(TypeId::of::<T>())
            .and_then(|index| self.slots[index].value.downcast_ref::<Arc<T>>())
            .cloned()
    }

    /// Look up `T`, falling back to the first registered view of `T`.
    pub fn get<T: ?Sized + Send + Sync + 'static>(&mut self) -> Option<Arc<T>> {
        if let Some(value) = self.get_exact::<T>() {
            return Some(value);
        }

        let key = TypeId::of::<T>();
        let mut candidates = self.slots.iter().filter_map(|slot| {
            slot.views
                .iter()
                .find(|view| view.key == key)
                .map(|view| (slot.type_name, view))
        });
        let (owner, view) = candidates.next()?;
        let others: Vec<&'static str> = candidates.map(|(name, _)| name).collect();
        if !others.is_empty() {
            log::warn!(
                "Ambiguous lookup for {}: using view of {}, also provided by {:?}",
                view.type_name,
                owner,
                others
            );
        }

        let cached = (view.clone_value)(&view.value);
        let result = cached.downcast_ref::<Arc<T>>().cloned();
        log::debug!("Caching {} from slot {}", view.type_name, owner);
        self.slots.push(Slot {
            key,
            type_name: type_name::<T>(),
            value: cached,
            views: Vec::new(),
            disposer: None,
            alias: true,
        });
        result
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| !slot.alias).count()
    }

    /// Dispose every entry that supports it and clear the store.
    pub fn dispose_all(&mut self) {
        for slot in self.slots.drain(..) {
            if let Some(disposer) = slot.disposer {
                log::debug!("Disposing slot {}", slot.type_name);
                disposer.dispose();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    trait Named: Send + Sync {
        fn name(&self) -> &str;
    }

    struct Factory(&'static str);

    impl Named for Factory {
        fn name(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn test_exact_lookup() {
        let mut store = SlotStore::default();
        store.set(Arc::new(42u32), None);
        assert_eq!(*store.get::<u32>().unwrap(), 42);
        assert!(store.get::<u64>().is_none());
    }

    #[test]
    fn test_trait_object_slot() {
        let mut store = SlotStore::default();
        let factory: Arc<dyn Named> = Arc::new(Factory("materials"));
        store.set::<dyn Named>(factory, None);
        assert_eq!(store.get::<dyn Named>().unwrap().name(), "materials");
    }

    #[test]
    fn test_fallback_first_view_wins_and_is_cached() {
        let mut store = SlotStore::default();
        let first = Arc::new(Factory("first"));
        let second = Arc::new(Factory("second"));
        store.set(first.clone(), None);
        store.set_view::<Factory, dyn Named>(first);
        store.set(Arc::new(7u8), None);
        store.set_view::<u8, dyn Named>(second);

        assert_eq!(store.get::<dyn Named>().unwrap().name(), "first");
        // Cached alias resolves directly now
        assert_eq!(store.get_exact::<dyn Named>().unwrap().name(), "first");
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_set_view_requires_slot() {
        let mut store = SlotStore::default();
        let view: Arc<dyn Named> = Arc::new(Factory("orphan"));
        assert!(!store.set_view::<Factory, dyn Named>(view));
    }

    #[test]
    fn test_fallback_forgets_removed_provider() {
        let mut store = SlotStore::default();
        let factory = Arc::new(Factory("removed"));
        store.set(factory.clone(), None);
        store.set_view::<Factory, dyn Named>(factory);
        assert_eq!(store.get::<dyn Named>().unwrap().name(), "removed");

        assert!(store.remove::<Factory>());
        assert!(store.get::<dyn Named>().is_none());
    }

    #[test]
    fn test_fallback_follows_replaced_view() {
        let mut store = SlotStore::default();
        store.set(Arc::new(Factory("owner")), None);
        store.set_view::<Factory, dyn Named>(Arc::new(Factory("old")));
        assert_eq!(store.get::<dyn Named>().unwrap().name(), "old");

        store.set_view::<Factory, dyn Named>(Arc::new(Factory("new")));
        assert_eq!(store.get::<dyn Named>().unwrap().name(), "new");
    }

    #[test]
    fn test_remove() {
        let mut store = SlotStore::default();
        store.set(Arc::new(1i32), None);
        assert!(store.remove::<i32>());
        assert!(!store.remove::<i32>());
        assert!(store.get::<i32>().is_none());
    }

    #[test]
    fn test_dispose_all_skips_aliases() {
        struct Counted(Arc<AtomicUsize>);
        impl Disposable for Counted {
            fn dispose(&self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
        impl Named for Counted {
            fn name(&self) -> &str {
                "counted"
            }
        }

        let count = Arc::new(AtomicUsize::new(0));
        let value = Arc::new(Counted(count.clone()));
        let mut store = SlotStore::default();
        store.set(value.clone(), Some(value.clone() as Arc<dyn Disposable>));
        store.set_view::<Counted, dyn Named>(value);
        assert!(store.get::<dyn Named>().is_some());

        store.dispose_all();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(store.len(), 0);
    }
}
