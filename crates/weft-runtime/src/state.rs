//! Per-session reactive state store.
//!
//! One live instance per state type per session, constructed lazily with
//! default field values on first access. Mutation is in place: the same
//! instance is observed by every later lookup in the session until
//! [`StateStore::reset`] at session teardown.
//!
//! There is no versioning, no copy-on-write, and deliberately no rollback
//! when a handler fails mid-mutation. The exclusive `&mut` borrow a
//! handler holds for the duration of one dispatch is the acquire/commit
//! scope; cross-session aliasing is impossible because each session owns
//! its store outright.

use std::any::{Any, TypeId};
use std::collections::HashMap;

/// Marker for types usable as session state.
///
/// Blanket-implemented: any `Default + Send + 'static` type qualifies.
pub trait SessionState: Any + Send + Default {}

impl<T: Any + Send + Default> SessionState for T {}

/// Singleton-per-type mutable state for one session.
#[derive(Default)]
pub struct StateStore {
    slots: HashMap<TypeId, Box<dyn Any + Send>>,
}

impl StateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The session singleton for `T`, constructed with default field
    /// values on first access.
    ///
    /// The returned reference is live and mutable: changes are visible to
    /// every later call for the same type until [`reset`](Self::reset).
    pub fn state_mut<T: SessionState>(&mut self) -> &mut T {
        let slot = self
            .slots
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(T::default()));
        // Slots are keyed by TypeId, so the downcast cannot miss.
        slot.downcast_mut::<T>()
            .expect("state slot holds the type its TypeId key names")
    }

    /// Read-only peek at `T`, without constructing it.
    pub fn get<T: SessionState>(&self) -> Option<&T> {
        self.slots
            .get(&TypeId::of::<T>())
            .and_then(|slot| slot.downcast_ref::<T>())
    }

    /// Whether an instance of `T` has been constructed.
    pub fn contains<T: SessionState>(&self) -> bool {
        self.slots.contains_key(&TypeId::of::<T>())
    }

    /// Discard all state. Session teardown only.
    pub fn reset(&mut self) {
        self.slots.clear();
    }

    /// Number of live state instances.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether any state has been constructed.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default, PartialEq, Debug)]
    struct Counter {
        val: i64,
    }

    #[derive(Default)]
    struct Form {
        name: String,
    }

    #[test]
    fn first_access_constructs_defaults() {
        let mut store = StateStore::new();
        assert!(!store.contains::<Counter>());
        assert_eq!(store.state_mut::<Counter>().val, 0);
        assert!(store.contains::<Counter>());
    }

    #[test]
    fn mutation_is_visible_to_later_lookups() {
        let mut store = StateStore::new();
        store.state_mut::<Counter>().val += 1;
        store.state_mut::<Counter>().val += 1;
        assert_eq!(store.state_mut::<Counter>().val, 2);
        assert_eq!(store.get::<Counter>().unwrap().val, 2);
    }

    #[test]
    fn one_instance_per_type() {
        let mut store = StateStore::new();
        store.state_mut::<Counter>().val = 5;
        store.state_mut::<Form>().name = "x".into();
        assert_eq!(store.len(), 2);
        assert_eq!(store.state_mut::<Counter>().val, 5);
        assert_eq!(store.state_mut::<Form>().name, "x");
    }

    #[test]
    fn reset_discards_everything() {
        let mut store = StateStore::new();
        store.state_mut::<Counter>().val = 9;
        store.reset();
        assert!(store.is_empty());
        // Reconstructed with defaults after teardown.
        assert_eq!(store.state_mut::<Counter>().val, 0);
    }

    #[test]
    fn get_does_not_construct() {
        let store = StateStore::new();
        assert!(store.get::<Counter>().is_none());
        assert!(store.is_empty());
    }
}
