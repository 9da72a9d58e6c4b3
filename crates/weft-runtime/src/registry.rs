//! Handler and mapper registries.
//!
//! [`HandlerRegistry`] is per-session and per-render-pass: ids are issued
//! fresh during tree construction and invalidated wholesale when the next
//! pass begins. [`MapperRegistry`] is global and startup-time: registered
//! once, then shared read-only across every session.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;
use weft_core::errors::{DispatchError, HandlerFault};
use weft_core::events::{default_mappers, EventKind, Mapper, TypedEvent};
use weft_core::ids::HandlerId;

use crate::state::StateStore;

/// An application callback bound to one event kind.
///
/// Callbacks receive the session's state store and the typed event, and
/// yield success or a structured fault — never an unwound panic as far as
/// the engine is concerned.
pub type Handler =
    Arc<dyn Fn(&mut StateStore, &TypedEvent) -> Result<(), HandlerFault> + Send + Sync>;

/// A registered `(callback, event kind)` pair.
#[derive(Clone)]
pub struct HandlerEntry {
    /// The application callback.
    pub callback: Handler,
    /// The kind of event this handler consumes.
    pub kind: EventKind,
}

impl std::fmt::Debug for HandlerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerEntry")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Per-render-pass handler registry.
///
/// Entries are created during tree construction and discarded when the
/// next pass begins; a [`HandlerId`] resolves to exactly one entry within
/// the pass that issued it.
#[derive(Default)]
pub struct HandlerRegistry {
    entries: HashMap<HandlerId, HandlerEntry>,
    /// Render-pass generation, folded into every issued id.
    pass: u64,
    next_id: u64,
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for an event kind, producing a fresh id.
    ///
    /// Ids embed the render-pass generation, so an id from a superseded
    /// pass can never collide with a freshly issued one: a stale id
    /// always resolves to `UnknownHandler`, never to a different
    /// handler. The empty id is never issued; it is reserved for "no
    /// handler bound".
    pub fn register(&mut self, kind: EventKind, callback: Handler) -> HandlerId {
        let id = HandlerId::from(format!("h{}-{}", self.pass, self.next_id));
        self.next_id += 1;
        let _ = self.entries.insert(id.clone(), HandlerEntry { callback, kind });
        id
    }

    /// Resolve an id to its entry.
    pub fn lookup(&self, id: &HandlerId) -> Result<&HandlerEntry, DispatchError> {
        self.entries
            .get(id)
            .ok_or_else(|| DispatchError::UnknownHandler {
                handler_id: id.as_str().to_owned(),
            })
    }

    /// Discard all entries and advance to the next pass generation.
    /// Called at the start of every render pass.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.pass += 1;
        self.next_id = 0;
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Global event-kind-to-mapper registry.
///
/// Built once at startup, then shared read-only (wrap in `Arc`) across
/// sessions. Registration is idempotent: the most recent mapper for a
/// kind wins.
#[derive(Default)]
pub struct MapperRegistry {
    mappers: HashMap<EventKind, Mapper>,
}

impl MapperRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with the built-in mapper for every kind.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for (kind, mapper) in default_mappers() {
            registry.register(kind, mapper);
        }
        registry
    }

    /// Register the mapper for a kind. The most recent registration wins.
    pub fn register(&mut self, kind: EventKind, mapper: Mapper) {
        if self.mappers.insert(kind, mapper).is_some() {
            debug!(?kind, "event mapper replaced");
        }
    }

    /// Resolve the mapper for a kind.
    pub fn lookup(&self, kind: EventKind) -> Result<&Mapper, DispatchError> {
        self.mappers
            .get(&kind)
            .ok_or(DispatchError::UnmappedEventKind { kind })
    }

    /// Number of registered mappers.
    pub fn len(&self) -> usize {
        self.mappers.len()
    }

    /// Whether no mappers are registered.
    pub fn is_empty(&self) -> bool {
        self.mappers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use weft_core::events::{ClickEvent, RawEvent};

    fn noop_handler() -> Handler {
        Arc::new(|_state, _event| Ok(()))
    }

    // --- HandlerRegistry ---

    #[test]
    fn register_then_lookup_returns_the_pair() {
        let mut registry = HandlerRegistry::new();
        let id = registry.register(EventKind::Click, noop_handler());

        let entry = registry.lookup(&id).unwrap();
        assert_eq!(entry.kind, EventKind::Click);
    }

    #[test]
    fn ids_are_unique_within_a_pass() {
        let mut registry = HandlerRegistry::new();
        let a = registry.register(EventKind::Click, noop_handler());
        let b = registry.register(EventKind::Click, noop_handler());
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn unknown_id_fails_loudly() {
        let registry = HandlerRegistry::new();
        let err = registry.lookup(&HandlerId::from("h99")).unwrap_err();
        assert_matches!(err, DispatchError::UnknownHandler { ref handler_id } if handler_id == "h99");
    }

    #[test]
    fn clear_invalidates_stale_ids() {
        let mut registry = HandlerRegistry::new();
        let first = registry.register(EventKind::Click, noop_handler());

        registry.clear();
        assert!(registry.is_empty());
        // Stale id no longer resolves.
        assert!(registry.lookup(&first).is_err());

        // Ids embed the pass generation: the reissued id is distinct from
        // the stale one, so the stale id stays dead even after new
        // registrations.
        let reissued = registry.register(EventKind::Click, noop_handler());
        assert_ne!(reissued, first);
        assert!(registry.lookup(&reissued).is_ok());
        assert!(registry.lookup(&first).is_err());
    }

    #[test]
    fn ids_never_collide_across_passes() {
        let mut registry = HandlerRegistry::new();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..3 {
            for _ in 0..4 {
                let id = registry.register(EventKind::Click, noop_handler());
                assert!(seen.insert(id), "id reused across passes");
            }
            registry.clear();
        }
    }

    #[test]
    fn empty_id_is_never_issued() {
        let mut registry = HandlerRegistry::new();
        for _ in 0..100 {
            let id = registry.register(EventKind::Click, noop_handler());
            assert!(!id.is_none());
        }
    }

    // --- MapperRegistry ---

    #[test]
    fn defaults_cover_every_kind() {
        let registry = MapperRegistry::with_defaults();
        assert!(registry.lookup(EventKind::Click).is_ok());
        assert!(registry.lookup(EventKind::Input).is_ok());
        assert!(registry.lookup(EventKind::CheckboxChange).is_ok());
        assert!(registry.lookup(EventKind::SelectOpenedChange).is_ok());
        assert!(registry.lookup(EventKind::SelectSelectionChange).is_ok());
        assert!(registry.lookup(EventKind::Navigate).is_ok());
    }

    #[test]
    fn missing_mapper_fails_loudly() {
        let registry = MapperRegistry::new();
        let err = registry.lookup(EventKind::Click).map(|_| ()).unwrap_err();
        assert_matches!(err, DispatchError::UnmappedEventKind { kind: EventKind::Click });
    }

    #[test]
    fn most_recent_registration_wins() {
        let mut registry = MapperRegistry::with_defaults();
        registry.register(
            EventKind::Click,
            Arc::new(|_raw: &RawEvent, _key: &str| {
                TypedEvent::Click(ClickEvent {
                    key: "overridden".into(),
                })
            }),
        );

        let mapper = registry.lookup(EventKind::Click).unwrap();
        let typed = mapper(&RawEvent::keyed("k"), "k");
        assert_eq!(typed.key(), "overridden");
    }
}
