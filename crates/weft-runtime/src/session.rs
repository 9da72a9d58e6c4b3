//! Session ownership and multi-session coordination.
//!
//! [`SessionContext`] owns everything mutable for one live client
//! connection: its handler registry (rebuilt every render pass), build
//! context, state store, and dispatch engine. Nothing is ambient — the
//! context is constructed at session start and passed in explicitly, so
//! sessions stay isolated and the engine is unit-testable.
//!
//! [`WeftRuntime`] coordinates sessions. Each session sits behind its own
//! exclusive lock, held for the whole dispatch sequence: exactly one
//! dispatch is in flight per session, while different sessions dispatch
//! freely in parallel. The mapper registry and signal emitter are shared
//! read-only across all sessions.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument};
use weft_core::events::{EventKind, RawEvent};
use weft_core::ids::{HandlerId, SessionId};
use weft_core::signal::{RuntimeSignal, SignalEmitter};
use weft_core::traceback::TracebackConfig;

use crate::dispatch::{DispatchEngine, DispatchOutcome};
use crate::registry::{Handler, HandlerRegistry, MapperRegistry};
use crate::state::{SessionState, StateStore};
use crate::tree::{BuildContext, ComponentNode};

/// Runtime-level errors (distinct from per-dispatch failures, which are
/// reported as diagnostics, not errors).
#[derive(Clone, Debug, Error)]
pub enum RuntimeError {
    /// The session id does not name a live session.
    #[error("unknown session: {0}")]
    UnknownSession(SessionId),
}

/// Everything one session owns.
pub struct SessionContext {
    id: SessionId,
    handlers: HandlerRegistry,
    tree: BuildContext,
    state: StateStore,
    engine: DispatchEngine,
    mappers: Arc<MapperRegistry>,
    emitter: Arc<SignalEmitter>,
}

impl SessionContext {
    /// Construct a context for a new session.
    pub fn new(
        id: SessionId,
        mappers: Arc<MapperRegistry>,
        emitter: Arc<SignalEmitter>,
        traceback: TracebackConfig,
    ) -> Self {
        Self {
            id,
            handlers: HandlerRegistry::new(),
            tree: BuildContext::new(),
            state: StateStore::new(),
            engine: DispatchEngine::new(traceback),
            mappers,
            emitter,
        }
    }

    /// This session's id.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    // ── Render pass ─────────────────────────────────────────────────────

    /// Start a render pass: discard the previous pass's handler ids and
    /// tree. Ids are reissued during this pass; stale ones will dispatch
    /// as `UnknownHandler`.
    pub fn begin_render_pass(&mut self) {
        self.handlers.clear();
        let _ = self.tree.finish();
        debug!(session_id = %self.id, "render pass started");
    }

    /// Close the pass and yield the built tree for the render engine.
    pub fn finish_render_pass(&mut self) -> Vec<ComponentNode> {
        self.tree.finish()
    }

    /// Register a callback for an event kind during tree construction.
    ///
    /// The returned id is valid only for the current render pass; embed
    /// it in the owning node's properties.
    pub fn register_event_handler(&mut self, kind: EventKind, callback: Handler) -> HandlerId {
        self.handlers.register(kind, callback)
    }

    /// Attach a leaf node to the current parent scope. See
    /// [`BuildContext::insert_component`].
    pub fn insert_component(
        &mut self,
        key: Option<&str>,
        type_name: &str,
        properties: Value,
    ) -> String {
        self.tree.insert_component(key, type_name, properties)
    }

    /// Attach a container node, running `f` inside its scope. See
    /// [`BuildContext::insert_container`].
    pub fn insert_container(
        &mut self,
        key: Option<&str>,
        type_name: &str,
        properties: Value,
        f: impl FnOnce(&mut BuildContext),
    ) -> String {
        self.tree.insert_container(key, type_name, properties, f)
    }

    // ── Dispatch ────────────────────────────────────────────────────────

    /// Run one dispatch to completion and emit the corresponding signal.
    ///
    /// Success emits [`RuntimeSignal::RenderNeeded`]; any captured failure
    /// emits [`RuntimeSignal::Diagnostic`]; an empty handler id emits
    /// nothing at all.
    pub fn dispatch(&mut self, handler_id: &HandlerId, raw_event: &RawEvent) -> DispatchOutcome {
        let outcome = self.engine.dispatch(
            &self.handlers,
            &self.mappers,
            &mut self.state,
            handler_id,
            raw_event,
        );
        match &outcome {
            DispatchOutcome::Skipped => {}
            DispatchOutcome::RenderNeeded => {
                let _ = self.emitter.render_needed(self.id.clone());
            }
            DispatchOutcome::Failed(diag) => {
                let _ = self.emitter.diagnostic(
                    self.id.clone(),
                    diag.message.clone(),
                    diag.traceback.clone(),
                );
            }
        }
        outcome
    }

    // ── State ───────────────────────────────────────────────────────────

    /// The session singleton for `T`. See [`StateStore::state_mut`].
    pub fn state_mut<T: SessionState>(&mut self) -> &mut T {
        self.state.state_mut::<T>()
    }

    /// Direct access to the state store.
    pub fn state(&mut self) -> &mut StateStore {
        &mut self.state
    }

    /// Session teardown of the state store.
    pub fn reset_state(&mut self) {
        self.state.reset();
    }
}

/// Multi-session runtime coordinator.
pub struct WeftRuntime {
    mappers: Arc<MapperRegistry>,
    emitter: Arc<SignalEmitter>,
    traceback: TracebackConfig,
    /// Live sessions, each behind its own exclusive lock.
    sessions: DashMap<SessionId, Arc<Mutex<SessionContext>>>,
}

impl WeftRuntime {
    /// Build a runtime around a startup-time mapper registry.
    ///
    /// The registry is frozen here: registrations made after this point
    /// are impossible, which is what makes shared lock-free reads safe.
    pub fn new(mappers: MapperRegistry) -> Self {
        Self::with_traceback_config(mappers, TracebackConfig::default())
    }

    /// Build a runtime with custom traceback tunables.
    pub fn with_traceback_config(mappers: MapperRegistry, traceback: TracebackConfig) -> Self {
        Self {
            mappers: Arc::new(mappers),
            emitter: Arc::new(SignalEmitter::new()),
            traceback,
            sessions: DashMap::new(),
        }
    }

    /// Create a session and return its id.
    #[instrument(skip(self))]
    pub fn create_session(&self) -> SessionId {
        let id = SessionId::generate();
        let context = SessionContext::new(
            id.clone(),
            Arc::clone(&self.mappers),
            Arc::clone(&self.emitter),
            self.traceback.clone(),
        );
        let _ = self
            .sessions
            .insert(id.clone(), Arc::new(Mutex::new(context)));
        info!(session_id = %id, "session created");
        id
    }

    /// The lock handle for a live session.
    pub fn session(&self, id: &SessionId) -> Option<Arc<Mutex<SessionContext>>> {
        self.sessions.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Run one dispatch against a session, holding its exclusive lock for
    /// the whole sequence.
    pub fn dispatch(
        &self,
        id: &SessionId,
        handler_id: &HandlerId,
        raw_event: &RawEvent,
    ) -> Result<DispatchOutcome, RuntimeError> {
        let session = self
            .session(id)
            .ok_or_else(|| RuntimeError::UnknownSession(id.clone()))?;
        let mut context = session.lock();
        Ok(context.dispatch(handler_id, raw_event))
    }

    /// End a session, discarding its state. Returns whether it existed.
    #[instrument(skip(self))]
    pub fn end_session(&self, id: &SessionId) -> bool {
        let removed = self.sessions.remove(id).is_some();
        if removed {
            info!(session_id = %id, "session ended");
        }
        removed
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Subscribe to runtime signals across all sessions.
    pub fn subscribe(&self) -> broadcast::Receiver<RuntimeSignal> {
        self.emitter.subscribe()
    }

    /// The shared signal emitter.
    pub fn emitter(&self) -> &Arc<SignalEmitter> {
        &self.emitter
    }

    /// The shared mapper registry.
    pub fn mappers(&self) -> &Arc<MapperRegistry> {
        &self.mappers
    }
}
