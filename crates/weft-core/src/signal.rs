//! Outbound runtime signals and the broadcast emitter that carries them.
//!
//! The runtime does not render or diff; it tells the external render
//! engine *when* to re-render and hands diagnostics to whoever listens.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::ids::SessionId;
use crate::traceback::Traceback;

/// Default broadcast channel capacity.
const DEFAULT_CAPACITY: usize = 1024;

/// Fields common to every signal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseSignal {
    /// Session the signal belongs to.
    pub session_id: SessionId,
    /// ISO 8601 timestamp.
    pub timestamp: String,
}

impl BaseSignal {
    /// A base stamped with the current time.
    pub fn now(session_id: SessionId) -> Self {
        Self {
            session_id,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Lifecycle signals emitted by the dispatch engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RuntimeSignal {
    /// A dispatch succeeded; the component tree needs re-rendering.
    #[serde(rename = "render_needed")]
    RenderNeeded {
        /// Session and timestamp.
        base: BaseSignal,
    },

    /// A dispatch failed; a structured diagnostic is attached.
    #[serde(rename = "diagnostic")]
    Diagnostic {
        /// Session and timestamp.
        base: BaseSignal,
        /// Failure summary.
        message: String,
        /// Captured call chain.
        traceback: Traceback,
    },
}

impl RuntimeSignal {
    /// Session the signal belongs to.
    pub fn session_id(&self) -> &SessionId {
        match self {
            Self::RenderNeeded { base } | Self::Diagnostic { base, .. } => &base.session_id,
        }
    }

    /// Stable signal type tag.
    pub fn signal_type(&self) -> &'static str {
        match self {
            Self::RenderNeeded { .. } => "render_needed",
            Self::Diagnostic { .. } => "diagnostic",
        }
    }
}

/// Broadcast fan-out for runtime signals.
///
/// The emitter stamps and constructs signals itself: callers say *what
/// happened* (`render_needed`, `diagnostic`) and the emitter builds the
/// wire-shaped signal around it. Emission never awaits; slow receivers
/// lag and drop signals rather than blocking dispatch. Per-kind counters
/// let hosts poll how many re-renders and failures a runtime has
/// produced without subscribing.
pub struct SignalEmitter {
    tx: broadcast::Sender<RuntimeSignal>,
    render_count: AtomicU64,
    diagnostic_count: AtomicU64,
}

impl SignalEmitter {
    /// Create a new emitter with the default channel capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a new emitter with a custom channel capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            render_count: AtomicU64::new(0),
            diagnostic_count: AtomicU64::new(0),
        }
    }

    /// Signal that a session's component tree must be re-rendered.
    ///
    /// Returns the number of receivers that saw the signal; 0 when no one
    /// is subscribed, which is not an error.
    pub fn render_needed(&self, session_id: SessionId) -> usize {
        let _ = self.render_count.fetch_add(1, Ordering::Relaxed);
        self.send(RuntimeSignal::RenderNeeded {
            base: BaseSignal::now(session_id),
        })
    }

    /// Report a captured dispatch failure to whoever listens.
    ///
    /// Same delivery contract as [`render_needed`](Self::render_needed).
    pub fn diagnostic(
        &self,
        session_id: SessionId,
        message: impl Into<String>,
        traceback: Traceback,
    ) -> usize {
        let _ = self.diagnostic_count.fetch_add(1, Ordering::Relaxed);
        self.send(RuntimeSignal::Diagnostic {
            base: BaseSignal::now(session_id),
            message: message.into(),
            traceback,
        })
    }

    fn send(&self, signal: RuntimeSignal) -> usize {
        self.tx.send(signal).unwrap_or(0)
    }

    /// Subscribe to signals emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<RuntimeSignal> {
        self.tx.subscribe()
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Re-renders signalled since construction.
    pub fn render_count(&self) -> u64 {
        self.render_count.load(Ordering::Relaxed)
    }

    /// Dispatch failures reported since construction.
    pub fn diagnostic_count(&self) -> u64 {
        self.diagnostic_count.load(Ordering::Relaxed)
    }
}

impl Default for SignalEmitter {
    fn default() -> Self {
        Self::new()
    }
}
