//! Dispatch engine — the central control loop.
//!
//! Pipeline per dispatch: resolve handler → resolve mapper → map raw
//! event → invoke callback → report. Phases:
//!
//! ```text
//! Idle → Dispatching → {Idle | ErrorCaptured}
//! ```
//!
//! `ErrorCaptured` holds until the next dispatch begins, so hosts can
//! observe that the previous dispatch failed; the next dispatch returns
//! the engine to `Idle` before running.
//!
//! The engine never panics outward and never stays in `Dispatching`: every
//! failure is contained, captured into a bounded [`Traceback`], and
//! returned as a [`DispatchOutcome::Failed`] diagnostic. State mutated
//! before a fault stays mutated — weak isolation, by contract.

use std::panic::{catch_unwind, AssertUnwindSafe};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument, warn};
use weft_core::errors::{DispatchError, HandlerFault};
use weft_core::events::RawEvent;
use weft_core::ids::HandlerId;
use weft_core::traceback::{Traceback, TracebackCapturer, TracebackConfig};

use crate::registry::{HandlerRegistry, MapperRegistry};
use crate::state::StateStore;

/// Engine phase. Observable for hosts that surface dispatch status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DispatchPhase {
    /// No dispatch in flight.
    #[default]
    Idle,
    /// A dispatch is running (steps resolve through invoke).
    Dispatching,
    /// The last dispatch failed and its diagnostic was captured.
    ErrorCaptured,
}

/// Structured failure report for one dispatch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    /// Failure summary.
    pub message: String,
    /// Captured call chain, innermost frame first.
    pub traceback: Traceback,
}

/// What one dispatch produced.
#[derive(Clone, Debug, PartialEq)]
pub enum DispatchOutcome {
    /// Empty handler id: nothing happened, by contract.
    Skipped,
    /// The handler ran to completion; the tree needs re-rendering.
    RenderNeeded,
    /// The dispatch failed; a diagnostic was captured.
    Failed(Diagnostic),
}

impl DispatchOutcome {
    /// Whether this outcome requires a re-render.
    pub fn needs_render(&self) -> bool {
        matches!(self, Self::RenderNeeded)
    }
}

/// The dispatch engine for one session.
pub struct DispatchEngine {
    capturer: TracebackCapturer,
    phase: DispatchPhase,
}

impl DispatchEngine {
    /// Build an engine with the given traceback tunables.
    pub fn new(config: TracebackConfig) -> Self {
        Self {
            capturer: TracebackCapturer::new(config),
            phase: DispatchPhase::Idle,
        }
    }

    /// Current phase. `Idle` after a successful or skipped dispatch;
    /// `ErrorCaptured` after a failed one, until the next dispatch begins.
    pub fn phase(&self) -> DispatchPhase {
        self.phase
    }

    /// Run one dispatch to completion.
    ///
    /// The whole sequence is synchronous: no suspension points, no
    /// cancellation. The caller must hold the session's exclusive lock so
    /// no other dispatch mutates the same session concurrently.
    #[instrument(skip_all, fields(handler_id = %handler_id, key = %raw_event.key))]
    pub fn dispatch(
        &mut self,
        handlers: &HandlerRegistry,
        mappers: &MapperRegistry,
        state: &mut StateStore,
        handler_id: &HandlerId,
        raw_event: &RawEvent,
    ) -> DispatchOutcome {
        // A new dispatch supersedes any captured error from the last one.
        self.phase = DispatchPhase::Idle;

        // Step 1: the reserved empty id means "no handler bound".
        if handler_id.is_none() {
            debug!("empty handler id, skipping");
            return DispatchOutcome::Skipped;
        }

        self.phase = DispatchPhase::Dispatching;
        let outcome = self.run(handlers, mappers, state, handler_id, raw_event);

        self.phase = if matches!(outcome, DispatchOutcome::Failed(_)) {
            debug!("diagnostic captured");
            DispatchPhase::ErrorCaptured
        } else {
            DispatchPhase::Idle
        };
        outcome
    }

    fn run(
        &self,
        handlers: &HandlerRegistry,
        mappers: &MapperRegistry,
        state: &mut StateStore,
        handler_id: &HandlerId,
        raw_event: &RawEvent,
    ) -> DispatchOutcome {
        // Step 2: resolve the handler entry.
        let entry = match handlers.lookup(handler_id) {
            Ok(entry) => entry,
            Err(err) => {
                error!(%handler_id, "stale or unknown handler id");
                return self.integration_failure(&err);
            }
        };

        // Step 3: resolve the mapper for the entry's kind.
        let mapper = match mappers.lookup(entry.kind) {
            Ok(mapper) => mapper,
            Err(err) => {
                error!(kind = ?entry.kind, "no mapper registered");
                return self.integration_failure(&err);
            }
        };

        // Step 4: produce the typed event.
        let typed = mapper(raw_event, &raw_event.key);

        // Step 5: invoke the callback. Faults and panics are contained;
        // state mutated before the fault stays mutated (no rollback).
        let invoked = catch_unwind(AssertUnwindSafe(|| (entry.callback)(state, &typed)));
        match invoked {
            Ok(Ok(())) => {
                // Step 6: success — the consumer re-renders.
                debug!("handler completed");
                DispatchOutcome::RenderNeeded
            }
            Ok(Err(fault)) => {
                warn!(message = %fault.message, "handler fault");
                DispatchOutcome::Failed(Diagnostic {
                    message: DispatchError::HandlerFault(fault.clone()).to_string(),
                    traceback: self.capturer.capture(&fault.frames),
                })
            }
            Err(panic) => {
                let fault = HandlerFault::without_frames(panic_message(panic.as_ref()));
                error!(message = %fault.message, "handler panicked");
                DispatchOutcome::Failed(Diagnostic {
                    message: DispatchError::HandlerFault(fault.clone()).to_string(),
                    traceback: self.capturer.capture(&fault.frames),
                })
            }
        }
    }

    /// Programming/integration errors still produce a diagnostic: the
    /// fault site is the engine itself, captured here.
    fn integration_failure(&self, err: &DispatchError) -> DispatchOutcome {
        let fault = HandlerFault::new(err.to_string());
        DispatchOutcome::Failed(Diagnostic {
            message: err.to_string(),
            traceback: self.capturer.capture(&fault.frames),
        })
    }
}

impl Default for DispatchEngine {
    fn default() -> Self {
        Self::new(TracebackConfig::default())
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_owned()
    }
}
