//! Dispatch error hierarchy and structured handler failure payloads.
//!
//! The three failure kinds have very different weights:
//!
//! - [`DispatchError::UnknownHandler`] — a stale id from a superseded tree;
//!   a reactivity bug that must surface loudly.
//! - [`DispatchError::UnmappedEventKind`] — a missing mapper; an
//!   integration bug that must surface loudly.
//! - [`DispatchError::HandlerFault`] — expected application-level failure,
//!   carrying the call chain captured at the fault site.

use std::fmt;
use std::panic::Location;

use thiserror::Error;

use crate::events::EventKind;
use crate::traceback::RawFrame;

/// Why a dispatch failed.
#[derive(Clone, Debug, Error)]
pub enum DispatchError {
    /// The handler id does not resolve in the current render pass.
    #[error("unknown handler id: {handler_id}")]
    UnknownHandler {
        /// The stale or malformed id.
        handler_id: String,
    },

    /// No mapper is registered for the handler's event kind.
    #[error("no event mapper registered for kind {kind:?}")]
    UnmappedEventKind {
        /// The unmapped kind.
        kind: EventKind,
    },

    /// The application callback failed.
    #[error("handler fault: {0}")]
    HandlerFault(HandlerFault),
}

/// Structured failure payload produced by an application callback.
///
/// Callbacks return `Result<(), HandlerFault>` rather than raising; the
/// fault carries the call chain captured exactly at the failure site,
/// innermost frame first. Construct with [`HandlerFault::new`] at the
/// point of failure and annotate outer frames with
/// [`HandlerFault::in_frame`] as the fault propagates.
#[derive(Clone, Debug, Default)]
pub struct HandlerFault {
    /// Human-readable failure description.
    pub message: String,
    /// Raw call chain, innermost frame first.
    pub frames: Vec<RawFrame>,
}

impl HandlerFault {
    /// Capture a fault at the current source location.
    ///
    /// The caller's file and line become the innermost frame, so this must
    /// be invoked exactly at the failure site, not reconstructed afterward.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let location = Location::caller();
        Self {
            message: message.into(),
            frames: vec![RawFrame::new(location.file(), "<handler>", location.line())],
        }
    }

    /// A fault with no captured frames (e.g. converted from a panic whose
    /// unwind left no usable chain).
    pub fn without_frames(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            frames: Vec::new(),
        }
    }

    /// Append an outer frame as the fault propagates up the call chain.
    pub fn in_frame(
        mut self,
        filename: impl Into<String>,
        code_name: impl Into<String>,
        line_number: u32,
    ) -> Self {
        self.frames
            .push(RawFrame::new(filename, code_name, line_number));
        self
    }
}

impl fmt::Display for HandlerFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn new_captures_the_fault_site() {
        let fault = HandlerFault::new("boom");
        assert_eq!(fault.frames.len(), 1);
        assert!(fault.frames[0].filename.ends_with("errors.rs"));
        assert_eq!(fault.frames[0].code_name, "<handler>");
        assert!(fault.frames[0].line_number > 0);
    }

    #[test]
    fn in_frame_appends_outward() {
        let fault = HandlerFault::new("boom")
            .in_frame("/app/page.rs", "render_page", 42)
            .in_frame("/app/main.rs", "main", 7);
        assert_eq!(fault.frames.len(), 3);
        assert_eq!(fault.frames[1].code_name, "render_page");
        assert_eq!(fault.frames[2].code_name, "main");
    }

    #[test]
    fn error_messages_name_the_culprit() {
        let err = DispatchError::UnknownHandler {
            handler_id: "xyz".into(),
        };
        assert!(err.to_string().contains("xyz"));

        let err = DispatchError::UnmappedEventKind {
            kind: EventKind::Click,
        };
        assert!(err.to_string().contains("Click"));

        let err = DispatchError::HandlerFault(HandlerFault::new("boom"));
        assert_matches!(err, DispatchError::HandlerFault(ref f) if f.message == "boom");
        assert!(err.to_string().contains("boom"));
    }
}
