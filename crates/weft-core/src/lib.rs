//! # weft-core
//!
//! Foundation types for the Weft server-driven UI runtime.
//!
//! This crate provides the shared vocabulary the runtime crates depend on:
//!
//! - **Branded IDs**: [`ids::HandlerId`], [`ids::SessionId`] as newtypes
//! - **Events**: [`events::EventKind`] wire tags, [`events::RawEvent`]
//!   inbound payloads, [`events::TypedEvent`] application events
//! - **Errors**: [`errors::DispatchError`] hierarchy via `thiserror`,
//!   [`errors::HandlerFault`] structured failure payloads
//! - **Tracebacks**: [`traceback::TracebackCapturer`] bounded diagnostics
//!   with source context and path normalization
//! - **Signals**: [`signal::RuntimeSignal`] broadcast by
//!   [`signal::SignalEmitter`] for the external render/diff engine
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by `weft-runtime`.

#![deny(unsafe_code)]

pub mod errors;
pub mod events;
pub mod ids;
pub mod logging;
pub mod signal;
pub mod traceback;
