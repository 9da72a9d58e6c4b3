//! # weft-runtime
//!
//! Event dispatch, reactive session state, and component tree building
//! for the Weft server-driven UI framework.
//!
//! - **Registries**: per-render-pass handler registry, startup-time
//!   mapper registry
//! - **State store**: per-session singleton-per-type mutable state
//! - **Tree builder**: stack-shaped build context embedding handler ids
//!   into serialized node properties
//! - **Dispatch engine**: resolve → map → invoke → report, with every
//!   failure captured into a bounded traceback
//! - **Sessions**: explicit per-session ownership with an exclusive lock
//!   around each dispatch sequence
//!
//! Rendering, diffing, routing, and transport are external collaborators:
//! this crate builds trees, dispatches events against them, and says when
//! to re-render.
//!
//! ## Crate Position
//!
//! Aggregation layer. Depends on: weft-core.

#![deny(unsafe_code)]

pub mod dispatch;
pub mod registry;
pub mod session;
pub mod state;
pub mod tree;

// Re-export main public API
pub use dispatch::{Diagnostic, DispatchEngine, DispatchOutcome, DispatchPhase};
pub use registry::{Handler, HandlerEntry, HandlerRegistry, MapperRegistry};
pub use session::{RuntimeError, SessionContext, WeftRuntime};
pub use state::{SessionState, StateStore};
pub use tree::{BuildContext, ComponentNode};
