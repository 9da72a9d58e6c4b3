//! Branded ID newtypes.
//!
//! IDs are opaque strings on the wire but distinct types in code, so a
//! handler id can never be passed where a session id is expected.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies a `(callback, event kind)` pair for the current render pass.
///
/// Handler ids are issued fresh on every render pass and are only valid
/// against the pass that produced them. The empty string is reserved to
/// mean "no handler bound"; dispatching it is a no-op.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandlerId(String);

impl HandlerId {
    /// The reserved "no handler bound" id.
    pub fn none() -> Self {
        Self(String::new())
    }

    /// Whether this is the reserved "no handler bound" id.
    pub fn is_none(&self) -> bool {
        self.0.is_empty()
    }

    /// The raw string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for HandlerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for HandlerId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies one live client connection — the persistence scope for
/// session state across dispatches.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh session id (UUID v7, time-ordered).
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// The raw string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
