//! Component tree construction.
//!
//! [`BuildContext`] maintains the implicit current parent scope as a
//! stack, mirroring declarative nesting: leaves attach with
//! [`insert_component`](BuildContext::insert_component), containers open a
//! nested scope for the duration of a closure with
//! [`insert_container`](BuildContext::insert_container).
//!
//! Handler ids are embedded by the component declaration layer: it
//! registers callbacks against the session's handler registry and writes
//! the returned ids into `properties` before inserting the node, so the
//! dispatch engine can later resolve events sent against the node.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// One node of the component tree handed to the external render engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentNode {
    /// Identity among siblings. Must be unique for correct downstream
    /// diffing.
    pub key: String,
    /// Component type discriminator; the property schema is defined per
    /// type by the external declaration layer.
    pub type_name: String,
    /// Serialized properties, opaque to the runtime. May embed handler ids.
    pub properties: Value,
    /// Child nodes, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ComponentNode>,
}

/// Stack-shaped build context for one render pass.
///
/// The bottom of the stack is a synthetic root; [`finish`](Self::finish)
/// yields its children and resets the context for the next pass.
pub struct BuildContext {
    stack: Vec<ComponentNode>,
}

impl BuildContext {
    /// Create a context holding only the synthetic root.
    pub fn new() -> Self {
        Self {
            stack: vec![Self::root()],
        }
    }

    fn root() -> ComponentNode {
        ComponentNode {
            key: String::new(),
            type_name: "<root>".to_owned(),
            properties: Value::Null,
            children: Vec::new(),
        }
    }

    /// Attach a leaf node to the current parent scope.
    ///
    /// `key` must be unique among siblings for correct downstream
    /// identity. When omitted, a positional fallback key is derived from
    /// declaration order (`{type_name}_{index}`). Positional keys are
    /// fragile: conditional or reordered declarations shift the index and
    /// break identity across passes. This is flagged, not corrected.
    ///
    /// Returns the resolved key.
    pub fn insert_component(
        &mut self,
        key: Option<&str>,
        type_name: &str,
        properties: Value,
    ) -> String {
        let node = self.make_node(key, type_name, properties);
        let key = node.key.clone();
        self.parent_mut().children.push(node);
        key
    }

    /// Attach a container node and run `f` with it as the current parent.
    ///
    /// Same key contract as [`insert_component`](Self::insert_component).
    /// Returns the resolved key.
    pub fn insert_container(
        &mut self,
        key: Option<&str>,
        type_name: &str,
        properties: Value,
        f: impl FnOnce(&mut Self),
    ) -> String {
        let node = self.make_node(key, type_name, properties);
        let key = node.key.clone();
        self.stack.push(node);
        f(self);
        // The matching pop: f cannot unbalance the stack through the
        // public API, so the popped node is the one pushed above.
        if let Some(node) = self.stack.pop() {
            self.parent_mut().children.push(node);
        }
        key
    }

    /// Close the pass: yield the root's children and reset for the next
    /// pass.
    pub fn finish(&mut self) -> Vec<ComponentNode> {
        // Collapse any scopes left open into the root before draining.
        while self.stack.len() > 1 {
            if let Some(node) = self.stack.pop() {
                self.parent_mut().children.push(node);
            }
        }
        std::mem::take(&mut self.parent_mut().children)
    }

    /// Number of children attached to the current parent scope so far.
    pub fn sibling_count(&self) -> usize {
        self.stack.last().map_or(0, |parent| parent.children.len())
    }

    fn make_node(&self, key: Option<&str>, type_name: &str, properties: Value) -> ComponentNode {
        let key = match key {
            Some(k) => k.to_owned(),
            None => format!("{type_name}_{}", self.sibling_count()),
        };
        if self
            .parent()
            .children
            .iter()
            .any(|sibling| sibling.key == key)
        {
            warn!(%key, type_name, "duplicate sibling key; downstream identity will be wrong");
        }
        ComponentNode {
            key,
            type_name: type_name.to_owned(),
            properties,
            children: Vec::new(),
        }
    }

    fn parent(&self) -> &ComponentNode {
        // Invariant: the synthetic root is never popped.
        self.stack.last().expect("build stack holds at least the root")
    }

    fn parent_mut(&mut self) -> &mut ComponentNode {
        self.stack
            .last_mut()
            .expect("build stack holds at least the root")
    }
}

impl Default for BuildContext {
    fn default() -> Self {
        Self::new()
    }
}
