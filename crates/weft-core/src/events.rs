//! Event vocabulary: wire event kinds, raw inbound payloads, and the
//! typed application events mappers produce from them.
//!
//! Two layers:
//!
//! - **[`RawEvent`]**: the untyped wire payload delivered by the transport.
//!   Carries discriminated primitive fields; which field is meaningful
//!   depends on the event kind.
//! - **[`TypedEvent`]**: what application handlers actually receive. A
//!   registered [`Mapper`] translates raw to typed, selected by
//!   [`EventKind`] tag.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ids::HandlerId;

/// Wire event kind tags.
///
/// A closed enumeration: every kind the runtime can dispatch has exactly
/// one mapper registered for it, selected by this tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Pointer click on a component.
    Click,
    /// Text input value change.
    Input,
    /// Checkbox toggled.
    CheckboxChange,
    /// Select panel opened or closed.
    SelectOpenedChange,
    /// Select value changed.
    SelectSelectionChange,
    /// Client-side navigation request.
    Navigate,
}

/// Untyped inbound wire event.
///
/// The transport delivers `{handler_id, raw_event}`; this is the
/// `raw_event` half. Primitive fields are discriminated: a mapper for a
/// given kind reads the field(s) that kind populates and ignores the rest.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    /// Component key the event was raised against.
    #[serde(default)]
    pub key: String,
    /// Boolean payload (checkbox state, panel open state).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bool_value: Option<bool>,
    /// String payload (input text, selected value).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string_value: Option<String>,
    /// Numeric payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub double_value: Option<f64>,
}

impl RawEvent {
    /// An event with no payload fields, keyed to `key`.
    pub fn keyed(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    /// Set the boolean payload.
    pub fn with_bool(mut self, value: bool) -> Self {
        self.bool_value = Some(value);
        self
    }

    /// Set the string payload.
    pub fn with_string(mut self, value: impl Into<String>) -> Self {
        self.string_value = Some(value.into());
        self
    }

    /// Set the numeric payload.
    pub fn with_double(mut self, value: f64) -> Self {
        self.double_value = Some(value);
        self
    }
}

/// Inbound dispatch message: a handler id plus the raw event for it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequest {
    /// Target handler, as issued during the last render pass.
    pub handler_id: HandlerId,
    /// Untyped event payload.
    pub raw_event: RawEvent,
}

// ─────────────────────────────────────────────────────────────────────────────
// Typed events
// ─────────────────────────────────────────────────────────────────────────────

/// Pointer click.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClickEvent {
    /// Source component key.
    pub key: String,
}

/// Text input value change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InputEvent {
    /// Source component key.
    pub key: String,
    /// New input value.
    pub value: String,
}

/// Checkbox toggled.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CheckboxChangeEvent {
    /// Source component key.
    pub key: String,
    /// New checked state.
    pub checked: bool,
}

/// Select panel opened or closed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectOpenedChangeEvent {
    /// Source component key.
    pub key: String,
    /// Whether the panel is now open.
    pub opened: bool,
}

/// Select value changed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectSelectionChangeEvent {
    /// Source component key.
    pub key: String,
    /// Newly selected value.
    pub value: String,
}

/// Client-side navigation request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NavigateEvent {
    /// Source component key.
    pub key: String,
}

/// A typed application event, one variant per [`EventKind`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TypedEvent {
    /// See [`ClickEvent`].
    Click(ClickEvent),
    /// See [`InputEvent`].
    Input(InputEvent),
    /// See [`CheckboxChangeEvent`].
    CheckboxChange(CheckboxChangeEvent),
    /// See [`SelectOpenedChangeEvent`].
    SelectOpenedChange(SelectOpenedChangeEvent),
    /// See [`SelectSelectionChangeEvent`].
    SelectSelectionChange(SelectSelectionChangeEvent),
    /// See [`NavigateEvent`].
    Navigate(NavigateEvent),
}

impl TypedEvent {
    /// Source component key.
    pub fn key(&self) -> &str {
        match self {
            Self::Click(e) => &e.key,
            Self::Input(e) => &e.key,
            Self::CheckboxChange(e) => &e.key,
            Self::SelectOpenedChange(e) => &e.key,
            Self::SelectSelectionChange(e) => &e.key,
            Self::Navigate(e) => &e.key,
        }
    }

    /// The kind tag this event corresponds to.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Click(_) => EventKind::Click,
            Self::Input(_) => EventKind::Input,
            Self::CheckboxChange(_) => EventKind::CheckboxChange,
            Self::SelectOpenedChange(_) => EventKind::SelectOpenedChange,
            Self::SelectSelectionChange(_) => EventKind::SelectSelectionChange,
            Self::Navigate(_) => EventKind::Navigate,
        }
    }
}

/// Pure translation from a raw wire event (plus the target component key)
/// into a typed application event.
pub type Mapper = Arc<dyn Fn(&RawEvent, &str) -> TypedEvent + Send + Sync>;

/// The built-in mapper for every [`EventKind`].
///
/// Each mapper reads the primitive field(s) its kind populates; missing
/// fields fall back to defaults rather than failing, since the wire layer
/// is untyped by design.
pub fn default_mappers() -> Vec<(EventKind, Mapper)> {
    vec![
        (
            EventKind::Click,
            Arc::new(|_raw: &RawEvent, key: &str| {
                TypedEvent::Click(ClickEvent { key: key.to_owned() })
            }) as Mapper,
        ),
        (
            EventKind::Input,
            Arc::new(|raw: &RawEvent, key: &str| {
                TypedEvent::Input(InputEvent {
                    key: key.to_owned(),
                    value: raw.string_value.clone().unwrap_or_default(),
                })
            }) as Mapper,
        ),
        (
            EventKind::CheckboxChange,
            Arc::new(|raw: &RawEvent, key: &str| {
                TypedEvent::CheckboxChange(CheckboxChangeEvent {
                    key: key.to_owned(),
                    checked: raw.bool_value.unwrap_or_default(),
                })
            }) as Mapper,
        ),
        (
            EventKind::SelectOpenedChange,
            Arc::new(|raw: &RawEvent, key: &str| {
                TypedEvent::SelectOpenedChange(SelectOpenedChangeEvent {
                    key: key.to_owned(),
                    opened: raw.bool_value.unwrap_or_default(),
                })
            }) as Mapper,
        ),
        (
            EventKind::SelectSelectionChange,
            Arc::new(|raw: &RawEvent, key: &str| {
                TypedEvent::SelectSelectionChange(SelectSelectionChangeEvent {
                    key: key.to_owned(),
                    value: raw.string_value.clone().unwrap_or_default(),
                })
            }) as Mapper,
        ),
        (
            EventKind::Navigate,
            Arc::new(|_raw: &RawEvent, key: &str| {
                TypedEvent::Navigate(NavigateEvent { key: key.to_owned() })
            }) as Mapper,
        ),
    ]
}
