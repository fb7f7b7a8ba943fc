use tt_core::completion::{Availability, CompletionError};
use tt_core::field::{FieldGeometry, FieldKind, FieldSnapshot, NodeId, NodeInfo, NodeKind, Rect};
use tt_core::keys::{InputTrigger, KeyEvent, Modifiers};
use tt_core::settings::Settings;
use tt_session::{Effect, Response};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum TtError {
    #[error("IO error: {msg}")]
    Io { msg: String },
    #[error("invalid data: {msg}")]
    InvalidData { msg: String },
    #[error("model error: {msg}")]
    Model { msg: String },
    #[error("internal error: {msg}")]
    Internal { msg: String },
}

impl From<uniffi::UnexpectedUniFFICallbackError> for TtError {
    fn from(e: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::Internal { msg: e.reason }
    }
}

impl From<CompletionError> for TtError {
    fn from(e: CompletionError) -> Self {
        Self::Model { msg: e.to_string() }
    }
}

impl From<TtError> for CompletionError {
    fn from(e: TtError) -> Self {
        match e {
            TtError::Model { msg } => Self::Call(msg),
            other => Self::Call(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Records (value types, copied across FFI boundary)
// ---------------------------------------------------------------------------

/// A node of the host document, as reported by attach scans and mutations.
#[derive(Clone, Debug, uniffi::Record)]
pub struct TtNode {
    pub id: u64,
    /// Lower-case tag name; `None` for non-element nodes.
    pub tag: Option<String>,
    pub input_type: Option<String>,
}

impl From<TtNode> for NodeInfo {
    fn from(node: TtNode) -> Self {
        let kind = match node.tag {
            Some(tag) => NodeKind::Element {
                tag,
                input_type: node.input_type,
            },
            None => NodeKind::Text,
        };
        NodeInfo {
            id: NodeId(node.id),
            kind,
        }
    }
}

#[derive(Clone, Debug, uniffi::Record)]
pub struct TtFieldState {
    pub value: String,
    pub cursor: u32,
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
    pub font: String,
}

impl From<TtFieldState> for FieldSnapshot {
    fn from(s: TtFieldState) -> Self {
        FieldSnapshot {
            value: s.value,
            cursor: s.cursor as usize,
            geometry: FieldGeometry {
                rect: Rect {
                    top: s.top,
                    left: s.left,
                    width: s.width,
                    height: s.height,
                },
                font: s.font,
            },
        }
    }
}

#[derive(Clone, Debug, uniffi::Record)]
pub struct TtKeyEvent {
    /// DOM `KeyboardEvent.key`.
    pub key: String,
    pub ctrl: bool,
    pub meta: bool,
    pub alt: bool,
    pub shift: bool,
}

impl From<TtKeyEvent> for KeyEvent {
    fn from(k: TtKeyEvent) -> Self {
        KeyEvent::from_dom(
            &k.key,
            Modifiers {
                ctrl: k.ctrl,
                meta: k.meta,
                alt: k.alt,
                shift: k.shift,
            },
        )
    }
}

#[derive(Clone, Debug, Default, uniffi::Record)]
pub struct TtInputTrigger {
    pub last_key: Option<TtKeyEvent>,
    /// DOM `InputEvent.inputType`.
    pub input_type: Option<String>,
}

impl From<TtInputTrigger> for InputTrigger {
    fn from(t: TtInputTrigger) -> Self {
        InputTrigger {
            key: t.last_key.map(KeyEvent::from),
            input_type: t.input_type,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, uniffi::Record)]
pub struct TtSettings {
    pub suggestions_enabled: bool,
    pub autocorrect_enabled: bool,
}

impl From<Settings> for TtSettings {
    fn from(s: Settings) -> Self {
        Self {
            suggestions_enabled: s.suggestions_enabled,
            autocorrect_enabled: s.autocorrect_enabled,
        }
    }
}

/// Event-driven response from every session entry point.
#[derive(Clone, Debug, Default, uniffi::Record)]
pub struct TtResponse {
    /// Suppress the event's default handling (e.g. Tab focus change).
    pub consumed: bool,
    pub effects: Vec<TtEffect>,
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, uniffi::Enum)]
pub enum TtAvailability {
    Unavailable,
    NeedsSetup,
    Available,
}

impl From<TtAvailability> for Availability {
    fn from(a: TtAvailability) -> Self {
        match a {
            TtAvailability::Unavailable => Self::Unavailable,
            TtAvailability::NeedsSetup => Self::NeedsSetup,
            TtAvailability::Available => Self::Available,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, uniffi::Enum)]
pub enum TtFieldKind {
    Text,
    Search,
    TextArea,
}

impl From<FieldKind> for TtFieldKind {
    fn from(k: FieldKind) -> Self {
        match k {
            FieldKind::Text => Self::Text,
            FieldKind::Search => Self::Search,
            FieldKind::TextArea => Self::TextArea,
        }
    }
}

#[derive(Clone, Debug, PartialEq, uniffi::Enum)]
pub enum TtEffect {
    AttachListeners {
        field: u64,
        kind: TtFieldKind,
    },
    ObserveSubtree {
        root: u64,
    },
    SetValue {
        field: u64,
        value: String,
    },
    ShowOverlay {
        field: u64,
        text: String,
        top: f64,
        left: f64,
        font: String,
        class_name: String,
        created: bool,
    },
    RemoveOverlay {
        field: u64,
    },
    SchedulePoll {
        after_ms: u64,
    },
}

impl From<Effect> for TtEffect {
    fn from(e: Effect) -> Self {
        match e {
            Effect::AttachListeners { field, kind } => Self::AttachListeners {
                field: field.0,
                kind: kind.into(),
            },
            Effect::ObserveSubtree { root } => Self::ObserveSubtree { root: root.0 },
            Effect::SetValue { field, value } => Self::SetValue {
                field: field.0,
                value,
            },
            Effect::ShowOverlay {
                field,
                text,
                top,
                left,
                font,
                class_name,
                created,
            } => Self::ShowOverlay {
                field: field.0,
                text,
                top,
                left,
                font,
                class_name,
                created,
            },
            Effect::RemoveOverlay { field } => Self::RemoveOverlay { field: field.0 },
            Effect::SchedulePoll { after_ms } => Self::SchedulePoll { after_ms },
        }
    }
}

// ---------------------------------------------------------------------------
// Response conversion
// ---------------------------------------------------------------------------

/// Merge session responses into one FFI response.
///
/// All `SchedulePoll` requests collapse into a single one carrying the
/// shortest delay, emitted last; `pending_poll` adds the worker's own
/// polling interval when model calls are still in flight.
pub(super) fn convert_responses(
    responses: impl IntoIterator<Item = Response>,
    pending_poll: Option<u64>,
) -> TtResponse {
    let mut consumed = false;
    let mut effects = Vec::new();
    let mut poll_after = pending_poll;
    for resp in responses {
        consumed |= resp.consumed;
        for effect in resp.effects {
            match effect {
                Effect::SchedulePoll { after_ms } => {
                    poll_after = Some(poll_after.map_or(after_ms, |p| p.min(after_ms)));
                }
                other => effects.push(TtEffect::from(other)),
            }
        }
    }
    if let Some(after_ms) = poll_after {
        effects.push(TtEffect::SchedulePoll { after_ms });
    }
    TtResponse { consumed, effects }
}
