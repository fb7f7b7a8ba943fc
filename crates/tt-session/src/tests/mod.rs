mod attach;
mod basic;

use std::sync::Arc;

use tt_core::config::Config;
use tt_core::field::{FieldGeometry, FieldId, FieldSnapshot, NodeId, NodeInfo, Rect};
use tt_core::keys::{InputTrigger, Key, KeyEvent};
use tt_core::metrics::TextMeasurer;
use tt_core::settings::{Settings, SettingsStore};

use crate::clock::ManualClock;
use crate::{AugmentSession, Response};

pub(super) const FIELD: FieldId = NodeId(10);
pub(super) const DEBOUNCE: u64 = 300;

/// Every char is 10px wide, so overlay positions are easy to predict.
pub(super) struct FixedMeasurer;

impl TextMeasurer for FixedMeasurer {
    fn measure(&self, text: &str, _font: &str) -> f64 {
        text.chars().count() as f64 * 10.0
    }
}

pub(super) fn geometry() -> FieldGeometry {
    FieldGeometry {
        rect: Rect {
            top: 100.0,
            left: 50.0,
            width: 300.0,
            height: 24.0,
        },
        font: "16px Arial".to_string(),
    }
}

pub(super) fn snapshot(value: &str) -> FieldSnapshot {
    FieldSnapshot {
        geometry: geometry(),
        ..FieldSnapshot::with_value(value)
    }
}

pub(super) fn make_session_with(settings: Settings) -> (AugmentSession, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let session = AugmentSession::new(
        &Config::default(),
        SettingsStore::new(settings),
        Arc::new(FixedMeasurer),
        clock.clone(),
    );
    (session, clock)
}

/// Session with one attached text field, `FIELD`.
pub(super) fn make_session() -> (AugmentSession, Arc<ManualClock>) {
    let (mut session, clock) = make_session_with(Settings::default());
    session.attach_all(&[NodeInfo::element(FIELD.0, "input", Some("text"))]);
    (session, clock)
}

pub(super) fn typed(c: char) -> InputTrigger {
    InputTrigger::key(KeyEvent::plain(Key::Char(c)))
}

/// Type `s` one char at a time onto `value`, `interval` ms apart.
pub(super) fn type_string(
    session: &mut AugmentSession,
    clock: &ManualClock,
    value: &mut String,
    s: &str,
    interval: u64,
) -> Vec<Response> {
    let mut responses = Vec::new();
    for ch in s.chars() {
        value.push(ch);
        responses.push(session.handle_input(FIELD, snapshot(value), &typed(ch)));
        clock.advance(interval);
    }
    responses
}

pub(super) fn tab() -> KeyEvent {
    KeyEvent::plain(Key::Tab)
}
