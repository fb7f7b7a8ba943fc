use tt_core::keys::{InputTrigger, Key, KeyEvent, Modifiers};

use super::*;
use crate::{CorrectionResult, Effect};

#[test]
fn test_debounce_coalesces_rapid_typing() {
    let (mut session, clock) = make_session();
    let mut value = String::from("I am go");
    type_string(&mut session, &clock, &mut value, "ng", 50);
    assert_eq!(value, "I am gong");

    // Quiet period not over yet: nothing fires.
    clock.advance(DEBOUNCE - 100);
    assert!(session.poll_timers().is_empty());

    clock.advance(100);
    let due = session.poll_timers();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].snapshot, "I am gong");
    assert_eq!(due[0].field, FIELD);

    // Fired work is gone; a second poll dispatches nothing.
    clock.advance(DEBOUNCE);
    assert!(session.poll_timers().is_empty());
}

#[test]
fn test_superseding_keystroke_replaces_ticket() {
    let (mut session, clock) = make_session();
    let mut value = String::new();
    type_string(&mut session, &clock, &mut value, "a", 10);
    let first = session.pending_correction(FIELD).unwrap().clone();

    type_string(&mut session, &clock, &mut value, "b", 10);
    let second = session.pending_correction(FIELD).unwrap().clone();

    assert_ne!(first.ticket, second.ticket);
    assert_eq!(second.snapshot, "ab");
    assert_eq!(second.fire_at_ms, 10 + DEBOUNCE);
}

#[test]
fn test_schedule_poll_requested() {
    let (mut session, clock) = make_session();
    let mut value = String::new();
    let responses = type_string(&mut session, &clock, &mut value, "x", 0);
    assert!(responses[0]
        .effects
        .contains(&Effect::SchedulePoll { after_ms: DEBOUNCE }));
    assert_eq!(session.next_deadline_ms(), Some(DEBOUNCE));
}

#[test]
fn test_boundary_cancels_pending() {
    let (mut session, clock) = make_session();
    let mut value = String::from("I am gon");
    type_string(&mut session, &clock, &mut value, "g ", 20);
    assert!(session.pending_correction(FIELD).is_none());
    clock.advance(DEBOUNCE * 2);
    assert!(session.poll_timers().is_empty());
}

#[test]
fn test_skip_on_newline_and_tab() {
    let (mut session, clock) = make_session();
    for ending in ["line\n", "cell\t"] {
        session.handle_input(FIELD, snapshot(ending), &InputTrigger::default());
        clock.advance(DEBOUNCE);
        assert!(session.poll_timers().is_empty(), "{ending:?}");
    }
}

#[test]
fn test_skip_on_backspace_and_undo() {
    let (mut session, clock) = make_session();
    let backspace = InputTrigger::key(KeyEvent::plain(Key::Backspace));
    session.handle_input(FIELD, snapshot("I am gon"), &backspace);
    assert!(session.pending_correction(FIELD).is_none());

    let undo = InputTrigger::key(KeyEvent::from_dom(
        "z",
        Modifiers {
            meta: true,
            ..Modifiers::none()
        },
    ));
    session.handle_input(FIELD, snapshot("I am go"), &undo);
    assert!(session.pending_correction(FIELD).is_none());

    session.handle_input(FIELD, snapshot("I am g"), &InputTrigger::input_type("deleteContentBackward"));
    clock.advance(DEBOUNCE);
    assert!(session.poll_timers().is_empty());
}

#[test]
fn test_correction_applied_when_current() {
    let (mut session, clock) = make_session();
    let mut value = String::from("I am gon");
    type_string(&mut session, &clock, &mut value, "g", 0);
    clock.advance(DEBOUNCE);
    let req = session.poll_timers().pop().unwrap();

    let resp = session
        .receive_correction(CorrectionResult {
            field: req.field,
            generation: req.generation,
            snapshot: req.snapshot,
            corrected: "I am going".to_string(),
        })
        .unwrap();
    assert_eq!(
        resp.effects,
        vec![Effect::SetValue {
            field: FIELD,
            value: "I am going".to_string()
        }]
    );
    assert_eq!(session.field_value(FIELD), Some("I am going"));
}

#[test]
fn test_stale_correction_never_clobbers() {
    let (mut session, clock) = make_session();
    let mut value = String::from("I am gon");
    type_string(&mut session, &clock, &mut value, "g", 0);
    clock.advance(DEBOUNCE);
    let req = session.poll_timers().pop().unwrap();
    assert_eq!(req.snapshot, "I am gong");

    // User keeps typing while the correction is in flight.
    type_string(&mut session, &clock, &mut value, " to", 30);

    let resp = session.receive_correction(CorrectionResult {
        field: req.field,
        generation: req.generation,
        snapshot: req.snapshot,
        corrected: "I am going".to_string(),
    });
    assert!(resp.is_none());
    assert_eq!(session.field_value(FIELD), Some("I am gong to"));
}

#[test]
fn test_out_of_order_results() {
    let (mut session, clock) = make_session();
    let mut value = String::from("teh");
    session.handle_input(FIELD, snapshot(&value), &typed('h'));
    clock.advance(DEBOUNCE);
    let older = session.poll_timers().pop().unwrap();

    type_string(&mut session, &clock, &mut value, "y", 0);
    clock.advance(DEBOUNCE);
    let newer = session.poll_timers().pop().unwrap();

    // Newer resolves first and applies; the older one arrives later and is dropped.
    assert!(session
        .receive_correction(CorrectionResult {
            field: FIELD,
            generation: newer.generation,
            snapshot: newer.snapshot,
            corrected: "they".to_string(),
        })
        .is_some());
    assert!(session
        .receive_correction(CorrectionResult {
            field: FIELD,
            generation: older.generation,
            snapshot: older.snapshot,
            corrected: "the".to_string(),
        })
        .is_none());
    assert_eq!(session.field_value(FIELD), Some("they"));
}

#[test]
fn test_unchanged_correction_is_noop() {
    let (mut session, clock) = make_session();
    session.handle_input(FIELD, snapshot("fine"), &typed('e'));
    clock.advance(DEBOUNCE);
    let req = session.poll_timers().pop().unwrap();
    let generation = session.generation(FIELD);
    assert!(session
        .receive_correction(CorrectionResult {
            field: FIELD,
            generation: req.generation,
            snapshot: req.snapshot.clone(),
            corrected: req.snapshot,
        })
        .is_none());
    assert_eq!(session.generation(FIELD), generation);
}

#[test]
fn test_unattached_field_ignored() {
    let (mut session, _clock) = make_session();
    let resp = session.handle_input(NodeId(999), snapshot("hello"), &typed('o'));
    assert!(resp.is_empty());
    assert!(session.pending_correction(NodeId(999)).is_none());
}

#[test]
fn test_fields_debounce_independently() {
    let (mut session, clock) = make_session();
    let other = NodeId(11);
    session.attach_all(&[NodeInfo::element(other.0, "textarea", None)]);

    session.handle_input(FIELD, snapshot("abc"), &typed('c'));
    clock.advance(100);
    session.handle_input(other, snapshot("xyz"), &typed('z'));
    clock.advance(DEBOUNCE - 100);

    let due = session.poll_timers();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].field, FIELD);

    clock.advance(100);
    let due = session.poll_timers();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].field, other);
}
