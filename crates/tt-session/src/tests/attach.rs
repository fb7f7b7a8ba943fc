use tt_core::field::FieldKind;

use super::*;
use crate::{Effect, MutationBatch, PredictionResult};

fn page() -> Vec<NodeInfo> {
    vec![
        NodeInfo::element(1, "form", None),
        NodeInfo::element(2, "input", Some("text")),
        NodeInfo::element(3, "input", Some("password")),
        NodeInfo::text(4),
        NodeInfo::element(5, "textarea", None),
        NodeInfo::element(6, "input", Some("search")),
        NodeInfo::element(7, "input", Some("checkbox")),
    ]
}

#[test]
fn test_attach_all_eligible_only() {
    let (mut session, _clock) = make_session_with(Settings::default());
    let resp = session.attach_all(&page());
    assert_eq!(
        resp.effects,
        vec![
            Effect::AttachListeners {
                field: NodeId(2),
                kind: FieldKind::Text
            },
            Effect::AttachListeners {
                field: NodeId(5),
                kind: FieldKind::TextArea
            },
            Effect::AttachListeners {
                field: NodeId(6),
                kind: FieldKind::Search
            },
        ]
    );
    assert_eq!(session.attached_count(), 3);
    assert!(!session.is_attached(NodeId(3)));
}

#[test]
fn test_attach_is_idempotent() {
    let (mut session, _clock) = make_session_with(Settings::default());
    session.attach_all(&page());
    let again = session.attach_all(&page());
    assert!(again.effects.is_empty());
    assert_eq!(session.attached_count(), 3);
}

#[test]
fn test_observe_once() {
    let (mut session, _clock) = make_session_with(Settings::default());
    let resp = session.observe(NodeId(0));
    assert_eq!(resp.effects, vec![Effect::ObserveSubtree { root: NodeId(0) }]);
    assert!(session.is_observing());
    assert!(session.observe(NodeId(0)).effects.is_empty());
}

#[test]
fn test_mutations_ignored_before_observe() {
    let (mut session, _clock) = make_session_with(Settings::default());
    let resp = session.handle_mutations(&MutationBatch {
        added: vec![NodeInfo::element(20, "textarea", None)],
        removed: vec![],
    });
    assert!(resp.effects.is_empty());
    assert!(!session.is_attached(NodeId(20)));
}

#[test]
fn test_dynamic_field_behaves_like_static() {
    let (mut session, clock) = make_session_with(Settings::default());
    session.attach_all(&page());
    session.observe(NodeId(0));

    // A form inserted later; the added root itself is an eligible field too.
    let resp = session.handle_mutations(&MutationBatch {
        added: vec![
            NodeInfo::element(30, "input", None),
            NodeInfo::element(31, "div", None),
            NodeInfo::element(32, "textarea", None),
        ],
        removed: vec![],
    });
    assert_eq!(resp.effects.len(), 2);

    let dynamic = NodeId(32);
    session.handle_input(dynamic, snapshot("helo"), &typed('o'));
    clock.advance(DEBOUNCE);
    let due = session.poll_timers();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].field, dynamic);
    assert_eq!(due[0].snapshot, "helo");
}

#[test]
fn test_removed_field_dropped() {
    let (mut session, clock) = make_session_with(Settings::default());
    session.attach_all(&page());
    session.observe(NodeId(0));

    let field = NodeId(2);
    let resp = session.handle_input(field, snapshot("I like "), &typed(' '));
    let req = resp.prediction.unwrap();
    session
        .receive_prediction(PredictionResult {
            field,
            generation: req.generation,
            suggestion: "cats".to_string(),
        })
        .unwrap();
    session.handle_input(NodeId(5), snapshot("abc"), &typed('c'));

    let resp = session.handle_mutations(&MutationBatch {
        added: vec![],
        removed: vec![NodeId(1), field, NodeId(5)],
    });
    assert_eq!(resp.effects, vec![Effect::RemoveOverlay { field }]);
    assert!(!session.is_attached(field));
    assert!(!session.is_attached(NodeId(5)));

    clock.advance(DEBOUNCE);
    assert!(session.poll_timers().is_empty());
}

#[test]
fn test_moved_field_keeps_state() {
    let (mut session, _clock) = make_session_with(Settings::default());
    session.attach_all(&page());
    session.observe(NodeId(0));
    session.handle_input(NodeId(5), snapshot("abc"), &typed('c'));

    let resp = session.handle_mutations(&MutationBatch {
        added: vec![NodeInfo::element(5, "textarea", None)],
        removed: vec![NodeId(5)],
    });
    assert!(resp.effects.is_empty());
    assert!(session.pending_correction(NodeId(5)).is_some());
}

#[test]
fn test_reinserted_field_reattached() {
    let (mut session, _clock) = make_session_with(Settings::default());
    session.attach_all(&page());
    session.observe(NodeId(0));

    session.handle_mutations(&MutationBatch {
        added: vec![],
        removed: vec![NodeId(6)],
    });
    let resp = session.handle_mutations(&MutationBatch {
        added: vec![NodeInfo::element(6, "input", Some("search"))],
        removed: vec![],
    });
    assert_eq!(resp.effects.len(), 1);
    assert_eq!(session.field_kind(NodeId(6)), Some(FieldKind::Search));
}
