use std::collections::{HashMap, HashSet};

use tracing::{debug, debug_span};

use tt_core::field::{FieldId, FieldKind, NodeId, NodeInfo};

use super::types::{Effect, MutationBatch, Response};
use super::{AugmentSession, FieldState};

/// Attached fields keyed by node identity, plus the observed root.
///
/// Membership here is the single source of truth for "listeners bound":
/// a field is announced to the host exactly once while it stays attached.
#[derive(Debug, Default)]
pub(crate) struct FieldRegistry {
    fields: HashMap<FieldId, FieldState>,
    observing: Option<NodeId>,
}

impl FieldRegistry {
    /// Returns true if `field` was not attached before.
    fn attach(&mut self, field: FieldId, kind: FieldKind) -> bool {
        if self.fields.contains_key(&field) {
            return false;
        }
        self.fields.insert(field, FieldState::new(kind));
        true
    }

    fn detach(&mut self, field: FieldId) -> bool {
        self.fields.remove(&field).is_some()
    }

    pub(crate) fn get(&self, field: FieldId) -> Option<&FieldState> {
        self.fields.get(&field)
    }

    pub(crate) fn get_mut(&mut self, field: FieldId) -> Option<&mut FieldState> {
        self.fields.get_mut(&field)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&FieldId, &FieldState)> {
        self.fields.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (&FieldId, &mut FieldState)> {
        self.fields.iter_mut()
    }

    pub(crate) fn len(&self) -> usize {
        self.fields.len()
    }
}

impl AugmentSession {
    /// Attach every eligible field among `nodes` (a flattened subtree).
    pub fn attach_all(&mut self, nodes: &[NodeInfo]) -> Response {
        Response::with(self.scan(nodes))
    }

    /// Start watching `root` for added and removed nodes. Idempotent.
    pub fn observe(&mut self, root: NodeId) -> Response {
        match self.registry.observing {
            Some(current) => {
                debug!(%current, %root, "already observing");
                Response::not_consumed()
            }
            None => {
                self.registry.observing = Some(root);
                Response::with(vec![Effect::ObserveSubtree { root }])
            }
        }
    }

    pub fn is_observing(&self) -> bool {
        self.registry.observing.is_some()
    }

    /// Apply one batch of subtree mutations.
    ///
    /// Nodes both removed and added in the same batch were moved; they keep
    /// their state and are not re-announced.
    pub fn handle_mutations(&mut self, batch: &MutationBatch) -> Response {
        let _span = debug_span!(
            "handle_mutations",
            added = batch.added.len(),
            removed = batch.removed.len()
        )
        .entered();

        if self.registry.observing.is_none() {
            debug!("mutation batch before observe; ignored");
            return Response::not_consumed();
        }

        let moved: HashSet<NodeId> = batch.added.iter().map(|n| n.id).collect();
        let mut resp = Response::not_consumed();
        for &node in &batch.removed {
            if !moved.contains(&node) {
                resp.extend(self.detach(node));
            }
        }
        resp.extend(self.scan(&batch.added));
        resp
    }

    fn scan(&mut self, nodes: &[NodeInfo]) -> Vec<Effect> {
        let mut effects = Vec::new();
        for node in nodes {
            let Some(kind) = node.field_kind() else {
                continue;
            };
            if self.registry.attach(node.id, kind) {
                debug!(field = %node.id, ?kind, "field attached");
                effects.push(Effect::AttachListeners {
                    field: node.id,
                    kind,
                });
            }
        }
        effects
    }

    /// Drop everything held for a field that left the document.
    fn detach(&mut self, field: FieldId) -> Option<Effect> {
        if !self.registry.detach(field) {
            return None;
        }
        debug!(%field, "field detached");
        self.overlays.remove(field)
    }
}
