use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;
use tt_core::field::{FieldId, NodeId, NodeInfo};
use tt_core::keys::{InputTrigger, KeyEvent};
use tt_core::settings::SettingsUpdate;
use tt_session::{AugmentSession, MutationBatch, Response};

use super::types::convert_responses;
use super::{TtError, TtFieldState, TtInputTrigger, TtKeyEvent, TtNode, TtResponse, TtSettings};
use crate::async_worker::{AsyncWorker, WorkResult};

/// How soon the host should poll again while model calls are in flight.
const WORKER_POLL_MS: u64 = 50;

/// One document's augmentation session. All methods are cheap; model calls
/// run on the session's worker threads and surface through `poll`.
#[derive(uniffi::Object)]
pub struct TtSession {
    session: Mutex<AugmentSession>,
    worker: AsyncWorker,
}

#[uniffi::export]
impl TtSession {
    /// Initial scan of the document: every node in tree order.
    fn attach_all(&self, nodes: Vec<TtNode>) -> TtResponse {
        let nodes: Vec<NodeInfo> = nodes.into_iter().map(NodeInfo::from).collect();
        let mut session = self.lock();
        let resp = session.attach_all(&nodes);
        self.finish(&session, vec![resp])
    }

    fn observe(&self, root: u64) -> TtResponse {
        let mut session = self.lock();
        let resp = session.observe(NodeId(root));
        self.finish(&session, vec![resp])
    }

    fn handle_mutations(&self, added: Vec<TtNode>, removed: Vec<u64>) -> TtResponse {
        let batch = MutationBatch {
            added: added.into_iter().map(NodeInfo::from).collect(),
            removed: removed.into_iter().map(NodeId).collect(),
        };
        let mut session = self.lock();
        let resp = session.handle_mutations(&batch);
        for &id in &batch.removed {
            if !session.is_attached(id) {
                self.worker.forget(id);
            }
        }
        self.finish(&session, vec![resp])
    }

    fn handle_input(&self, field: u64, state: TtFieldState, trigger: TtInputTrigger) -> TtResponse {
        let field = NodeId(field);
        let trigger = InputTrigger::from(trigger);
        let mut session = self.lock();
        let mut resp = session.handle_input(field, state.into(), &trigger);
        self.publish(&session, field);
        self.dispatch(&mut resp);
        self.finish(&session, vec![resp])
    }

    fn handle_key(&self, field: u64, key: TtKeyEvent, state: TtFieldState) -> TtResponse {
        let field = NodeId(field);
        let event = KeyEvent::from(key);
        let mut session = self.lock();
        let resp = session.handle_key(field, &event, state.into());
        self.publish(&session, field);
        self.finish(&session, vec![resp])
    }

    /// Fire due corrections and deliver finished model results.
    fn poll(&self) -> TtResponse {
        let mut session = self.lock();
        for request in session.poll_timers() {
            debug!(field = %request.field, "dispatching correction");
            self.worker.submit_correction(request);
        }

        let mut responses = Vec::new();
        while let Some(result) = self.worker.try_recv() {
            let (field, resp) = match result {
                WorkResult::Correction(r) => (r.field, session.receive_correction(r)),
                WorkResult::Prediction(r) => (r.field, session.receive_prediction(r)),
            };
            if let Some(mut resp) = resp {
                self.publish(&session, field);
                self.dispatch(&mut resp);
                responses.push(resp);
            }
        }
        self.finish(&session, responses)
    }

    /// Apply a preference-change message (`{"suggestionsEnabled": false}`,
    /// legacy `{"action": "toggleExtension", "enabled": true}`, ...).
    /// Messages without a recognised key are ignored.
    fn apply_settings_message(&self, message: String) -> Result<TtResponse, TtError> {
        let update = SettingsUpdate::from_json(&message)
            .map_err(|e| TtError::InvalidData { msg: e.to_string() })?;
        Ok(self.apply(update))
    }

    fn set_suggestions_enabled(&self, enabled: bool) -> TtResponse {
        self.apply(SettingsUpdate {
            suggestions_enabled: Some(enabled),
            autocorrect_enabled: None,
        })
    }

    fn set_autocorrect_enabled(&self, enabled: bool) -> TtResponse {
        self.apply(SettingsUpdate {
            suggestions_enabled: None,
            autocorrect_enabled: Some(enabled),
        })
    }

    /// The host found the overlay element gone (removed by the page).
    fn overlay_lost(&self, field: u64) {
        self.lock().handle_overlay_lost(NodeId(field));
    }

    fn dismiss_overlay(&self, field: u64) -> TtResponse {
        let mut session = self.lock();
        let resp = session.dismiss_overlay(NodeId(field));
        self.finish(&session, vec![resp])
    }

    fn settings(&self) -> TtSettings {
        self.lock().settings().into()
    }

    fn is_attached(&self, field: u64) -> bool {
        self.lock().is_attached(NodeId(field))
    }
}

impl TtSession {
    pub(super) fn new(session: AugmentSession, worker: AsyncWorker) -> Self {
        Self {
            session: Mutex::new(session),
            worker,
        }
    }

    fn lock(&self) -> MutexGuard<'_, AugmentSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply(&self, update: SettingsUpdate) -> TtResponse {
        if update.is_empty() {
            return TtResponse::default();
        }
        let mut session = self.lock();
        let resp = session.apply_settings(update);
        self.finish(&session, vec![resp])
    }

    fn publish(&self, session: &AugmentSession, field: FieldId) {
        if let Some(generation) = session.generation(field) {
            self.worker.publish(field, generation);
        }
    }

    fn dispatch(&self, resp: &mut Response) {
        if let Some(request) = resp.prediction.take() {
            self.worker.submit_prediction(request);
        }
    }

    fn finish(&self, session: &AugmentSession, responses: Vec<Response>) -> TtResponse {
        let worker = self.worker.has_pending_work().then_some(WORKER_POLL_MS);
        let pending = match (session.next_deadline_ms(), worker) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        convert_responses(responses, pending)
    }
}
