use tracing::{debug, debug_span};

use tt_core::field::{FieldId, FieldSnapshot};
use tt_core::keys::KeyEvent;

use super::types::{Effect, PredictionResult, Response};
use super::AugmentSession;

impl AugmentSession {
    /// Process a key press in `field`. Only the accept key is handled: with a
    /// visible suggestion it is consumed and the suggestion appended.
    pub fn handle_key(&mut self, field: FieldId, event: &KeyEvent, snapshot: FieldSnapshot) -> Response {
        let _span = debug_span!("handle_key", %field, ?event).entered();

        if !event.is_plain(&self.accept_key) || !self.settings.get().suggestions_enabled {
            return Response::not_consumed();
        }
        let Some(state) = self.registry.get_mut(field) else {
            return Response::not_consumed();
        };
        let Some(overlay) = self.overlays.take(field) else {
            return Response::not_consumed();
        };

        state.observe(snapshot);
        let value = format!("{}{}", state.value, overlay.text);
        state.write(value.clone());
        debug!(accepted = %overlay.text, "suggestion accepted");

        let mut resp = Response::consumed();
        resp.push(Effect::SetValue { field, value });
        resp.push(Effect::RemoveOverlay { field });
        resp
    }

    /// Show a finished prediction if the field has not changed since it was requested.
    pub fn receive_prediction(&mut self, result: PredictionResult) -> Option<Response> {
        if !self.settings.get().suggestions_enabled {
            return None;
        }
        let state = self.registry.get(result.field)?;
        if state.generation != result.generation {
            debug!(field = %result.field, "stale prediction discarded");
            return None;
        }
        let text = result.suggestion.trim();
        if text.is_empty() {
            return None;
        }
        let effect = self
            .overlays
            .show(result.field, &state.geometry, &state.value, text);
        Some(Response::with(vec![effect]))
    }

    /// The host found the overlay node gone; the next suggestion recreates it.
    pub fn handle_overlay_lost(&mut self, field: FieldId) {
        if self.overlays.forget(field) {
            debug!(%field, "overlay lost; will recreate");
        }
    }

    /// Remove the field's overlay, if any.
    pub fn dismiss_overlay(&mut self, field: FieldId) -> Response {
        Response::with(self.overlays.remove(field).into_iter().collect())
    }
}
