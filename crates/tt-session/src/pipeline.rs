use tracing::{debug, debug_span};

use tt_core::field::{FieldId, FieldSnapshot};
use tt_core::keys::{correction_skip, wants_prediction, InputTrigger};
use tt_core::settings::SettingsUpdate;

use super::types::{
    CorrectionRequest, CorrectionResult, Effect, PendingCorrection, PredictionRequest, Response,
};
use super::AugmentSession;

impl AugmentSession {
    /// Process a text change in `field`.
    ///
    /// Every change cancels the field's pending correction. Unless autocorrect
    /// is off or the skip policy applies, a new one is scheduled with the
    /// current text as its snapshot. At a word boundary a prediction is
    /// requested; otherwise the field's overlay no longer fits and is removed.
    pub fn handle_input(
        &mut self,
        field: FieldId,
        snapshot: FieldSnapshot,
        trigger: &InputTrigger,
    ) -> Response {
        let _span = debug_span!("handle_input", %field, ?trigger).entered();
        let settings = self.settings.get();
        let now = self.clock.now_ms();
        let fire_at_ms = now + self.debounce_ms;
        let ticket = self.next_ticket + 1;

        let Some(state) = self.registry.get_mut(field) else {
            debug!("input from unattached field; ignored");
            return Response::not_consumed();
        };
        state.observe(snapshot);

        let mut resp = Response::not_consumed();
        let cancelled = state.pending.take();

        if !settings.autocorrect_enabled {
            debug!("autocorrect disabled");
        } else if let Some(reason) = correction_skip(trigger, &state.value) {
            debug!(?reason, "correction skipped");
        } else {
            state.pending = Some(PendingCorrection {
                ticket,
                snapshot: state.value.clone(),
                generation: state.generation,
                fire_at_ms,
            });
            self.next_ticket = ticket;
            resp.push(Effect::SchedulePoll {
                after_ms: self.debounce_ms,
            });
        }
        if let Some(old) = cancelled {
            debug!(ticket = old.ticket, "pending correction cancelled");
        }

        if wants_prediction(&state.value) {
            if settings.suggestions_enabled {
                resp.prediction = Some(PredictionRequest {
                    field,
                    generation: state.generation,
                    text: state.value.clone(),
                });
            }
        } else if let Some(effect) = self.overlays.remove(field) {
            resp.push(effect);
        }
        resp
    }

    /// Fire every pending correction whose quiet period has elapsed.
    pub fn poll_timers(&mut self) -> Vec<CorrectionRequest> {
        let now = self.clock.now_ms();
        let enabled = self.settings.get().autocorrect_enabled;
        let mut due = Vec::new();
        for (&field, state) in self.registry.iter_mut() {
            if !enabled {
                state.pending = None;
                continue;
            }
            if !state.pending.as_ref().is_some_and(|p| p.fire_at_ms <= now) {
                continue;
            }
            if let Some(p) = state.pending.take() {
                debug!(%field, ticket = p.ticket, "correction due");
                due.push(CorrectionRequest {
                    field,
                    generation: p.generation,
                    snapshot: p.snapshot,
                });
            }
        }
        due.sort_by_key(|r| r.field);
        due
    }

    /// Apply a finished correction if it is still about the field's current text.
    /// Returns `None` when the result is stale, redundant, or no longer wanted.
    pub fn receive_correction(&mut self, result: CorrectionResult) -> Option<Response> {
        let _span = debug_span!(
            "receive_correction",
            field = %result.field,
            generation = result.generation
        )
        .entered();

        if !self.settings.get().autocorrect_enabled {
            debug!("autocorrect disabled; correction discarded");
            return None;
        }
        let Some(state) = self.registry.get_mut(result.field) else {
            debug!("field detached; correction discarded");
            return None;
        };
        if state.generation != result.generation || state.value != result.snapshot {
            debug!(current = state.generation, "stale correction discarded");
            return None;
        }
        if result.corrected == result.snapshot {
            return None;
        }

        state.write(result.corrected.clone());
        Some(Response::with(vec![Effect::SetValue {
            field: result.field,
            value: result.corrected,
        }]))
    }

    /// Merge a preference message and clean up what the new settings forbid.
    pub fn apply_settings(&mut self, update: SettingsUpdate) -> Response {
        let (before, after) = self.settings.apply(update);
        let mut resp = Response::not_consumed();
        if !after.suggestions_enabled {
            resp.extend(self.overlays.clear());
        }
        if !after.autocorrect_enabled {
            for (_, state) in self.registry.iter_mut() {
                state.pending = None;
            }
        }
        if before != after {
            debug!(?after, "settings changed");
        }
        resp
    }
}
