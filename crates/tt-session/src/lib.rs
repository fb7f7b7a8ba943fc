//! Per-document input augmentation pipeline.
//!
//! `AugmentSession` owns every decision for the editable fields of one
//! document: which fields to attach, when to request a correction, whether a
//! finished correction or prediction still applies, and where the suggestion
//! overlay goes. The host feeds it events and performs the returned effects.

mod attach;
pub mod clock;
mod overlay;
mod pipeline;
mod suggest;
mod types;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use tt_core::config::Config;
use tt_core::field::{FieldGeometry, FieldId, FieldKind, FieldSnapshot};
use tt_core::keys::Key;
use tt_core::metrics::TextMeasurer;
use tt_core::settings::{Settings, SettingsStore};

pub use overlay::Overlay;
pub use types::{
    CorrectionRequest, CorrectionResult, Effect, MutationBatch, PendingCorrection,
    PredictionRequest, PredictionResult, Response,
};

use attach::FieldRegistry;
use clock::Clock;
use overlay::OverlayManager;

/// Engine-side mirror of one attached field.
#[derive(Debug)]
pub(crate) struct FieldState {
    kind: FieldKind,
    value: String,
    /// Bumped on every text change and every engine write.
    generation: u64,
    geometry: FieldGeometry,
    pending: Option<PendingCorrection>,
}

impl FieldState {
    fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            value: String::new(),
            generation: 0,
            geometry: FieldGeometry::default(),
            pending: None,
        }
    }

    /// Record the host's live view of the field.
    fn observe(&mut self, snapshot: FieldSnapshot) {
        self.geometry = snapshot.geometry;
        if self.value != snapshot.value {
            self.value = snapshot.value;
            self.generation += 1;
        }
    }

    /// Record a value the engine is about to write into the field.
    fn write(&mut self, value: String) {
        self.value = value;
        self.generation += 1;
    }
}

pub struct AugmentSession {
    settings: SettingsStore,
    clock: Arc<dyn Clock>,
    debounce_ms: u64,
    accept_key: Key,
    registry: FieldRegistry,
    overlays: OverlayManager,
    next_ticket: u64,
}

impl AugmentSession {
    pub fn new(
        config: &Config,
        settings: SettingsStore,
        measurer: Arc<dyn TextMeasurer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            settings,
            clock,
            debounce_ms: config.pipeline.debounce_ms,
            accept_key: config.accept_key().clone(),
            registry: FieldRegistry::default(),
            overlays: OverlayManager::new(&config.overlay, measurer),
            next_ticket: 0,
        }
    }

    pub fn settings(&self) -> Settings {
        self.settings.get()
    }

    pub fn is_attached(&self, field: FieldId) -> bool {
        self.registry.get(field).is_some()
    }

    pub fn attached_count(&self) -> usize {
        self.registry.len()
    }

    pub fn field_kind(&self, field: FieldId) -> Option<FieldKind> {
        self.registry.get(field).map(|s| s.kind)
    }

    /// The engine's view of the field's current value.
    pub fn field_value(&self, field: FieldId) -> Option<&str> {
        self.registry.get(field).map(|s| s.value.as_str())
    }

    pub fn generation(&self, field: FieldId) -> Option<u64> {
        self.registry.get(field).map(|s| s.generation)
    }

    pub fn pending_correction(&self, field: FieldId) -> Option<&PendingCorrection> {
        self.registry.get(field).and_then(|s| s.pending.as_ref())
    }

    pub fn overlay(&self, field: FieldId) -> Option<&Overlay> {
        self.overlays.get(field)
    }

    pub fn overlay_count(&self) -> usize {
        self.overlays.len()
    }

    /// Milliseconds until the earliest pending correction is due.
    pub fn next_deadline_ms(&self) -> Option<u64> {
        let now = self.clock.now_ms();
        self.registry
            .iter()
            .filter_map(|(_, s)| s.pending.as_ref())
            .map(|p| p.fire_at_ms.saturating_sub(now))
            .min()
    }
}
