use std::collections::HashMap;
use std::sync::Arc;

use tt_core::config::OverlayConfig;
use tt_core::field::{FieldGeometry, FieldId};
use tt_core::metrics::TextMeasurer;

use super::types::Effect;

/// Suggestion overlay bound to one field.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub text: String,
    pub top: f64,
    pub left: f64,
    pub font: String,
}

/// At most one overlay per field; showing again reuses it.
pub(crate) struct OverlayManager {
    overlays: HashMap<FieldId, Overlay>,
    measurer: Arc<dyn TextMeasurer>,
    gap_px: f64,
    class_name: String,
}

impl OverlayManager {
    pub fn new(config: &OverlayConfig, measurer: Arc<dyn TextMeasurer>) -> Self {
        Self {
            overlays: HashMap::new(),
            measurer,
            gap_px: config.gap_px,
            class_name: config.class_name.clone(),
        }
    }

    /// Create or update the overlay for `field`, placed just after `value`.
    /// The width is measured on every call; `value` may have changed since.
    pub fn show(&mut self, field: FieldId, geometry: &FieldGeometry, value: &str, text: &str) -> Effect {
        let width = self.measurer.measure(value, &geometry.font);
        let overlay = Overlay {
            text: text.to_string(),
            top: geometry.rect.top,
            left: geometry.rect.left + width + self.gap_px,
            font: geometry.font.clone(),
        };
        let created = self.overlays.insert(field, overlay.clone()).is_none();
        Effect::ShowOverlay {
            field,
            text: overlay.text,
            top: overlay.top,
            left: overlay.left,
            font: overlay.font,
            class_name: self.class_name.clone(),
            created,
        }
    }

    pub fn remove(&mut self, field: FieldId) -> Option<Effect> {
        self.overlays
            .remove(&field)
            .map(|_| Effect::RemoveOverlay { field })
    }

    /// Remove and return the overlay without emitting an effect.
    pub fn take(&mut self, field: FieldId) -> Option<Overlay> {
        self.overlays.remove(&field)
    }

    /// The host lost the overlay node; the next `show` recreates it.
    pub fn forget(&mut self, field: FieldId) -> bool {
        self.overlays.remove(&field).is_some()
    }

    pub fn clear(&mut self) -> Vec<Effect> {
        let mut fields: Vec<FieldId> = self.overlays.drain().map(|(f, _)| f).collect();
        fields.sort();
        fields
            .into_iter()
            .map(|field| Effect::RemoveOverlay { field })
            .collect()
    }

    pub fn get(&self, field: FieldId) -> Option<&Overlay> {
        self.overlays.get(&field)
    }

    pub fn len(&self) -> usize {
        self.overlays.len()
    }
}
