use tt_core::field::{FieldId, FieldKind, NodeId, NodeInfo};

/// An instruction for the host to carry out against the document.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Bind the input and key-press handlers of a newly found field.
    AttachListeners { field: FieldId, kind: FieldKind },
    /// Install the subtree-mutation watcher on `root`.
    ObserveSubtree { root: NodeId },
    /// Overwrite the field's `value`.
    SetValue { field: FieldId, value: String },
    /// Create (when `created`) or update the overlay bound to `field`.
    ShowOverlay {
        field: FieldId,
        text: String,
        top: f64,
        left: f64,
        font: String,
        class_name: String,
        created: bool,
    },
    RemoveOverlay { field: FieldId },
    /// Call `poll` again after this many milliseconds.
    SchedulePoll { after_ms: u64 },
}

/// Next-word prediction the caller should run off-thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionRequest {
    pub field: FieldId,
    pub generation: u64,
    pub text: String,
}

/// A debounced correction whose quiet period has elapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectionRequest {
    pub field: FieldId,
    pub generation: u64,
    pub snapshot: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectionResult {
    pub field: FieldId,
    pub generation: u64,
    pub snapshot: String,
    pub corrected: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionResult {
    pub field: FieldId,
    pub generation: u64,
    pub suggestion: String,
}

/// Scheduled, cancellable correction for one field. At most one per field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCorrection {
    /// Unique per scheduling; a replaced ticket never fires.
    pub ticket: u64,
    pub snapshot: String,
    pub generation: u64,
    pub fire_at_ms: u64,
}

/// Nodes added to and removed from the observed subtree since the last batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutationBatch {
    /// Every node of every added subtree, roots included.
    pub added: Vec<NodeInfo>,
    pub removed: Vec<NodeId>,
}

/// Response to one host event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    /// The host must suppress the event's default handling.
    pub consumed: bool,
    pub effects: Vec<Effect>,
    pub prediction: Option<PredictionRequest>,
}

impl Response {
    pub(crate) fn not_consumed() -> Self {
        Self::default()
    }

    pub(crate) fn consumed() -> Self {
        Self {
            consumed: true,
            ..Self::default()
        }
    }

    pub(crate) fn with(effects: Vec<Effect>) -> Self {
        Self {
            effects,
            ..Self::default()
        }
    }

    pub(crate) fn push(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    pub(crate) fn extend(&mut self, effects: impl IntoIterator<Item = Effect>) {
        self.effects.extend(effects);
    }

    pub fn is_empty(&self) -> bool {
        !self.consumed && self.effects.is_empty() && self.prediction.is_none()
    }
}
