//! Host-implemented capabilities and their bridges to the core traits.

use std::sync::Arc;

use tt_core::completion::{
    Availability, CompletionError, DownloadMonitor, LanguageModel, LogMonitor, PromptSession,
    SessionOptions,
};
use tt_core::metrics::TextMeasurer;

use super::{TtAvailability, TtError};

/// The host's on-device text-completion capability.
#[uniffi::export(with_foreign)]
pub trait TtLanguageModel: Send + Sync {
    fn availability(&self) -> TtAvailability;

    /// Open a session primed with `system_prompt`. A model that must be
    /// downloaded first reports progress through `monitor`.
    fn create_session(
        &self,
        system_prompt: String,
        monitor: Arc<dyn TtDownloadMonitor>,
    ) -> Result<Arc<dyn TtPromptSession>, TtError>;
}

#[uniffi::export(with_foreign)]
pub trait TtPromptSession: Send + Sync {
    fn prompt(&self, input: String) -> Result<String, TtError>;
}

#[uniffi::export(with_foreign)]
pub trait TtDownloadMonitor: Send + Sync {
    fn on_progress(&self, loaded: u64, total: u64);
}

/// Measures rendered text width with the host's own layout engine.
#[uniffi::export(with_foreign)]
pub trait TtTextMeasurer: Send + Sync {
    fn measure(&self, text: String, font: String) -> f64;
}

// ---------------------------------------------------------------------------
// Bridges
// ---------------------------------------------------------------------------

pub(crate) struct ForeignModel(pub Arc<dyn TtLanguageModel>);

impl LanguageModel for ForeignModel {
    fn availability(&self) -> Availability {
        self.0.availability().into()
    }

    fn create_session(
        &self,
        options: &SessionOptions<'_>,
    ) -> Result<Arc<dyn PromptSession>, CompletionError> {
        let inner = options
            .monitor
            .clone()
            .unwrap_or_else(|| Arc::new(LogMonitor));
        let monitor: Arc<dyn TtDownloadMonitor> = Arc::new(MonitorBridge(inner));
        let session = self
            .0
            .create_session(options.system_prompt.to_string(), monitor)
            .map_err(|e| CompletionError::Setup(e.to_string()))?;
        Ok(Arc::new(ForeignSession(session)))
    }
}

struct ForeignSession(Arc<dyn TtPromptSession>);

impl PromptSession for ForeignSession {
    fn prompt(&self, input: &str) -> Result<String, CompletionError> {
        self.0.prompt(input.to_string()).map_err(CompletionError::from)
    }
}

struct MonitorBridge(Arc<dyn DownloadMonitor>);

impl TtDownloadMonitor for MonitorBridge {
    fn on_progress(&self, loaded: u64, total: u64) {
        self.0.on_progress(loaded, total);
    }
}

pub(crate) struct ForeignMeasurer(pub Arc<dyn TtTextMeasurer>);

impl TextMeasurer for ForeignMeasurer {
    fn measure(&self, text: &str, font: &str) -> f64 {
        let width = self.0.measure(text.to_string(), font.to_string());
        if width.is_finite() {
            width.max(0.0)
        } else {
            0.0
        }
    }
}
