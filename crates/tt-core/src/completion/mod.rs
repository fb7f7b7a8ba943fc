//! Language-model capability seam and the completion client built on it.
//!
//! The host provides a [`LanguageModel`]; the engine probes it once, opens a
//! corrector and a predictor [`PromptSession`], and wraps both in a
//! [`CompletionClient`] whose calls never fail.

mod client;

use std::sync::Arc;

pub use client::{CompletionClient, Role};

/// Result of the one-time capability probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Unavailable,
    /// Usable after a one-time setup (typically a model download).
    NeedsSetup,
    Available,
}

impl Availability {
    pub fn is_usable(self) -> bool {
        self != Self::Unavailable
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("language model unavailable")]
    Unavailable,
    #[error("session setup failed: {0}")]
    Setup(String),
    #[error("prompt failed: {0}")]
    Call(String),
    #[error("malformed model output: {0}")]
    Malformed(String),
}

/// Receives one-time model download progress.
pub trait DownloadMonitor: Send + Sync {
    fn on_progress(&self, loaded: u64, total: u64);
}

/// Download monitor that reports through `tracing`.
#[derive(Debug, Default)]
pub struct LogMonitor;

impl DownloadMonitor for LogMonitor {
    fn on_progress(&self, loaded: u64, total: u64) {
        tracing::info!("Downloaded {loaded} of {total} bytes.");
    }
}

pub struct SessionOptions<'a> {
    /// System-level behavioural instruction for the session.
    pub system_prompt: &'a str,
    pub monitor: Option<Arc<dyn DownloadMonitor>>,
}

/// An open session with the model. `prompt` blocks until the model answers.
pub trait PromptSession: Send + Sync {
    fn prompt(&self, input: &str) -> Result<String, CompletionError>;
}

/// The host's text-completion capability.
pub trait LanguageModel: Send + Sync {
    fn availability(&self) -> Availability;

    fn create_session(
        &self,
        options: &SessionOptions<'_>,
    ) -> Result<Arc<dyn PromptSession>, CompletionError>;
}
