//! UniFFI export layer: foreign-language bindings for the Turbotype engine.
//!
//! Each public type here maps to a generated class, record, enum or callback
//! interface on the host side.

mod engine;
mod foreign;
mod session;
mod types;

pub use engine::TtEngine;
pub use foreign::{TtDownloadMonitor, TtLanguageModel, TtPromptSession, TtTextMeasurer};
pub use session::TtSession;
pub use types::{
    TtAvailability, TtEffect, TtError, TtFieldKind, TtFieldState, TtInputTrigger, TtKeyEvent,
    TtNode, TtResponse, TtSettings,
};

use std::path::Path;

// ---------------------------------------------------------------------------
// Top-level functions
// ---------------------------------------------------------------------------

#[uniffi::export]
fn engine_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Install a custom config file. Must run before the first engine is built.
#[uniffi::export]
fn config_load(path: String) -> Result<(), TtError> {
    tt_core::config::init_from_file(Path::new(&path)).map_err(|e| match e {
        tt_core::config::ConfigError::Io { .. } => TtError::Io { msg: e.to_string() },
        other => TtError::InvalidData {
            msg: other.to_string(),
        },
    })
}

#[uniffi::export]
fn config_default() -> String {
    tt_core::config::DEFAULT_CONFIG_TOML.to_string()
}

/// Stylesheet the host injects once per document for the suggestion overlay.
#[uniffi::export]
fn overlay_stylesheet() -> String {
    tt_core::config::config().overlay.stylesheet.clone()
}

#[uniffi::export]
fn is_eligible_field(tag: String, input_type: Option<String>) -> bool {
    tt_core::field::is_eligible(&tag, input_type.as_deref())
}

#[uniffi::export]
fn trace_init(log_dir: String) {
    crate::trace_init::init_tracing(Path::new(&log_dir));
}
