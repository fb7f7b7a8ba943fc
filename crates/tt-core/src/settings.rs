//! The two user toggles and the message channel that updates them.
//!
//! The store is an injectable handle rather than ambient state: every session
//! holds a clone, the preference panel's messages go through `apply`, and a
//! read always sees the latest applied message.

use std::sync::{Arc, RwLock};

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub suggestions_enabled: bool,
    pub autocorrect_enabled: bool,
}

impl Default for Settings {
    /// An unset preference means enabled.
    fn default() -> Self {
        Self {
            suggestions_enabled: true,
            autocorrect_enabled: true,
        }
    }
}

/// Partial update carried by one preference message. Absent fields are left unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettingsUpdate {
    pub suggestions_enabled: Option<bool>,
    pub autocorrect_enabled: Option<bool>,
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsMessageError {
    #[error("settings message is not valid JSON: {0}")]
    Json(String),
    #[error("settings message must be a JSON object")]
    NotAnObject,
}

impl SettingsUpdate {
    /// Decode a preference message.
    ///
    /// `{"action": "toggleExtension", "enabled": b}` sets both toggles.
    /// Any other object (with or without `"action": "updateSettings"`) carries
    /// `suggestionsEnabled` / `autocorrectEnabled`. Values are coerced to bool
    /// where possible; unknown fields and uncoercible values are ignored.
    pub fn from_message(message: &Value) -> Result<Self, SettingsMessageError> {
        let obj = message
            .as_object()
            .ok_or(SettingsMessageError::NotAnObject)?;

        if obj.get("action").and_then(Value::as_str) == Some("toggleExtension") {
            let enabled = obj.get("enabled").and_then(coerce_bool);
            return Ok(Self {
                suggestions_enabled: enabled,
                autocorrect_enabled: enabled,
            });
        }

        Ok(Self {
            suggestions_enabled: obj.get("suggestionsEnabled").and_then(coerce_bool),
            autocorrect_enabled: obj.get("autocorrectEnabled").and_then(coerce_bool),
        })
    }

    pub fn from_json(json: &str) -> Result<Self, SettingsMessageError> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| SettingsMessageError::Json(e.to_string()))?;
        Self::from_message(&value)
    }

    pub fn is_empty(&self) -> bool {
        self.suggestions_enabled.is_none() && self.autocorrect_enabled.is_none()
    }
}

fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "on" | "1" | "yes" => Some(true),
            "false" | "off" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Shared, cloneable handle to the current settings.
#[derive(Debug, Clone, Default)]
pub struct SettingsStore {
    inner: Arc<RwLock<Settings>>,
}

impl SettingsStore {
    pub fn new(initial: Settings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial)),
        }
    }

    pub fn get(&self) -> Settings {
        match self.inner.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Merge `update` and return `(before, after)`.
    pub fn apply(&self, update: SettingsUpdate) -> (Settings, Settings) {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let before = *guard;
        if let Some(v) = update.suggestions_enabled {
            guard.suggestions_enabled = v;
        }
        if let Some(v) = update.autocorrect_enabled {
            guard.autocorrect_enabled = v;
        }
        tracing::debug!(?before, after = ?*guard, "settings applied");
        (before, *guard)
    }
}
