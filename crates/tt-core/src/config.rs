//! Engine tunables loaded from TOML.
//!
//! - `init_custom(toml_content)` installs a custom TOML before the first `config()` call
//! - `config()` returns `&'static Config` (lazy-init singleton)
//! - Defaults are embedded via `include_str!("default_config.toml")`
//!
//! Constructors elsewhere take `&Config`, so tests and tools can build their
//! own values with `parse_config_toml` instead of touching the singleton.

use std::path::Path;
use std::sync::OnceLock;

use serde::Deserialize;

use crate::keys::Key;

pub const DEFAULT_CONFIG_TOML: &str = include_str!("default_config.toml");

static CUSTOM_TOML: OnceLock<String> = OnceLock::new();

/// Set custom TOML before first `config()` call.
pub fn init_custom(toml_content: String) -> Result<(), ConfigError> {
    parse_config_toml(&toml_content)?;
    CUSTOM_TOML
        .set(toml_content)
        .map_err(|_| ConfigError::AlreadyInitialized)
}

/// Read a TOML file and install it as the custom config.
pub fn init_from_file(path: &Path) -> Result<(), ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        msg: e.to_string(),
    })?;
    init_custom(content)
}

/// Get or initialize the global config singleton.
pub fn config() -> &'static Config {
    static INSTANCE: OnceLock<Config> = OnceLock::new();
    INSTANCE.get_or_init(|| {
        let toml_str = CUSTOM_TOML
            .get()
            .map(|s| s.as_str())
            .unwrap_or(DEFAULT_CONFIG_TOML);
        // init_custom validated the custom TOML; the embedded one is covered by tests.
        parse_config_toml(toml_str).unwrap_or_else(|_| Config::builtin())
    })
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("TOML parse error: {0}")]
    Parse(String),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
    #[error("{path}: {msg}")]
    Io { path: String, msg: String },
    #[error("config already initialized")]
    AlreadyInitialized,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub overlay: OverlayConfig,
    pub completion: CompletionConfig,
    pub metrics: MetricsConfig,
    /// Parsed `pipeline.accept_key`.
    #[serde(skip)]
    accept_key: Option<Key>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub debounce_ms: u64,
    pub accept_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OverlayConfig {
    pub gap_px: f64,
    pub class_name: String,
    #[serde(default)]
    pub stylesheet: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionConfig {
    pub input_prefix: String,
    pub corrector_prompt: String,
    pub predictor_prompt: String,
    #[serde(default)]
    pub prediction_fallback: String,
    pub max_growth_ratio: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub default_font_px: f64,
    pub advance_em: f64,
}

impl Config {
    /// The key that accepts a visible suggestion.
    pub fn accept_key(&self) -> &Key {
        self.accept_key.as_ref().unwrap_or(&Key::Tab)
    }

    /// Hard-coded copy of the embedded defaults, used only if the embedded
    /// TOML itself were broken.
    fn builtin() -> Self {
        Self {
            pipeline: PipelineConfig {
                debounce_ms: 300,
                accept_key: "Tab".to_string(),
            },
            overlay: OverlayConfig {
                gap_px: 5.0,
                class_name: "turbotype-suggestion".to_string(),
                stylesheet: String::new(),
            },
            completion: CompletionConfig {
                input_prefix: "Sequence: ".to_string(),
                corrector_prompt: String::new(),
                predictor_prompt: String::new(),
                prediction_fallback: String::new(),
                max_growth_ratio: 2.0,
            },
            metrics: MetricsConfig {
                default_font_px: 16.0,
                advance_em: 0.55,
            },
            accept_key: Some(Key::Tab),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        parse_config_toml(DEFAULT_CONFIG_TOML).unwrap_or_else(|_| Self::builtin())
    }
}

pub fn parse_config_toml(toml_str: &str) -> Result<Config, ConfigError> {
    let mut c: Config = toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))?;
    validate(&c)?;
    c.accept_key = Some(parse_accept_key(&c.pipeline.accept_key)?);
    Ok(c)
}

fn parse_accept_key(raw: &str) -> Result<Key, ConfigError> {
    match Key::from_dom(raw) {
        Key::Unidentified => Err(ConfigError::InvalidValue {
            field: "pipeline.accept_key".to_string(),
            reason: format!("unknown key name {raw:?}"),
        }),
        key => Ok(key),
    }
}

fn validate(c: &Config) -> Result<(), ConfigError> {
    macro_rules! check {
        ($cond:expr, $section:ident . $field:ident, $reason:expr) => {
            if !$cond {
                return Err(ConfigError::InvalidValue {
                    field: concat!(stringify!($section), ".", stringify!($field)).to_string(),
                    reason: $reason.to_string(),
                });
            }
        };
    }

    check!(c.pipeline.debounce_ms > 0, pipeline.debounce_ms, "must be positive");
    check!(c.overlay.gap_px >= 0.0, overlay.gap_px, "must be non-negative");
    check!(
        !c.overlay.class_name.trim().is_empty(),
        overlay.class_name,
        "must not be empty"
    );
    check!(
        c.completion.max_growth_ratio >= 1.0,
        completion.max_growth_ratio,
        "must be at least 1.0"
    );
    check!(
        c.metrics.default_font_px > 0.0,
        metrics.default_font_px,
        "must be positive"
    );
    check!(c.metrics.advance_em > 0.0, metrics.advance_em, "must be positive");

    Ok(())
}
