//! Client settings and the default state file location (`~/.docs-qa/state.json`).

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::history::SearchMode;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Connection parameters for [`crate::ApiClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
        }
    }
}

/// User settings. Missing fields in a stored copy take their defaults, so an
/// older or partial file still loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub api_base_url: String,
    pub timeout_ms: u64,
    pub default_mode: SearchMode,
    pub show_timings: bool,
    pub show_debug: bool,
    pub source_url_prefix: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            default_mode: SearchMode::Full,
            show_timings: true,
            show_debug: false,
            source_url_prefix: String::new(),
        }
    }
}

impl AppSettings {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.api_base_url.clone(), Duration::from_millis(self.timeout_ms))
    }

    /// Apply the fields present in `patch`.
    pub fn apply(&mut self, patch: SettingsPatch) {
        if let Some(v) = patch.api_base_url {
            self.api_base_url = v;
        }
        if let Some(v) = patch.timeout_ms {
            self.timeout_ms = v;
        }
        if let Some(v) = patch.default_mode {
            self.default_mode = v;
        }
        if let Some(v) = patch.show_timings {
            self.show_timings = v;
        }
        if let Some(v) = patch.show_debug {
            self.show_debug = v;
        }
        if let Some(v) = patch.source_url_prefix {
            self.source_url_prefix = v;
        }
    }
}

/// Partial settings update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_mode: Option<SearchMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_timings: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_debug: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url_prefix: Option<String>,
}

impl SettingsPatch {
    /// Parse a single `key = value` pair as typed on the command line.
    pub fn from_key_value(key: &str, value: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason,
        };
        let mut patch = SettingsPatch::default();
        match key {
            "api_base_url" => {
                if value.trim().is_empty() {
                    return Err(invalid("must not be empty".into()));
                }
                patch.api_base_url = Some(value.trim().to_string());
            }
            "timeout_ms" => {
                let ms: u64 = value.parse().map_err(|e: std::num::ParseIntError| invalid(e.to_string()))?;
                if ms == 0 {
                    return Err(invalid("must be greater than zero".into()));
                }
                patch.timeout_ms = Some(ms);
            }
            "default_mode" => patch.default_mode = Some(value.parse().map_err(invalid)?),
            "show_timings" => patch.show_timings = Some(parse_bool(value).map_err(invalid)?),
            "show_debug" => patch.show_debug = Some(parse_bool(value).map_err(invalid)?),
            "source_url_prefix" => patch.source_url_prefix = Some(value.to_string()),
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        }
        Ok(patch)
    }
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        other => Err(format!("expected true or false, got {other}")),
    }
}

/// Returns the default state file path: `~/.docs-qa/state.json` (platform-specific).
pub fn default_state_path() -> Option<PathBuf> {
    let home = home_dir()?;
    Some(home.join(".docs-qa").join("state.json"))
}

#[cfg(unix)]
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

#[cfg(windows)]
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE").map(PathBuf::from)
}

#[cfg(not(any(unix, windows)))]
fn home_dir() -> Option<PathBuf> {
    None
}

/// Settings parse error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown setting: {0}")]
    UnknownKey(String),
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}
