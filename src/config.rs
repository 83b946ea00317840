//! # Configuration
//!
//! Tool-level settings loaded from environment variables.
//!
//! Command line flags take precedence over anything loaded here; this layer
//! only supplies defaults for values that are rarely passed explicitly.

use crate::constants::{
    DEFAULT_EDITOR, DEFAULT_FIELD_MANAGER, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_MANIFEST_BASE_URL,
    DEFAULT_MANIFEST_VERSION,
};
use std::time::Duration;

/// Tool configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    /// Base URL that manifest bundles are downloaded from
    pub manifest_base_url: String,
    /// Release channel appended to the base URL (e.g. `latest`, `v0.3.1`)
    pub manifest_version: String,
    /// Field manager recorded on created/patched objects
    pub field_manager: String,
    /// Timeout for a single manifest download (seconds)
    pub http_timeout_secs: u64,
    /// Editor command line (`VISUAL`, then `EDITOR`, then `vi`)
    pub editor: String,
    /// Global log level (ERROR, WARN, INFO, DEBUG, TRACE)
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: String,
    /// Enable color in text format logs
    pub log_enable_color: bool,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            manifest_base_url: DEFAULT_MANIFEST_BASE_URL.to_string(),
            manifest_version: DEFAULT_MANIFEST_VERSION.to_string(),
            field_manager: DEFAULT_FIELD_MANAGER.to_string(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            editor: DEFAULT_EDITOR.to_string(),
            log_level: "WARN".to_string(),
            log_format: "text".to_string(),
            log_enable_color: true,
        }
    }
}

impl ToolConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            manifest_base_url: env_var_or_default_str(
                "SECRETCTL_MANIFEST_BASE_URL",
                DEFAULT_MANIFEST_BASE_URL,
            ),
            manifest_version: env_var_or_default_str(
                "SECRETCTL_MANIFEST_VERSION",
                DEFAULT_MANIFEST_VERSION,
            ),
            field_manager: env_var_or_default_str("SECRETCTL_FIELD_MANAGER", DEFAULT_FIELD_MANAGER),
            http_timeout_secs: env_var_or_default(
                "SECRETCTL_HTTP_TIMEOUT_SECS",
                DEFAULT_HTTP_TIMEOUT_SECS,
            ),
            editor: resolve_editor(),
            log_level: env_var_or_default_str("LOG_LEVEL", "WARN"),
            log_format: env_var_or_default_str("LOG_FORMAT", "text"),
            log_enable_color: env_var_or_default_bool("LOG_ENABLE_COLOR", true),
        }
    }

    /// Get manifest download timeout duration
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Whether logs should be emitted as JSON lines
    pub fn log_json(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}

/// `VISUAL` wins over `EDITOR`; empty values are ignored
fn resolve_editor() -> String {
    ["VISUAL", "EDITOR"]
        .iter()
        .filter_map(|key| std::env::var(key).ok())
        .find(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_EDITOR.to_string())
}

/// Read environment variable or return default value
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read environment variable as boolean or return default
fn env_var_or_default_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map_or(default, |v| parse_bool(&v))
}

fn parse_bool(value: &str) -> bool {
    let v_lower = value.to_lowercase();
    v_lower == "true" || v_lower == "1" || v_lower == "yes" || v_lower == "on"
}

/// Read environment variable as string or return default
fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
