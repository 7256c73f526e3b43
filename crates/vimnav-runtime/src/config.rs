#![forbid(unsafe_code)]

//! Loading settings from files and the environment.
//!
//! Settings files are JSON or TOML, chosen by extension. Both go through
//! [`Settings::normalize`], so a readable file always yields usable
//! settings; only unreadable or unparsable files are errors.
//!
//! ```toml
//! # vimnav.toml
//! scrollStepSize = 120
//! hintCharacters = "asdfjkl"
//! excludedUrls = ["*://mail.example.com/*"]
//!
//! [keyMappings]
//! goToTop = "gg"
//! scrollDown = "j"
//! ```
//!
//! # Environment
//!
//! - `VIMNAV_LOG`: tracing filter directive (default `info`).
//! - `VIMNAV_SETTINGS`: path to a settings file.

use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::Value;
use vimnav_core::Settings;

/// Environment variable holding the tracing filter.
pub const LOG_ENV: &str = "VIMNAV_LOG";
/// Environment variable holding the settings file path.
pub const SETTINGS_ENV: &str = "VIMNAV_SETTINGS";
/// Filter used when [`LOG_ENV`] is unset.
pub const DEFAULT_LOG_FILTER: &str = "info";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur when loading a settings file.
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading a file.
    Io { path: PathBuf, source: std::io::Error },
    /// JSON parse error.
    Json(serde_json::Error),
    /// TOML parse error.
    Toml(toml::de::Error),
    /// Extension is neither `.json` nor `.toml`.
    UnknownFormat(PathBuf),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "cannot read {}: {source}", path.display()),
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            Self::UnknownFormat(path) => {
                write!(f, "unknown settings format (want .json or .toml): {}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json(e) => Some(e),
            Self::Toml(e) => Some(e),
            Self::UnknownFormat(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Settings sources
// ---------------------------------------------------------------------------

/// Parse and normalize JSON settings.
pub fn settings_from_json_str(s: &str) -> Result<Settings, ConfigError> {
    let raw: Value = serde_json::from_str(s).map_err(ConfigError::Json)?;
    Ok(Settings::normalize(&raw))
}

/// Parse and normalize TOML settings.
pub fn settings_from_toml_str(s: &str) -> Result<Settings, ConfigError> {
    let table: toml::Value = toml::from_str(s).map_err(ConfigError::Toml)?;
    let raw = serde_json::to_value(table).map_err(ConfigError::Json)?;
    Ok(Settings::normalize(&raw))
}

/// Load a settings file, picking the parser by extension.
pub fn load_settings_file(path: impl AsRef<Path>) -> Result<Settings, ConfigError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    let parse: fn(&str) -> Result<Settings, ConfigError> = match extension.as_deref() {
        Some("json") => settings_from_json_str,
        Some("toml") => settings_from_toml_str,
        _ => return Err(ConfigError::UnknownFormat(path.to_path_buf())),
    };
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let settings = parse(&content)?;
    tracing::info!(target: "vimnav.settings", path = %path.display(), "settings loaded");
    Ok(settings)
}

// ---------------------------------------------------------------------------
// RuntimeConfig
// ---------------------------------------------------------------------------

/// Process-level configuration for hosts and tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Tracing filter directive.
    pub log_filter: String,
    /// Settings file to load, if any.
    pub settings_path: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            settings_path: None,
        }
    }
}

impl RuntimeConfig {
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    #[must_use]
    pub fn with_settings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_path = Some(path.into());
        self
    }

    /// Load config from environment variables.
    ///
    /// Reads:
    /// - `VIMNAV_LOG`: tracing filter (blank values are ignored)
    /// - `VIMNAV_SETTINGS`: settings file path (blank values are ignored)
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// [`from_env`](Self::from_env) with an injectable lookup.
    #[must_use]
    pub fn from_env_with<F>(get_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(filter) = get_env(LOG_ENV)
            && !filter.trim().is_empty()
        {
            config.log_filter = filter.trim().to_string();
        }

        if let Some(path) = get_env(SETTINGS_ENV)
            && !path.trim().is_empty()
        {
            config.settings_path = Some(PathBuf::from(path.trim()));
        }

        config
    }

    /// Load the configured settings file, or defaults when none is set.
    pub fn load_settings(&self) -> Result<Settings, ConfigError> {
        match &self.settings_path {
            Some(path) => load_settings_file(path),
            None => Ok(Settings::default()),
        }
    }
}
