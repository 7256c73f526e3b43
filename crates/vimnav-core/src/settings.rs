#![forbid(unsafe_code)]

//! User settings and their normalization.
//!
//! The engine trusts [`Settings`] completely. Untrusted input (stored JSON,
//! messages from the settings page, config files) goes through
//! [`Settings::normalize`], which never fails: each field that is missing,
//! mistyped, or out of range falls back to its default on its own.
//!
//! # Field rules
//!
//! | Field | Accepted | Default |
//! |-------|----------|---------|
//! | `scrollStepSize` | number > 0 | 150 |
//! | `halfPageScroll` | number in (0, 1] | 0.5 |
//! | `smoothScroll` | bool | true |
//! | `smoothScrollDuration` | number >= 0 (ms) | 150 |
//! | `hintCharacters` | string of >= 2 chars | `sadfjklewcmpgh` |
//! | `keyMappings` | object; string entries merged over the defaults | stock keymap |
//! | `excludedUrls` | array; non-strings dropped | `[]` |
//! | `disabledActions` | array; unknown names dropped | `[]` |

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use web_time::Duration;

use crate::action::{Action, KeyMappings};
use crate::notation::KeySequence;

/// Default line-scroll distance in pixels.
pub const DEFAULT_SCROLL_STEP_SIZE: f64 = 150.0;
/// Default half-page fraction.
pub const DEFAULT_HALF_PAGE_SCROLL: f64 = 0.5;
/// Default smooth-scroll duration in milliseconds.
pub const DEFAULT_SMOOTH_SCROLL_DURATION_MS: f64 = 150.0;
/// Default hint alphabet (home row first).
pub const DEFAULT_HINT_CHARACTERS: &str = "sadfjklewcmpgh";
/// Shortest usable hint alphabet.
pub const MIN_HINT_CHARACTERS: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub scroll_step_size: f64,
    pub half_page_scroll: f64,
    pub smooth_scroll: bool,
    #[serde(rename = "smoothScrollDuration")]
    pub smooth_scroll_duration_ms: f64,
    pub hint_characters: String,
    pub key_mappings: KeyMappings,
    pub excluded_urls: Vec<String>,
    pub disabled_actions: Vec<Action>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scroll_step_size: DEFAULT_SCROLL_STEP_SIZE,
            half_page_scroll: DEFAULT_HALF_PAGE_SCROLL,
            smooth_scroll: true,
            smooth_scroll_duration_ms: DEFAULT_SMOOTH_SCROLL_DURATION_MS,
            hint_characters: DEFAULT_HINT_CHARACTERS.to_string(),
            key_mappings: KeyMappings::default(),
            excluded_urls: Vec::new(),
            disabled_actions: Vec::new(),
        }
    }
}

impl Settings {
    /// Build settings from untrusted JSON, field by field.
    #[must_use]
    pub fn normalize(raw: &Value) -> Self {
        let defaults = Self::default();
        let Some(obj) = raw.as_object() else {
            tracing::debug!(target: "vimnav.settings", "settings are not an object; using defaults");
            return defaults;
        };

        Self {
            scroll_step_size: number(obj, "scrollStepSize", |v| v > 0.0)
                .unwrap_or(defaults.scroll_step_size),
            half_page_scroll: number(obj, "halfPageScroll", |v| v > 0.0 && v <= 1.0)
                .unwrap_or(defaults.half_page_scroll),
            smooth_scroll: field(obj, "smoothScroll", Value::as_bool)
                .unwrap_or(defaults.smooth_scroll),
            smooth_scroll_duration_ms: number(obj, "smoothScrollDuration", |v| v >= 0.0)
                .unwrap_or(defaults.smooth_scroll_duration_ms),
            hint_characters: field(obj, "hintCharacters", |v| {
                v.as_str()
                    .filter(|s| s.chars().count() >= MIN_HINT_CHARACTERS)
                    .map(str::to_string)
            })
            .unwrap_or(defaults.hint_characters),
            key_mappings: field(obj, "keyMappings", merge_key_mappings)
                .unwrap_or(defaults.key_mappings),
            excluded_urls: field(obj, "excludedUrls", |v| {
                v.as_array().map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
            })
            .unwrap_or(defaults.excluded_urls),
            disabled_actions: field(obj, "disabledActions", |v| {
                v.as_array().map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .filter_map(Action::from_name)
                        .collect()
                })
            })
            .unwrap_or(defaults.disabled_actions),
        }
    }

    /// Overlay the top-level fields of `patch` onto these settings and
    /// normalize the result. Non-object patches change nothing.
    #[must_use]
    pub fn merged(&self, patch: &Value) -> Self {
        let Some(patch) = patch.as_object() else {
            return self.clone();
        };
        let mut base = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        for (key, value) in patch {
            base.insert(key.clone(), value.clone());
        }
        Self::normalize(&Value::Object(base))
    }

    /// Smooth-scroll animation length.
    #[must_use]
    pub fn smooth_scroll_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.smooth_scroll_duration_ms.max(0.0) / 1000.0)
            .unwrap_or(Duration::MAX)
    }

    #[must_use]
    pub fn is_disabled(&self, action: Action) -> bool {
        self.disabled_actions.contains(&action)
    }

    /// Key mappings with disabled actions removed.
    #[must_use]
    pub fn effective_mappings(&self) -> KeyMappings {
        self.key_mappings.clone().without(&self.disabled_actions)
    }
}

/// Read `key` through `parse`; present-but-invalid values are logged.
fn field<T>(obj: &Map<String, Value>, key: &str, parse: impl FnOnce(&Value) -> Option<T>) -> Option<T> {
    let raw = obj.get(key)?;
    let parsed = parse(raw);
    if parsed.is_none() {
        tracing::debug!(target: "vimnav.settings", field = key, value = %raw, "invalid setting; using default");
    }
    parsed
}

fn number(obj: &Map<String, Value>, key: &str, valid: impl Fn(f64) -> bool) -> Option<f64> {
    field(obj, key, |v| v.as_f64().filter(|n| valid(*n)))
}

fn merge_key_mappings(raw: &Value) -> Option<KeyMappings> {
    let overrides = raw.as_object()?;
    let mut mappings = KeyMappings::default();
    for action in Action::ALL {
        if let Some(notation) = overrides.get(action.name()).and_then(Value::as_str) {
            mappings.set(action, KeySequence::parse(notation));
        }
    }
    Some(mappings)
}
