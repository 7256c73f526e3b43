#![forbid(unsafe_code)]

//! Messages the browser side pushes into a page.
//!
//! Outbound requests (tab commands) are [`vimnav_core::TabCommand`]. The only
//! inbound message today is a settings broadcast, sent whenever the user
//! saves settings anywhere.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message received from the background context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BackgroundMessage {
    /// Fresh settings. The payload is untrusted and normalized on receipt;
    /// a missing or null payload is ignored.
    #[serde(rename = "SETTINGS_UPDATED")]
    SettingsUpdated {
        #[serde(default)]
        payload: Value,
    },
}

impl BackgroundMessage {
    /// Decode a raw message, returning `None` for anything unrecognized.
    #[must_use]
    pub fn from_value(raw: Value) -> Option<Self> {
        match serde_json::from_value(raw) {
            Ok(message) => Some(message),
            Err(err) => {
                tracing::debug!(target: "vimnav.engine", error = %err, "ignoring unrecognized message");
                None
            }
        }
    }
}
