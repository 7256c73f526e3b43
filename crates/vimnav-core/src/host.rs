#![forbid(unsafe_code)]

//! Host capabilities.
//!
//! The engine reaches the page and the browser only through these traits.
//! A host implements all of them and gets [`Host`] for free. Every method
//! is synchronous; anything asynchronous on the platform side (messaging,
//! smooth native scrolling) is fire-and-forget from the engine's view.

use serde::{Deserialize, Serialize};

use crate::element::{ElementId, ElementInfo, HintCandidate};
use crate::error::HostError;
use crate::hints::HintView;
use crate::mode::ModeIndicator;

// ---------------------------------------------------------------------------
// Viewport
// ---------------------------------------------------------------------------

/// How the host should perform a scroll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollBehavior {
    Instant,
    /// Platform-native smooth scrolling.
    Smooth,
}

impl ScrollBehavior {
    #[must_use]
    pub const fn from_smooth(smooth: bool) -> Self {
        if smooth { Self::Smooth } else { Self::Instant }
    }
}

/// Viewport size and scroll position, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewportMetrics {
    pub width: f64,
    pub height: f64,
    pub scroll_x: f64,
    pub scroll_y: f64,
    /// Total scrollable document height.
    pub scroll_height: f64,
}

impl ViewportMetrics {
    /// Largest meaningful `scroll_y`.
    #[must_use]
    pub fn max_scroll_y(&self) -> f64 {
        (self.scroll_height - self.height).max(0.0)
    }
}

pub trait Viewport {
    fn metrics(&self) -> ViewportMetrics;
    fn scroll_by(&mut self, dx: f64, dy: f64, behavior: ScrollBehavior) -> Result<(), HostError>;
    fn scroll_to(&mut self, x: f64, y: f64, behavior: ScrollBehavior) -> Result<(), HostError>;
}

// ---------------------------------------------------------------------------
// Find in page
// ---------------------------------------------------------------------------

/// Options for the host's find-in-page primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FindOptions {
    pub case_sensitive: bool,
    pub backwards: bool,
    pub wrap_around: bool,
}

impl FindOptions {
    /// Case-insensitive, wrapping search in the given direction.
    #[must_use]
    pub const fn direction(forward: bool) -> Self {
        Self {
            case_sensitive: false,
            backwards: !forward,
            wrap_around: true,
        }
    }
}

pub trait PageFinder {
    /// Search and select the next match. Returns whether one was found.
    fn find(&mut self, query: &str, options: FindOptions) -> bool;
    fn clear_selection(&mut self);
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

pub trait Document {
    /// Fresh attributes for `id`, or `None` if the element is gone.
    fn element(&self, id: ElementId) -> Option<ElementInfo>;
    fn active_element(&self) -> Option<ElementId>;
    /// Clickable elements in document order, with geometry and style.
    fn hint_candidates(&self) -> Vec<HintCandidate>;
    /// First visible text-like input, for the focus-input action.
    fn first_text_input(&self) -> Option<ElementId>;
    fn focus(&mut self, id: ElementId) -> Result<(), HostError>;
    fn blur(&mut self, id: ElementId);
    fn click(&mut self, id: ElementId) -> Result<(), HostError>;
}

pub trait Browser {
    fn history_back(&mut self);
    fn history_forward(&mut self);
    fn reload(&mut self);
}

// ---------------------------------------------------------------------------
// Messaging
// ---------------------------------------------------------------------------

/// Requests the page sends to the browser's tab manager.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TabCommand {
    #[serde(rename = "TAB_CLOSE")]
    Close,
    #[serde(rename = "TAB_RESTORE")]
    Restore,
    #[serde(rename = "TAB_NEW")]
    New,
    /// Open `url` in a background tab.
    #[serde(rename = "TAB_NEW_URL")]
    NewWithUrl { url: String },
    #[serde(rename = "TAB_DUPLICATE")]
    Duplicate,
    #[serde(rename = "TAB_NEXT")]
    Next,
    #[serde(rename = "TAB_PREV")]
    Prev,
}

pub trait Messenger {
    fn send(&mut self, command: TabCommand) -> Result<(), HostError>;
}

// ---------------------------------------------------------------------------
// Overlay
// ---------------------------------------------------------------------------

/// What the page overlay should display. Rendering is the host's business.
pub trait Overlay {
    fn show_hints(&mut self, hints: &[HintView]);
    fn update_hints(&mut self, hints: &[HintView]);
    fn hide_hints(&mut self);
    fn show_search_bar(&mut self);
    fn hide_search_bar(&mut self);
    fn set_selection_highlight(&mut self, on: bool);
    /// `None` hides the indicator.
    fn set_mode_indicator(&mut self, indicator: Option<&ModeIndicator>);
}

/// Everything the engine needs from its environment.
pub trait Host: Viewport + PageFinder + Document + Browser + Messenger + Overlay {}

impl<T> Host for T where T: Viewport + PageFinder + Document + Browser + Messenger + Overlay {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tab_commands_use_type_tag() {
        let json = serde_json::to_string(&TabCommand::Close).unwrap();
        assert_eq!(json, r#"{"type":"TAB_CLOSE"}"#);

        let json = serde_json::to_string(&TabCommand::NewWithUrl {
            url: "https://example.com/".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"TAB_NEW_URL","url":"https://example.com/"}"#);

        let back: TabCommand = serde_json::from_str(r#"{"type":"TAB_PREV"}"#).unwrap();
        assert_eq!(back, TabCommand::Prev);
    }

    #[test]
    fn find_options_direction() {
        let fwd = FindOptions::direction(true);
        assert!(!fwd.backwards && fwd.wrap_around && !fwd.case_sensitive);
        assert!(FindOptions::direction(false).backwards);
    }

    #[test]
    fn max_scroll_never_negative() {
        let m = ViewportMetrics {
            height: 800.0,
            scroll_height: 600.0,
            ..Default::default()
        };
        assert_eq!(m.max_scroll_y(), 0.0);
    }
}
