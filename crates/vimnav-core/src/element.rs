#![forbid(unsafe_code)]

//! Page element descriptors.
//!
//! The engine never owns page elements. It refers to them by [`ElementId`]
//! and asks the host for a fresh [`ElementInfo`] whenever it needs one; the
//! host may answer that the element is gone.

use serde::{Deserialize, Serialize};

/// Opaque identity of a page element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(u64);

impl ElementId {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Element type as far as navigation cares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Anchor { href: Option<String> },
    Button,
    /// `<input>`; `input_type` is the raw `type` attribute (may be empty).
    Input { input_type: String },
    TextArea,
    Select,
    Summary,
    Details,
    /// Any other tag, lowercase.
    Other(String),
}

/// Snapshot of the attributes that drive clickability and editability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementInfo {
    pub id: ElementId,
    pub kind: ElementKind,
    #[serde(default)]
    pub role: Option<String>,
    /// Raw `contenteditable` attribute, if present.
    #[serde(default)]
    pub content_editable: Option<String>,
    #[serde(default)]
    pub tabindex: Option<i32>,
    #[serde(default)]
    pub has_onclick: bool,
}

impl ElementInfo {
    #[must_use]
    pub fn new(id: ElementId, kind: ElementKind) -> Self {
        Self {
            id,
            kind,
            role: None,
            content_editable: None,
            tabindex: None,
            has_onclick: false,
        }
    }

    #[must_use]
    pub fn anchor(id: ElementId, href: &str) -> Self {
        Self::new(
            id,
            ElementKind::Anchor {
                href: Some(href.to_string()),
            },
        )
    }

    #[must_use]
    pub fn input(id: ElementId, input_type: &str) -> Self {
        Self::new(
            id,
            ElementKind::Input {
                input_type: input_type.to_string(),
            },
        )
    }

    #[must_use]
    pub fn with_role(mut self, role: &str) -> Self {
        self.role = Some(role.to_string());
        self
    }

    #[must_use]
    pub fn with_content_editable(mut self, value: &str) -> Self {
        self.content_editable = Some(value.to_string());
        self
    }

    #[must_use]
    pub fn with_tabindex(mut self, tabindex: i32) -> Self {
        self.tabindex = Some(tabindex);
        self
    }

    #[must_use]
    pub fn with_onclick(mut self) -> Self {
        self.has_onclick = true;
        self
    }

    /// Link target of an anchor with a non-empty `href`.
    #[must_use]
    pub fn href(&self) -> Option<&str> {
        match &self.kind {
            ElementKind::Anchor { href: Some(href) } if !href.is_empty() => Some(href),
            _ => None,
        }
    }

    /// Lowercased input type, `"text"` when the attribute is missing.
    #[must_use]
    pub fn input_type(&self) -> Option<String> {
        match &self.kind {
            ElementKind::Input { input_type } if input_type.is_empty() => Some("text".into()),
            ElementKind::Input { input_type } => Some(input_type.to_ascii_lowercase()),
            _ => None,
        }
    }

    /// Whether link hints should label this element.
    ///
    /// Links with a target, form controls other than hidden inputs,
    /// summary/details, elements with a button/link/tab role, inline click
    /// handlers, a tabindex, or any contenteditable attribute.
    #[must_use]
    pub fn is_clickable(&self) -> bool {
        let by_kind = match &self.kind {
            ElementKind::Anchor { href } => href.is_some(),
            ElementKind::Input { .. } => self.input_type().as_deref() != Some("hidden"),
            ElementKind::Button
            | ElementKind::TextArea
            | ElementKind::Select
            | ElementKind::Summary
            | ElementKind::Details => true,
            ElementKind::Other(_) => false,
        };
        by_kind
            || matches!(self.role.as_deref(), Some("button" | "link" | "tab"))
            || self.has_onclick
            || self.tabindex.is_some()
            || self.content_editable.is_some()
    }
}

// ---------------------------------------------------------------------------
// Geometry and style
// ---------------------------------------------------------------------------

/// Bounding rectangle in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

/// Computed style properties that can hide an element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementStyle {
    pub visibility_hidden: bool,
    pub display_none: bool,
    pub opacity: f64,
}

impl Default for ElementStyle {
    fn default() -> Self {
        Self {
            visibility_hidden: false,
            display_none: false,
            opacity: 1.0,
        }
    }
}

/// A clickable element offered for hinting, in document order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HintCandidate {
    pub element: ElementId,
    pub rect: Rect,
    #[serde(default)]
    pub style: ElementStyle,
}

impl HintCandidate {
    #[must_use]
    pub fn new(element: ElementId, rect: Rect) -> Self {
        Self {
            element,
            rect,
            style: ElementStyle::default(),
        }
    }

    #[must_use]
    pub fn with_style(mut self, style: ElementStyle) -> Self {
        self.style = style;
        self
    }
}
