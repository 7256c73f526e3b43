#![forbid(unsafe_code)]

//! Deterministic in-memory page implementing every host capability.
//!
//! [`FakePage`] keeps a flat list of elements (page coordinates, document
//! order), a scroll position, and a blob of searchable text. Every host
//! call is recorded as a [`HostCall`] in arrival order so tests can assert
//! on the exact effect stream.
//!
//! # Focus emulation
//!
//! Focus changes the engine causes (`focus`, `blur`, clicking an editable
//! element) are queued as [`FocusEvent`]s. The driver delivers them back to
//! the engine after each call, the way a browser fires `focusin`/`focusout`
//! after the fact.
//!
//! # Failure injection
//!
//! `scroll`, `click`, `focus`, and `send` can be made to fail with a chosen
//! [`HostError`] to exercise the engine's discard paths.

use serde::Serialize;
use vimnav_core::element::{ElementId, ElementInfo, ElementStyle, HintCandidate, Rect};
use vimnav_core::error::HostError;
use vimnav_core::hints::HintView;
use vimnav_core::host::{
    Browser, Document, FindOptions, Messenger, Overlay, PageFinder, ScrollBehavior, TabCommand,
    Viewport, ViewportMetrics,
};
use vimnav_core::mode::{ModeIndicator, is_editable};

/// One recorded host call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum HostCall {
    ScrollBy { dx: f64, dy: f64, behavior: ScrollBehavior },
    ScrollTo { x: f64, y: f64, behavior: ScrollBehavior },
    Find { query: String, options: FindOptions, found: bool },
    ClearSelection,
    Focus { element: ElementId },
    Blur { element: ElementId },
    Click { element: ElementId },
    HistoryBack,
    HistoryForward,
    Reload,
    Send { command: TabCommand },
    ShowHints { hints: Vec<HintView> },
    UpdateHints { hints: Vec<HintView> },
    HideHints,
    ShowSearchBar,
    HideSearchBar,
    SelectionHighlight { on: bool },
    ModeIndicator { indicator: Option<ModeIndicator> },
}

/// A focus change the browser would report back to the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "element", rename_all = "snake_case")]
pub enum FocusEvent {
    In(ElementId),
    Out(ElementId),
}

/// Capability that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Scroll,
    Click,
    Focus,
    Send,
}

#[derive(Debug, Clone)]
struct PageElement {
    info: ElementInfo,
    /// Page coordinates.
    rect: Rect,
    style: ElementStyle,
}

/// Recording fake host.
#[derive(Debug, Clone)]
pub struct FakePage {
    metrics: ViewportMetrics,
    elements: Vec<PageElement>,
    text: String,
    active: Option<ElementId>,
    calls: Vec<HostCall>,
    focus_events: Vec<FocusEvent>,
    failures: Vec<(Capability, HostError)>,
}

impl Default for FakePage {
    fn default() -> Self {
        Self::new(ViewportMetrics {
            width: 1280.0,
            height: 720.0,
            scroll_x: 0.0,
            scroll_y: 0.0,
            scroll_height: 5000.0,
        })
    }
}

impl FakePage {
    #[must_use]
    pub fn new(metrics: ViewportMetrics) -> Self {
        Self {
            metrics,
            elements: Vec::new(),
            text: String::new(),
            active: None,
            calls: Vec::new(),
            focus_events: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// A 1280x720 page with `links` stacked anchors, a search field, a
    /// textarea, a checkbox, and a hidden button.
    ///
    /// Ids: anchors are `1..=links`; then the text input, the textarea, the
    /// checkbox, and the hidden button follow in that order.
    #[must_use]
    pub fn demo(links: usize) -> Self {
        let mut page = Self::default().with_text(
            "Vimnav demo page. The quick brown fox jumps over the lazy dog. \
             Keyboard navigation for the web.",
        );
        let mut next = 1u64;
        for n in 0..links {
            let id = ElementId::new(next);
            next += 1;
            page = page.with_element(
                ElementInfo::anchor(id, &format!("https://example.com/page/{}", n + 1)),
                Rect::new(40.0, 40.0 + n as f64 * 28.0, 220.0, 20.0),
            );
        }
        let below = 60.0 + links as f64 * 28.0;
        let input = ElementId::new(next);
        let textarea = ElementId::new(next + 1);
        let checkbox = ElementId::new(next + 2);
        let hidden = ElementId::new(next + 3);
        page.with_element(ElementInfo::input(input, "search"), Rect::new(40.0, below, 300.0, 24.0))
            .with_element(
                ElementInfo::new(textarea, vimnav_core::ElementKind::TextArea),
                Rect::new(40.0, below + 40.0, 300.0, 80.0),
            )
            .with_element(
                ElementInfo::input(checkbox, "checkbox"),
                Rect::new(360.0, below, 16.0, 16.0),
            )
            .with_styled_element(
                ElementInfo::new(hidden, vimnav_core::ElementKind::Button),
                Rect::new(400.0, below, 80.0, 24.0),
                ElementStyle {
                    display_none: true,
                    ..ElementStyle::default()
                },
            )
    }

    // -----------------------------------------------------------------------
    // Builders
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn with_element(self, info: ElementInfo, rect: Rect) -> Self {
        self.with_styled_element(info, rect, ElementStyle::default())
    }

    #[must_use]
    pub fn with_styled_element(mut self, info: ElementInfo, rect: Rect, style: ElementStyle) -> Self {
        self.elements.push(PageElement { info, rect, style });
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Make every call to `capability` fail with `error`.
    #[must_use]
    pub fn with_failure(mut self, capability: Capability, error: HostError) -> Self {
        self.set_failure(capability, Some(error));
        self
    }

    pub fn set_failure(&mut self, capability: Capability, error: Option<HostError>) {
        self.failures.retain(|(c, _)| *c != capability);
        if let Some(error) = error {
            self.failures.push((capability, error));
        }
    }

    fn failure(&self, capability: Capability) -> Result<(), HostError> {
        match self.failures.iter().find(|(c, _)| *c == capability) {
            Some((_, error)) => Err(error.clone()),
            None => Ok(()),
        }
    }

    // -----------------------------------------------------------------------
    // Page mutation
    // -----------------------------------------------------------------------

    /// Drop an element, as a page script might. Returns whether it existed.
    pub fn remove_element(&mut self, id: ElementId) -> bool {
        let before = self.elements.len();
        self.elements.retain(|e| e.info.id != id);
        if self.active == Some(id) {
            self.active = None;
        }
        self.elements.len() != before
    }

    /// Move focus without going through the engine (a mouse click, say).
    pub fn set_active(&mut self, id: Option<ElementId>) {
        self.active = id;
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn calls(&self) -> &[HostCall] {
        &self.calls
    }

    /// Take the recorded calls, leaving the log empty.
    pub fn take_calls(&mut self) -> Vec<HostCall> {
        std::mem::take(&mut self.calls)
    }

    /// Take queued focus changes.
    pub fn take_focus_events(&mut self) -> Vec<FocusEvent> {
        std::mem::take(&mut self.focus_events)
    }

    #[must_use]
    pub fn scroll_position(&self) -> (f64, f64) {
        (self.metrics.scroll_x, self.metrics.scroll_y)
    }

    #[must_use]
    pub fn active(&self) -> Option<ElementId> {
        self.active
    }

    fn find_element(&self, id: ElementId) -> Option<&PageElement> {
        self.elements.iter().find(|e| e.info.id == id)
    }

    fn move_focus(&mut self, id: ElementId) {
        if self.active == Some(id) {
            return;
        }
        if let Some(previous) = self.active.take() {
            self.focus_events.push(FocusEvent::Out(previous));
        }
        self.active = Some(id);
        self.focus_events.push(FocusEvent::In(id));
    }

    fn set_scroll(&mut self, x: f64, y: f64) {
        self.metrics.scroll_x = x.max(0.0);
        self.metrics.scroll_y = y.clamp(0.0, self.metrics.max_scroll_y());
    }
}

// ---------------------------------------------------------------------------
// Host capabilities
// ---------------------------------------------------------------------------

impl Viewport for FakePage {
    fn metrics(&self) -> ViewportMetrics {
        self.metrics
    }

    fn scroll_by(&mut self, dx: f64, dy: f64, behavior: ScrollBehavior) -> Result<(), HostError> {
        self.failure(Capability::Scroll)?;
        self.calls.push(HostCall::ScrollBy { dx, dy, behavior });
        self.set_scroll(self.metrics.scroll_x + dx, self.metrics.scroll_y + dy);
        Ok(())
    }

    fn scroll_to(&mut self, x: f64, y: f64, behavior: ScrollBehavior) -> Result<(), HostError> {
        self.failure(Capability::Scroll)?;
        self.calls.push(HostCall::ScrollTo { x, y, behavior });
        self.set_scroll(x, y);
        Ok(())
    }
}

impl PageFinder for FakePage {
    fn find(&mut self, query: &str, options: FindOptions) -> bool {
        let found = if options.case_sensitive {
            self.text.contains(query)
        } else {
            self.text.to_lowercase().contains(&query.to_lowercase())
        };
        self.calls.push(HostCall::Find {
            query: query.to_string(),
            options,
            found,
        });
        found
    }

    fn clear_selection(&mut self) {
        self.calls.push(HostCall::ClearSelection);
    }
}

impl Document for FakePage {
    fn element(&self, id: ElementId) -> Option<ElementInfo> {
        self.find_element(id).map(|e| e.info.clone())
    }

    fn active_element(&self) -> Option<ElementId> {
        self.active
    }

    fn hint_candidates(&self) -> Vec<HintCandidate> {
        let (sx, sy) = self.scroll_position();
        self.elements
            .iter()
            .filter(|e| e.info.is_clickable())
            .map(|e| {
                let rect = Rect::new(e.rect.left - sx, e.rect.top - sy, e.rect.width, e.rect.height);
                HintCandidate::new(e.info.id, rect).with_style(e.style)
            })
            .collect()
    }

    fn first_text_input(&self) -> Option<ElementId> {
        self.elements
            .iter()
            .find(|e| !e.style.display_none && is_editable(Some(&e.info)))
            .map(|e| e.info.id)
    }

    fn focus(&mut self, id: ElementId) -> Result<(), HostError> {
        self.failure(Capability::Focus)?;
        if self.find_element(id).is_none() {
            return Err(HostError::ElementGone(id));
        }
        self.calls.push(HostCall::Focus { element: id });
        self.move_focus(id);
        Ok(())
    }

    fn blur(&mut self, id: ElementId) {
        self.calls.push(HostCall::Blur { element: id });
        if self.active == Some(id) {
            self.active = None;
            self.focus_events.push(FocusEvent::Out(id));
        }
    }

    fn click(&mut self, id: ElementId) -> Result<(), HostError> {
        self.failure(Capability::Click)?;
        let Some(element) = self.find_element(id) else {
            return Err(HostError::ElementGone(id));
        };
        let editable = is_editable(Some(&element.info));
        self.calls.push(HostCall::Click { element: id });
        if editable {
            self.move_focus(id);
        }
        Ok(())
    }
}

impl Browser for FakePage {
    fn history_back(&mut self) {
        self.calls.push(HostCall::HistoryBack);
    }

    fn history_forward(&mut self) {
        self.calls.push(HostCall::HistoryForward);
    }

    fn reload(&mut self) {
        self.calls.push(HostCall::Reload);
    }
}

impl Messenger for FakePage {
    fn send(&mut self, command: TabCommand) -> Result<(), HostError> {
        self.failure(Capability::Send)?;
        self.calls.push(HostCall::Send { command });
        Ok(())
    }
}

impl Overlay for FakePage {
    fn show_hints(&mut self, hints: &[HintView]) {
        self.calls.push(HostCall::ShowHints {
            hints: hints.to_vec(),
        });
    }

    fn update_hints(&mut self, hints: &[HintView]) {
        self.calls.push(HostCall::UpdateHints {
            hints: hints.to_vec(),
        });
    }

    fn hide_hints(&mut self) {
        self.calls.push(HostCall::HideHints);
    }

    fn show_search_bar(&mut self) {
        self.calls.push(HostCall::ShowSearchBar);
    }

    fn hide_search_bar(&mut self) {
        self.calls.push(HostCall::HideSearchBar);
    }

    fn set_selection_highlight(&mut self, on: bool) {
        self.calls.push(HostCall::SelectionHighlight { on });
    }

    fn set_mode_indicator(&mut self, indicator: Option<&ModeIndicator>) {
        self.calls.push(HostCall::ModeIndicator {
            indicator: indicator.cloned(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_layout() {
        let page = FakePage::demo(3);
        let candidates = page.hint_candidates();
        // 3 anchors + input + textarea + checkbox + hidden button.
        assert_eq!(candidates.len(), 7);
        assert!(candidates[6].style.display_none);
        assert_eq!(page.first_text_input(), Some(ElementId::new(4)));
    }

    #[test]
    fn scrolling_clamps_and_moves_candidates() {
        let mut page = FakePage::demo(1);
        page.scroll_by(0.0, -100.0, ScrollBehavior::Instant).unwrap();
        assert_eq!(page.scroll_position(), (0.0, 0.0));

        page.scroll_by(0.0, 30.0, ScrollBehavior::Smooth).unwrap();
        assert_eq!(page.hint_candidates()[0].rect.top, 10.0);

        page.scroll_to(0.0, 1e9, ScrollBehavior::Instant).unwrap();
        assert_eq!(page.scroll_position().1, 5000.0 - 720.0);
        assert_eq!(page.calls().len(), 3);
    }

    #[test]
    fn injected_failures_skip_recording() {
        let mut page = FakePage::demo(1).with_failure(Capability::Scroll, HostError::Unsupported("scroll"));
        assert_eq!(
            page.scroll_by(0.0, 10.0, ScrollBehavior::Instant),
            Err(HostError::Unsupported("scroll"))
        );
        assert!(page.calls().is_empty());

        page.set_failure(Capability::Scroll, None);
        assert!(page.scroll_by(0.0, 10.0, ScrollBehavior::Instant).is_ok());
    }

    #[test]
    fn focus_changes_are_queued() {
        let mut page = FakePage::demo(1);
        let input = ElementId::new(2);
        let textarea = ElementId::new(3);
        page.focus(input).unwrap();
        page.click(textarea).unwrap();
        page.blur(textarea);
        assert_eq!(
            page.take_focus_events(),
            [
                FocusEvent::In(input),
                FocusEvent::Out(input),
                FocusEvent::In(textarea),
                FocusEvent::Out(textarea),
            ]
        );
        assert_eq!(page.active(), None);
    }

    #[test]
    fn removed_elements_are_gone() {
        let mut page = FakePage::demo(2);
        let link = ElementId::new(1);
        assert!(page.remove_element(link));
        assert!(page.element(link).is_none());
        assert_eq!(page.click(link), Err(HostError::ElementGone(link)));
        assert!(!page.remove_element(link));
    }

    #[test]
    fn find_reports_result() {
        let mut page = FakePage::demo(0);
        assert!(page.find("QUICK brown", FindOptions::direction(true)));
        assert!(!page.find("zebra", FindOptions::direction(false)));
        assert!(matches!(
            page.calls()[1],
            HostCall::Find { found: false, .. }
        ));
    }

    #[test]
    fn calls_serialize_with_tag() {
        let call = HostCall::Send {
            command: TabCommand::NewWithUrl {
                url: "https://example.com/".into(),
            },
        };
        let json = serde_json::to_string(&call).unwrap();
        assert_eq!(
            json,
            r#"{"call":"send","command":{"type":"TAB_NEW_URL","url":"https://example.com/"}}"#
        );
    }
}
