#![forbid(unsafe_code)]

//! Link hint labels and the typing session that resolves them.
//!
//! # Label allocation
//!
//! With `n` elements and an alphabet of `k` characters:
//!
//! - `n <= k`: the first `n` alphabet characters, in order.
//! - `n > k`: two-character labels in row-major order (`aa ab ba bb` for
//!   `ab`), truncated to `n`. Past `k * k` elements the list stops short and
//!   the excess elements get no hint.
//!
//! Labels pair positionally with the elements that pass [`is_visible`];
//! invisible elements are dropped before labels are assigned.
//!
//! # Matching
//!
//! Typed keys are lowercased and appended to the typed prefix. A label equal
//! to the prefix activates its element. If no label starts with the prefix
//! the session cancels. Escape cancels at any point.

use ahash::AHashMap;
use serde::Serialize;

use crate::element::{ElementId, HintCandidate};
use crate::event::Key;
use crate::host::ViewportMetrics;

/// Generate `count` labels from `alphabet`.
#[must_use]
pub fn generate_labels(count: usize, alphabet: &str) -> Vec<String> {
    let chars: Vec<char> = alphabet.chars().collect();
    if count <= chars.len() {
        return chars.iter().take(count).map(char::to_string).collect();
    }

    let mut labels = Vec::with_capacity(count.min(chars.len() * chars.len()));
    'outer: for first in &chars {
        for second in &chars {
            if labels.len() == count {
                break 'outer;
            }
            labels.push(format!("{first}{second}"));
        }
    }
    labels
}

/// Whether a candidate is worth a hint: non-zero size, intersecting the
/// viewport, and not hidden by style.
#[must_use]
pub fn is_visible(candidate: &HintCandidate, viewport: &ViewportMetrics) -> bool {
    let rect = &candidate.rect;
    if rect.width == 0.0 && rect.height == 0.0 {
        return false;
    }
    if rect.bottom() < 0.0 || rect.top > viewport.height {
        return false;
    }
    if rect.right() < 0.0 || rect.left > viewport.width {
        return false;
    }
    let style = &candidate.style;
    !(style.visibility_hidden || style.display_none || style.opacity == 0.0)
}

/// A label assigned to an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HintLabel {
    pub element: ElementId,
    pub label: String,
}

/// Display descriptor handed to the overlay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HintView {
    pub element: ElementId,
    pub label: String,
    /// Anchor point, clamped to the viewport origin.
    pub left: f64,
    pub top: f64,
    /// Leading characters of `label` already typed.
    pub typed_len: usize,
    /// Still reachable from the typed prefix; hidden otherwise.
    pub matches: bool,
}

/// Result of one key in a hint session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HintOutcome {
    /// Prefix still matches one or more labels.
    Pending,
    /// A label was typed in full; the session is over.
    Activate { element: ElementId, new_tab: bool },
    /// Escape, an unmatched prefix, or a non-character key; the session is
    /// over.
    Cancelled,
}

/// One link-hint activation, from labels shown to element chosen.
#[derive(Debug, Clone)]
pub struct HintSession {
    labels: Vec<HintLabel>,
    anchors: Vec<(f64, f64)>,
    /// Lowercased label -> index of the first label with that text.
    index: AHashMap<String, usize>,
    typed: String,
    open_in_new_tab: bool,
    active: bool,
}

impl HintSession {
    /// Filter `candidates` by visibility and assign labels in order.
    #[must_use]
    pub fn start(
        candidates: &[HintCandidate],
        viewport: &ViewportMetrics,
        alphabet: &str,
        open_in_new_tab: bool,
    ) -> Self {
        let visible: Vec<&HintCandidate> = candidates
            .iter()
            .filter(|candidate| is_visible(candidate, viewport))
            .collect();
        let names = generate_labels(visible.len(), alphabet);

        let mut labels = Vec::with_capacity(names.len());
        let mut anchors = Vec::with_capacity(names.len());
        let mut index = AHashMap::with_capacity(names.len());
        for (i, (candidate, label)) in visible.iter().zip(names).enumerate() {
            index.entry(fold(&label)).or_insert(i);
            anchors.push((candidate.rect.left.max(0.0), candidate.rect.top.max(0.0)));
            labels.push(HintLabel {
                element: candidate.element,
                label,
            });
        }

        if labels.len() < visible.len() {
            tracing::debug!(
                target: "vimnav.hints",
                visible = visible.len(),
                labeled = labels.len(),
                "more elements than two-character labels; excess left unlabeled"
            );
        }
        tracing::debug!(
            target: "vimnav.hints",
            candidates = candidates.len(),
            labeled = labels.len(),
            open_in_new_tab,
            "hint session started"
        );

        Self {
            labels,
            anchors,
            index,
            typed: String::new(),
            open_in_new_tab,
            active: true,
        }
    }

    /// Feed one key.
    pub fn handle_key(&mut self, key: Key) -> HintOutcome {
        if !self.active {
            return HintOutcome::Cancelled;
        }
        let c = match key.to_lowercase() {
            Key::Char(c) => c,
            Key::Named(_) => {
                self.cancel();
                return HintOutcome::Cancelled;
            }
        };
        self.typed.push(c);

        if let Some(&i) = self.index.get(&self.typed) {
            let element = self.labels[i].element;
            self.active = false;
            tracing::debug!(
                target: "vimnav.hints",
                label = %self.labels[i].label,
                %element,
                "hint selected"
            );
            return HintOutcome::Activate {
                element,
                new_tab: self.open_in_new_tab,
            };
        }
        if self.remaining().next().is_none() {
            tracing::debug!(target: "vimnav.hints", typed = %self.typed, "no hint matches");
            self.cancel();
            return HintOutcome::Cancelled;
        }
        HintOutcome::Pending
    }

    /// End the session without activating anything.
    pub fn cancel(&mut self) {
        self.typed.clear();
        self.active = false;
    }

    #[must_use]
    pub fn labels(&self) -> &[HintLabel] {
        &self.labels
    }

    #[must_use]
    pub fn typed(&self) -> &str {
        &self.typed
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn open_in_new_tab(&self) -> bool {
        self.open_in_new_tab
    }

    /// Labels still reachable from the typed prefix.
    pub fn remaining(&self) -> impl Iterator<Item = &HintLabel> {
        self.labels
            .iter()
            .filter(|hint| fold(&hint.label).starts_with(&self.typed))
    }

    /// Current overlay state.
    #[must_use]
    pub fn views(&self) -> Vec<HintView> {
        self.labels
            .iter()
            .zip(&self.anchors)
            .map(|(hint, &(left, top))| {
                let matches = fold(&hint.label).starts_with(&self.typed);
                HintView {
                    element: hint.element,
                    label: hint.label.clone(),
                    left,
                    top,
                    typed_len: if matches { self.typed.chars().count() } else { 0 },
                    matches,
                }
            })
            .collect()
    }
}

/// Lowercase a label the way typed keys are lowercased.
fn fold(label: &str) -> String {
    label
        .chars()
        .map(|c| match Key::Char(c).to_lowercase() {
            Key::Char(lower) => lower,
            Key::Named(_) => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ElementStyle, Rect};
    use crate::event::NamedKey;

    fn viewport() -> ViewportMetrics {
        ViewportMetrics {
            width: 1000.0,
            height: 800.0,
            ..Default::default()
        }
    }

    fn candidate(n: u64, top: f64) -> HintCandidate {
        HintCandidate::new(ElementId::new(n), Rect::new(10.0, top, 100.0, 20.0))
    }

    fn candidates(count: u64) -> Vec<HintCandidate> {
        (0..count).map(|n| candidate(n, 10.0 + n as f64)).collect()
    }

    #[test]
    fn labels_fit_alphabet() {
        assert_eq!(generate_labels(3, "abcd"), ["a", "b", "c"]);
        assert_eq!(generate_labels(4, "abcd"), ["a", "b", "c", "d"]);
        assert_eq!(generate_labels(3, "sad"), ["s", "a", "d"]);
        assert!(generate_labels(0, "ab").is_empty());
    }

    #[test]
    fn labels_go_two_wide_and_truncate() {
        assert_eq!(generate_labels(10, "ab"), ["aa", "ab", "ba", "bb"]);
        assert_eq!(generate_labels(3, "ab"), ["aa", "ab", "ba"]);
        assert_eq!(generate_labels(5, "abc")[4], "bb");
    }

    #[test]
    fn visibility_predicate() {
        let vp = viewport();
        assert!(is_visible(&candidate(1, 10.0), &vp));

        let zero = HintCandidate::new(ElementId::new(1), Rect::new(10.0, 10.0, 0.0, 0.0));
        assert!(!is_visible(&zero, &vp));
        let thin = HintCandidate::new(ElementId::new(1), Rect::new(10.0, 10.0, 0.0, 20.0));
        assert!(is_visible(&thin, &vp));

        assert!(!is_visible(&candidate(1, -50.0), &vp));
        assert!(!is_visible(&candidate(1, 801.0), &vp));
        let right = HintCandidate::new(ElementId::new(1), Rect::new(1001.0, 10.0, 5.0, 5.0));
        assert!(!is_visible(&right, &vp));

        let hidden = |style| candidate(1, 10.0).with_style(style);
        assert!(!is_visible(
            &hidden(ElementStyle {
                visibility_hidden: true,
                ..Default::default()
            }),
            &vp
        ));
        assert!(!is_visible(
            &hidden(ElementStyle {
                display_none: true,
                ..Default::default()
            }),
            &vp
        ));
        assert!(!is_visible(
            &hidden(ElementStyle {
                opacity: 0.0,
                ..Default::default()
            }),
            &vp
        ));
    }

    #[test]
    fn invisible_elements_are_dropped_before_labeling() {
        let cands = vec![candidate(1, 10.0), candidate(2, -500.0), candidate(3, 30.0)];
        let session = HintSession::start(&cands, &viewport(), "sadf", false);
        let labels: Vec<_> = session
            .labels()
            .iter()
            .map(|h| (h.element.raw(), h.label.as_str()))
            .collect();
        assert_eq!(labels, [(1, "s"), (3, "a")]);
    }

    #[test]
    fn ten_elements_two_letter_alphabet() {
        let mut session = HintSession::start(&candidates(10), &viewport(), "ab", false);
        assert_eq!(session.labels().len(), 4);

        assert_eq!(session.handle_key(Key::Char('b')), HintOutcome::Pending);
        let remaining: Vec<_> = session.remaining().map(|h| h.label.as_str()).collect();
        assert_eq!(remaining, ["ba", "bb"]);

        assert_eq!(
            session.handle_key(Key::Char('b')),
            HintOutcome::Activate {
                element: ElementId::new(3),
                new_tab: false
            }
        );
        assert!(!session.is_active());
    }

    #[test]
    fn typed_input_is_lowercased() {
        let mut session = HintSession::start(&candidates(3), &viewport(), "sad", true);
        assert_eq!(
            session.handle_key(Key::Char('A')),
            HintOutcome::Activate {
                element: ElementId::new(1),
                new_tab: true
            }
        );
    }

    #[test]
    fn uppercase_alphabet_still_matches() {
        let mut session = HintSession::start(&candidates(2), &viewport(), "XY", false);
        assert_eq!(
            session.handle_key(Key::Char('y')),
            HintOutcome::Activate {
                element: ElementId::new(1),
                new_tab: false
            }
        );
    }

    #[test]
    fn labels_with_multi_char_lowercase_are_typeable() {
        // 'İ' lowercases to two chars; typed keys keep it as is.
        let mut session = HintSession::start(&candidates(2), &viewport(), "İx", false);
        assert_eq!(session.remaining().count(), 2);
        assert_eq!(
            session.handle_key(Key::Char('İ')),
            HintOutcome::Activate {
                element: ElementId::new(0),
                new_tab: false
            }
        );
    }

    #[test]
    fn unmatched_prefix_cancels() {
        let mut session = HintSession::start(&candidates(10), &viewport(), "ab", false);
        assert_eq!(session.handle_key(Key::Char('z')), HintOutcome::Cancelled);
        assert!(!session.is_active());
        assert_eq!(session.typed(), "");
    }

    #[test]
    fn escape_and_named_keys_cancel() {
        let mut session = HintSession::start(&candidates(10), &viewport(), "ab", false);
        session.handle_key(Key::Char('a'));
        assert_eq!(
            session.handle_key(Key::Named(NamedKey::Escape)),
            HintOutcome::Cancelled
        );
        assert_eq!(session.typed(), "");

        let mut session = HintSession::start(&candidates(10), &viewport(), "ab", false);
        assert_eq!(
            session.handle_key(Key::Named(NamedKey::ArrowDown)),
            HintOutcome::Cancelled
        );
    }

    #[test]
    fn views_track_typed_prefix() {
        let mut cands = candidates(5);
        cands[0].rect = Rect::new(-20.0, -5.0, 100.0, 20.0);
        let mut session = HintSession::start(&cands, &viewport(), "ab", false);
        let views = session.views();
        assert_eq!(views.len(), 4);
        assert_eq!((views[0].left, views[0].top), (0.0, 0.0));
        assert!(views.iter().all(|v| v.matches && v.typed_len == 0));

        session.handle_key(Key::Char('a'));
        let views = session.views();
        let shown: Vec<_> = views
            .iter()
            .filter(|v| v.matches)
            .map(|v| (v.label.as_str(), v.typed_len))
            .collect();
        assert_eq!(shown, [("aa", 1), ("ab", 1)]);
    }

    #[test]
    fn excess_elements_get_no_label() {
        let session = HintSession::start(&candidates(6), &viewport(), "ab", false);
        assert_eq!(session.labels().len(), 4);
        assert_eq!(session.labels()[3].element, ElementId::new(3));
    }
}
