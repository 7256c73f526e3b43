#![forbid(unsafe_code)]

//! Actions and the key mapping table.
//!
//! An [`Action`] names a user-invokable behavior independent of the key that
//! triggers it. [`KeyMappings`] is the ordered action → sequence table the
//! resolver is built from; its iteration order is [`Action::ALL`] order, which
//! is also the tie-break order for equal-length sequences.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::notation::KeySequence;

/// A symbolic, user-invokable behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    ScrollDown,
    ScrollUp,
    ScrollLeft,
    ScrollRight,
    HalfPageDown,
    HalfPageUp,
    GoToTop,
    GoToBottom,
    LinkHints,
    LinkHintsNewTab,
    FocusInput,
    HistoryBack,
    HistoryForward,
    PrevTab,
    NextTab,
    Reload,
    CloseTab,
    RestoreTab,
    NewTab,
    DuplicateTab,
    Search,
    SearchNext,
    SearchPrev,
    ClearSearch,
    InsertMode,
}

impl Action {
    /// Every action, in table order.
    pub const ALL: [Self; 25] = [
        Self::ScrollDown,
        Self::ScrollUp,
        Self::ScrollLeft,
        Self::ScrollRight,
        Self::HalfPageDown,
        Self::HalfPageUp,
        Self::GoToTop,
        Self::GoToBottom,
        Self::LinkHints,
        Self::LinkHintsNewTab,
        Self::FocusInput,
        Self::HistoryBack,
        Self::HistoryForward,
        Self::PrevTab,
        Self::NextTab,
        Self::Reload,
        Self::CloseTab,
        Self::RestoreTab,
        Self::NewTab,
        Self::DuplicateTab,
        Self::Search,
        Self::SearchNext,
        Self::SearchPrev,
        Self::ClearSearch,
        Self::InsertMode,
    ];

    /// Wire name (camelCase).
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ScrollDown => "scrollDown",
            Self::ScrollUp => "scrollUp",
            Self::ScrollLeft => "scrollLeft",
            Self::ScrollRight => "scrollRight",
            Self::HalfPageDown => "halfPageDown",
            Self::HalfPageUp => "halfPageUp",
            Self::GoToTop => "goToTop",
            Self::GoToBottom => "goToBottom",
            Self::LinkHints => "linkHints",
            Self::LinkHintsNewTab => "linkHintsNewTab",
            Self::FocusInput => "focusInput",
            Self::HistoryBack => "historyBack",
            Self::HistoryForward => "historyForward",
            Self::PrevTab => "prevTab",
            Self::NextTab => "nextTab",
            Self::Reload => "reload",
            Self::CloseTab => "closeTab",
            Self::RestoreTab => "restoreTab",
            Self::NewTab => "newTab",
            Self::DuplicateTab => "duplicateTab",
            Self::Search => "search",
            Self::SearchNext => "searchNext",
            Self::SearchPrev => "searchPrev",
            Self::ClearSearch => "clearSearch",
            Self::InsertMode => "insertMode",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.name() == name)
    }

    /// The stock binding for this action.
    #[must_use]
    pub const fn default_binding(self) -> &'static str {
        match self {
            Self::ScrollDown => "j",
            Self::ScrollUp => "k",
            Self::ScrollLeft => "h",
            Self::ScrollRight => "l",
            Self::HalfPageDown => "d",
            Self::HalfPageUp => "u",
            Self::GoToTop => "gg",
            Self::GoToBottom => "G",
            Self::LinkHints => "f",
            Self::LinkHintsNewTab => "F",
            Self::FocusInput => "gi",
            Self::HistoryBack => "H",
            Self::HistoryForward => "L",
            Self::PrevTab => "J",
            Self::NextTab => "K",
            Self::Reload => "r",
            Self::CloseTab => "x",
            Self::RestoreTab => "X",
            Self::NewTab => "t",
            Self::DuplicateTab => "T",
            Self::Search => "/",
            Self::SearchNext => "n",
            Self::SearchPrev => "N",
            Self::ClearSearch => "Escape",
            Self::InsertMode => "i",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// KeyMappings
// ---------------------------------------------------------------------------

/// Ordered action → key sequence table.
///
/// Each action appears at most once. Sequences may be empty (unbound) or
/// duplicated across actions; the resolver tolerates both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMappings {
    entries: Vec<(Action, KeySequence)>,
}

impl Default for KeyMappings {
    fn default() -> Self {
        Self {
            entries: Action::ALL
                .into_iter()
                .map(|action| (action, KeySequence::parse(action.default_binding())))
                .collect(),
        }
    }
}

impl KeyMappings {
    /// A table with no bindings.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Build from `(action, notation)` pairs; later pairs override earlier
    /// ones for the same action.
    #[must_use]
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (Action, &'a str)>) -> Self {
        let mut mappings = Self::empty();
        for (action, notation) in pairs {
            mappings.set(action, KeySequence::parse(notation));
        }
        mappings
    }

    /// Bind `action`, replacing any existing binding in place.
    pub fn set(&mut self, action: Action, sequence: KeySequence) {
        match self.entries.iter_mut().find(|(a, _)| *a == action) {
            Some(entry) => entry.1 = sequence,
            None => self.entries.push((action, sequence)),
        }
    }

    #[must_use]
    pub fn get(&self, action: Action) -> Option<&KeySequence> {
        self.entries
            .iter()
            .find(|(a, _)| *a == action)
            .map(|(_, seq)| seq)
    }

    /// Drop the bindings of every action in `disabled`.
    #[must_use]
    pub fn without(mut self, disabled: &[Action]) -> Self {
        self.entries.retain(|(action, _)| !disabled.contains(action));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (Action, &KeySequence)> {
        self.entries.iter().map(|(action, seq)| (*action, seq))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for KeyMappings {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (action, seq) in &self.entries {
            map.serialize_entry(action.name(), seq)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for KeyMappings {
    /// Strict form: a map of action names to notation strings. Unknown
    /// action names are skipped. Lenient merging over the defaults lives in
    /// `Settings::normalize`.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MappingsVisitor;

        impl<'de> Visitor<'de> for MappingsVisitor {
            type Value = KeyMappings;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of action names to key sequences")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut mappings = KeyMappings::empty();
                while let Some((name, seq)) = access.next_entry::<String, KeySequence>()? {
                    if let Some(action) = Action::from_name(&name) {
                        mappings.set(action, seq);
                    }
                }
                Ok(mappings)
            }
        }

        deserializer.deserialize_map(MappingsVisitor)
    }
}
