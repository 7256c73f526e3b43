#![forbid(unsafe_code)]

//! Interaction modes.
//!
//! [`ModeManager`] holds the single active [`Mode`] and notifies observers on
//! every real transition. [`AutoInsert`] turns focus changes into Insert and
//! Normal transitions.
//!
//! # Invariants
//!
//! 1. Exactly one mode is active; Normal is the initial mode.
//! 2. `set_mode` to the current mode is a no-op: no notification.
//! 3. Listeners run synchronously in registration order with
//!    `(new, old)`.
//! 4. A notification pass runs over a snapshot of the listener list:
//!    unsubscribing during a pass does not stop listeners already in that
//!    pass, only future passes.
//!
//! # Focus settling
//!
//! Leaving an editable field does not drop to Normal immediately. The
//! tracker arms one zero-delay timer; when it fires, the newly focused
//! element is checked and Normal is entered only if it is not editable.
//! Tabbing between two inputs therefore stays in Insert throughout.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use web_time::Duration;

use crate::element::{ElementInfo, ElementKind};
use crate::schedule::{Scheduler, TimerId, Wake};

/// The engine's key interpretation context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Normal,
    Insert,
    Hints,
    Search,
}

impl Mode {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Insert => "insert",
            Self::Hints => "hints",
            Self::Search => "search",
        }
    }

    /// What the on-page indicator shows for this mode, if anything.
    #[must_use]
    pub fn indicator(self) -> Option<ModeIndicator> {
        match self {
            Self::Insert => Some(ModeIndicator {
                text: "-- INSERT --".to_string(),
                color: "#22c55e".to_string(),
            }),
            Self::Normal | Self::Hints | Self::Search => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Mode indicator content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeIndicator {
    pub text: String,
    /// CSS color for the badge background.
    pub color: String,
}

// ---------------------------------------------------------------------------
// Mode manager
// ---------------------------------------------------------------------------

type Listener = Rc<RefCell<dyn FnMut(Mode, Mode)>>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

/// Finite-state holder for the current mode.
pub struct ModeManager {
    mode: Mode,
    registry: Rc<RefCell<Registry>>,
}

impl fmt::Debug for ModeManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModeManager")
            .field("mode", &self.mode)
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl Default for ModeManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ModeManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            mode: Mode::Normal,
            registry: Rc::new(RefCell::new(Registry::default())),
        }
    }

    #[inline]
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub fn is_normal(&self) -> bool {
        self.mode == Mode::Normal
    }

    #[must_use]
    pub fn is_insert(&self) -> bool {
        self.mode == Mode::Insert
    }

    /// Switch modes. Returns whether anything changed.
    pub fn set_mode(&mut self, new: Mode) -> bool {
        if new == self.mode {
            return false;
        }
        let old = std::mem::replace(&mut self.mode, new);
        tracing::debug!(target: "vimnav.mode", from = %old, to = %new, "mode change");

        let snapshot: Vec<Listener> = self
            .registry
            .borrow()
            .entries
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in snapshot {
            (&mut *listener.borrow_mut())(new, old);
        }
        true
    }

    /// Register a listener for `(new, old)` transitions.
    ///
    /// The listener stays registered until [`ModeSubscription::unsubscribe`]
    /// is called; dropping the handle does not remove it.
    pub fn on_mode_change(&mut self, listener: impl FnMut(Mode, Mode) + 'static) -> ModeSubscription {
        let listener: Listener = Rc::new(RefCell::new(listener));
        let mut registry = self.registry.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.entries.push((id, listener));
        ModeSubscription {
            id,
            registry: Rc::downgrade(&self.registry),
        }
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.registry.borrow().entries.len()
    }
}

/// Handle for removing a mode listener.
#[derive(Debug, Clone)]
pub struct ModeSubscription {
    id: u64,
    registry: Weak<RefCell<Registry>>,
}

impl ModeSubscription {
    /// Remove the listener. Safe to call from inside a notification and
    /// after the manager is gone.
    pub fn unsubscribe(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry
                .borrow_mut()
                .entries
                .retain(|(id, _)| *id != self.id);
        }
    }
}

// ---------------------------------------------------------------------------
// Editability
// ---------------------------------------------------------------------------

/// Input types that are controls rather than text fields.
const NON_TEXT_INPUT_TYPES: &[&str] = &[
    "checkbox", "radio", "submit", "button", "reset", "file", "image", "hidden",
];

/// Whether focusing `element` means the user is typing text.
///
/// Text-like inputs, text areas, and `contenteditable` regions whose
/// attribute is `""` or `"true"`.
#[must_use]
pub fn is_editable(element: Option<&ElementInfo>) -> bool {
    let Some(element) = element else {
        return false;
    };
    if element
        .content_editable
        .as_deref()
        .is_some_and(|value| value.is_empty() || value.eq_ignore_ascii_case("true"))
    {
        return true;
    }
    match &element.kind {
        ElementKind::TextArea => true,
        ElementKind::Input { .. } => element
            .input_type()
            .is_some_and(|ty| !NON_TEXT_INPUT_TYPES.contains(&ty.as_str())),
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Auto-insert
// ---------------------------------------------------------------------------

/// Focus tracker that proposes Insert/Normal transitions.
///
/// The tracker never touches the mode itself; it returns the mode the
/// caller should switch to.
#[derive(Debug, Default)]
pub struct AutoInsert {
    pending: Option<TimerId>,
}

impl AutoInsert {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An element gained focus.
    pub fn focus_in(&self, target: Option<&ElementInfo>, current: Mode) -> Option<Mode> {
        (current == Mode::Normal && is_editable(target)).then_some(Mode::Insert)
    }

    /// An element lost focus. Arms the settle timer if an editable element
    /// was left while in Insert; returns whether it did.
    pub fn focus_out(
        &mut self,
        target: Option<&ElementInfo>,
        current: Mode,
        sched: &mut Scheduler<Wake>,
    ) -> bool {
        if current != Mode::Insert || !is_editable(target) {
            return false;
        }
        self.cancel(sched);
        self.pending = Some(sched.set_timeout(Duration::ZERO, Wake::FocusSettle));
        true
    }

    /// The settle timer fired. `active` is the element focused now.
    pub fn settle(&mut self, id: TimerId, active: Option<&ElementInfo>, current: Mode) -> Option<Mode> {
        if self.pending != Some(id) {
            return None;
        }
        self.pending = None;
        (current == Mode::Insert && !is_editable(active)).then_some(Mode::Normal)
    }

    pub fn cancel(&mut self, sched: &mut Scheduler<Wake>) {
        if let Some(id) = self.pending.take() {
            sched.clear_timeout(id);
        }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
