#![forbid(unsafe_code)]

//! Multi-key sequence resolution.
//!
//! [`KeySequenceResolver`] turns a stream of key symbols into actions. Each
//! key is appended to a pending buffer which is then classified against the
//! binding table, longest sequences first.
//!
//! # State Machine
//!
//! ```text
//!          key: exact / none
//!      ┌──────────────────────────┐
//!      ▼                          │
//!  ┌────────┐   key: prefix   ┌─────────┐ ◀──┐
//!  │  Idle  │────────────────▶│ Pending │    │ key: prefix
//!  └────────┘                 └─────────┘ ───┘
//!      ▲     timeout / reset       │
//!      └───────────────────────────┘
//! ```
//!
//! # Failed sequences
//!
//! When the buffer neither matches nor prefixes any binding and the fed key
//! is a single character, the resolver retries with that key alone. With
//! `gg` and `j` bound, `g` then `j` yields `Prefix` then `Exact(j)`. Named
//! keys never retry, so `g` then `ArrowDown` just resets.
//!
//! # Invariants
//!
//! 1. After `Exact` or `None` the buffer is empty and no timeout is pending.
//! 2. After `Prefix` exactly one timeout is pending.
//! 3. The pending timeout is canceled whenever the buffer is reset or
//!    extended.
//! 4. Empty sequences are unbound and never match.
//!
//! # Example
//!
//! ```
//! use web_time::Instant;
//! use vimnav_core::action::{Action, KeyMappings};
//! use vimnav_core::event::Key;
//! use vimnav_core::keybinding::{KeySequenceResolver, Resolution};
//! use vimnav_core::schedule::Scheduler;
//!
//! let t = Instant::now();
//! let mut sched = Scheduler::new(t);
//! let mappings = KeyMappings::from_pairs([(Action::GoToTop, "gg"), (Action::ScrollDown, "j")]);
//! let mut resolver = KeySequenceResolver::new(&mappings);
//!
//! assert_eq!(resolver.feed(Key::Char('g'), &mut sched), Resolution::Prefix);
//! assert_eq!(resolver.feed(Key::Char('j'), &mut sched), Resolution::Exact(Action::ScrollDown));
//! assert!(resolver.buffer().is_empty());
//! ```

use web_time::Duration;

use crate::action::{Action, KeyMappings};
use crate::event::Key;
use crate::notation::KeySequence;
use crate::schedule::{Scheduler, TimerId, Wake};

/// Window after a prefix match during which further keys continue it.
pub const SEQUENCE_TIMEOUT: Duration = Duration::from_millis(500);

/// Classification of the pending buffer after one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The buffer completed a binding.
    Exact(Action),
    /// The buffer is a strict prefix of at least one binding.
    Prefix,
    /// Nothing is bound to or extends the buffer.
    None,
}

impl Resolution {
    /// `Exact` and `Prefix` both swallow the key.
    #[must_use]
    pub const fn is_consumed(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Resolves key streams against a binding table.
#[derive(Debug, Clone)]
pub struct KeySequenceResolver {
    /// Non-empty sequences, longest first, ties in mapping order.
    bindings: Vec<(KeySequence, Action)>,
    buffer: Vec<Key>,
    timer: Option<TimerId>,
}

impl KeySequenceResolver {
    #[must_use]
    pub fn new(mappings: &KeyMappings) -> Self {
        Self {
            bindings: Self::table(mappings),
            buffer: Vec::new(),
            timer: None,
        }
    }

    fn table(mappings: &KeyMappings) -> Vec<(KeySequence, Action)> {
        let mut bindings: Vec<(KeySequence, Action)> = mappings
            .iter()
            .filter(|(_, seq)| !seq.is_empty())
            .map(|(action, seq)| (seq.clone(), action))
            .collect();
        // Stable: equal lengths keep mapping order.
        bindings.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        bindings
    }

    /// Replace the table and drop all pending state.
    pub fn set_mappings(&mut self, mappings: &KeyMappings, sched: &mut Scheduler<Wake>) {
        self.reset(sched);
        self.bindings = Self::table(mappings);
        tracing::debug!(
            target: "vimnav.keys",
            bindings = self.bindings.len(),
            "key mappings replaced"
        );
    }

    /// Consume one key and classify the buffer.
    pub fn feed(&mut self, key: Key, sched: &mut Scheduler<Wake>) -> Resolution {
        self.cancel_timer(sched);
        self.buffer.push(key);

        if let Some(action) = self.exact(&self.buffer) {
            self.buffer.clear();
            tracing::trace!(target: "vimnav.keys", %key, %action, "exact");
            return Resolution::Exact(action);
        }
        if self.is_prefix(&self.buffer) {
            self.arm(sched);
            tracing::trace!(target: "vimnav.keys", %key, pending = self.buffer.len(), "prefix");
            return Resolution::Prefix;
        }

        self.buffer.clear();
        if !key.is_single_char() {
            tracing::trace!(target: "vimnav.keys", %key, "none");
            return Resolution::None;
        }

        // Retry with the last key as a fresh buffer.
        let retry = [key];
        if let Some(action) = self.exact(&retry) {
            tracing::trace!(target: "vimnav.keys", %key, %action, "exact after retry");
            return Resolution::Exact(action);
        }
        if self.is_prefix(&retry) {
            self.buffer.push(key);
            self.arm(sched);
            tracing::trace!(target: "vimnav.keys", %key, "prefix after retry");
            return Resolution::Prefix;
        }
        tracing::trace!(target: "vimnav.keys", %key, "none");
        Resolution::None
    }

    /// Clear the buffer and cancel any pending timeout.
    pub fn reset(&mut self, sched: &mut Scheduler<Wake>) {
        self.cancel_timer(sched);
        self.buffer.clear();
    }

    /// Handle a fired sequence timeout. Returns whether it was ours.
    pub fn on_timeout(&mut self, id: TimerId) -> bool {
        if self.timer != Some(id) {
            return false;
        }
        self.timer = None;
        if !self.buffer.is_empty() {
            tracing::trace!(target: "vimnav.keys", pending = self.buffer.len(), "sequence timed out");
        }
        self.buffer.clear();
        true
    }

    /// Keys typed since the last resolution.
    #[must_use]
    pub fn buffer(&self) -> &[Key] {
        &self.buffer
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// The pending timeout handle, if one is armed.
    #[must_use]
    pub fn timer(&self) -> Option<TimerId> {
        self.timer
    }

    /// Active bindings in match order.
    pub fn bindings(&self) -> impl Iterator<Item = (&KeySequence, Action)> {
        self.bindings.iter().map(|(seq, action)| (seq, *action))
    }

    fn exact(&self, keys: &[Key]) -> Option<Action> {
        self.bindings
            .iter()
            .find(|(seq, _)| seq.matches(keys))
            .map(|(_, action)| *action)
    }

    fn is_prefix(&self, keys: &[Key]) -> bool {
        self.bindings.iter().any(|(seq, _)| seq.extends(keys))
    }

    fn arm(&mut self, sched: &mut Scheduler<Wake>) {
        self.cancel_timer(sched);
        self.timer = Some(sched.set_timeout(SEQUENCE_TIMEOUT, Wake::SequenceTimeout));
    }

    fn cancel_timer(&mut self, sched: &mut Scheduler<Wake>) {
        if let Some(id) = self.timer.take() {
            sched.clear_timeout(id);
        }
    }
}
