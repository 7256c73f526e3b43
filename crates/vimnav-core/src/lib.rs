#![forbid(unsafe_code)]

//! Core: keys, bindings, modes, hint labels, and smooth scrolling.
//!
//! # Role in vimnav
//! `vimnav-core` holds every piece of keyboard-navigation logic that does not
//! depend on a particular page. The runtime (`vimnav-runtime`) wires these
//! pieces into an engine; a host (a browser content script, or the fake page
//! in `vimnav-harness`) implements the traits in [`host`].
//!
//! # Primary responsibilities
//! - **Keys**: [`event::KeyPress`] and the [`notation::KeySequence`] binding syntax.
//! - **Bindings**: [`keybinding::KeySequenceResolver`] with prefix buffering and a timeout.
//! - **Modes**: [`mode::ModeManager`] plus focus-driven auto-insert.
//! - **Hints**: label generation, visibility filtering, and the typing session.
//! - **Scrolling**: the merging [`scroll::ScrollAnimator`].
//! - **Settings**: [`settings::Settings`] normalization from untrusted JSON.
//!
//! # Time
//! Nothing here reads a clock. Timers and animation frames go through a
//! host-driven [`schedule::Scheduler`], so every state machine is
//! deterministic under test.

pub mod action;
pub mod element;
pub mod error;
pub mod event;
pub mod hints;
pub mod host;
pub mod keybinding;
pub mod mode;
pub mod notation;
pub mod schedule;
pub mod scroll;
pub mod search;
pub mod settings;

pub use action::{Action, KeyMappings};
pub use element::{ElementId, ElementInfo, ElementKind, HintCandidate, Rect};
pub use error::{Disposition, HostError};
pub use event::{Key, KeyPress, Modifiers, NamedKey};
pub use host::{Host, TabCommand, ViewportMetrics};
pub use keybinding::{KeySequenceResolver, Resolution};
pub use mode::{Mode, ModeIndicator, ModeManager};
pub use notation::KeySequence;
pub use schedule::{FrameId, Scheduler, TimerId, Wake};
pub use settings::Settings;
