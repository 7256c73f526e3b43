#![forbid(unsafe_code)]

//! Host failure model.
//!
//! Nothing in the engine is fatal. Host capabilities may fail (the element
//! vanished, the page rejected a click, the platform lacks a primitive);
//! callers log the failure and keep the interaction loop running.
//!
//! # Design Principles
//!
//! 1. **No propagation past the call site.** Every host call that can fail
//!    is handled where it is made.
//! 2. **No retries.** The user re-triggers the action.
//! 3. **Disposition.** Each error maps to a [`Disposition`] telling the
//!    caller whether to drop just this effect or the whole operation it
//!    belongs to (for example an in-flight scroll animation).

use std::fmt;

use crate::element::ElementId;

/// Failure reported by a host capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The element no longer exists in the page.
    ElementGone(ElementId),
    /// The host refused the request (page script threw, messaging failed).
    Rejected(String),
    /// The host does not provide this primitive at all.
    Unsupported(&'static str),
}

/// What the caller does with a [`HostError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Drop this one effect; anything in flight continues.
    Discard,
    /// Drop the operation the effect belongs to.
    Abandon,
}

impl HostError {
    #[must_use]
    pub fn disposition(&self) -> Disposition {
        match self {
            Self::ElementGone(_) | Self::Rejected(_) => Disposition::Discard,
            Self::Unsupported(_) => Disposition::Abandon,
        }
    }

    /// Error type label for tracing fields.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::ElementGone(_) => "element_gone",
            Self::Rejected(_) => "rejected",
            Self::Unsupported(_) => "unsupported",
        }
    }
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ElementGone(id) => write!(f, "element {id} is no longer in the page"),
            Self::Rejected(reason) => write!(f, "host rejected the request: {reason}"),
            Self::Unsupported(what) => write!(f, "host does not support {what}"),
        }
    }
}

impl std::error::Error for HostError {}
