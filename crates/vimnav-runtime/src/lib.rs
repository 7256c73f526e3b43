#![forbid(unsafe_code)]

//! Runtime: the per-page dispatch engine and its process-level plumbing.
//!
//! # Role in vimnav
//! `vimnav-runtime` turns the state machines in `vimnav-core` into one
//! [`Engine`] per page. A host feeds it DOM key events, focus changes,
//! timer ticks, and display frames; the engine answers each key with a
//! [`KeyDisposition`] and drives the page through the `vimnav_core::host`
//! traits.
//!
//! # Modules
//! - [`engine`]: key routing by mode, action effects, timers and frames.
//! - [`exclusion`]: `excludedUrls` glob matching.
//! - [`message`]: messages pushed in from the background context.
//! - [`config`]: settings files (JSON/TOML) and environment configuration.
//! - [`logging`]: tracing subscriber setup.

pub mod config;
pub mod engine;
pub mod exclusion;
pub mod logging;
pub mod message;

pub use config::{ConfigError, RuntimeConfig};
pub use engine::{Engine, KeyDisposition};
pub use exclusion::UrlExclusion;
pub use message::BackgroundMessage;
