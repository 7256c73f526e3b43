#![forbid(unsafe_code)]

//! Test harness for vimnav.
//!
//! - [`FakePage`]: an in-memory page implementing every host capability,
//!   recording each call and emulating focus events.
//! - [`parse_script`]: a line-oriented key script format.
//! - [`Driver`]: runs an engine against a page on a virtual clock and
//!   records a [`TraceRecord`] stream.
//!
//! The `vimnav-script` binary wires the three together and prints the trace
//! as JSON lines.

pub mod cli;
pub mod driver;
pub mod error;
pub mod fake_page;
pub mod script;

pub use cli::{Cli, run, run_from_env};
pub use driver::{Driver, FRAME_INTERVAL, TraceEvent, TraceRecord};
pub use error::{HarnessError, Result};
pub use fake_page::{Capability, FakePage, FocusEvent, HostCall};
pub use script::{ScriptError, ScriptStep, parse_script};
