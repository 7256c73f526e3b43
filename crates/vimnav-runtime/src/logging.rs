#![forbid(unsafe_code)]

//! Tracing subscriber setup for hosts and tools.
//!
//! Library code only emits events; binaries call [`init_tracing`] once.
//! Targets used across the workspace:
//!
//! | Target | Events |
//! |--------|--------|
//! | `vimnav.keys` | resolver classifications (TRACE) |
//! | `vimnav.mode` | mode transitions (DEBUG) |
//! | `vimnav.scroll` | animation lifecycle (TRACE), scroll failures (WARN) |
//! | `vimnav.hints` | session start and outcome (DEBUG) |
//! | `vimnav.search` | find calls (DEBUG) |
//! | `vimnav.settings` | normalization fallbacks (DEBUG), loads (INFO) |
//! | `vimnav.engine` | dispatch decisions (DEBUG), discarded host failures (WARN) |

use tracing_subscriber::EnvFilter;

/// Install a stderr fmt subscriber filtered by `filter`.
///
/// Invalid directives fall back to `info`. Returns `false` if a global
/// subscriber was already installed; calling this twice is harmless.
pub fn init_tracing(filter: &str) -> bool {
    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|err| {
        eprintln!("vimnav: invalid log filter {filter:?} ({err}); using info");
        EnvFilter::new("info")
    });
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_a_no_op() {
        let _ = init_tracing("vimnav=debug");
        assert!(!init_tracing("vimnav=trace"));
    }

    #[test]
    fn bad_filter_does_not_panic() {
        let _ = init_tracing("[[[not a filter");
    }
}
