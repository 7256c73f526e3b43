#![forbid(unsafe_code)]

//! Run an [`Engine`] against a [`FakePage`] on a virtual clock.
//!
//! The driver plays the part of the browser: it delivers keys, focus
//! changes, search-bar input, background messages, and display frames, and
//! it records everything that comes back as a [`TraceRecord`] stream.
//!
//! # Time
//!
//! The clock starts at an arbitrary [`Instant`] and only moves when a step
//! asks it to. While a scroll animation wants frames the clock moves in
//! [`FRAME_INTERVAL`] ticks; otherwise it jumps straight to the next timer.
//!
//! # Trace order
//!
//! Within one step the trace holds the input first, then focus events the
//! page fired back, then mode transitions, then host calls.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use serde::Serialize;
use serde_json::{Value, json};
use vimnav_core::element::ElementId;
use vimnav_core::{Key, KeyPress, Mode, Modifiers, Settings};
use vimnav_runtime::{BackgroundMessage, Engine, KeyDisposition};
use web_time::Instant;

use crate::fake_page::{FakePage, FocusEvent, HostCall};
use crate::script::ScriptStep;

/// One display frame at 60 Hz, rounded down.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Upper bound on how long [`Driver::run_until_idle`] lets the clock run.
pub const IDLE_LIMIT: Duration = Duration::from_secs(10);

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    Key {
        key: String,
        disposition: KeyDisposition,
    },
    Focus {
        element: ElementId,
        focused: bool,
    },
    Search {
        query: String,
        found: Option<bool>,
    },
    CancelSearch,
    Settings {
        applied: bool,
    },
    Navigate {
        url: String,
        disabled: bool,
    },
    Mode {
        from: Mode,
        to: Mode,
    },
    Call(HostCall),
}

/// A [`TraceEvent`] stamped with virtual time since the driver started.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceRecord {
    pub t_ms: u64,
    #[serde(flatten)]
    pub event: TraceEvent,
}

type Transitions = Rc<RefCell<Vec<(Mode, Mode)>>>;

/// Engine plus page plus clock.
#[derive(Debug)]
pub struct Driver {
    engine: Engine,
    page: FakePage,
    start: Instant,
    now: Instant,
    transitions: Transitions,
    trace: Vec<TraceRecord>,
}

impl Driver {
    /// Attach a fresh engine for `url` to `page`.
    #[must_use]
    pub fn new(settings: Settings, url: &str, page: FakePage) -> Self {
        let start = Instant::now();
        let mut engine = Engine::new(settings, url, start);
        let transitions: Transitions = Rc::default();
        let sink = Rc::clone(&transitions);
        // The engine owns the listener for its whole life; the handle is not
        // needed.
        let _subscription = engine.on_mode_change(move |new, old| sink.borrow_mut().push((old, new)));
        let mut driver = Self {
            engine,
            page,
            start,
            now: start,
            transitions,
            trace: Vec::new(),
        };
        driver.engine.attach(&mut driver.page);
        driver.flush();
        driver
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    #[must_use]
    pub fn page(&self) -> &FakePage {
        &self.page
    }

    pub fn page_mut(&mut self) -> &mut FakePage {
        &mut self.page
    }

    #[must_use]
    pub fn now(&self) -> Instant {
        self.now
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.now.duration_since(self.start)
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.engine.mode()
    }

    /// Records so far, without draining them.
    #[must_use]
    pub fn trace(&self) -> &[TraceRecord] {
        &self.trace
    }

    pub fn take_trace(&mut self) -> Vec<TraceRecord> {
        std::mem::take(&mut self.trace)
    }

    /// Host calls recorded so far, in order.
    pub fn calls(&self) -> impl Iterator<Item = &HostCall> {
        self.trace.iter().filter_map(|record| match &record.event {
            TraceEvent::Call(call) => Some(call),
            _ => None,
        })
    }

    // -----------------------------------------------------------------------
    // Input
    // -----------------------------------------------------------------------

    /// Deliver one key press.
    pub fn press(&mut self, press: KeyPress) -> KeyDisposition {
        let disposition = self.engine.handle_key(press, self.now, &mut self.page);
        self.record(TraceEvent::Key {
            key: describe(press),
            disposition,
        });
        self.settle_step();
        disposition
    }

    /// Type each character of `keys` as a separate press.
    pub fn type_keys(&mut self, keys: &str) -> Vec<KeyPress> {
        keys.chars()
            .map(|c| {
                let press = KeyPress::char(c);
                self.press(press);
                press
            })
            .collect()
    }

    /// The user moved focus to `id` (a mouse click, Tab, or a page script).
    pub fn focus(&mut self, id: ElementId) {
        if self.page.active() == Some(id) {
            return;
        }
        if let Some(previous) = self.page.active() {
            self.page.set_active(None);
            self.deliver_focus(FocusEvent::Out(previous));
        }
        self.page.set_active(Some(id));
        self.deliver_focus(FocusEvent::In(id));
        self.settle_step();
    }

    /// The user moved focus off `id` to nothing.
    pub fn blur(&mut self, id: ElementId) {
        if self.page.active() != Some(id) {
            return;
        }
        self.page.set_active(None);
        self.deliver_focus(FocusEvent::Out(id));
        self.settle_step();
    }

    /// Enter in the search bar.
    pub fn search(&mut self, query: &str) -> Option<bool> {
        let found = self.engine.submit_search(query, self.now, &mut self.page);
        self.record(TraceEvent::Search {
            query: query.to_string(),
            found,
        });
        self.settle_step();
        found
    }

    /// Escape in the search bar.
    pub fn cancel_search(&mut self) {
        self.engine.advance(self.now, &mut self.page);
        self.engine.cancel_search(&mut self.page);
        self.record(TraceEvent::CancelSearch);
        self.settle_step();
    }

    /// Broadcast a `SETTINGS_UPDATED` message carrying `payload`.
    pub fn update_settings(&mut self, payload: Value) -> bool {
        let applied = BackgroundMessage::from_value(json!({
            "type": "SETTINGS_UPDATED",
            "payload": payload,
        }))
        .is_some_and(|message| self.engine.handle_message(message));
        self.record(TraceEvent::Settings { applied });
        self.settle_step();
        applied
    }

    /// Same-document navigation to `url`.
    pub fn navigate(&mut self, url: &str) {
        self.engine.set_page_url(url);
        self.record(TraceEvent::Navigate {
            url: url.to_string(),
            disabled: self.engine.is_disabled(),
        });
    }

    // -----------------------------------------------------------------------
    // Time
    // -----------------------------------------------------------------------

    /// Let `duration` of virtual time pass, running frames and timers.
    pub fn wait(&mut self, duration: Duration) {
        let target = self.now + duration;
        while self.now < target {
            let next = if self.engine.wants_frame() {
                self.now + FRAME_INTERVAL
            } else {
                match self.engine.next_deadline() {
                    Some(deadline) if deadline > self.now => deadline,
                    Some(_) => self.now,
                    None => target,
                }
            };
            self.now = next.min(target);
            self.tick();
        }
        self.settle_step();
    }

    /// Run until no timer or frame is pending, or [`IDLE_LIMIT`] passes.
    /// Returns whether the engine went idle.
    pub fn run_until_idle(&mut self) -> bool {
        let limit = self.now + IDLE_LIMIT;
        loop {
            let pending = self.engine.wants_frame() || self.engine.next_deadline().is_some();
            if !pending {
                return true;
            }
            if self.now >= limit {
                return false;
            }
            let next = if self.engine.wants_frame() {
                self.now + FRAME_INTERVAL
            } else {
                self.engine.next_deadline().map_or(limit, |d| d.max(self.now))
            };
            self.now = next.min(limit);
            self.tick();
            self.settle_step();
        }
    }

    fn tick(&mut self) {
        if self.engine.wants_frame() {
            self.engine.animation_frame(self.now, &mut self.page);
        } else {
            self.engine.advance(self.now, &mut self.page);
        }
    }

    // -----------------------------------------------------------------------
    // Scripts
    // -----------------------------------------------------------------------

    /// Apply one script step.
    pub fn step(&mut self, step: &ScriptStep) {
        match step {
            ScriptStep::Key(press) => {
                self.press(*press);
            }
            ScriptStep::Wait(duration) => self.wait(*duration),
            ScriptStep::Focus(id) => self.focus(*id),
            ScriptStep::Blur(id) => self.blur(*id),
            ScriptStep::Search(query) => {
                self.search(query);
            }
            ScriptStep::CancelSearch => self.cancel_search(),
            ScriptStep::Settings(payload) => {
                self.update_settings(payload.clone());
            }
            ScriptStep::Navigate(url) => self.navigate(url),
        }
    }

    /// Apply every step, let the engine go idle, and return the trace.
    pub fn run(&mut self, steps: &[ScriptStep]) -> Vec<TraceRecord> {
        for step in steps {
            self.step(step);
        }
        if !self.run_until_idle() {
            tracing::warn!(target: "vimnav.engine", "engine still busy after idle limit");
        }
        self.take_trace()
    }

    // -----------------------------------------------------------------------
    // Plumbing
    // -----------------------------------------------------------------------

    fn record(&mut self, event: TraceEvent) {
        let t_ms = u64::try_from(self.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.trace.push(TraceRecord { t_ms, event });
    }

    fn deliver_focus(&mut self, event: FocusEvent) {
        match event {
            FocusEvent::In(id) => {
                self.record(TraceEvent::Focus {
                    element: id,
                    focused: true,
                });
                self.engine.focus_in(id, self.now, &mut self.page);
            }
            FocusEvent::Out(id) => {
                self.record(TraceEvent::Focus {
                    element: id,
                    focused: false,
                });
                self.engine.focus_out(id, self.now, &mut self.page);
            }
        }
    }

    /// Feed back focus events the page queued, then flush.
    fn settle_step(&mut self) {
        loop {
            let events = self.page.take_focus_events();
            if events.is_empty() {
                break;
            }
            for event in events {
                self.deliver_focus(event);
            }
        }
        self.flush();
    }

    fn flush(&mut self) {
        let transitions: Vec<_> = self.transitions.borrow_mut().drain(..).collect();
        for (from, to) in transitions {
            self.record(TraceEvent::Mode { from, to });
        }
        for call in self.page.take_calls() {
            self.record(TraceEvent::Call(call));
        }
    }
}

/// `ctrl+shift+Tab`, `j`, `Escape`.
#[must_use]
pub fn describe(press: KeyPress) -> String {
    let mut out = String::new();
    for (flag, name) in [
        (Modifiers::CTRL, "ctrl+"),
        (Modifiers::ALT, "alt+"),
        (Modifiers::META, "meta+"),
        (Modifiers::SHIFT, "shift+"),
    ] {
        if press.modifiers.contains(flag) {
            out.push_str(name);
        }
    }
    match press.key {
        Key::Char(' ') => out.push_str("space"),
        key => out.push_str(&key.to_string()),
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use vimnav_core::NamedKey;

    fn driver() -> Driver {
        Driver::new(Settings::default(), "https://example.com/", FakePage::demo(3))
    }

    #[test]
    fn attach_shows_no_indicator_in_normal() {
        let mut d = driver();
        assert_eq!(
            d.take_trace(),
            [TraceRecord {
                t_ms: 0,
                event: TraceEvent::Call(HostCall::ModeIndicator { indicator: None }),
            }]
        );
    }

    #[test]
    fn wait_moves_the_clock_exactly() {
        let mut d = driver();
        d.wait(Duration::from_millis(250));
        assert_eq!(d.elapsed(), Duration::from_millis(250));
        assert!(d.run_until_idle());
        assert_eq!(d.elapsed(), Duration::from_millis(250));
    }

    #[test]
    fn smooth_scroll_runs_to_completion() {
        let mut d = driver();
        d.press(KeyPress::char('j'));
        assert!(d.engine().wants_frame());
        assert!(d.run_until_idle());
        let landed = d.page().scroll_position().1;
        assert!((landed - Settings::default().scroll_step_size).abs() < 1.0, "{landed}");
    }

    #[test]
    fn user_focus_enters_insert() {
        let mut d = driver();
        let input = ElementId::new(4);
        d.focus(input);
        assert_eq!(d.mode(), Mode::Insert);
        let modes: Vec<_> = d
            .trace()
            .iter()
            .filter_map(|r| match r.event {
                TraceEvent::Mode { from, to } => Some((from, to)),
                _ => None,
            })
            .collect();
        assert_eq!(modes, [(Mode::Normal, Mode::Insert)]);
    }

    #[test]
    fn describe_keys() {
        assert_eq!(describe(KeyPress::char('j')), "j");
        assert_eq!(describe(KeyPress::char(' ')), "space");
        assert_eq!(
            describe(KeyPress::named(NamedKey::Tab).with_modifiers(Modifiers::CTRL | Modifiers::SHIFT)),
            "ctrl+shift+Tab"
        );
    }

    #[test]
    fn records_serialize_flat() {
        let record = TraceRecord {
            t_ms: 16,
            event: TraceEvent::Key {
                key: "j".into(),
                disposition: KeyDisposition::Consumed,
            },
        };
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({"t_ms": 16, "event": "key", "key": "j", "disposition": "consumed"})
        );
    }
}
