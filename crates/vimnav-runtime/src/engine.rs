#![forbid(unsafe_code)]

//! The dispatcher: key events in, host effects out.
//!
//! [`Engine`] is the composition root for one page. It owns every piece of
//! interaction state (resolver, animator, modes, hint and search sessions,
//! and the scheduler that times them) and reaches the page only through a
//! `&mut H: Host` passed into each call.
//!
//! # Routing
//!
//! ```text
//! key ─┬─ page excluded ─────────────────────────────▶ PassThrough
//!      ├─ Ctrl/Alt/Meta held, or modifier-only key ─▶ PassThrough
//!      └─ by mode
//!           Insert: Escape ─▶ Normal + blur           (else PassThrough)
//!           Hints:  every key ─▶ hint session          Consumed
//!           Search: Escape ─▶ cancel search            (else PassThrough)
//!           Normal: resolver ─┬─ Exact ─▶ run action   Consumed
//!                             ├─ Prefix               Consumed
//!                             └─ None                 PassThrough
//! ```
//!
//! # Time
//!
//! Every entry point takes `now`. Timers due at or before `now` fire before
//! the entry point does its own work, so a host that never calls
//! [`Engine::advance`] explicitly still sees expired key sequences dropped
//! before the next key is resolved. Scroll animation runs only from
//! [`Engine::animation_frame`].
//!
//! # Failure Modes
//!
//! Host failures never leave the engine. Each is logged at WARN on
//! `vimnav.engine` (or `vimnav.scroll` for animation frames) and its effect
//! is dropped. An `Unsupported` failure during a scroll animation also ends
//! the animation.

use serde::Serialize;
use vimnav_core::action::Action;
use vimnav_core::element::ElementId;
use vimnav_core::error::HostError;
use vimnav_core::event::{KeyPress, Modifiers};
use vimnav_core::hints::{HintOutcome, HintSession};
use vimnav_core::host::{Host, TabCommand};
use vimnav_core::keybinding::{KeySequenceResolver, Resolution};
use vimnav_core::mode::{AutoInsert, Mode, ModeManager, ModeSubscription};
use vimnav_core::schedule::{Scheduler, Wake};
use vimnav_core::scroll::{self, Direction, ScrollAnimator};
use vimnav_core::search::SearchState;
use vimnav_core::settings::Settings;
use web_time::Instant;

use crate::exclusion::UrlExclusion;
use crate::message::BackgroundMessage;

/// Whether the host should suppress the key's default handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyDisposition {
    /// The engine used the key; prevent default and stop propagation.
    Consumed,
    /// Let the page handle the key.
    PassThrough,
}

impl KeyDisposition {
    #[must_use]
    pub const fn is_consumed(self) -> bool {
        matches!(self, Self::Consumed)
    }
}

/// Per-page interaction engine.
#[derive(Debug)]
pub struct Engine {
    settings: Settings,
    page_url: String,
    exclusion: UrlExclusion,
    disabled: bool,
    sched: Scheduler<Wake>,
    resolver: KeySequenceResolver,
    animator: ScrollAnimator,
    modes: ModeManager,
    auto_insert: AutoInsert,
    hints: Option<HintSession>,
    search: SearchState,
}

impl Engine {
    /// Build an engine for the page at `page_url`, in Normal mode.
    #[must_use]
    pub fn new(settings: Settings, page_url: impl Into<String>, now: Instant) -> Self {
        let page_url = page_url.into();
        let exclusion = UrlExclusion::new(&settings.excluded_urls);
        let disabled = exclusion.is_excluded(&page_url);
        let resolver = KeySequenceResolver::new(&settings.effective_mappings());
        tracing::debug!(target: "vimnav.engine", url = %page_url, disabled, "engine created");
        Self {
            settings,
            page_url,
            exclusion,
            disabled,
            sched: Scheduler::new(now),
            resolver,
            animator: ScrollAnimator::new(),
            modes: ModeManager::new(),
            auto_insert: AutoInsert::new(),
            hints: None,
            search: SearchState::new(),
        }
    }

    /// Push the initial mode indicator to the host.
    pub fn attach<H: Host + ?Sized>(&mut self, host: &mut H) {
        host.set_mode_indicator(self.modes.mode().indicator().as_ref());
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[inline]
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.modes.mode()
    }

    /// Whether the current page matched an excluded URL pattern.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    #[must_use]
    pub fn page_url(&self) -> &str {
        &self.page_url
    }

    #[must_use]
    pub fn resolver(&self) -> &KeySequenceResolver {
        &self.resolver
    }

    #[must_use]
    pub fn animator(&self) -> &ScrollAnimator {
        &self.animator
    }

    #[must_use]
    pub fn hint_session(&self) -> Option<&HintSession> {
        self.hints.as_ref()
    }

    #[must_use]
    pub fn search(&self) -> &SearchState {
        &self.search
    }

    #[must_use]
    pub fn scheduler(&self) -> &Scheduler<Wake> {
        &self.sched
    }

    /// Earliest pending timer deadline, for hosts that sleep between events.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.sched.next_deadline()
    }

    /// Whether a frame callback is waiting for [`Engine::animation_frame`].
    #[must_use]
    pub fn wants_frame(&self) -> bool {
        self.sched.pending_frames() > 0
    }

    /// Observe mode transitions as `(new, old)`.
    pub fn on_mode_change(&mut self, listener: impl FnMut(Mode, Mode) + 'static) -> ModeSubscription {
        self.modes.on_mode_change(listener)
    }

    // -----------------------------------------------------------------------
    // Keys
    // -----------------------------------------------------------------------

    /// Handle a DOM `keydown` by its `key` value. Unknown key names pass
    /// through.
    pub fn handle_dom_key<H: Host + ?Sized>(
        &mut self,
        key: &str,
        modifiers: Modifiers,
        now: Instant,
        host: &mut H,
    ) -> KeyDisposition {
        match KeyPress::from_dom(key, modifiers) {
            Some(press) => self.handle_key(press, now, host),
            None => {
                self.advance(now, host);
                tracing::trace!(target: "vimnav.engine", key, "unrecognized key name");
                KeyDisposition::PassThrough
            }
        }
    }

    /// Handle one key press.
    pub fn handle_key<H: Host + ?Sized>(
        &mut self,
        press: KeyPress,
        now: Instant,
        host: &mut H,
    ) -> KeyDisposition {
        self.advance(now, host);

        if self.disabled {
            return KeyDisposition::PassThrough;
        }
        if press.has_command_modifier() || press.key.is_modifier() {
            return KeyDisposition::PassThrough;
        }

        match self.modes.mode() {
            Mode::Insert => self.insert_key(press, host),
            Mode::Hints => self.hints_key(press, host),
            Mode::Search => self.search_key(press, host),
            Mode::Normal => self.normal_key(press, host),
        }
    }

    fn insert_key<H: Host + ?Sized>(&mut self, press: KeyPress, host: &mut H) -> KeyDisposition {
        if !press.key.is_escape() {
            return KeyDisposition::PassThrough;
        }
        self.set_mode(Mode::Normal, host);
        if let Some(active) = host.active_element() {
            host.blur(active);
        }
        KeyDisposition::Consumed
    }

    fn hints_key<H: Host + ?Sized>(&mut self, press: KeyPress, host: &mut H) -> KeyDisposition {
        let Some(session) = self.hints.as_mut() else {
            return KeyDisposition::PassThrough;
        };
        match session.handle_key(press.key) {
            HintOutcome::Pending => host.update_hints(&session.views()),
            HintOutcome::Activate { element, new_tab } => {
                self.hints = None;
                host.hide_hints();
                self.activate_element(element, new_tab, host);
                self.set_mode(Mode::Normal, host);
            }
            HintOutcome::Cancelled => self.end_hints(host),
        }
        KeyDisposition::Consumed
    }

    fn search_key<H: Host + ?Sized>(&mut self, press: KeyPress, host: &mut H) -> KeyDisposition {
        if !press.key.is_escape() {
            return KeyDisposition::PassThrough;
        }
        self.cancel_search(host);
        KeyDisposition::Consumed
    }

    fn normal_key<H: Host + ?Sized>(&mut self, press: KeyPress, host: &mut H) -> KeyDisposition {
        match self.resolver.feed(press.key, &mut self.sched) {
            Resolution::Exact(action) => {
                self.run_action(action, host);
                KeyDisposition::Consumed
            }
            Resolution::Prefix => KeyDisposition::Consumed,
            Resolution::None => KeyDisposition::PassThrough,
        }
    }

    // -----------------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------------

    /// Perform `action` immediately, as if its binding had been typed in
    /// Normal mode.
    pub fn run_action<H: Host + ?Sized>(&mut self, action: Action, host: &mut H) {
        tracing::debug!(target: "vimnav.engine", %action, "dispatch");
        let result = match action {
            Action::ScrollDown => self.step(Direction::Down, host),
            Action::ScrollUp => self.step(Direction::Up, host),
            Action::ScrollLeft => self.step(Direction::Left, host),
            Action::ScrollRight => self.step(Direction::Right, host),
            Action::HalfPageDown => scroll::half_page(true, &self.settings, host),
            Action::HalfPageUp => scroll::half_page(false, &self.settings, host),
            Action::GoToTop => scroll::go_to_top(&self.settings, host),
            Action::GoToBottom => scroll::go_to_bottom(&self.settings, host),
            Action::LinkHints => {
                self.start_hints(false, host);
                Ok(())
            }
            Action::LinkHintsNewTab => {
                self.start_hints(true, host);
                Ok(())
            }
            Action::FocusInput => match host.first_text_input() {
                Some(id) => host.focus(id),
                None => Ok(()),
            },
            Action::HistoryBack => {
                host.history_back();
                Ok(())
            }
            Action::HistoryForward => {
                host.history_forward();
                Ok(())
            }
            Action::Reload => {
                host.reload();
                Ok(())
            }
            Action::PrevTab => host.send(TabCommand::Prev),
            Action::NextTab => host.send(TabCommand::Next),
            Action::CloseTab => host.send(TabCommand::Close),
            Action::RestoreTab => host.send(TabCommand::Restore),
            Action::NewTab => host.send(TabCommand::New),
            Action::DuplicateTab => host.send(TabCommand::Duplicate),
            Action::Search => {
                self.open_search(host);
                Ok(())
            }
            Action::SearchNext => {
                self.search.repeat(true, host);
                Ok(())
            }
            Action::SearchPrev => {
                self.search.repeat(false, host);
                Ok(())
            }
            Action::ClearSearch => {
                self.search.clear(host);
                Ok(())
            }
            Action::InsertMode => {
                self.set_mode(Mode::Insert, host);
                Ok(())
            }
        };
        if let Err(err) = result {
            discard(action.name(), &err);
        }
    }

    fn step<H: Host + ?Sized>(&mut self, direction: Direction, host: &mut H) -> Result<(), HostError> {
        self.animator
            .step(direction, &self.settings, host, &mut self.sched)
    }

    // -----------------------------------------------------------------------
    // Hints
    // -----------------------------------------------------------------------

    fn start_hints<H: Host + ?Sized>(&mut self, open_in_new_tab: bool, host: &mut H) {
        let candidates = host.hint_candidates();
        let metrics = host.metrics();
        let session = HintSession::start(
            &candidates,
            &metrics,
            &self.settings.hint_characters,
            open_in_new_tab,
        );
        if session.labels().is_empty() {
            tracing::debug!(target: "vimnav.engine", candidates = candidates.len(), "no visible hint targets");
            return;
        }
        host.show_hints(&session.views());
        self.hints = Some(session);
        self.set_mode(Mode::Hints, host);
    }

    fn end_hints<H: Host + ?Sized>(&mut self, host: &mut H) {
        if let Some(mut session) = self.hints.take() {
            session.cancel();
        }
        host.hide_hints();
        self.set_mode(Mode::Normal, host);
    }

    /// Click the element, or open its link in a background tab.
    fn activate_element<H: Host + ?Sized>(&mut self, id: ElementId, new_tab: bool, host: &mut H) {
        let Some(element) = host.element(id) else {
            discard("activate", &HostError::ElementGone(id));
            return;
        };
        let result = match element.href() {
            Some(href) if new_tab => host.send(TabCommand::NewWithUrl {
                url: href.to_string(),
            }),
            _ => host.click(id),
        };
        if let Err(err) = result {
            discard("activate", &err);
        }
    }

    // -----------------------------------------------------------------------
    // Search
    // -----------------------------------------------------------------------

    fn open_search<H: Host + ?Sized>(&mut self, host: &mut H) {
        self.search.open(host);
        self.set_mode(Mode::Search, host);
    }

    /// The user pressed Enter in the search bar. Returns the find result,
    /// or `None` if no search was open or the query was empty.
    pub fn submit_search<H: Host + ?Sized>(
        &mut self,
        query: &str,
        now: Instant,
        host: &mut H,
    ) -> Option<bool> {
        self.advance(now, host);
        if self.modes.mode() != Mode::Search {
            return None;
        }
        self.set_mode(Mode::Normal, host);
        self.search.submit(query, host)
    }

    /// Close the search bar without searching.
    pub fn cancel_search<H: Host + ?Sized>(&mut self, host: &mut H) {
        self.search.close(host);
        if self.modes.mode() == Mode::Search {
            self.set_mode(Mode::Normal, host);
        }
    }

    // -----------------------------------------------------------------------
    // Focus
    // -----------------------------------------------------------------------

    /// An element gained focus.
    pub fn focus_in<H: Host + ?Sized>(&mut self, id: ElementId, now: Instant, host: &mut H) {
        self.advance(now, host);
        let target = host.element(id);
        if let Some(mode) = self.auto_insert.focus_in(target.as_ref(), self.modes.mode()) {
            self.set_mode(mode, host);
        }
    }

    /// An element lost focus. Leaving Insert waits for focus to settle.
    pub fn focus_out<H: Host + ?Sized>(&mut self, id: ElementId, now: Instant, host: &mut H) {
        self.advance(now, host);
        let target = host.element(id);
        self.auto_insert
            .focus_out(target.as_ref(), self.modes.mode(), &mut self.sched);
    }

    // -----------------------------------------------------------------------
    // Time
    // -----------------------------------------------------------------------

    /// Fire every timer due at `now`. Returns how many fired.
    pub fn advance<H: Host + ?Sized>(&mut self, now: Instant, host: &mut H) -> usize {
        let due = self.sched.advance(now);
        let fired = due.len();
        for (id, wake) in due {
            match wake {
                Wake::SequenceTimeout => {
                    self.resolver.on_timeout(id);
                }
                Wake::FocusSettle => {
                    let active = host.active_element().and_then(|active| host.element(active));
                    if let Some(mode) = self.auto_insert.settle(id, active.as_ref(), self.modes.mode()) {
                        self.set_mode(mode, host);
                    }
                }
                Wake::ScrollFrame => {
                    tracing::trace!(target: "vimnav.engine", "frame wake delivered as timer; ignored");
                }
            }
        }
        fired
    }

    /// Run one display frame. Returns whether another frame is wanted.
    pub fn animation_frame<H: Host + ?Sized>(&mut self, now: Instant, host: &mut H) -> bool {
        self.advance(now, host);
        for (id, wake) in self.sched.take_frames(now) {
            if wake == Wake::ScrollFrame {
                self.animator.on_frame(id, now, host, &mut self.sched);
            }
        }
        self.sched.pending_frames() > 0
    }

    // -----------------------------------------------------------------------
    // Settings
    // -----------------------------------------------------------------------

    /// Replace settings: rebuild bindings, recheck exclusion, and stop any
    /// animation in flight.
    pub fn apply_settings(&mut self, settings: Settings) {
        self.animator.reset(&mut self.sched);
        self.resolver
            .set_mappings(&settings.effective_mappings(), &mut self.sched);
        self.exclusion = UrlExclusion::new(&settings.excluded_urls);
        self.disabled = self.exclusion.is_excluded(&self.page_url);
        self.settings = settings;
        tracing::debug!(target: "vimnav.engine", disabled = self.disabled, "settings applied");
    }

    /// The page navigated without reloading the engine.
    pub fn set_page_url(&mut self, url: impl Into<String>) {
        self.page_url = url.into();
        self.disabled = self.exclusion.is_excluded(&self.page_url);
    }

    /// Handle a message from the background context. Returns whether it
    /// changed anything.
    pub fn handle_message(&mut self, message: BackgroundMessage) -> bool {
        match message {
            BackgroundMessage::SettingsUpdated { payload } => {
                if payload.is_null() {
                    return false;
                }
                self.apply_settings(Settings::normalize(&payload));
                true
            }
        }
    }

    // -----------------------------------------------------------------------
    // Modes
    // -----------------------------------------------------------------------

    fn set_mode<H: Host + ?Sized>(&mut self, mode: Mode, host: &mut H) {
        let old = self.modes.mode();
        if !self.modes.set_mode(mode) {
            return;
        }
        if old == Mode::Normal {
            self.resolver.reset(&mut self.sched);
        }
        if old == Mode::Insert {
            self.auto_insert.cancel(&mut self.sched);
        }
        host.set_mode_indicator(mode.indicator().as_ref());
    }
}

fn discard(operation: &str, err: &HostError) {
    tracing::warn!(
        target: "vimnav.engine",
        operation,
        error = %err,
        error_type = err.error_type(),
        "host call failed; effect dropped"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn engine(url: &str) -> Engine {
        Engine::new(Settings::default(), url, Instant::now())
    }

    #[test]
    fn starts_normal_and_enabled() {
        let engine = engine("https://example.com/");
        assert_eq!(engine.mode(), Mode::Normal);
        assert!(!engine.is_disabled());
        assert!(!engine.wants_frame());
        assert_eq!(engine.next_deadline(), None);
    }

    #[test]
    fn excluded_url_disables() {
        let settings = Settings {
            excluded_urls: vec!["*://mail.example.com/*".into()],
            ..Settings::default()
        };
        let engine = Engine::new(settings, "https://mail.example.com/inbox", Instant::now());
        assert!(engine.is_disabled());
    }

    #[test]
    fn navigation_rechecks_exclusion() {
        let settings = Settings {
            excluded_urls: vec!["https://docs.example.com/*".into()],
            ..Settings::default()
        };
        let mut engine = Engine::new(settings, "https://example.com/", Instant::now());
        assert!(!engine.is_disabled());
        engine.set_page_url("https://docs.example.com/guide");
        assert!(engine.is_disabled());
        assert_eq!(engine.page_url(), "https://docs.example.com/guide");
    }

    #[test]
    fn settings_message_rebuilds_bindings() {
        let mut engine = engine("https://example.com/");
        let changed = engine.handle_message(BackgroundMessage::SettingsUpdated {
            payload: json!({
                "disabledActions": ["scrollDown"],
                "excludedUrls": ["https://example.com/"],
            }),
        });
        assert!(changed);
        assert!(engine.is_disabled());
        assert!(engine.settings().is_disabled(Action::ScrollDown));
        assert!(
            engine
                .resolver()
                .bindings()
                .all(|(_, action)| action != Action::ScrollDown)
        );
    }

    #[test]
    fn null_payload_is_ignored() {
        let mut engine = engine("https://example.com/");
        assert!(!engine.handle_message(BackgroundMessage::SettingsUpdated {
            payload: serde_json::Value::Null
        }));
        assert_eq!(engine.settings(), &Settings::default());
    }

    #[test]
    fn disposition_flags() {
        assert!(KeyDisposition::Consumed.is_consumed());
        assert!(!KeyDisposition::PassThrough.is_consumed());
    }
}
