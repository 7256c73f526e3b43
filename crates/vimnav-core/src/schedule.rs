#![forbid(unsafe_code)]

//! Host-driven timers and frame callbacks.
//!
//! The engine never sleeps or spawns. Components register one-shot timeouts
//! and per-frame callbacks here; the host advances the clock and drains what
//! is due. Both kinds of registration are cancelable by id.
//!
//! # Invariants
//!
//! 1. Ids are never reused within one scheduler.
//! 2. [`Scheduler::advance`] yields due timers in deadline order, ties broken
//!    by registration order.
//! 3. A zero-delay timeout never fires inside the call that registered it;
//!    it fires on the next `advance`, even with an unchanged clock.
//! 4. The scheduler clock never moves backwards.
//!
//! # Failure Modes
//!
//! - Canceling an id that already fired (or was never issued) is a no-op
//!   returning `false`.
//! - Components must compare the fired id with the one they hold; a wake
//!   whose id they no longer hold is stale and ignored.

use std::collections::BTreeMap;

use ahash::AHashMap;
use web_time::{Duration, Instant};

/// Handle to a pending one-shot timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Handle to a pending frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(u64);

/// What a wake-up is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Wake {
    /// Key sequence window elapsed.
    SequenceTimeout,
    /// Scroll animation frame.
    ScrollFrame,
    /// Focus settled after a focus-out.
    FocusSettle,
}

/// Deterministic timeout and frame queue.
#[derive(Debug)]
pub struct Scheduler<T> {
    now: Instant,
    next_id: u64,
    timers: BTreeMap<(Instant, u64), T>,
    deadlines: AHashMap<u64, Instant>,
    frames: BTreeMap<u64, T>,
}

impl<T> Scheduler<T> {
    #[must_use]
    pub fn new(now: Instant) -> Self {
        Self {
            now,
            next_id: 0,
            timers: BTreeMap::new(),
            deadlines: AHashMap::new(),
            frames: BTreeMap::new(),
        }
    }

    /// Current scheduler clock.
    #[inline]
    #[must_use]
    pub fn now(&self) -> Instant {
        self.now
    }

    fn issue(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn observe(&mut self, now: Instant) {
        if now > self.now {
            self.now = now;
        }
    }

    /// Schedule `payload` to fire once `delay` has elapsed.
    pub fn set_timeout(&mut self, delay: Duration, payload: T) -> TimerId {
        let id = self.issue();
        let deadline = self.now + delay;
        self.timers.insert((deadline, id), payload);
        self.deadlines.insert(id, deadline);
        TimerId(id)
    }

    /// Cancel a pending timeout. Returns whether it was still pending.
    pub fn clear_timeout(&mut self, id: TimerId) -> bool {
        match self.deadlines.remove(&id.0) {
            Some(deadline) => self.timers.remove(&(deadline, id.0)).is_some(),
            None => false,
        }
    }

    /// Request a callback on the next frame.
    pub fn request_frame(&mut self, payload: T) -> FrameId {
        let id = self.issue();
        self.frames.insert(id, payload);
        FrameId(id)
    }

    /// Cancel a pending frame callback. Returns whether it was still pending.
    pub fn cancel_frame(&mut self, id: FrameId) -> bool {
        self.frames.remove(&id.0).is_some()
    }

    /// Move the clock to `now` and take every timeout that is due.
    pub fn advance(&mut self, now: Instant) -> Vec<(TimerId, T)> {
        self.observe(now);
        let mut due = Vec::new();
        while let Some(entry) = self.timers.first_entry() {
            let (deadline, id) = *entry.key();
            if deadline > self.now {
                break;
            }
            let payload = entry.remove();
            self.deadlines.remove(&id);
            due.push((TimerId(id), payload));
        }
        due
    }

    /// Move the clock to `now` and take every frame callback requested so
    /// far. Frames requested while handling these land in the next batch.
    pub fn take_frames(&mut self, now: Instant) -> Vec<(FrameId, T)> {
        self.observe(now);
        std::mem::take(&mut self.frames)
            .into_iter()
            .map(|(id, payload)| (FrameId(id), payload))
            .collect()
    }

    #[must_use]
    pub fn has_timer(&self, id: TimerId) -> bool {
        self.deadlines.contains_key(&id.0)
    }

    #[must_use]
    pub fn has_frame(&self, id: FrameId) -> bool {
        self.frames.contains_key(&id.0)
    }

    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    #[must_use]
    pub fn pending_frames(&self) -> usize {
        self.frames.len()
    }

    /// Earliest pending deadline, if any.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.keys().next().map(|(deadline, _)| *deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS_100: Duration = Duration::from_millis(100);
    const MS_500: Duration = Duration::from_millis(500);

    #[test]
    fn timeout_fires_at_deadline() {
        let t = Instant::now();
        let mut sched = Scheduler::new(t);
        let id = sched.set_timeout(MS_500, "seq");

        assert!(sched.advance(t + MS_100).is_empty());
        assert!(sched.has_timer(id));
        assert_eq!(sched.next_deadline(), Some(t + MS_500));

        let due = sched.advance(t + MS_500);
        assert_eq!(due, vec![(id, "seq")]);
        assert!(!sched.has_timer(id));
        assert_eq!(sched.pending_timers(), 0);
    }

    #[test]
    fn due_timers_come_out_in_deadline_order() {
        let t = Instant::now();
        let mut sched = Scheduler::new(t);
        let late = sched.set_timeout(MS_500, 2);
        let early = sched.set_timeout(MS_100, 1);
        let tie = sched.set_timeout(MS_100, 3);

        let due = sched.advance(t + MS_500);
        assert_eq!(due, vec![(early, 1), (tie, 3), (late, 2)]);
    }

    #[test]
    fn cleared_timer_never_fires() {
        let t = Instant::now();
        let mut sched = Scheduler::new(t);
        let id = sched.set_timeout(MS_100, ());
        assert!(sched.clear_timeout(id));
        assert!(!sched.clear_timeout(id));
        assert!(sched.advance(t + MS_500).is_empty());
    }

    #[test]
    fn zero_delay_fires_on_next_advance() {
        let t = Instant::now();
        let mut sched = Scheduler::new(t);
        let id = sched.set_timeout(Duration::ZERO, ());
        assert_eq!(sched.pending_timers(), 1);
        assert_eq!(sched.advance(t), vec![(id, ())]);
    }

    #[test]
    fn clock_never_moves_backwards() {
        let t = Instant::now();
        let mut sched: Scheduler<()> = Scheduler::new(t + MS_500);
        sched.advance(t);
        assert_eq!(sched.now(), t + MS_500);
    }

    #[test]
    fn frames_drain_in_batches() {
        let t = Instant::now();
        let mut sched = Scheduler::new(t);
        let a = sched.request_frame('a');
        let b = sched.request_frame('b');
        assert!(sched.cancel_frame(a));
        assert!(!sched.cancel_frame(a));
        assert!(sched.has_frame(b));

        let frames = sched.take_frames(t + MS_100);
        assert_eq!(frames, vec![(b, 'b')]);
        assert_eq!(sched.now(), t + MS_100);
        assert_eq!(sched.pending_frames(), 0);
    }

    #[test]
    fn ids_are_not_reused() {
        let t = Instant::now();
        let mut sched = Scheduler::new(t);
        let first = sched.set_timeout(MS_100, ());
        sched.advance(t + MS_100);
        let second = sched.set_timeout(MS_100, ());
        assert_ne!(first, second);
    }
}
