#![forbid(unsafe_code)]

//! Smooth step scrolling and discrete page jumps.
//!
//! Native smooth scrolling breaks down when a key repeats: each call starts
//! its own animation and they fight. [`ScrollAnimator`] instead runs at most
//! one eased animation and folds every new request into it.
//!
//! # Merge rule
//!
//! A request that arrives mid-animation takes the distance not yet applied,
//! adds the new delta, and restarts the curve from zero at the current time.
//! Ten rapid `j` presses become one motion covering ten steps.
//!
//! # Invariants
//!
//! 1. At most one [`AnimationState`] and one pending frame exist at a time.
//! 2. The pending frame is canceled before a new one is requested.
//! 3. When progress reaches 1 the applied distance equals the total exactly
//!    and the animator is idle.
//! 4. Sub-pixel frames (both axes under [`MIN_STEP_PX`]) skip the scroll
//!    call but still advance the bookkeeping.
//!
//! # Failure Modes
//!
//! A failing scroll primitive is logged. A [`Disposition::Abandon`] error
//! stops the animation; anything else drops that frame's movement only.
//!
//! Half-page and top/bottom jumps do not repeat rapidly; they bypass the
//! animator and use the host's native behavior.

use web_time::{Duration, Instant};

use crate::error::{Disposition, HostError};
use crate::host::{ScrollBehavior, Viewport};
use crate::schedule::{FrameId, Scheduler, Wake};
use crate::settings::Settings;

/// Frames moving less than this on both axes skip the scroll call.
pub const MIN_STEP_PX: f64 = 0.5;

// ---------------------------------------------------------------------------
// Easing
// ---------------------------------------------------------------------------

/// Ease-out cubic: fast start, gentle deceleration.
///
/// `f(0) = 0`, `f(1) = 1`, monotone on `[0, 1]`. Input is clamped.
#[inline]
#[must_use]
pub fn ease_out_cubic(t: f64) -> f64 {
    let inv = 1.0 - t.clamp(0.0, 1.0);
    1.0 - inv * inv * inv
}

// ---------------------------------------------------------------------------
// Animation state
// ---------------------------------------------------------------------------

/// One in-flight animation cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationState {
    pub total_dx: f64,
    pub total_dy: f64,
    pub applied_dx: f64,
    pub applied_dy: f64,
    pub start: Instant,
    pub duration: Duration,
    pub frame: FrameId,
}

impl AnimationState {
    /// Distance requested but not yet applied.
    #[must_use]
    pub fn remaining(&self) -> (f64, f64) {
        (
            self.total_dx - self.applied_dx,
            self.total_dy - self.applied_dy,
        )
    }

    /// Elapsed fraction of the duration, clamped to `[0, 1]`. A zero
    /// duration is complete immediately.
    #[must_use]
    pub fn progress(&self, now: Instant) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.start);
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
    }
}

/// What one animation frame did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    /// Incremental delta computed for this frame.
    pub step: (f64, f64),
    /// Cumulative distance applied after this frame.
    pub applied: (f64, f64),
    pub total: (f64, f64),
    /// Whether the scroll primitive was called and succeeded.
    pub scrolled: bool,
    /// The animation ended with this frame.
    pub finished: bool,
}

/// Step direction for line scrolling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Unit vector in page coordinates (y grows downwards).
    #[must_use]
    pub const fn unit(self) -> (f64, f64) {
        match self {
            Self::Up => (0.0, -1.0),
            Self::Down => (0.0, 1.0),
            Self::Left => (-1.0, 0.0),
            Self::Right => (1.0, 0.0),
        }
    }
}

// ---------------------------------------------------------------------------
// Animator
// ---------------------------------------------------------------------------

/// Coalescing smooth-scroll driver.
#[derive(Debug, Default)]
pub struct ScrollAnimator {
    animation: Option<AnimationState>,
}

impl ScrollAnimator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> Option<&AnimationState> {
        self.animation.as_ref()
    }

    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    /// Animate a scroll by `(dx, dy)` over `duration`, merging with any
    /// animation already in flight.
    pub fn request(&mut self, dx: f64, dy: f64, duration: Duration, sched: &mut Scheduler<Wake>) {
        let start = sched.now();
        let state = match self.animation.take() {
            Some(current) => {
                sched.cancel_frame(current.frame);
                let (rx, ry) = current.remaining();
                tracing::trace!(
                    target: "vimnav.scroll",
                    remaining_dx = rx,
                    remaining_dy = ry,
                    dx,
                    dy,
                    "merging scroll request"
                );
                AnimationState {
                    total_dx: rx + dx,
                    total_dy: ry + dy,
                    applied_dx: 0.0,
                    applied_dy: 0.0,
                    start,
                    duration,
                    frame: sched.request_frame(Wake::ScrollFrame),
                }
            }
            None => AnimationState {
                total_dx: dx,
                total_dy: dy,
                applied_dx: 0.0,
                applied_dy: 0.0,
                start,
                duration,
                frame: sched.request_frame(Wake::ScrollFrame),
            },
        };
        self.animation = Some(state);
    }

    /// Run one animation frame. Stale frames (not the one this animator
    /// is waiting for) are ignored and yield `None`.
    pub fn on_frame<V: Viewport + ?Sized>(
        &mut self,
        frame: FrameId,
        now: Instant,
        viewport: &mut V,
        sched: &mut Scheduler<Wake>,
    ) -> Option<FrameReport> {
        let state = self.animation.as_mut()?;
        if state.frame != frame {
            return None;
        }

        let progress = state.progress(now);
        let eased = ease_out_cubic(progress);
        let target_dx = state.total_dx * eased;
        let target_dy = state.total_dy * eased;
        let step_dx = target_dx - state.applied_dx;
        let step_dy = target_dy - state.applied_dy;

        let mut scrolled = false;
        let mut abandon = false;
        if step_dx.abs() >= MIN_STEP_PX || step_dy.abs() >= MIN_STEP_PX {
            match viewport.scroll_by(step_dx, step_dy, ScrollBehavior::Instant) {
                Ok(()) => scrolled = true,
                Err(err) => {
                    abandon = err.disposition() == Disposition::Abandon;
                    log_scroll_failure(&err);
                }
            }
        }
        state.applied_dx = target_dx;
        state.applied_dy = target_dy;

        let report = FrameReport {
            step: (step_dx, step_dy),
            applied: (target_dx, target_dy),
            total: (state.total_dx, state.total_dy),
            scrolled,
            finished: progress >= 1.0 || abandon,
        };
        if report.finished {
            tracing::trace!(
                target: "vimnav.scroll",
                total_dx = state.total_dx,
                total_dy = state.total_dy,
                abandon,
                "animation finished"
            );
            self.animation = None;
        } else {
            state.frame = sched.request_frame(Wake::ScrollFrame);
        }
        Some(report)
    }

    /// Cancel the pending frame and drop the animation.
    pub fn reset(&mut self, sched: &mut Scheduler<Wake>) {
        if let Some(state) = self.animation.take() {
            sched.cancel_frame(state.frame);
        }
    }

    /// Line scroll by `scroll_step_size` pixels: animated when smooth
    /// scrolling is on, otherwise an instant native scroll.
    pub fn step<V: Viewport + ?Sized>(
        &mut self,
        direction: Direction,
        settings: &Settings,
        viewport: &mut V,
        sched: &mut Scheduler<Wake>,
    ) -> Result<(), HostError> {
        let (ux, uy) = direction.unit();
        let dx = ux * settings.scroll_step_size;
        let dy = uy * settings.scroll_step_size;
        if settings.smooth_scroll {
            self.request(dx, dy, settings.smooth_scroll_duration(), sched);
            Ok(())
        } else {
            viewport.scroll_by(dx, dy, ScrollBehavior::Instant)
        }
    }
}

fn log_scroll_failure(err: &HostError) {
    tracing::warn!(
        target: "vimnav.scroll",
        error = %err,
        error_type = err.error_type(),
        "scroll primitive failed"
    );
}

// ---------------------------------------------------------------------------
// Discrete jumps
// ---------------------------------------------------------------------------

/// Scroll half a viewport (scaled by `half_page_scroll`) up or down.
pub fn half_page<V: Viewport + ?Sized>(
    down: bool,
    settings: &Settings,
    viewport: &mut V,
) -> Result<(), HostError> {
    let distance = viewport.metrics().height * settings.half_page_scroll;
    let dy = if down { distance } else { -distance };
    viewport.scroll_by(0.0, dy, ScrollBehavior::from_smooth(settings.smooth_scroll))
}

/// Jump to the top, keeping the horizontal position.
pub fn go_to_top<V: Viewport + ?Sized>(settings: &Settings, viewport: &mut V) -> Result<(), HostError> {
    let x = viewport.metrics().scroll_x;
    viewport.scroll_to(x, 0.0, ScrollBehavior::from_smooth(settings.smooth_scroll))
}

/// Jump to the bottom, keeping the horizontal position.
pub fn go_to_bottom<V: Viewport + ?Sized>(settings: &Settings, viewport: &mut V) -> Result<(), HostError> {
    let metrics = viewport.metrics();
    viewport.scroll_to(
        metrics.scroll_x,
        metrics.max_scroll_y(),
        ScrollBehavior::from_smooth(settings.smooth_scroll),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ViewportMetrics;

    #[derive(Default)]
    struct Recorder {
        metrics: ViewportMetrics,
        by: Vec<(f64, f64, ScrollBehavior)>,
        to: Vec<(f64, f64, ScrollBehavior)>,
        fail_with: Option<HostError>,
    }

    impl Viewport for Recorder {
        fn metrics(&self) -> ViewportMetrics {
            self.metrics
        }

        fn scroll_by(&mut self, dx: f64, dy: f64, behavior: ScrollBehavior) -> Result<(), HostError> {
            if let Some(err) = self.fail_with.clone() {
                return Err(err);
            }
            self.by.push((dx, dy, behavior));
            Ok(())
        }

        fn scroll_to(&mut self, x: f64, y: f64, behavior: ScrollBehavior) -> Result<(), HostError> {
            self.to.push((x, y, behavior));
            Ok(())
        }
    }

    const MS_16: Duration = Duration::from_millis(16);
    const MS_150: Duration = Duration::from_millis(150);

    fn run_frames(
        animator: &mut ScrollAnimator,
        sched: &mut Scheduler<Wake>,
        viewport: &mut Recorder,
        until: Instant,
    ) -> Option<FrameReport> {
        let mut now = sched.now();
        let mut last = None;
        while animator.is_animating() && now <= until {
            now += MS_16;
            for (id, _) in sched.take_frames(now) {
                last = animator.on_frame(id, now, viewport, sched).or(last);
            }
        }
        last
    }

    #[test]
    fn easing_endpoints() {
        assert_eq!(ease_out_cubic(0.0), 0.0);
        assert_eq!(ease_out_cubic(1.0), 1.0);
        assert_eq!(ease_out_cubic(0.5), 0.875);
        assert_eq!(ease_out_cubic(2.0), 1.0);
        assert_eq!(ease_out_cubic(-1.0), 0.0);
    }

    #[test]
    fn idle_request_creates_animation() {
        let t = Instant::now();
        let mut sched = Scheduler::new(t);
        let mut anim = ScrollAnimator::new();
        anim.request(0.0, 150.0, MS_150, &mut sched);

        let state = anim.state().unwrap();
        assert_eq!(state.total_dy, 150.0);
        assert_eq!(state.applied_dy, 0.0);
        assert_eq!(state.start, t);
        assert_eq!(sched.pending_frames(), 1);
    }

    #[test]
    fn requests_merge_additively() {
        let t = Instant::now();
        let mut sched = Scheduler::new(t);
        let mut anim = ScrollAnimator::new();
        for _ in 0..3 {
            anim.request(0.0, 150.0, MS_150, &mut sched);
        }
        assert_eq!(anim.state().unwrap().total_dy, 450.0);
        assert_eq!(sched.pending_frames(), 1);
    }

    #[test]
    fn merge_uses_remaining_distance() {
        let t = Instant::now();
        let mut sched = Scheduler::new(t);
        let mut vp = Recorder::default();
        let mut anim = ScrollAnimator::new();
        anim.request(0.0, 100.0, Duration::from_millis(100), &mut sched);

        let half = t + Duration::from_millis(50);
        let (id, _) = sched.take_frames(half)[0];
        anim.on_frame(id, half, &mut vp, &mut sched);
        let applied = anim.state().unwrap().applied_dy;
        assert_eq!(applied, 87.5);

        anim.request(0.0, 100.0, Duration::from_millis(100), &mut sched);
        let state = anim.state().unwrap();
        assert_eq!(state.total_dy, 12.5 + 100.0);
        assert_eq!(state.applied_dy, 0.0);
        assert_eq!(state.start, half);
        assert_eq!(sched.pending_frames(), 1);
    }

    #[test]
    fn converges_exactly_and_goes_idle() {
        let t = Instant::now();
        let mut sched = Scheduler::new(t);
        let mut vp = Recorder::default();
        let mut anim = ScrollAnimator::new();
        anim.request(-40.0, 333.0, MS_150, &mut sched);
        let last = run_frames(&mut anim, &mut sched, &mut vp, t + Duration::from_secs(1)).unwrap();

        assert!(last.finished);
        assert_eq!(last.applied, (-40.0, 333.0));
        assert!(!anim.is_animating());
        assert_eq!(sched.pending_frames(), 0);
        // Skipped sub-pixel frames leave at most half a pixel per frame.
        let sum_y: f64 = vp.by.iter().map(|c| c.1).sum();
        assert!((sum_y - 333.0).abs() < 1.0);
        assert!(vp.by.iter().all(|c| c.2 == ScrollBehavior::Instant));
    }

    #[test]
    fn zero_duration_completes_on_first_frame() {
        let t = Instant::now();
        let mut sched = Scheduler::new(t);
        let mut vp = Recorder::default();
        let mut anim = ScrollAnimator::new();
        anim.request(0.0, 150.0, Duration::ZERO, &mut sched);
        let (id, _) = sched.take_frames(t)[0];
        let report = anim.on_frame(id, t, &mut vp, &mut sched).unwrap();
        assert!(report.finished && report.scrolled);
        assert!(!anim.is_animating());
        assert_eq!(vp.by, vec![(0.0, 150.0, ScrollBehavior::Instant)]);
    }

    #[test]
    fn sub_pixel_frames_skip_the_call() {
        let t = Instant::now();
        let mut sched = Scheduler::new(t);
        let mut vp = Recorder::default();
        let mut anim = ScrollAnimator::new();
        anim.request(0.0, 1.0, MS_150, &mut sched);

        let now = t + Duration::from_millis(10);
        let (id, _) = sched.take_frames(now)[0];
        let report = anim.on_frame(id, now, &mut vp, &mut sched).unwrap();
        assert!(!report.scrolled);
        assert!(vp.by.is_empty());
        assert!(anim.state().unwrap().applied_dy > 0.0);
    }

    #[test]
    fn stale_frame_is_ignored() {
        let t = Instant::now();
        let mut sched = Scheduler::new(t);
        let mut vp = Recorder::default();
        let mut anim = ScrollAnimator::new();
        anim.request(0.0, 150.0, MS_150, &mut sched);
        let stale = anim.state().unwrap().frame;
        anim.request(0.0, 150.0, MS_150, &mut sched);
        assert!(anim.on_frame(stale, t + MS_16, &mut vp, &mut sched).is_none());
        assert!(vp.by.is_empty());
    }

    #[test]
    fn reset_cancels_pending_frame() {
        let t = Instant::now();
        let mut sched = Scheduler::new(t);
        let mut anim = ScrollAnimator::new();
        anim.request(0.0, 150.0, MS_150, &mut sched);
        anim.reset(&mut sched);
        assert!(!anim.is_animating());
        assert_eq!(sched.pending_frames(), 0);
    }

    // Stricter than a plain discard: `Unsupported` ends the animation.
    #[test]
    fn unsupported_scroll_ends_animation_early() {
        let t = Instant::now();
        let mut sched = Scheduler::new(t);
        let mut vp = Recorder {
            fail_with: Some(HostError::Unsupported("scroll")),
            ..Default::default()
        };
        let mut anim = ScrollAnimator::new();
        anim.request(0.0, 150.0, MS_150, &mut sched);
        let (id, _) = sched.take_frames(t + MS_16)[0];
        anim.on_frame(id, t + MS_16, &mut vp, &mut sched);
        assert!(!anim.is_animating());
        assert_eq!(sched.pending_frames(), 0);
    }

    #[test]
    fn rejected_scroll_keeps_animating() {
        let t = Instant::now();
        let mut sched = Scheduler::new(t);
        let mut vp = Recorder {
            fail_with: Some(HostError::Rejected("busy".into())),
            ..Default::default()
        };
        let mut anim = ScrollAnimator::new();
        anim.request(0.0, 150.0, MS_150, &mut sched);
        let (id, _) = sched.take_frames(t + MS_16)[0];
        anim.on_frame(id, t + MS_16, &mut vp, &mut sched);
        assert!(anim.is_animating());
        assert_eq!(sched.pending_frames(), 1);
    }

    #[test]
    fn step_without_smooth_scrolls_instantly() {
        let t = Instant::now();
        let mut sched = Scheduler::new(t);
        let mut vp = Recorder::default();
        let mut anim = ScrollAnimator::new();
        let settings = Settings {
            smooth_scroll: false,
            ..Settings::default()
        };
        anim.step(Direction::Left, &settings, &mut vp, &mut sched).unwrap();
        assert_eq!(vp.by, vec![(-150.0, 0.0, ScrollBehavior::Instant)]);
        assert!(!anim.is_animating());
    }

    #[test]
    fn step_with_smooth_animates() {
        let t = Instant::now();
        let mut sched = Scheduler::new(t);
        let mut vp = Recorder::default();
        let mut anim = ScrollAnimator::new();
        anim.step(Direction::Up, &Settings::default(), &mut vp, &mut sched).unwrap();
        assert!(vp.by.is_empty());
        let state = anim.state().unwrap();
        assert_eq!(state.total_dy, -150.0);
        assert_eq!(state.duration, MS_150);
    }

    #[test]
    fn discrete_jumps_use_native_behavior() {
        let mut vp = Recorder {
            metrics: ViewportMetrics {
                width: 1024.0,
                height: 800.0,
                scroll_x: 12.0,
                scroll_y: 300.0,
                scroll_height: 5000.0,
            },
            ..Default::default()
        };
        let smooth = Settings::default();
        let instant = Settings {
            smooth_scroll: false,
            ..Settings::default()
        };

        half_page(true, &smooth, &mut vp).unwrap();
        half_page(false, &instant, &mut vp).unwrap();
        assert_eq!(
            vp.by,
            vec![
                (0.0, 400.0, ScrollBehavior::Smooth),
                (0.0, -400.0, ScrollBehavior::Instant)
            ]
        );

        go_to_top(&smooth, &mut vp).unwrap();
        go_to_bottom(&instant, &mut vp).unwrap();
        assert_eq!(
            vp.to,
            vec![
                (12.0, 0.0, ScrollBehavior::Smooth),
                (12.0, 4200.0, ScrollBehavior::Instant)
            ]
        );
    }
}
