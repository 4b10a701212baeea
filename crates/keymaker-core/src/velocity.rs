//! Per-frame scroll velocity tracking.

use crate::callback::Callback;
use crate::input::InputHub;
use crate::scheduler::{CancelToken, FrameId, Scheduler};
use crate::timing::{Sample, Timestamp};
use std::cell::Cell;
use std::rc::{Rc, Weak};

/// Something that knows the current scroll offset.
pub trait ScrollSource {
    fn scroll_offset(&self) -> f64;
}

impl<F: Fn() -> f64> ScrollSource for F {
    fn scroll_offset(&self) -> f64 {
        self()
    }
}

impl ScrollSource for InputHub {
    fn scroll_offset(&self) -> f64 {
        InputHub::scroll_offset(self)
    }
}

/// How the reader is moving through the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollPace {
    Calm,
    Rushing,
}

impl ScrollPace {
    /// Velocities strictly above `threshold` are rushing.
    pub fn classify(velocity: f64, threshold: f64) -> Self {
        if velocity > threshold {
            ScrollPace::Rushing
        } else {
            ScrollPace::Calm
        }
    }
}

struct TrackerState {
    scheduler: Scheduler,
    source: Box<dyn ScrollSource>,
    on_velocity: Callback<f64>,
    previous: Cell<Sample<f64>>,
    velocity: Cell<f64>,
    frame: Cell<Option<FrameId>>,
    token: CancelToken,
}

impl TrackerState {
    fn schedule(self: &Rc<Self>) {
        let weak: Weak<Self> = Rc::downgrade(self);
        let token = self.token.clone();
        let id = self.scheduler.request_frame(move |now| {
            if token.is_cancelled() {
                return;
            }
            if let Some(state) = weak.upgrade() {
                state.sample(now);
            }
        });
        self.frame.set(Some(id));
    }

    fn sample(self: &Rc<Self>, now: Timestamp) {
        self.frame.set(None);

        let current = Sample::new(self.source.scroll_offset(), now);
        let velocity = self.previous.get().speed_to(&current);
        self.velocity.set(velocity);
        self.previous.set(current);
        log::trace!("scroll velocity {velocity:.3} px/ms at {}ms", now.as_millis());

        self.on_velocity.invoke(velocity);

        // The callback may have stopped the tracker
        if !self.token.is_cancelled() {
            self.schedule();
        }
    }
}

/// Samples the scroll offset on every frame and reports its speed.
///
/// Reports `|Δoffset| / Δt` in px/ms. Frames that share a timestamp with the
/// previous sample, or arrive with an earlier one, report `0`.
pub struct VelocityTracker {
    state: Rc<TrackerState>,
}

impl VelocityTracker {
    /// Start sampling on the next frame.
    ///
    /// The first reported velocity is measured against the offset at the
    /// time of this call.
    pub fn start(
        scheduler: &Scheduler,
        source: impl ScrollSource + 'static,
        on_velocity: impl FnMut(f64) + 'static,
    ) -> Self {
        let previous = Sample::new(source.scroll_offset(), scheduler.now());
        let state = Rc::new(TrackerState {
            scheduler: scheduler.clone(),
            source: Box::new(source),
            on_velocity: Callback::new("velocity", on_velocity),
            previous: Cell::new(previous),
            velocity: Cell::new(0.0),
            frame: Cell::new(None),
            token: CancelToken::new(),
        });
        state.schedule();
        log::debug!("velocity tracker started");
        Self { state }
    }

    /// Velocity reported by the latest frame.
    pub fn velocity(&self) -> f64 {
        self.state.velocity.get()
    }

    /// Pace of the latest frame against `threshold`.
    pub fn pace(&self, threshold: f64) -> ScrollPace {
        ScrollPace::classify(self.velocity(), threshold)
    }

    pub fn is_running(&self) -> bool {
        !self.state.token.is_cancelled()
    }

    /// Stop sampling. No callback fires afterwards. Safe to call repeatedly.
    pub fn stop(&self) {
        if self.state.token.is_cancelled() {
            return;
        }
        self.state.token.cancel();
        if let Some(id) = self.state.frame.take() {
            self.state.scheduler.cancel_frame(id);
        }
        log::debug!("velocity tracker stopped");
    }
}

impl Drop for VelocityTracker {
    fn drop(&mut self) {
        self.stop();
    }
}
