//! Host-driven cooperative scheduler for timers and frame callbacks.
//!
//! Nothing here blocks. Components register callbacks and return; the host
//! moves time forward with [`Scheduler::advance_to`] (from its frame loop in
//! a browser, or directly in tests), which fires due timers in deadline order
//! and then runs one animation frame.

use crate::timing::{Clock, Timestamp};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

/// Callback fired when a timer elapses.
pub type TimerCallback = Box<dyn FnOnce()>;

/// Callback fired on the next frame with the frame time.
pub type FrameCallback = Box<dyn FnOnce(Timestamp)>;

/// Handle to a pending timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

/// Handle to a pending frame request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameId(u64);

#[derive(Default)]
struct SchedulerInner {
    now: Timestamp,
    next_id: u64,
    /// Keyed by deadline, then registration order.
    timers: BTreeMap<(Timestamp, TimerId), TimerCallback>,
    /// Keyed by registration order.
    frames: BTreeMap<FrameId, FrameCallback>,
}

impl SchedulerInner {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Single-threaded scheduler handle. Clones share the same queues.
#[derive(Clone, Default)]
pub struct Scheduler {
    inner: Rc<RefCell<SchedulerInner>>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Scheduler")
            .field("now", &inner.now)
            .field("pending_timers", &inner.timers.len())
            .field("pending_frames", &inner.frames.len())
            .finish()
    }
}

impl Scheduler {
    /// Create a scheduler at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scheduler whose clock starts at `now`.
    pub fn starting_at(now: Timestamp) -> Self {
        let scheduler = Self::new();
        scheduler.inner.borrow_mut().now = now;
        scheduler
    }

    /// Current scheduler time.
    pub fn now(&self) -> Timestamp {
        self.inner.borrow().now
    }

    /// Run `callback` once `delay_ms` has elapsed.
    pub fn set_timeout(&self, delay_ms: u64, callback: impl FnOnce() + 'static) -> TimerId {
        let mut inner = self.inner.borrow_mut();
        let id = TimerId(inner.next_id());
        let deadline = inner.now.saturating_add(delay_ms);
        inner.timers.insert((deadline, id), Box::new(callback));
        id
    }

    /// Cancel a pending timer. Unknown or already fired ids are ignored.
    pub fn clear_timeout(&self, id: TimerId) {
        self.inner
            .borrow_mut()
            .timers
            .retain(|(_, timer), _| *timer != id);
    }

    /// Run `callback` on the next frame.
    pub fn request_frame(&self, callback: impl FnOnce(Timestamp) + 'static) -> FrameId {
        let mut inner = self.inner.borrow_mut();
        let id = FrameId(inner.next_id());
        inner.frames.insert(id, Box::new(callback));
        id
    }

    /// Cancel a pending frame request. Unknown or already run ids are ignored.
    pub fn cancel_frame(&self, id: FrameId) {
        self.inner.borrow_mut().frames.remove(&id);
    }

    /// Number of timers waiting to fire.
    pub fn pending_timers(&self) -> usize {
        self.inner.borrow().timers.len()
    }

    /// Number of frame callbacks waiting for the next frame.
    pub fn pending_frames(&self) -> usize {
        self.inner.borrow().frames.len()
    }

    /// Move the clock to `target`, firing due timers, then run one frame.
    ///
    /// Timers fire in deadline order with the clock set to their deadline.
    /// Timers registered by callbacks fire in the same call if they fall due
    /// before `target`. A `target` in the past is ignored.
    pub fn advance_to(&self, target: Timestamp) {
        let now = self.now();
        if target < now {
            log::warn!(
                "Ignoring scheduler time {}ms earlier than current {}ms",
                target.as_millis(),
                now.as_millis()
            );
            return;
        }

        loop {
            let callback = {
                let mut inner = self.inner.borrow_mut();
                match inner.timers.first_key_value() {
                    Some((&(deadline, _), _)) if deadline <= target => {}
                    _ => break,
                }
                let Some(((deadline, _), callback)) = inner.timers.pop_first() else {
                    break;
                };
                inner.now = deadline;
                callback
            };
            callback();
        }

        self.inner.borrow_mut().now = target;
        self.run_frame();
    }

    /// Move the clock forward by `millis`, then run one frame.
    pub fn advance_by(&self, millis: u64) {
        self.advance_to(self.now().saturating_add(millis));
    }

    /// Move the clock to the time reported by `clock`.
    pub fn sync_with(&self, clock: &impl Clock) {
        self.advance_to(clock.now());
    }

    /// Run every frame callback registered before this call.
    ///
    /// Callbacks requested while the frame runs wait for the next frame.
    /// Returns the number of callbacks that ran.
    pub fn run_frame(&self) -> usize {
        let (now, batch): (Timestamp, Vec<FrameId>) = {
            let inner = self.inner.borrow();
            (inner.now, inner.frames.keys().copied().collect())
        };

        let mut ran = 0;
        for id in batch {
            // Earlier callbacks in this batch may have cancelled later ones
            let callback = self.inner.borrow_mut().frames.remove(&id);
            if let Some(callback) = callback {
                callback(now);
                ran += 1;
            }
        }
        ran
    }
}

impl Clock for Scheduler {
    fn now(&self) -> Timestamp {
        Scheduler::now(self)
    }
}

/// Shared flag marking a component as torn down.
///
/// Scheduled callbacks hold a clone and become no-ops once it is cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Rc<Cell<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }

    /// Wrap `callback` so it does nothing after cancellation.
    pub fn guard(&self, callback: impl FnOnce() + 'static) -> impl FnOnce() + 'static {
        let token = self.clone();
        move || {
            if !token.is_cancelled() {
                callback();
            }
        }
    }
}
