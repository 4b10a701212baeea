//! Stillness detection over one input channel.
//!
//! A debouncer: every event on the channel pushes a countdown back, and the
//! countdown firing means the reader has gone quiet. The same detector serves
//! scroll stillness and pointer stillness; each instance owns its own timer
//! and listener.

use crate::callback::Callback;
use crate::config::IdleConfig;
use crate::input::{InputHub, PointerEvent, Subscription};
use crate::scheduler::{CancelToken, Scheduler, TimerId};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// Which input stream counts as activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdleChannel {
    /// Scroll events.
    Scroll,
    /// Pointer movement. Presses and releases do not count.
    PointerMove,
}

/// Observable state of a detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleState {
    Still,
    Moving,
}

struct IdleShared {
    scheduler: Scheduler,
    channel: IdleChannel,
    delay_ms: u64,
    still: Cell<bool>,
    timer: Cell<Option<TimerId>>,
    on_still: Callback<()>,
    on_move: Callback<()>,
    token: CancelToken,
}

impl IdleShared {
    fn handle_input(self: &Rc<Self>) {
        if self.token.is_cancelled() {
            return;
        }

        if self.still.replace(false) {
            log::debug!("{:?} idle detector: moving", self.channel);
            self.on_move.invoke(());
        }

        if let Some(timer) = self.timer.take() {
            self.scheduler.clear_timeout(timer);
        }
        // on_move may have destroyed the detector
        if self.token.is_cancelled() {
            return;
        }

        let weak: Weak<Self> = Rc::downgrade(self);
        let timer = self.scheduler.set_timeout(
            self.delay_ms,
            self.token.guard(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.countdown_elapsed();
                }
            }),
        );
        self.timer.set(Some(timer));
    }

    /// Fires `on_still` whatever the previous state was.
    fn countdown_elapsed(&self) {
        self.timer.set(None);
        self.still.set(true);
        log::debug!("{:?} idle detector: still", self.channel);
        self.on_still.invoke(());
    }
}

/// Converts an input stream into `on_still` / `on_move` transitions.
///
/// Each event on the channel calls `on_move` if the detector was still, then
/// restarts a countdown of `delay_ms`. When the countdown elapses the
/// detector becomes still and calls `on_still`.
pub struct IdleDetector {
    shared: Rc<IdleShared>,
    subscription: RefCell<Option<Subscription>>,
}

impl IdleDetector {
    pub fn new(
        scheduler: &Scheduler,
        hub: &InputHub,
        channel: IdleChannel,
        config: &IdleConfig,
        on_still: impl FnMut() + 'static,
        on_move: impl FnMut() + 'static,
    ) -> Self {
        let shared = Rc::new(IdleShared {
            scheduler: scheduler.clone(),
            channel,
            delay_ms: config.delay_ms,
            still: Cell::new(false),
            timer: Cell::new(None),
            on_still: Callback::from_fn("on_still", on_still),
            on_move: Callback::from_fn("on_move", on_move),
            token: CancelToken::new(),
        });

        let weak = Rc::downgrade(&shared);
        let subscription = match channel {
            IdleChannel::Scroll => hub.on_scroll(move |_| {
                if let Some(shared) = weak.upgrade() {
                    shared.handle_input();
                }
            }),
            IdleChannel::PointerMove => hub.on_pointer(move |event| {
                if !matches!(event, PointerEvent::Move { .. }) {
                    return;
                }
                if let Some(shared) = weak.upgrade() {
                    shared.handle_input();
                }
            }),
        };
        log::debug!("{channel:?} idle detector attached ({}ms)", config.delay_ms);

        Self {
            shared,
            subscription: RefCell::new(Some(subscription)),
        }
    }

    /// Scroll stillness detector.
    pub fn scroll(
        scheduler: &Scheduler,
        hub: &InputHub,
        config: &IdleConfig,
        on_still: impl FnMut() + 'static,
        on_move: impl FnMut() + 'static,
    ) -> Self {
        Self::new(scheduler, hub, IdleChannel::Scroll, config, on_still, on_move)
    }

    /// Pointer stillness detector.
    pub fn pointer(
        scheduler: &Scheduler,
        hub: &InputHub,
        config: &IdleConfig,
        on_still: impl FnMut() + 'static,
        on_move: impl FnMut() + 'static,
    ) -> Self {
        Self::new(scheduler, hub, IdleChannel::PointerMove, config, on_still, on_move)
    }

    pub fn channel(&self) -> IdleChannel {
        self.shared.channel
    }

    pub fn state(&self) -> IdleState {
        if self.shared.still.get() {
            IdleState::Still
        } else {
            IdleState::Moving
        }
    }

    /// Whether a countdown is pending.
    pub fn is_counting_down(&self) -> bool {
        self.shared.timer.get().is_some()
    }

    pub fn is_destroyed(&self) -> bool {
        self.shared.token.is_cancelled()
    }

    /// Detach the listener and clear the countdown. Safe to call repeatedly.
    pub fn destroy(&self) {
        if self.shared.token.is_cancelled() {
            return;
        }
        self.shared.token.cancel();
        if let Some(timer) = self.shared.timer.take() {
            self.shared.scheduler.clear_timeout(timer);
        }
        let subscription = self.subscription.borrow_mut().take();
        drop(subscription);
        log::debug!("{:?} idle detector destroyed", self.shared.channel);
    }
}

impl Drop for IdleDetector {
    fn drop(&mut self) {
        self.destroy();
    }
}
