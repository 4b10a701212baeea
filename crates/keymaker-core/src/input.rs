//! Platform input abstraction for scroll and pointer events.
//!
//! Mouse and touch input are unified into [`PointerEvent`]. Components never
//! attach to a window or document directly: they subscribe to an
//! [`InputHub`] and own the returned [`Subscription`], which removes the
//! listener when released or dropped. The host (a browser binding, the
//! headless driver, or a test) feeds raw events in with the `dispatch_*`
//! methods.

use crate::timing::Timestamp;
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// Identifies an element that can receive pointer presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementId(pub u32);

/// Input device a pointer event came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointerKind {
    #[default]
    Mouse,
    Touch,
}

/// Pointer event type for unified mouse/touch handling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    /// Press. `target` is the element under the pointer, if it has an id.
    Down {
        position: Point,
        timestamp: Timestamp,
        #[serde(default)]
        kind: PointerKind,
        #[serde(default)]
        target: Option<ElementId>,
    },
    Move {
        position: Point,
        timestamp: Timestamp,
        #[serde(default)]
        kind: PointerKind,
    },
    Up {
        position: Point,
        timestamp: Timestamp,
        #[serde(default)]
        kind: PointerKind,
    },
}

impl PointerEvent {
    pub fn position(&self) -> Point {
        match *self {
            Self::Down { position, .. }
            | Self::Move { position, .. }
            | Self::Up { position, .. } => position,
        }
    }

    pub fn timestamp(&self) -> Timestamp {
        match *self {
            Self::Down { timestamp, .. }
            | Self::Move { timestamp, .. }
            | Self::Up { timestamp, .. } => timestamp,
        }
    }

    pub fn kind(&self) -> PointerKind {
        match *self {
            Self::Down { kind, .. } | Self::Move { kind, .. } | Self::Up { kind, .. } => kind,
        }
    }
}

/// The page scrolled to `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScrollEvent {
    pub offset: f64,
    pub timestamp: Timestamp,
}

type Handler<E> = Rc<dyn Fn(&E)>;

struct Listener<E> {
    id: u64,
    active: Rc<Cell<bool>>,
    handler: Handler<E>,
}

struct ChannelInner<E> {
    next_id: u64,
    listeners: Vec<Listener<E>>,
}

/// A list of listeners for one kind of event.
pub struct Channel<E> {
    inner: Rc<RefCell<ChannelInner<E>>>,
}

impl<E> Clone for Channel<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E> Default for Channel<E> {
    fn default() -> Self {
        Self {
            inner: Rc::new(RefCell::new(ChannelInner {
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }
}

impl<E: 'static> Channel<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener. It stays attached until the subscription is released.
    pub fn subscribe(&self, handler: impl Fn(&E) + 'static) -> Subscription {
        let active = Rc::new(Cell::new(true));
        let id = {
            let mut inner = self.inner.borrow_mut();
            inner.next_id += 1;
            let id = inner.next_id;
            inner.listeners.push(Listener {
                id,
                active: active.clone(),
                handler: Rc::new(handler),
            });
            id
        };

        let channel: Weak<RefCell<ChannelInner<E>>> = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            active.set(false);
            if let Some(channel) = channel.upgrade() {
                channel.borrow_mut().listeners.retain(|l| l.id != id);
            }
        })
    }

    /// Deliver `event` to every listener attached when dispatch started.
    ///
    /// Listeners added during dispatch wait for the next event; listeners
    /// removed during dispatch are not called.
    pub fn dispatch(&self, event: &E) {
        let snapshot: Vec<(Rc<Cell<bool>>, Handler<E>)> = self
            .inner
            .borrow()
            .listeners
            .iter()
            .map(|l| (l.active.clone(), l.handler.clone()))
            .collect();

        for (active, handler) in snapshot {
            if active.get() {
                handler(event);
            }
        }
    }

    /// Number of attached listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }
}

/// Owned registration of a listener. Releasing or dropping it detaches the
/// listener; releasing twice is a no-op.
pub struct Subscription {
    release: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    fn new(release: impl FnOnce() + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Detach the listener now.
    pub fn release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }

    /// Whether the listener is still attached.
    pub fn is_active(&self) -> bool {
        self.release.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Page-level input source shared by every engine component.
#[derive(Clone, Default)]
pub struct InputHub {
    scroll: Channel<ScrollEvent>,
    pointer: Channel<PointerEvent>,
    scroll_offset: Rc<Cell<f64>>,
}

impl InputHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listen for scroll events.
    pub fn on_scroll(&self, handler: impl Fn(&ScrollEvent) + 'static) -> Subscription {
        self.scroll.subscribe(handler)
    }

    /// Listen for every pointer event on the page.
    pub fn on_pointer(&self, handler: impl Fn(&PointerEvent) + 'static) -> Subscription {
        self.pointer.subscribe(handler)
    }

    /// Feed a scroll event. The offset is remembered for [`Self::scroll_offset`].
    pub fn dispatch_scroll(&self, event: ScrollEvent) {
        self.scroll_offset.set(event.offset);
        self.scroll.dispatch(&event);
    }

    /// Feed a pointer event.
    pub fn dispatch_pointer(&self, event: PointerEvent) {
        self.pointer.dispatch(&event);
    }

    /// Last scroll offset seen by this hub.
    pub fn scroll_offset(&self) -> f64 {
        self.scroll_offset.get()
    }

    /// Total listeners attached across all channels.
    pub fn listener_count(&self) -> usize {
        self.scroll.listener_count() + self.pointer.listener_count()
    }
}

impl std::fmt::Debug for InputHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputHub")
            .field("scroll_listeners", &self.scroll.listener_count())
            .field("pointer_listeners", &self.pointer.listener_count())
            .field("scroll_offset", &self.scroll_offset.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pointer_move(x: f64, y: f64, ms: u64) -> PointerEvent {
        PointerEvent::Move {
            position: Point::new(x, y),
            timestamp: Timestamp::from_millis(ms),
            kind: PointerKind::Mouse,
        }
    }

    #[test]
    fn test_subscribe_and_dispatch() {
        let hub = InputHub::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = seen.clone();
        let _sub = hub.on_pointer(move |e| sink.borrow_mut().push(e.position()));

        hub.dispatch_pointer(pointer_move(10.0, 20.0, 0));
        hub.dispatch_pointer(pointer_move(15.0, 25.0, 16));

        assert_eq!(
            *seen.borrow(),
            vec![Point::new(10.0, 20.0), Point::new(15.0, 25.0)]
        );
    }

    #[test]
    fn test_drop_releases_listener() {
        let hub = InputHub::new();
        let count = Rc::new(Cell::new(0));

        let counter = count.clone();
        let sub = hub.on_scroll(move |_| counter.set(counter.get() + 1));
        assert_eq!(hub.listener_count(), 1);

        drop(sub);
        assert_eq!(hub.listener_count(), 0);

        hub.dispatch_scroll(ScrollEvent {
            offset: 10.0,
            timestamp: Timestamp::ZERO,
        });
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn test_release_twice_is_noop() {
        let hub = InputHub::new();
        let mut sub = hub.on_scroll(|_| {});

        sub.release();
        assert!(!sub.is_active());
        sub.release();
        assert_eq!(hub.listener_count(), 0);
    }

    #[test]
    fn test_listener_removed_during_dispatch_is_skipped() {
        let hub = InputHub::new();
        let count = Rc::new(Cell::new(0));
        let second: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        let victim = second.clone();
        let _first = hub.on_pointer(move |_| {
            victim.borrow_mut().take();
        });
        let counter = count.clone();
        *second.borrow_mut() = Some(hub.on_pointer(move |_| counter.set(counter.get() + 1)));

        hub.dispatch_pointer(pointer_move(0.0, 0.0, 0));
        assert_eq!(count.get(), 0);
        assert_eq!(hub.listener_count(), 1);
    }

    #[test]
    fn test_listener_added_during_dispatch_waits() {
        let hub = InputHub::new();
        let count = Rc::new(Cell::new(0));
        let added: Rc<RefCell<Vec<Subscription>>> = Rc::new(RefCell::new(Vec::new()));

        let inner_hub = hub.clone();
        let counter = count.clone();
        let store = added.clone();
        let _sub = hub.on_pointer(move |_| {
            let counter = counter.clone();
            let sub = inner_hub.on_pointer(move |_| counter.set(counter.get() + 1));
            store.borrow_mut().push(sub);
        });

        hub.dispatch_pointer(pointer_move(0.0, 0.0, 0));
        assert_eq!(count.get(), 0);

        hub.dispatch_pointer(pointer_move(1.0, 0.0, 16));
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_scroll_offset_is_remembered() {
        let hub = InputHub::new();
        assert_eq!(hub.scroll_offset(), 0.0);

        hub.dispatch_scroll(ScrollEvent {
            offset: 420.0,
            timestamp: Timestamp::from_millis(5),
        });
        assert_eq!(hub.scroll_offset(), 420.0);
    }

    #[test]
    fn test_pointer_event_accessors() {
        let event = PointerEvent::Down {
            position: Point::new(3.0, 4.0),
            timestamp: Timestamp::from_millis(9),
            kind: PointerKind::Touch,
            target: Some(ElementId(7)),
        };

        assert_eq!(event.position(), Point::new(3.0, 4.0));
        assert_eq!(event.timestamp(), Timestamp::from_millis(9));
        assert_eq!(event.kind(), PointerKind::Touch);
    }

    #[test]
    fn test_pointer_event_json() {
        let json = r#"{"Move":{"position":{"x":1.0,"y":2.0},"timestamp":16}}"#;
        let event: PointerEvent = serde_json::from_str(json).unwrap();

        assert_eq!(event, pointer_move(1.0, 2.0, 16));
    }
}
