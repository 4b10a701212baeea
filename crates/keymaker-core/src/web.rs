//! Browser bindings: logging, reduced-motion query, and the event pump that
//! feeds window input and animation frames into the engine.

use crate::input::{ElementId, InputHub, PointerEvent, PointerKind, ScrollEvent};
use crate::scheduler::Scheduler;
use crate::timing::{Clock, SystemClock, Timestamp};
use kurbo::Point;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use thiserror::Error;
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;

/// Attribute carrying the [`ElementId`] of a pressable element.
pub const ELEMENT_ID_ATTRIBUTE: &str = "data-keymaker-id";

/// Errors from the browser bindings.
#[derive(Debug, Error)]
pub enum WebError {
    #[error("No window object")]
    NoWindow,
    #[error("Failed to attach {event} listener: {message}")]
    Listener { event: &'static str, message: String },
    #[error("Failed to request animation frame: {0}")]
    Frame(String),
}

pub type WebResult<T> = Result<T, WebError>;

/// Install the panic hook and the console logger. Safe to call twice.
pub fn init_logging(level: log::Level) {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(level).is_err() {
        log::debug!("console logger already installed");
    }
}

/// Whether the user asked the system to minimize motion.
pub fn prefers_reduced_motion() -> bool {
    web_sys::window()
        .and_then(|window| window.match_media("(prefers-reduced-motion: reduce)").ok().flatten())
        .is_some_and(|query| query.matches())
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Down,
    Move,
    Up,
}

/// The id in [`ELEMENT_ID_ATTRIBUTE`] of the closest tagged ancestor of the
/// event target.
fn target_id(event: &web_sys::Event) -> Option<ElementId> {
    let element = event.target()?.dyn_into::<web_sys::Element>().ok()?;
    let tagged = element
        .closest(&format!("[{ELEMENT_ID_ATTRIBUTE}]"))
        .ok()
        .flatten()?;
    tagged
        .get_attribute(ELEMENT_ID_ATTRIBUTE)?
        .parse::<u32>()
        .ok()
        .map(ElementId)
}

fn pointer_event(
    phase: Phase,
    position: Point,
    timestamp: Timestamp,
    kind: PointerKind,
    event: &web_sys::Event,
) -> PointerEvent {
    match phase {
        Phase::Down => PointerEvent::Down {
            position,
            timestamp,
            kind,
            target: target_id(event),
        },
        Phase::Move => PointerEvent::Move {
            position,
            timestamp,
            kind,
        },
        Phase::Up => PointerEvent::Up {
            position,
            timestamp,
            kind,
        },
    }
}

fn touch_position(event: &web_sys::TouchEvent, phase: Phase) -> Option<Point> {
    // A lifted finger is only listed in changedTouches
    let touches = match phase {
        Phase::Up => event.changed_touches(),
        Phase::Down | Phase::Move => event.touches(),
    };
    let touch = touches.get(0)?;
    Some(Point::new(touch.client_x() as f64, touch.client_y() as f64))
}

type Listener = Closure<dyn FnMut(web_sys::Event)>;
type FrameLoop = Closure<dyn FnMut(f64)>;

/// Pumps window input and animation frames into an [`InputHub`] and a
/// [`Scheduler`].
///
/// Each animation frame moves the scheduler to the wall clock. Scroll, mouse
/// and touch events on the window are converted and dispatched to the hub
/// with wall-clock timestamps. The scheduler should be fresh: its clock is
/// aligned with the moment of attaching.
pub struct WebPlatform {
    window: web_sys::Window,
    scheduler: Scheduler,
    hub: InputHub,
    clock: SystemClock,
    running: Rc<Cell<bool>>,
    frame_request: Rc<Cell<Option<i32>>>,
    frame_loop: Rc<RefCell<Option<FrameLoop>>>,
    /// Kept until drop, since a listener may detach the platform while it runs.
    listeners: Vec<(&'static str, Listener)>,
}

impl WebPlatform {
    pub fn attach(scheduler: &Scheduler, hub: &InputHub) -> WebResult<Self> {
        let window = web_sys::window().ok_or(WebError::NoWindow)?;
        let mut platform = Self {
            window,
            scheduler: scheduler.clone(),
            hub: hub.clone(),
            clock: SystemClock::new(),
            running: Rc::new(Cell::new(true)),
            frame_request: Rc::new(Cell::new(None)),
            frame_loop: Rc::new(RefCell::new(None)),
            listeners: Vec::new(),
        };

        platform.listen_scroll()?;
        platform.listen_mouse()?;
        platform.listen_touch()?;
        platform.start_frames()?;
        log::info!("web platform attached");
        Ok(platform)
    }

    pub fn clock(&self) -> SystemClock {
        self.clock
    }

    pub fn is_attached(&self) -> bool {
        self.running.get()
    }

    /// Remove every window listener and stop the frame loop.
    pub fn detach(&mut self) {
        if !self.running.replace(false) {
            return;
        }
        if let Some(id) = self.frame_request.take() {
            if let Err(e) = self.window.cancel_animation_frame(id) {
                log::warn!("Failed to cancel animation frame: {:?}", e);
            }
        }
        for (event, listener) in &self.listeners {
            if let Err(e) = self
                .window
                .remove_event_listener_with_callback(event, listener.as_ref().unchecked_ref())
            {
                log::warn!("Failed to remove {} listener: {:?}", event, e);
            }
        }
        log::info!("web platform detached");
    }

    fn listen(
        &mut self,
        event: &'static str,
        handler: impl FnMut(web_sys::Event) + 'static,
    ) -> WebResult<()> {
        self.add_listener(event, None, handler)
    }

    /// Listen with `passive: false`, so the handler may cancel the event.
    fn listen_active(
        &mut self,
        event: &'static str,
        handler: impl FnMut(web_sys::Event) + 'static,
    ) -> WebResult<()> {
        let options = web_sys::AddEventListenerOptions::new();
        options.set_passive(false);
        self.add_listener(event, Some(&options), handler)
    }

    fn add_listener(
        &mut self,
        event: &'static str,
        options: Option<&web_sys::AddEventListenerOptions>,
        handler: impl FnMut(web_sys::Event) + 'static,
    ) -> WebResult<()> {
        let listener = Closure::wrap(Box::new(handler) as Box<dyn FnMut(web_sys::Event)>);
        let callback = listener.as_ref().unchecked_ref();
        let added = match options {
            Some(options) => self
                .window
                .add_event_listener_with_callback_and_add_event_listener_options(
                    event, callback, options,
                ),
            None => self.window.add_event_listener_with_callback(event, callback),
        };
        added.map_err(|e| WebError::Listener {
            event,
            message: format!("{:?}", e),
        })?;
        self.listeners.push((event, listener));
        Ok(())
    }

    fn listen_scroll(&mut self) -> WebResult<()> {
        let hub = self.hub.clone();
        let clock = self.clock;
        let window = self.window.clone();
        self.listen("scroll", move |_event| {
            let offset = window.scroll_y().unwrap_or_else(|_| hub.scroll_offset());
            hub.dispatch_scroll(ScrollEvent {
                offset,
                timestamp: clock.now(),
            });
        })
    }

    fn listen_mouse(&mut self) -> WebResult<()> {
        for (name, phase) in [
            ("mousedown", Phase::Down),
            ("mousemove", Phase::Move),
            ("mouseup", Phase::Up),
        ] {
            let hub = self.hub.clone();
            let clock = self.clock;
            self.listen(name, move |event| {
                let Some(mouse) = event.dyn_ref::<web_sys::MouseEvent>() else {
                    return;
                };
                let position = Point::new(mouse.client_x() as f64, mouse.client_y() as f64);
                hub.dispatch_pointer(pointer_event(
                    phase,
                    position,
                    clock.now(),
                    PointerKind::Mouse,
                    &event,
                ));
            })?;
        }
        Ok(())
    }

    /// Touches that start on a tagged element are claimed: their start and
    /// moves are cancelled so the page neither scrolls nor synthesizes mouse
    /// events under the drag.
    fn listen_touch(&mut self) -> WebResult<()> {
        let pressing = Rc::new(Cell::new(false));
        for (name, phase) in [
            ("touchstart", Phase::Down),
            ("touchmove", Phase::Move),
            ("touchend", Phase::Up),
            ("touchcancel", Phase::Up),
        ] {
            let hub = self.hub.clone();
            let clock = self.clock;
            let pressing = pressing.clone();
            let handler = move |event: web_sys::Event| {
                match phase {
                    Phase::Down => {
                        pressing.set(target_id(&event).is_some());
                        if pressing.get() {
                            event.prevent_default();
                        }
                    }
                    Phase::Move if pressing.get() => event.prevent_default(),
                    Phase::Move => {}
                    Phase::Up => pressing.set(false),
                }
                let Some(touch) = event.dyn_ref::<web_sys::TouchEvent>() else {
                    return;
                };
                let Some(position) = touch_position(touch, phase) else {
                    return;
                };
                hub.dispatch_pointer(pointer_event(
                    phase,
                    position,
                    clock.now(),
                    PointerKind::Touch,
                    &event,
                ));
            };
            match phase {
                Phase::Down | Phase::Move => self.listen_active(name, handler)?,
                Phase::Up => self.listen(name, handler)?,
            }
        }
        Ok(())
    }

    fn start_frames(&self) -> WebResult<()> {
        let weak: Weak<RefCell<Option<FrameLoop>>> = Rc::downgrade(&self.frame_loop);
        let window = self.window.clone();
        let scheduler = self.scheduler.clone();
        let clock = self.clock;
        let running = self.running.clone();
        let frame_request = self.frame_request.clone();

        let frame_loop = Closure::wrap(Box::new(move |_time: f64| {
            frame_request.set(None);
            if !running.get() {
                return;
            }
            scheduler.sync_with(&clock);

            // A frame callback may have detached the platform
            if !running.get() {
                return;
            }
            let Some(slot) = weak.upgrade() else {
                return;
            };
            if let Err(e) = request_frame(&window, &slot, &frame_request) {
                log::warn!("Frame loop stopped: {}", e);
            }
        }) as Box<dyn FnMut(f64)>);

        *self.frame_loop.borrow_mut() = Some(frame_loop);
        request_frame(&self.window, &self.frame_loop, &self.frame_request)
    }
}

fn request_frame(
    window: &web_sys::Window,
    slot: &RefCell<Option<FrameLoop>>,
    frame_request: &Cell<Option<i32>>,
) -> WebResult<()> {
    let slot = slot.borrow();
    let Some(frame_loop) = slot.as_ref() else {
        return Ok(());
    };
    let id = window
        .request_animation_frame(frame_loop.as_ref().unchecked_ref())
        .map_err(|e| WebError::Frame(format!("{:?}", e)))?;
    frame_request.set(Some(id));
    Ok(())
}

impl Drop for WebPlatform {
    fn drop(&mut self) {
        self.detach();
    }
}
