//! Opaque handles to the elements the drag controller moves.
//!
//! The controller only reads bounds and transforms, writes transforms, and
//! starts tweens. Anything that can do those four things can be dragged:
//! a DOM node behind a binding, or a [`HeadlessElement`] in tests and
//! non-interactive contexts.

use crate::animation::{Lerp, Tween, TweenTrack};
use crate::input::ElementId;
use crate::scheduler::Scheduler;
use crate::timing::Timestamp;
use kurbo::{Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Visual transform of an element relative to its laid-out position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Translation from the layout position.
    pub offset: Vec2,
    /// Rotation in degrees.
    pub rotation: f64,
    /// Uniform scale about the element's center.
    pub scale: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        offset: Vec2::ZERO,
        rotation: 0.0,
        scale: 1.0,
    };

    pub fn new(offset: Vec2, rotation: f64, scale: f64) -> Self {
        Self {
            offset,
            rotation,
            scale,
        }
    }

    pub fn with_offset(self, offset: Vec2) -> Self {
        Self { offset, ..self }
    }

    pub fn with_rotation(self, rotation: f64) -> Self {
        Self { rotation, ..self }
    }

    pub fn with_scale(self, scale: f64) -> Self {
        Self { scale, ..self }
    }
}

impl Lerp for Transform {
    fn lerp(&self, target: &Self, fraction: f64) -> Self {
        Self {
            offset: Lerp::lerp(&self.offset, &target.offset, fraction),
            rotation: Lerp::lerp(&self.rotation, &target.rotation, fraction),
            scale: Lerp::lerp(&self.scale, &target.scale, fraction),
        }
    }
}

/// Called once when a tween reaches its target. Never called for a tween
/// that was interrupted.
pub type Completion = Box<dyn FnOnce()>;

/// The capabilities the engine needs from an on-screen element.
pub trait ElementHandle {
    /// Id carried by pointer presses on this element.
    fn id(&self) -> ElementId;

    /// Current on-screen bounds, including the transform. Elements that are
    /// not laid out yet report an empty rect.
    fn bounds(&self) -> Rect;

    /// Current transform.
    fn transform(&self) -> Transform;

    /// Jump to `transform`, interrupting any running tween.
    fn set_transform(&self, transform: Transform);

    /// Tween to `target`, replacing any running tween.
    fn animate_to(&self, target: Transform, tween: Tween, on_complete: Completion);
}

struct ActiveTween {
    generation: u64,
    track: TweenTrack<Transform>,
    on_complete: Option<Completion>,
}

struct HeadlessInner {
    layout: Rect,
    transform: Transform,
    generation: u64,
    tween: Option<ActiveTween>,
}

/// An element with no visual surface, animated by the scheduler's frames.
///
/// Bounds are the layout rect moved by the offset and scaled about its
/// center. Rotation is tracked but does not change the bounds.
#[derive(Clone)]
pub struct HeadlessElement {
    id: ElementId,
    scheduler: Scheduler,
    inner: Rc<RefCell<HeadlessInner>>,
}

impl HeadlessElement {
    pub fn new(id: ElementId, layout: Rect, scheduler: &Scheduler) -> Self {
        Self {
            id,
            scheduler: scheduler.clone(),
            inner: Rc::new(RefCell::new(HeadlessInner {
                layout,
                transform: Transform::IDENTITY,
                generation: 0,
                tween: None,
            })),
        }
    }

    /// Start from `transform` instead of the identity.
    pub fn with_transform(self, transform: Transform) -> Self {
        self.inner.borrow_mut().transform = transform;
        self
    }

    /// Untransformed layout rect.
    pub fn layout(&self) -> Rect {
        self.inner.borrow().layout
    }

    /// Simulate a relayout.
    pub fn set_layout(&self, layout: Rect) {
        self.inner.borrow_mut().layout = layout;
    }

    pub fn is_animating(&self) -> bool {
        self.inner.borrow().tween.is_some()
    }

    /// Target of the running tween, if any.
    pub fn animation_target(&self) -> Option<Transform> {
        self.inner.borrow().tween.as_ref().map(|t| t.track.to)
    }

    fn interrupt(inner: &mut HeadlessInner) -> Option<ActiveTween> {
        inner.generation += 1;
        inner.tween.take()
    }

    fn schedule_step(&self, generation: u64) {
        let weak: Weak<RefCell<HeadlessInner>> = Rc::downgrade(&self.inner);
        let id = self.id;
        let scheduler = self.scheduler.clone();
        self.scheduler.request_frame(move |now| {
            if let Some(inner) = weak.upgrade() {
                let element = HeadlessElement {
                    id,
                    scheduler,
                    inner,
                };
                element.step(generation, now);
            }
        });
    }

    fn step(&self, generation: u64, now: Timestamp) {
        let (done, on_complete) = {
            let mut state = self.inner.borrow_mut();
            let Some(active) = state.tween.as_mut() else {
                return;
            };
            // Superseded by a newer tween or a direct set
            if active.generation != generation {
                return;
            }
            let transform = active.track.sample(now);
            let done = active.track.is_done(now);
            let on_complete = if done { active.on_complete.take() } else { None };
            state.transform = transform;
            if done {
                state.tween = None;
            }
            (done, on_complete)
        };

        if !done {
            self.schedule_step(generation);
        } else if let Some(on_complete) = on_complete {
            on_complete();
        }
    }
}

impl ElementHandle for HeadlessElement {
    fn id(&self) -> ElementId {
        self.id
    }

    fn bounds(&self) -> Rect {
        let inner = self.inner.borrow();
        let moved = inner.layout + inner.transform.offset;
        let scale = inner.transform.scale;
        Rect::from_center_size(moved.center(), (moved.width() * scale, moved.height() * scale))
    }

    fn transform(&self) -> Transform {
        self.inner.borrow().transform
    }

    fn set_transform(&self, transform: Transform) {
        let interrupted = {
            let mut inner = self.inner.borrow_mut();
            let interrupted = Self::interrupt(&mut inner);
            inner.transform = transform;
            interrupted
        };
        // Dropped outside the borrow: completions may own other handles
        drop(interrupted);
    }

    fn animate_to(&self, target: Transform, tween: Tween, on_complete: Completion) {
        let (generation, interrupted) = {
            let mut inner = self.inner.borrow_mut();
            let interrupted = Self::interrupt(&mut inner);
            let generation = inner.generation;
            let track = TweenTrack::new(inner.transform, target, self.scheduler.now(), tween);
            inner.tween = Some(ActiveTween {
                generation,
                track,
                on_complete: Some(on_complete),
            });
            (generation, interrupted)
        };
        drop(interrupted);
        self.schedule_step(generation);
    }
}

impl std::fmt::Debug for HeadlessElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("HeadlessElement")
            .field("id", &self.id)
            .field("layout", &inner.layout)
            .field("transform", &inner.transform)
            .field("animating", &inner.tween.is_some())
            .finish()
    }
}
