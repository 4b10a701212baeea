//! Drag-to-target with a speed ceiling and a magnetic snap.
//!
//! The draggable only follows the pointer while the pointer moves slowly.
//! A move faster than the ceiling is refused: the element stays put and the
//! failure callback fires. Once the draggable's center comes within the snap
//! radius of the target's center it is pulled onto the target, shrinks into
//! it, and the success callback fires. Snapping is irreversible.

use crate::animation::{Easing, Tween};
use crate::callback::Callback;
use crate::config::DragConfig;
use crate::element::{ElementHandle, Transform};
use crate::input::{InputHub, PointerEvent, Subscription};
use crate::scheduler::{CancelToken, Scheduler};
use crate::timing::{MIN_INTERVAL_MS, Sample, Timestamp};
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// Where the controller is in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DragPhase {
    /// Waiting for a press on the draggable.
    #[default]
    Idle,
    /// Following the pointer.
    Dragging,
    /// Being pulled onto the target.
    Snapped,
    /// Shrinking into the target.
    Inserting,
    /// Done. Nothing moves it any more.
    Succeeded,
}

impl DragPhase {
    /// Whether the draggable has reached the target for good.
    pub fn is_snapped(self) -> bool {
        matches!(self, DragPhase::Snapped | DragPhase::Inserting | DragPhase::Succeeded)
    }
}

/// Distance between the centers of two rects.
///
/// Rects with no area or with non-finite coordinates are infinitely far from
/// everything.
pub fn center_distance(a: Rect, b: Rect) -> f64 {
    if !has_area(a) || !has_area(b) {
        return f64::INFINITY;
    }
    a.center().distance(b.center())
}

fn has_area(rect: Rect) -> bool {
    [rect.x0, rect.y0, rect.x1, rect.y1].iter().all(|v| v.is_finite())
        && rect.width() > 0.0
        && rect.height() > 0.0
}

/// Scale of the target when the draggable is `distance` away.
fn feedback_scale(config: &DragConfig, distance: f64) -> f64 {
    let radius = config.feedback_radius;
    if distance < radius {
        (1.0 + (radius - distance) / (2.0 * radius)).min(config.max_feedback_scale)
    } else {
        1.0
    }
}

/// State of one press-move-release gesture.
struct DragSession {
    origin: Transform,
    pointer_start: Point,
    /// Last move that was accepted.
    last: Sample<Point>,
    subscription: Subscription,
}

enum MoveVerdict {
    TooFast(f64),
    Accepted(Vec2),
}

struct DragShared {
    scheduler: Scheduler,
    hub: InputHub,
    draggable: Rc<dyn ElementHandle>,
    target: Rc<dyn ElementHandle>,
    config: DragConfig,
    /// Offset the draggable returns to when released away from the target.
    home: Vec2,
    phase: Cell<DragPhase>,
    target_scale: Cell<f64>,
    session: RefCell<Option<DragSession>>,
    on_success: Callback<()>,
    on_fail: Callback<()>,
    token: CancelToken,
}

impl DragShared {
    fn set_phase(&self, phase: DragPhase) {
        let previous = self.phase.replace(phase);
        log::debug!("drag phase {previous:?} -> {phase:?}");
    }

    fn distance(&self) -> f64 {
        center_distance(self.draggable.bounds(), self.target.bounds())
    }

    fn handle_press(self: &Rc<Self>, position: Point, timestamp: Timestamp) {
        if self.token.is_cancelled() {
            return;
        }
        match self.phase.get() {
            DragPhase::Idle => {}
            phase => {
                log::debug!("ignoring press while {phase:?}");
                return;
            }
        }

        let weak: Weak<Self> = Rc::downgrade(self);
        let subscription = self.hub.on_pointer(move |event| {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            match *event {
                PointerEvent::Move {
                    position,
                    timestamp,
                    ..
                } => shared.handle_move(position, timestamp),
                PointerEvent::Up { .. } => shared.handle_release(),
                PointerEvent::Down { .. } => {}
            }
        });

        // Stops a running return tween so the draggable stays under the pointer
        let origin = self.draggable.transform();
        self.draggable.set_transform(origin);

        *self.session.borrow_mut() = Some(DragSession {
            origin,
            pointer_start: position,
            last: Sample::new(position, timestamp),
            subscription,
        });
        self.set_phase(DragPhase::Dragging);
    }

    fn handle_move(self: &Rc<Self>, position: Point, timestamp: Timestamp) {
        if self.token.is_cancelled() || self.phase.get() != DragPhase::Dragging {
            return;
        }

        let verdict = {
            let mut session = self.session.borrow_mut();
            let Some(session) = session.as_mut() else {
                return;
            };
            let elapsed = timestamp
                .elapsed_since(session.last.timestamp)
                .unwrap_or(0)
                .max(MIN_INTERVAL_MS);
            let speed = session.last.distance_to(position) / elapsed as f64;
            // NaN positions fail this comparison and are refused too
            if speed <= self.config.velocity_ceiling {
                session.last = Sample::new(position, timestamp);
                MoveVerdict::Accepted(session.origin.offset + (position - session.pointer_start))
            } else {
                MoveVerdict::TooFast(speed)
            }
        };

        match verdict {
            MoveVerdict::TooFast(speed) => {
                log::debug!(
                    "move refused at {speed:.2} px/ms (ceiling {})",
                    self.config.velocity_ceiling
                );
                self.on_fail.invoke(());
            }
            MoveVerdict::Accepted(offset) => {
                let current = self.draggable.transform();
                self.draggable.set_transform(current.with_offset(offset));
                self.update_proximity();
            }
        }
    }

    fn update_proximity(self: &Rc<Self>) {
        let distance = self.distance();
        log::trace!("drag distance to target {distance:.1}");

        self.animate_target_scale(
            feedback_scale(&self.config, distance),
            Tween::new(self.config.feedback_ms, Easing::Power1Out),
        );

        if distance < self.config.snap_radius && self.phase.get() == DragPhase::Dragging {
            self.snap();
        }
    }

    fn animate_target_scale(&self, scale: f64, tween: Tween) {
        if (self.target_scale.get() - scale).abs() <= f64::EPSILON {
            return;
        }
        self.target_scale.set(scale);
        let target = self.target.transform().with_scale(scale);
        self.target.animate_to(target, tween, Box::new(|| {}));
    }

    fn snap(self: &Rc<Self>) {
        self.set_phase(DragPhase::Snapped);

        let delta = self.target.bounds().center() - self.draggable.bounds().center();
        let current = self.draggable.transform();
        let snapped = current.with_offset(current.offset + delta);
        let tween = Tween::new(self.config.snap_ms, Easing::Power2Out);

        self.animate_target_scale(1.0, tween);

        let weak = Rc::downgrade(self);
        self.draggable.animate_to(
            snapped,
            tween,
            Box::new(self.token.guard(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.insert();
                }
            })),
        );
    }

    fn insert(self: &Rc<Self>) {
        self.set_phase(DragPhase::Inserting);

        let inserted = self
            .draggable
            .transform()
            .with_scale(self.config.insert_scale);
        let weak = Rc::downgrade(self);
        self.draggable.animate_to(
            inserted,
            Tween::new(self.config.insert_ms, Easing::Power1InOut),
            Box::new(self.token.guard(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.finish();
                }
            })),
        );
    }

    fn finish(&self) {
        self.set_phase(DragPhase::Succeeded);
        log::info!("draggable inserted into target");
        self.on_success.invoke(());
    }

    fn handle_release(self: &Rc<Self>) {
        let session = self.session.borrow_mut().take();
        drop(session);

        if self.token.is_cancelled() || self.phase.get() != DragPhase::Dragging {
            return;
        }

        let distance = self.distance();
        if distance < self.config.snap_radius {
            log::debug!("released within snap radius ({distance:.1})");
            self.snap();
            return;
        }

        self.set_phase(DragPhase::Idle);
        let tween = Tween::new(self.config.return_ms, Easing::Power2Out);
        let current = self.draggable.transform();
        self.draggable
            .animate_to(current.with_offset(self.home), tween, Box::new(|| {}));
        self.animate_target_scale(1.0, tween);
    }
}

/// Drag controller that refuses fast gestures and snaps onto a target.
///
/// A press on the draggable (a [`PointerEvent::Down`] whose target is the
/// draggable's id) starts a session. Moves are measured against the last
/// accepted move: anything faster than `velocity_ceiling` calls `on_fail`
/// and is otherwise ignored. Releasing away from the target sends the
/// draggable home; reaching the target runs the snap and insertion tweens
/// and then calls `on_success` once.
pub struct ResistantDragController {
    shared: Rc<DragShared>,
    start: RefCell<Option<Subscription>>,
}

impl ResistantDragController {
    pub fn new(
        scheduler: &Scheduler,
        hub: &InputHub,
        draggable: Rc<dyn ElementHandle>,
        target: Rc<dyn ElementHandle>,
        config: DragConfig,
        on_success: impl FnMut() + 'static,
        on_fail: impl FnMut() + 'static,
    ) -> Self {
        let home = draggable.transform().offset;
        let target_scale = target.transform().scale;
        let draggable_id = draggable.id();

        let shared = Rc::new(DragShared {
            scheduler: scheduler.clone(),
            hub: hub.clone(),
            draggable,
            target,
            config,
            home,
            phase: Cell::new(DragPhase::Idle),
            target_scale: Cell::new(target_scale),
            session: RefCell::new(None),
            on_success: Callback::from_fn("on_success", on_success),
            on_fail: Callback::from_fn("on_fail", on_fail),
            token: CancelToken::new(),
        });

        let weak = Rc::downgrade(&shared);
        let start = hub.on_pointer(move |event| {
            if let PointerEvent::Down {
                position,
                timestamp,
                target: Some(target),
                ..
            } = *event
            {
                if target != draggable_id {
                    return;
                }
                if let Some(shared) = weak.upgrade() {
                    shared.handle_press(position, timestamp);
                }
            }
        });
        log::debug!("drag controller attached to {draggable_id:?}");

        Self {
            shared,
            start: RefCell::new(Some(start)),
        }
    }

    pub fn phase(&self) -> DragPhase {
        self.shared.phase.get()
    }

    /// Whether the draggable has snapped onto the target. Never reverts.
    pub fn is_snapped(&self) -> bool {
        self.phase().is_snapped()
    }

    /// Current distance between the draggable's and the target's centers.
    pub fn distance_to_target(&self) -> f64 {
        self.shared.distance()
    }

    pub fn config(&self) -> &DragConfig {
        &self.shared.config
    }

    /// Scheduler time, for hosts that stamp their own events.
    pub fn now(&self) -> Timestamp {
        self.shared.scheduler.now()
    }

    pub fn is_destroyed(&self) -> bool {
        self.shared.token.is_cancelled()
    }

    /// Detach every listener. Pending snap or insertion tweens still move
    /// the element but no longer call back. Safe to call repeatedly.
    pub fn destroy(&self) {
        if self.shared.token.is_cancelled() {
            return;
        }
        self.shared.token.cancel();
        let start = self.start.borrow_mut().take();
        let session = self.shared.session.borrow_mut().take();
        drop(start);
        drop(session);
        log::debug!("drag controller destroyed in {:?}", self.shared.phase.get());
    }
}

impl Drop for ResistantDragController {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::HeadlessElement;
    use crate::input::{ElementId, PointerKind};

    const DRAGGABLE: ElementId = ElementId(1);
    const TARGET: ElementId = ElementId(2);

    /// Draggable centered at (50, 25), target centered at (350, 25) unless
    /// built with [`Rig::with_target`].
    struct Rig {
        scheduler: Scheduler,
        hub: InputHub,
        draggable: HeadlessElement,
        target: HeadlessElement,
        controller: ResistantDragController,
        success: Rc<Cell<u32>>,
        fail: Rc<Cell<u32>>,
        pointer: Cell<Point>,
    }

    impl Rig {
        fn new() -> Self {
            Self::with_target(Rect::new(300.0, 0.0, 400.0, 50.0))
        }

        fn with_target(layout: Rect) -> Self {
            let scheduler = Scheduler::new();
            let hub = InputHub::new();
            let draggable =
                HeadlessElement::new(DRAGGABLE, Rect::new(0.0, 0.0, 100.0, 50.0), &scheduler);
            let target = HeadlessElement::new(TARGET, layout, &scheduler);
            let success = Rc::new(Cell::new(0));
            let fail = Rc::new(Cell::new(0));

            let on_success = success.clone();
            let on_fail = fail.clone();
            let controller = ResistantDragController::new(
                &scheduler,
                &hub,
                Rc::new(draggable.clone()),
                Rc::new(target.clone()),
                DragConfig::default(),
                move || on_success.set(on_success.get() + 1),
                move || on_fail.set(on_fail.get() + 1),
            );

            Self {
                scheduler,
                hub,
                draggable,
                target,
                controller,
                success,
                fail,
                pointer: Cell::new(Point::new(50.0, 25.0)),
            }
        }

        fn press_on(&self, target: Option<ElementId>) {
            self.hub.dispatch_pointer(PointerEvent::Down {
                position: self.pointer.get(),
                timestamp: self.scheduler.now(),
                kind: PointerKind::Mouse,
                target,
            });
        }

        fn press(&self) {
            self.press_on(Some(DRAGGABLE));
        }

        fn move_by(&self, dx: f64) {
            let position = self.pointer.get() + Vec2::new(dx, 0.0);
            self.pointer.set(position);
            self.hub.dispatch_pointer(PointerEvent::Move {
                position,
                timestamp: self.scheduler.now(),
                kind: PointerKind::Mouse,
            });
        }

        /// Move right in 10px steps, one per 16ms frame.
        fn drag_slowly(&self, distance: f64) {
            let mut left = distance;
            while left > 0.0 {
                let step = left.min(10.0);
                self.scheduler.advance_by(16);
                self.move_by(step);
                left -= step;
            }
        }

        fn release(&self) {
            self.hub.dispatch_pointer(PointerEvent::Up {
                position: self.pointer.get(),
                timestamp: self.scheduler.now(),
                kind: PointerKind::Mouse,
            });
        }

        fn run_for(&self, millis: u64) {
            for _ in 0..millis.div_ceil(16) {
                self.scheduler.advance_by(16);
            }
        }
    }

    #[test]
    fn test_slow_drag_snaps_and_succeeds_once() {
        let rig = Rig::new();

        rig.press();
        assert_eq!(rig.controller.phase(), DragPhase::Dragging);

        rig.drag_slowly(250.0);
        assert!(rig.controller.is_snapped());
        assert_eq!(rig.fail.get(), 0);

        rig.run_for(1500);
        rig.release();
        rig.run_for(100);

        assert_eq!(rig.controller.phase(), DragPhase::Succeeded);
        assert_eq!(rig.success.get(), 1);
        assert_eq!(rig.fail.get(), 0);

        let transform = rig.draggable.transform();
        assert!((transform.offset.x - 300.0).abs() < 1e-6);
        assert!((transform.scale - 0.95).abs() < 1e-9);
        assert!(rig.controller.distance_to_target() < 1e-6);
        assert!((rig.target.transform().scale - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_creeping_drag_snaps_within_radius() {
        // Target center 200px to the right of the draggable's
        let rig = Rig::with_target(Rect::new(200.0, 0.0, 300.0, 50.0));
        assert!((rig.controller.distance_to_target() - 200.0).abs() < 1e-9);

        rig.press();
        let mut moves = 0;
        while rig.controller.phase() == DragPhase::Dragging && moves < 200 {
            rig.scheduler.advance_by(16);
            rig.move_by(2.0);
            moves += 1;
        }

        // 61 moves of 2px leave 78px between the centers, inside the 80px radius
        assert_eq!(moves, 61);
        assert_eq!(rig.controller.phase(), DragPhase::Snapped);

        rig.run_for(1500);
        rig.release();

        assert_eq!(rig.controller.phase(), DragPhase::Succeeded);
        assert_eq!(rig.success.get(), 1);
        assert_eq!(rig.fail.get(), 0);
        assert!((rig.draggable.transform().offset.x - 200.0).abs() < 1e-6);
    }

    #[test]
    fn test_moves_after_snap_are_ignored() {
        let rig = Rig::new();

        rig.press();
        rig.drag_slowly(230.0);
        assert_eq!(rig.controller.phase(), DragPhase::Snapped);

        rig.move_by(500.0);
        assert_eq!(rig.fail.get(), 0);
        rig.run_for(1500);

        assert!((rig.draggable.transform().offset.x - 300.0).abs() < 1e-6);
        assert_eq!(rig.success.get(), 1);
    }

    #[test]
    fn test_fast_move_fails_and_keeps_position() {
        let rig = Rig::new();

        rig.press();
        rig.scheduler.advance_by(16);
        rig.move_by(50.0);

        assert_eq!(rig.fail.get(), 1);
        assert_eq!(rig.draggable.transform().offset, Vec2::ZERO);
        assert_eq!(rig.controller.phase(), DragPhase::Dragging);

        // Measured from the press, not from the refused move
        rig.scheduler.advance_by(200);
        rig.move_by(10.0);
        assert_eq!(rig.fail.get(), 1);
        assert_eq!(rig.draggable.transform().offset, Vec2::new(60.0, 0.0));
    }

    #[test]
    fn test_coalesced_moves_count_as_fast() {
        let rig = Rig::new();

        rig.press();
        rig.scheduler.advance_by(16);
        rig.move_by(10.0);
        // Same timestamp as the previous move
        rig.move_by(5.0);

        assert_eq!(rig.fail.get(), 1);
        assert_eq!(rig.draggable.transform().offset, Vec2::new(10.0, 0.0));
    }

    #[test]
    fn test_release_far_from_target_returns_home() {
        let rig = Rig::new();

        rig.press();
        rig.drag_slowly(180.0);
        assert!((rig.controller.distance_to_target() - 120.0).abs() < 1e-9);

        rig.release();
        assert_eq!(rig.controller.phase(), DragPhase::Idle);

        rig.run_for(600);
        assert!(rig.draggable.transform().offset.hypot() < 1e-9);
        assert_eq!(rig.success.get(), 0);
        assert_eq!(rig.fail.get(), 0);
        assert_eq!(rig.hub.listener_count(), 1);
    }

    #[test]
    fn test_press_during_return_holds_position() {
        let rig = Rig::new();

        rig.press();
        rig.drag_slowly(150.0);
        rig.release();
        rig.run_for(48);
        assert!(rig.draggable.is_animating());

        rig.press();
        let at_press = rig.draggable.transform().offset.x;
        assert!(at_press > 0.0 && at_press < 150.0);
        assert!(!rig.draggable.is_animating());

        // Held still, the draggable does not keep sliding home
        rig.run_for(200);
        assert_eq!(rig.draggable.transform().offset.x, at_press);

        rig.scheduler.advance_by(16);
        rig.move_by(1.0);
        assert!((rig.draggable.transform().offset.x - (at_press + 1.0)).abs() < 1e-9);
        assert_eq!(rig.fail.get(), 0);
    }

    #[test]
    fn test_late_snap_on_release() {
        let rig = Rig::new();

        rig.press();
        rig.drag_slowly(200.0);
        assert_eq!(rig.controller.phase(), DragPhase::Dragging);

        // The target moves under the held draggable
        rig.target.set_layout(Rect::new(260.0, 0.0, 360.0, 50.0));
        rig.release();
        assert!(rig.controller.is_snapped());

        rig.run_for(1500);
        assert_eq!(rig.success.get(), 1);
    }

    #[test]
    fn test_target_feedback_scale() {
        let rig = Rig::new();

        rig.press();
        rig.drag_slowly(185.0);
        let expected = 1.0 + (120.0 - 115.0) / 240.0;
        let scale = rig.target.animation_target().map(|t| t.scale);
        assert!(scale.is_some_and(|s| (s - expected).abs() < 1e-9));

        rig.drag_slowly(15.0);
        let scale = rig.target.animation_target().map(|t| t.scale);
        assert!(scale.is_some_and(|s| (s - 1.05).abs() < 1e-9));
    }

    #[test]
    fn test_press_elsewhere_is_ignored() {
        let rig = Rig::new();

        rig.press_on(Some(TARGET));
        rig.press_on(None);
        assert_eq!(rig.controller.phase(), DragPhase::Idle);

        rig.move_by(5.0);
        assert_eq!(rig.draggable.transform().offset, Vec2::ZERO);
    }

    #[test]
    fn test_press_after_success_is_ignored() {
        let rig = Rig::new();

        rig.press();
        rig.drag_slowly(250.0);
        rig.release();
        rig.run_for(1500);
        assert_eq!(rig.controller.phase(), DragPhase::Succeeded);

        rig.press();
        rig.drag_slowly(50.0);
        assert_eq!(rig.controller.phase(), DragPhase::Succeeded);
        assert_eq!(rig.success.get(), 1);
    }

    #[test]
    fn test_destroy_during_insert_skips_success() {
        let rig = Rig::new();

        rig.press();
        rig.drag_slowly(250.0);
        rig.run_for(320);
        assert_eq!(rig.controller.phase(), DragPhase::Inserting);

        rig.controller.destroy();
        rig.controller.destroy();
        rig.run_for(1500);

        assert_eq!(rig.success.get(), 0);
        assert_eq!(rig.hub.listener_count(), 0);
        assert!(rig.controller.is_destroyed());
    }

    #[test]
    fn test_drop_releases_listeners() {
        let rig = Rig::new();
        rig.press();
        assert_eq!(rig.hub.listener_count(), 2);

        let Rig { hub, controller, .. } = rig;
        drop(controller);
        assert_eq!(hub.listener_count(), 0);
    }

    #[test]
    fn test_center_distance_degenerate() {
        let unit = Rect::new(0.0, 0.0, 10.0, 10.0);

        assert_eq!(center_distance(unit, Rect::ZERO), f64::INFINITY);
        assert_eq!(
            center_distance(unit, Rect::new(0.0, 0.0, f64::NAN, 10.0)),
            f64::INFINITY
        );
        assert_eq!(center_distance(unit, unit + Vec2::new(3.0, 4.0)), 5.0);
    }
}
