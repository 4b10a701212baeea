//! Wires every engine component to one page and replays scripted input.

use crate::script::{FRAME_MS, Script, Step};
use keymaker_core::{
    CompletionFlag, DragPhase, ElementId, EngineConfig, HeadlessElement, IdleDetector, InputHub,
    PointerEvent, PointerKind, ResistantDragController, Scheduler, ScrollEvent, ScrollPace,
    VelocityTracker,
};
use kurbo::{Point, Rect};
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;

/// Id of the draggable key.
pub const KEY_ID: ElementId = ElementId(1);

/// Id of the lock the key is dragged into.
pub const LOCK_ID: ElementId = ElementId(2);

/// Signals observed while replaying a script.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionReport {
    pub duration_ms: u64,
    pub velocity_frames: u32,
    pub rushing_frames: u32,
    pub peak_velocity: f64,
    pub scroll_still: u32,
    pub scroll_moving: u32,
    pub pointer_still: u32,
    pub pointer_moving: u32,
    pub drag_failures: u32,
    pub drag_successes: u32,
    pub drag_phase: DragPhase,
    /// Completed before this session started.
    pub previously_unlocked: bool,
    /// Completed by this session.
    pub unlocked: bool,
}

/// A headless page: the key, the lock, and one instance of each detector.
pub struct Session {
    scheduler: Scheduler,
    hub: InputHub,
    report: Rc<RefCell<SessionReport>>,
    key: HeadlessElement,
    tracker: VelocityTracker,
    _scroll_idle: IdleDetector,
    _pointer_idle: IdleDetector,
    drag: ResistantDragController,
}

impl Session {
    pub fn new(config: &EngineConfig, flag: CompletionFlag) -> Self {
        let scheduler = Scheduler::new();
        let hub = InputHub::new();
        let report = Rc::new(RefCell::new(SessionReport {
            previously_unlocked: flag.is_set(),
            ..SessionReport::default()
        }));

        let key = HeadlessElement::new(KEY_ID, Rect::new(0.0, 0.0, 100.0, 50.0), &scheduler);
        let lock = HeadlessElement::new(LOCK_ID, Rect::new(300.0, 0.0, 400.0, 50.0), &scheduler);

        let threshold = config.velocity.rushing_threshold;
        let sink = report.clone();
        let tracker = VelocityTracker::start(&scheduler, hub.clone(), move |velocity| {
            let mut report = sink.borrow_mut();
            report.velocity_frames += 1;
            report.peak_velocity = report.peak_velocity.max(velocity);
            if ScrollPace::classify(velocity, threshold) == ScrollPace::Rushing {
                report.rushing_frames += 1;
            }
        });

        let (still, moving) = (report.clone(), report.clone());
        let scroll_idle = IdleDetector::scroll(
            &scheduler,
            &hub,
            &config.scroll_idle,
            move || still.borrow_mut().scroll_still += 1,
            move || moving.borrow_mut().scroll_moving += 1,
        );

        let (still, moving) = (report.clone(), report.clone());
        let pointer_idle = IdleDetector::pointer(
            &scheduler,
            &hub,
            &config.pointer_idle,
            move || still.borrow_mut().pointer_still += 1,
            move || moving.borrow_mut().pointer_moving += 1,
        );

        let (success, failure) = (report.clone(), report.clone());
        let drag = ResistantDragController::new(
            &scheduler,
            &hub,
            Rc::new(key.clone()),
            Rc::new(lock),
            config.drag,
            move || {
                let mut report = success.borrow_mut();
                report.drag_successes += 1;
                report.unlocked = flag.complete();
            },
            move || failure.borrow_mut().drag_failures += 1,
        );

        Self {
            scheduler,
            hub,
            report,
            key,
            tracker,
            _scroll_idle: scroll_idle,
            _pointer_idle: pointer_idle,
            drag,
        }
    }

    pub fn play(&self, script: &Script) {
        log::info!(
            "replaying {} steps ({}ms)",
            script.steps.len(),
            script.duration_ms()
        );
        for step in &script.steps {
            self.apply(*step);
        }
    }

    pub fn apply(&self, step: Step) {
        let timestamp = self.scheduler.now();
        match step {
            Step::Wait { ms } => {
                let mut remaining = ms;
                while remaining > 0 {
                    let frame = remaining.min(FRAME_MS);
                    self.scheduler.advance_by(frame);
                    remaining -= frame;
                }
            }
            Step::Scroll { offset } => self.hub.dispatch_scroll(ScrollEvent { offset, timestamp }),
            Step::Press { x, y, target } => self.hub.dispatch_pointer(PointerEvent::Down {
                position: Point::new(x, y),
                timestamp,
                kind: PointerKind::Mouse,
                target: target.map(ElementId),
            }),
            Step::Move { x, y } => self.hub.dispatch_pointer(PointerEvent::Move {
                position: Point::new(x, y),
                timestamp,
                kind: PointerKind::Mouse,
            }),
            Step::Release { x, y } => self.hub.dispatch_pointer(PointerEvent::Up {
                position: Point::new(x, y),
                timestamp,
                kind: PointerKind::Mouse,
            }),
        }
    }

    pub fn report(&self) -> SessionReport {
        let mut report = self.report.borrow().clone();
        report.duration_ms = self.scheduler.now().as_millis();
        report.drag_phase = self.drag.phase();
        report
    }

    pub fn key(&self) -> &HeadlessElement {
        &self.key
    }

    pub fn last_velocity(&self) -> f64 {
        self.tracker.velocity()
    }
}

/// Replay `script` on a fresh page and return what the detectors reported.
pub fn run(config: &EngineConfig, script: &Script, flag: CompletionFlag) -> SessionReport {
    let session = Session::new(config, flag);
    session.play(script);
    let report = session.report();
    log::info!(
        "session finished in {:?}: {} failures, {} successes",
        report.drag_phase,
        report.drag_failures,
        report.drag_successes
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use keymaker_core::{ElementHandle, MemoryStore};
    use std::sync::Arc;

    fn memory_flag() -> CompletionFlag {
        CompletionFlag::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_demo_unlocks() {
        let flag = memory_flag();
        let report = run(&EngineConfig::default(), &Script::demo(), flag.clone());

        assert_eq!(report.drag_phase, DragPhase::Succeeded);
        assert_eq!(report.drag_successes, 1);
        assert_eq!(report.drag_failures, 1);
        assert!(report.unlocked);
        assert!(!report.previously_unlocked);
        assert!(flag.is_set());
    }

    #[test]
    fn test_demo_detects_pace_and_stillness() {
        let report = run(&EngineConfig::default(), &Script::demo(), memory_flag());

        assert!(report.rushing_frames > 0);
        assert!(report.rushing_frames < report.velocity_frames);
        assert!((report.peak_velocity - 4.0).abs() < 1e-9);
        assert_eq!(report.scroll_still, 1);
        assert!(report.pointer_still >= 1);
        assert!(report.pointer_moving >= 1);
    }

    #[test]
    fn test_second_run_reports_previous_unlock() {
        let flag = memory_flag();
        run(&EngineConfig::default(), &Script::demo(), flag.clone());
        let report = run(&EngineConfig::default(), &Script::demo(), flag);

        assert!(report.previously_unlocked);
        assert!(!report.unlocked);
        assert_eq!(report.drag_successes, 1);
    }

    #[test]
    fn test_release_short_of_lock() {
        let script = Script::default()
            .press(50.0, 25.0, Some(KEY_ID.0))
            .glide((50.0, 25.0), (150.0, 25.0), 10)
            .release(150.0, 25.0)
            .wait(600);
        let session = Session::new(&EngineConfig::default(), memory_flag());
        session.play(&script);

        let report = session.report();
        assert_eq!(report.drag_phase, DragPhase::Idle);
        assert_eq!(report.drag_successes, 0);
        assert!(session.key().transform().offset.hypot() < 1e-9);
    }
}
