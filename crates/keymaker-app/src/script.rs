//! Scripted input sessions.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Frame interval used when waiting.
pub const FRAME_MS: u64 = 16;

/// One scripted input. Positions are in page pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Step {
    /// Let time pass, one frame at a time.
    Wait { ms: u64 },
    Scroll { offset: f64 },
    Press {
        x: f64,
        y: f64,
        #[serde(default)]
        target: Option<u32>,
    },
    Move { x: f64, y: f64 },
    Release { x: f64, y: f64 },
}

/// An ordered list of steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub steps: Vec<Step>,
}

impl Script {
    pub fn from_json(json: &str) -> AppResult<Self> {
        serde_json::from_str(json).map_err(AppError::Script)
    }

    pub fn wait(mut self, ms: u64) -> Self {
        self.steps.push(Step::Wait { ms });
        self
    }

    /// Scroll from `from` to `to` in equal steps, one per frame.
    pub fn scroll(mut self, from: f64, to: f64, frames: u32) -> Self {
        let frames = frames.max(1);
        for i in 1..=frames {
            let offset = from + (to - from) * f64::from(i) / f64::from(frames);
            self.steps.push(Step::Scroll { offset });
            self.steps.push(Step::Wait { ms: FRAME_MS });
        }
        self
    }

    pub fn press(mut self, x: f64, y: f64, target: Option<u32>) -> Self {
        self.steps.push(Step::Press { x, y, target });
        self
    }

    /// Move the pointer in a straight line, one step per frame.
    pub fn glide(mut self, from: (f64, f64), to: (f64, f64), frames: u32) -> Self {
        let frames = frames.max(1);
        for i in 1..=frames {
            let t = f64::from(i) / f64::from(frames);
            self.steps.push(Step::Wait { ms: FRAME_MS });
            self.steps.push(Step::Move {
                x: from.0 + (to.0 - from.0) * t,
                y: from.1 + (to.1 - from.1) * t,
            });
        }
        self
    }

    pub fn move_to(mut self, x: f64, y: f64) -> Self {
        self.steps.push(Step::Move { x, y });
        self
    }

    pub fn release(mut self, x: f64, y: f64) -> Self {
        self.steps.push(Step::Release { x, y });
        self
    }

    /// A reader who skims, pauses, fidgets, then slowly fits the key into
    /// the lock after one hasty attempt.
    pub fn demo() -> Self {
        Script::default()
            .scroll(0.0, 320.0, 20)
            .scroll(320.0, 1600.0, 20)
            .wait(1200)
            .glide((20.0, 200.0), (60.0, 220.0), 10)
            .wait(1000)
            .press(50.0, 25.0, Some(crate::session::KEY_ID.0))
            .wait(FRAME_MS)
            .move_to(150.0, 25.0)
            .glide((50.0, 25.0), (300.0, 25.0), 25)
            .wait(1500)
            .release(300.0, 25.0)
            .wait(100)
    }

    /// Total scripted time in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        self.steps
            .iter()
            .map(|step| match step {
                Step::Wait { ms } => *ms,
                _ => 0,
            })
            .sum()
    }
}
