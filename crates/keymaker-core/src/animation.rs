//! Easing curves and time-based tweens.

use crate::timing::Timestamp;
use kurbo::Vec2;
use serde::{Deserialize, Serialize};

/// Values that can be interpolated by a tween.
pub trait Lerp: Sized {
    fn lerp(&self, target: &Self, fraction: f64) -> Self;
}

impl Lerp for f64 {
    fn lerp(&self, target: &Self, fraction: f64) -> Self {
        self + (target - self) * fraction
    }
}

impl Lerp for Vec2 {
    fn lerp(&self, target: &Self, fraction: f64) -> Self {
        Vec2::new(
            Lerp::lerp(&self.x, &target.x, fraction),
            Lerp::lerp(&self.y, &target.y, fraction),
        )
    }
}

/// Polynomial easing curves. `Power1` is quadratic, `Power2` cubic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Easing {
    Linear,
    Power1In,
    #[default]
    Power1Out,
    Power1InOut,
    Power2In,
    Power2Out,
    Power2InOut,
}

impl Easing {
    /// Apply the easing function to a linear fraction in `[0, 1]`.
    pub fn transform(self, fraction: f64) -> f64 {
        let t = fraction.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::Power1In => ease_in(t, 2),
            Easing::Power1Out => ease_out(t, 2),
            Easing::Power1InOut => ease_in_out(t, 2),
            Easing::Power2In => ease_in(t, 3),
            Easing::Power2Out => ease_out(t, 3),
            Easing::Power2InOut => ease_in_out(t, 3),
        }
    }
}

fn ease_in(t: f64, power: i32) -> f64 {
    t.powi(power)
}

fn ease_out(t: f64, power: i32) -> f64 {
    1.0 - (1.0 - t).powi(power)
}

fn ease_in_out(t: f64, power: i32) -> f64 {
    if t < 0.5 {
        ease_in(t * 2.0, power) / 2.0
    } else {
        1.0 - ease_in((1.0 - t) * 2.0, power) / 2.0
    }
}

/// Duration and easing of a tween.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tween {
    pub duration_ms: u64,
    pub easing: Easing,
}

impl Tween {
    pub const fn new(duration_ms: u64, easing: Easing) -> Self {
        Self {
            duration_ms,
            easing,
        }
    }
}

/// A running interpolation from one value to another.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TweenTrack<T> {
    pub from: T,
    pub to: T,
    pub start: Timestamp,
    pub tween: Tween,
}

impl<T: Lerp + Copy> TweenTrack<T> {
    pub fn new(from: T, to: T, start: Timestamp, tween: Tween) -> Self {
        Self {
            from,
            to,
            start,
            tween,
        }
    }

    /// Linear progress in `[0, 1]`. Zero-length tweens are done immediately.
    pub fn progress(&self, now: Timestamp) -> f64 {
        if self.tween.duration_ms == 0 {
            return 1.0;
        }
        let elapsed = now.elapsed_since(self.start).unwrap_or(0);
        (elapsed as f64 / self.tween.duration_ms as f64).clamp(0.0, 1.0)
    }

    pub fn is_done(&self, now: Timestamp) -> bool {
        self.progress(now) >= 1.0
    }

    /// Interpolated value at `now`; exactly `to` once done.
    pub fn sample(&self, now: Timestamp) -> T {
        let progress = self.progress(now);
        if progress >= 1.0 {
            return self.to;
        }
        self.from.lerp(&self.to, self.tween.easing.transform(progress))
    }
}
