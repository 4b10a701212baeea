//! Timestamps, samples and delta-time helpers shared by every detector.

use kurbo::Point;
use serde::{Deserialize, Serialize};

// Use web_time for WASM compatibility
#[cfg(target_arch = "wasm32")]
use web_time::Instant;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

/// Shortest interval a pointer speed is measured over.
///
/// Coalesced events can share a timestamp; dividing by this instead of zero
/// keeps a jump between them counted as fast motion.
pub const MIN_INTERVAL_MS: u64 = 1;

/// Milliseconds since an arbitrary monotonic origin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The origin.
    pub const ZERO: Self = Self(0);

    /// Create a timestamp from milliseconds.
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Milliseconds since the origin.
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Time elapsed since `earlier`, or `None` if the clock went backwards.
    pub fn elapsed_since(self, earlier: Timestamp) -> Option<u64> {
        self.0.checked_sub(earlier.0)
    }

    /// This timestamp moved `millis` into the future.
    pub fn saturating_add(self, millis: u64) -> Self {
        Self(self.0.saturating_add(millis))
    }
}

/// Distance per millisecond.
///
/// Returns `0.0` for zero or unknown elapsed time and for non-finite
/// distances, so callers never see NaN or infinity.
pub fn speed(distance: f64, elapsed_ms: Option<u64>) -> f64 {
    match elapsed_ms {
        Some(elapsed) if elapsed > 0 && distance.is_finite() => distance.abs() / elapsed as f64,
        _ => 0.0,
    }
}

/// A position observed at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample<P> {
    pub position: P,
    pub timestamp: Timestamp,
}

impl<P> Sample<P> {
    pub fn new(position: P, timestamp: Timestamp) -> Self {
        Self { position, timestamp }
    }
}

impl Sample<f64> {
    /// Speed along the axis between this sample and a later one.
    pub fn speed_to(&self, next: &Sample<f64>) -> f64 {
        speed(
            next.position - self.position,
            next.timestamp.elapsed_since(self.timestamp),
        )
    }
}

impl Sample<Point> {
    /// Straight-line distance to another sample's position.
    pub fn distance_to(&self, position: Point) -> f64 {
        self.position.distance(position)
    }
}

/// Source of the current time.
pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// Monotonic wall clock measured from its creation.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.origin.elapsed().as_millis() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_since() {
        let earlier = Timestamp::from_millis(100);
        let later = Timestamp::from_millis(116);

        assert_eq!(later.elapsed_since(earlier), Some(16));
        assert_eq!(earlier.elapsed_since(later), None);
    }

    #[test]
    fn test_speed_guards_degenerate_time() {
        assert_eq!(speed(10.0, Some(0)), 0.0);
        assert_eq!(speed(10.0, None), 0.0);
        assert_eq!(speed(f64::NAN, Some(16)), 0.0);
        assert_eq!(speed(f64::INFINITY, Some(16)), 0.0);
    }

    #[test]
    fn test_speed_is_never_negative() {
        assert!((speed(-32.0, Some(16)) - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_scalar_sample_speed() {
        let a = Sample::new(100.0, Timestamp::from_millis(0));
        let b = Sample::new(60.0, Timestamp::from_millis(20));

        assert!((a.speed_to(&b) - 2.0).abs() < f64::EPSILON);
        // Same timestamp reports zero rather than infinity
        let c = Sample::new(500.0, Timestamp::from_millis(20));
        assert_eq!(b.speed_to(&c), 0.0);
        // Clock skew clamps to zero
        assert_eq!(b.speed_to(&a), 0.0);
    }

    #[test]
    fn test_point_sample_distance() {
        let sample = Sample::new(Point::new(0.0, 0.0), Timestamp::ZERO);
        assert!((sample.distance_to(Point::new(3.0, 4.0)) - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
