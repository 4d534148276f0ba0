//! Playback clock
//!
//! Maps the output device's monotonic clock to media time under an
//! arbitrary speed multiplier. The position is re-derived from the anchor
//! on every sample rather than incrementally accumulated, so repeated
//! floating-point rounding cannot introduce drift.

use std::time::Instant;

/// Monotonic time source owned by an audio output
///
/// Implementations must be monotonic and non-decreasing; the absolute
/// origin is arbitrary.
pub trait DeviceClock: Send + Sync {
    /// Current device time in seconds
    fn now(&self) -> f64;
}

/// Instant-based device clock (origin at creation)
#[derive(Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceClock for MonotonicClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Derived-position calculation for the current playback run
///
/// Anchored whenever playback starts, resumes, seeks, or changes speed:
/// `position(now) = offset_at_anchor + (now - device_at_anchor) * speed`.
#[derive(Debug, Clone, Copy)]
pub struct PlaybackClock {
    device_at_anchor: f64,
    offset_at_anchor: f64,
    speed: f64,
}

impl PlaybackClock {
    /// Anchor the clock at a media offset, starting now
    pub fn anchored(device_now: f64, offset_secs: f64, speed: f64) -> Self {
        Self {
            device_at_anchor: device_now,
            offset_at_anchor: offset_secs,
            speed,
        }
    }

    /// Current media position in seconds
    pub fn position(&self, device_now: f64) -> f64 {
        self.offset_at_anchor + (device_now - self.device_at_anchor) * self.speed
    }

    /// Active speed multiplier
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Change speed in place, preserving the current position
    ///
    /// Captures the position at the old speed, then continues the formula
    /// with the new speed from this instant.
    pub fn re_anchor(&mut self, device_now: f64, new_speed: f64) {
        self.offset_at_anchor = self.position(device_now);
        self.device_at_anchor = device_now;
        self.speed = new_speed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_at_unit_speed() {
        let clock = PlaybackClock::anchored(10.0, 0.0, 1.0);
        assert_eq!(clock.position(10.0), 0.0);
        assert_eq!(clock.position(13.5), 3.5);
    }

    #[test]
    fn test_position_with_offset_and_speed() {
        let clock = PlaybackClock::anchored(100.0, 2.0, 1.5);
        // 4 device seconds at 1.5x = 6 media seconds past the 2s offset
        assert!((clock.position(104.0) - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_re_anchor_preserves_position() {
        let mut clock = PlaybackClock::anchored(0.0, 0.0, 1.0);

        // 2s at 1x puts us at 2.0; switch to 2x
        clock.re_anchor(2.0, 2.0);
        assert!((clock.position(2.0) - 2.0).abs() < 1e-9);

        // One more device second at 2x lands at 4.0
        assert!((clock.position(3.0) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_re_derivation_has_no_drift() {
        let clock = PlaybackClock::anchored(0.0, 1.0, 1.25);

        // Sampling many times must give the same answer as sampling once
        let mut last = f64::MIN;
        for i in 0..10_000 {
            let now = i as f64 * 0.001;
            let pos = clock.position(now);
            assert!(pos >= last);
            last = pos;
        }
        assert!((clock.position(9.999) - (1.0 + 9.999 * 1.25)).abs() < 1e-9);
    }

    #[test]
    fn test_monotonic_clock_advances() {
        let clock = MonotonicClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
