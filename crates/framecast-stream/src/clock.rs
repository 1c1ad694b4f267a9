//! Monotonic clock shared by the pipeline
//!
//! All pipeline timestamps (grab times, fluency deadlines, blank timers) are
//! seconds on a single monotonic axis anchored at first use, so values taken
//! on different threads are directly comparable.

use std::sync::OnceLock;
use std::time::Instant;

static ANCHOR: OnceLock<Instant> = OnceLock::new();

/// Current monotonic time in seconds
///
/// Sub-millisecond precision; never goes backwards.
pub fn now_monotonic() -> f64 {
    ANCHOR.get_or_init(Instant::now).elapsed().as_secs_f64()
}

/// Floor a monotonic timestamp to its whole second
///
/// Used by the captured-FPS accounting to detect second boundaries.
pub fn floor_seconds(ts: f64) -> i64 {
    ts.floor() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_monotonic() {
        let a = now_monotonic();
        std::thread::sleep(Duration::from_millis(5));
        let b = now_monotonic();
        assert!(b > a);
        assert!(b - a >= 0.005);
    }

    #[test]
    fn test_floor_seconds() {
        assert_eq!(floor_seconds(0.999), 0);
        assert_eq!(floor_seconds(1.0), 1);
        assert_eq!(floor_seconds(42.5), 42);
    }
}
