//! Wall-clock phase timing.
//!
//! Phase durations are reporting data only. They never feed a score, so the clock is
//! allowed to be coarse: when the monotonic clock reports no elapsed time at all (a
//! platform without a high-resolution timer), the wall clock is consulted instead.

use std::time::{Duration, Instant, SystemTime};

/// A started measurement of one analysis phase.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    monotonic: Instant,
    wall: SystemTime,
}

impl Stopwatch {
    /// Starts a new measurement.
    #[must_use]
    pub fn start() -> Self {
        Stopwatch {
            monotonic: Instant::now(),
            wall: SystemTime::now(),
        }
    }

    /// Time elapsed since [`Stopwatch::start`].
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        let monotonic = self.monotonic.elapsed();
        if !monotonic.is_zero() {
            return monotonic;
        }
        self.wall.elapsed().unwrap_or(Duration::ZERO)
    }

    /// Elapsed time in fractional milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed().as_secs_f64() * 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_is_monotonic() {
        let watch = Stopwatch::start();
        let first = watch.elapsed();
        let second = watch.elapsed();
        assert!(second >= first);
        assert!(watch.elapsed_ms() >= 0.0);
    }
}
