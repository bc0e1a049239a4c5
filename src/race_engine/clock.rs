//! Race clock
//!
//! Elapsed race time only advances while the clock runs. All skill timers
//! read this clock, so stopping it pauses them too.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic source of "now", measured from an arbitrary origin.
pub trait TimeSource: Send {
    fn now(&self) -> Duration;
}

/// Wall-clock time backed by [`Instant`].
#[derive(Debug, Clone)]
pub struct MonotonicTime {
    origin: Instant,
}

impl MonotonicTime {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicTime {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicTime {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Time that only moves when told to. Clones share the same reading, so a
/// driver can keep one handle while the clock owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualTime {
    nanos: Arc<AtomicU64>,
}

impl ManualTime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.nanos.fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
    }

    pub fn advance_secs(&self, secs: f32) {
        self.advance(Duration::from_secs_f32(secs.max(0.0)));
    }
}

impl TimeSource for ManualTime {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}

/// Start/stop clock with separate delta and elapsed readings.
pub struct RaceClock {
    source: Box<dyn TimeSource>,
    /// Time accrued by completed run segments
    accumulated: Duration,
    /// Source reading when the current run segment began
    segment_start: Option<Duration>,
    last_delta_at: Duration,
}

impl RaceClock {
    pub fn new(source: Box<dyn TimeSource>) -> Self {
        Self {
            source,
            accumulated: Duration::ZERO,
            segment_start: None,
            last_delta_at: Duration::ZERO,
        }
    }

    /// Begin advancing from the current elapsed value. Returns false and does
    /// nothing when already running.
    pub fn start(&mut self) -> bool {
        if self.segment_start.is_some() {
            return false;
        }
        let now = self.source.now();
        self.segment_start = Some(now);
        self.last_delta_at = now;
        true
    }

    /// Freeze elapsed time at its current value. Idempotent.
    pub fn stop(&mut self) {
        if let Some(start) = self.segment_start.take() {
            self.accumulated += self.source.now().saturating_sub(start);
        }
    }

    /// Stop and zero the elapsed time.
    pub fn reset(&mut self) {
        self.segment_start = None;
        self.accumulated = Duration::ZERO;
    }

    pub fn is_running(&self) -> bool {
        self.segment_start.is_some()
    }

    /// Seconds since the previous call (or since `start`); 0 while stopped.
    pub fn get_delta(&mut self) -> f32 {
        if !self.is_running() {
            return 0.0;
        }
        let now = self.source.now();
        let delta = now.saturating_sub(self.last_delta_at);
        self.last_delta_at = now;
        delta.as_secs_f32()
    }

    /// Seconds of running time since the last reset.
    pub fn get_elapsed_time(&self) -> f32 {
        let running = match self.segment_start {
            Some(start) => self.source.now().saturating_sub(start),
            None => Duration::ZERO,
        };
        (self.accumulated + running).as_secs_f32()
    }
}

impl std::fmt::Debug for RaceClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RaceClock")
            .field("running", &self.is_running())
            .field("elapsed", &self.get_elapsed_time())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn manual_clock() -> (ManualTime, RaceClock) {
        let time = ManualTime::new();
        let clock = RaceClock::new(Box::new(time.clone()));
        (time, clock)
    }

    #[test]
    fn stopped_clock_reports_nothing() {
        let (time, mut clock) = manual_clock();
        time.advance_secs(1.0);
        assert_eq!(clock.get_delta(), 0.0);
        assert_eq!(clock.get_elapsed_time(), 0.0);
    }

    #[test]
    fn delta_measures_since_previous_read() {
        let (time, mut clock) = manual_clock();
        assert!(clock.start());
        time.advance_secs(0.5);
        assert_relative_eq!(clock.get_delta(), 0.5, epsilon = 1e-6);
        time.advance_secs(0.25);
        assert_relative_eq!(clock.get_delta(), 0.25, epsilon = 1e-6);
        assert_eq!(clock.get_delta(), 0.0);
        assert_relative_eq!(clock.get_elapsed_time(), 0.75, epsilon = 1e-6);
    }

    #[test]
    fn start_twice_is_a_noop() {
        let (time, mut clock) = manual_clock();
        assert!(clock.start());
        time.advance_secs(1.0);
        assert!(!clock.start());
        assert_relative_eq!(clock.get_delta(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn elapsed_excludes_stopped_time() {
        let (time, mut clock) = manual_clock();
        clock.start();
        time.advance_secs(1.0);
        clock.stop();
        clock.stop();
        time.advance_secs(5.0);
        assert_relative_eq!(clock.get_elapsed_time(), 1.0, epsilon = 1e-6);
        assert_eq!(clock.get_delta(), 0.0);

        clock.start();
        time.advance_secs(0.5);
        assert_relative_eq!(clock.get_elapsed_time(), 1.5, epsilon = 1e-6);
        assert_relative_eq!(clock.get_delta(), 0.5, epsilon = 1e-6);
    }

    #[test]
    fn reset_zeroes_elapsed() {
        let (time, mut clock) = manual_clock();
        clock.start();
        time.advance_secs(2.0);
        clock.reset();
        assert!(!clock.is_running());
        assert_eq!(clock.get_elapsed_time(), 0.0);
    }
}
