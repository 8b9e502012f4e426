//! Clock and timing utilities for playback and render pacing.
//!
//! Time is expressed as a `Duration` elapsed since a clock's epoch. The
//! camera controller never reads a clock itself; callers pass `now` in,
//! which lets tests drive playback with a [`ManualClock`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A monotonic time source.
pub trait Clock: Send + Sync {
    /// Time elapsed since the clock's epoch.
    fn now(&self) -> Duration;
}

/// A clock anchored to the moment it was started.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    /// The instant the clock started.
    epoch: Instant,

    /// Wall-clock time at epoch (ISO 8601 string).
    epoch_wall: String,
}

impl MonotonicClock {
    /// Create a new clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Seconds elapsed since start.
    pub fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Wall-clock time at start.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }

    /// The underlying epoch instant.
    pub fn epoch(&self) -> Instant {
        self.epoch
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }
}

/// A virtual clock that only moves when told to.
///
/// Clones share the same time, so a test can hand one clone to the code
/// under test and advance another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_ns: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward.
    pub fn advance(&self, by: Duration) {
        self.now_ns
            .fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
    }

    /// Jump to an absolute time. Going backwards is ignored.
    pub fn set(&self, to: Duration) {
        self.now_ns
            .fetch_max(to.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.now_ns.load(Ordering::SeqCst))
    }
}

/// Interval between playback ticks: `1000 / (fps * speed)` milliseconds.
pub fn frame_interval(fps: u32, speed: f64) -> Duration {
    let rate = fps.max(1) as f64 * speed.max(f64::MIN_POSITIVE);
    Duration::from_secs_f64(1.0 / rate)
}

/// Fixed-interval deadline tracker.
///
/// Fires at most once per [`TickSchedule::poll`] call. A late poll fires
/// once and schedules the next tick a full interval later, so ticks are
/// never delivered faster than the configured rate.
#[derive(Debug, Clone)]
pub struct TickSchedule {
    interval: Duration,
    next_due: Duration,
}

impl TickSchedule {
    /// Start ticking; the first tick is due one interval after `now`.
    pub fn starting_at(now: Duration, interval: Duration) -> Self {
        Self {
            interval,
            next_due: now + interval,
        }
    }

    /// Returns true and re-arms if the next tick is due.
    pub fn poll(&mut self, now: Duration) -> bool {
        if now < self.next_due {
            return false;
        }
        self.next_due = now + self.interval;
        true
    }

    /// When the next tick is due.
    pub fn next_due(&self) -> Duration {
        self.next_due
    }

    /// Tick interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_clock_elapsed() {
        let clock = MonotonicClock::start();
        assert!(clock.now() < Duration::from_secs(1));
        assert!(!clock.epoch_wall().is_empty());
    }

    #[test]
    fn test_manual_clock_clones_share_time() {
        let clock = ManualClock::new();
        let observer = clock.clone();
        clock.advance(Duration::from_millis(250));
        assert_eq!(observer.now(), Duration::from_millis(250));

        clock.set(Duration::from_millis(100));
        assert_eq!(observer.now(), Duration::from_millis(250));
    }

    #[test]
    fn test_frame_interval() {
        assert_eq!(frame_interval(30, 1.0), Duration::from_secs_f64(1.0 / 30.0));
        let fast = frame_interval(30, 2.0);
        assert!((fast.as_secs_f64() - 1.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_tick_schedule_never_catches_up() {
        let interval = Duration::from_millis(10);
        let mut schedule = TickSchedule::starting_at(Duration::ZERO, interval);
        assert!(!schedule.poll(Duration::from_millis(5)));
        assert!(schedule.poll(Duration::from_millis(10)));

        // A very late poll fires once, not five times.
        assert!(schedule.poll(Duration::from_millis(60)));
        assert!(!schedule.poll(Duration::from_millis(61)));
        assert_eq!(schedule.next_due(), Duration::from_millis(70));
    }
}
