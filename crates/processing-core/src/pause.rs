//! Recording-gap detection and moving-time accounting.
//!
//! Two thresholds are used by different stages: a short one to flag the
//! sample that resumes after a gap (so speed-based logic can skip the
//! window), and a longer one to decide which gaps count as stopped time.

use std::time::Duration;

use flyover_route_model::{elapsed, GeoPoint, Route};

/// Default gap that flags the resuming sample.
pub const DEFAULT_FLAG_THRESHOLD: Duration = Duration::from_secs(15);

/// Default gap that is subtracted from moving time.
pub const DEFAULT_ACCOUNTING_THRESHOLD: Duration = Duration::from_secs(30);

/// Pause detection settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PauseDetector {
    /// Gaps longer than this flag the next sample as a pause resume.
    pub flag_threshold: Duration,
    /// Gaps at least this long are removed from moving time.
    pub accounting_threshold: Duration,
}

impl Default for PauseDetector {
    fn default() -> Self {
        Self {
            flag_threshold: DEFAULT_FLAG_THRESHOLD,
            accounting_threshold: DEFAULT_ACCOUNTING_THRESHOLD,
        }
    }
}

impl PauseDetector {
    pub fn new(flag_threshold: Duration, accounting_threshold: Duration) -> Self {
        Self {
            flag_threshold,
            accounting_threshold,
        }
    }

    /// Return a copy of `points` with `is_pause_resume` set on every sample
    /// whose gap from its predecessor exceeds the flag threshold.
    ///
    /// Existing flags are recomputed. The first point is never flagged,
    /// and a pair missing either timestamp never flags. Positions are not
    /// touched.
    pub fn flag_pauses(&self, points: &[GeoPoint]) -> Vec<GeoPoint> {
        let threshold = self.flag_threshold.as_secs_f64();
        let mut flagged = Vec::with_capacity(points.len());

        for (i, point) in points.iter().enumerate() {
            let is_resume = i > 0
                && points[i - 1]
                    .seconds_until(point)
                    .is_some_and(|gap| gap > threshold);
            flagged.push(point.with_pause_resume(is_resume));
        }

        flagged
    }

    /// Elapsed time minus every gap at least as long as the accounting
    /// threshold, clamped at zero.
    ///
    /// `None` when either endpoint lacks a timestamp. Pairs with a missing
    /// timestamp are skipped rather than counted as pauses.
    pub fn moving_duration(&self, points: &[GeoPoint]) -> Option<Duration> {
        let total = elapsed(points)?.as_secs_f64();
        let threshold = self.accounting_threshold.as_secs_f64();

        let paused: f64 = points
            .windows(2)
            .filter_map(|w| w[0].seconds_until(&w[1]))
            .filter(|gap| *gap >= threshold)
            .sum();

        Some(Duration::from_secs_f64((total - paused).max(0.0)))
    }

    /// Gaps that exceed the flag threshold, as `(index_of_resume, gap)`.
    pub fn gaps(&self, points: &[GeoPoint]) -> Vec<(usize, Duration)> {
        let threshold = self.flag_threshold.as_secs_f64();
        points
            .windows(2)
            .enumerate()
            .filter_map(|(i, w)| {
                let gap = w[0].seconds_until(&w[1])?;
                (gap > threshold).then(|| (i + 1, Duration::from_secs_f64(gap)))
            })
            .collect()
    }

    /// Build a derived route with pause flags and moving duration filled in.
    pub fn annotate_route(&self, route: &Route) -> Route {
        let moving = self.moving_duration(&route.points);
        let annotated = route
            .derive(self.flag_pauses(&route.points))
            .with_moving_duration(moving);

        tracing::debug!(
            pauses = annotated.pause_count(),
            moving_secs = moving.map(|d| d.as_secs_f64()),
            "Annotated pauses"
        );
        annotated
    }
}
