//! Route container and derived statistics.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo_point::{path_distance, GeoPoint};

/// An ordered recording of one activity.
///
/// Owned by whoever loaded it. Processing stages take `&Route` and return
/// new routes built with [`Route::derive`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub id: String,
    pub name: String,

    /// Ordered samples; never empty.
    pub points: Vec<GeoPoint>,

    /// Path length in meters.
    pub total_distance_m: f64,

    /// Time between first and last sample, when both are timestamped.
    #[serde(default)]
    pub total_duration: Option<Duration>,

    /// Total duration minus recording gaps.
    #[serde(default)]
    pub moving_duration: Option<Duration>,

    /// Time of the first sample.
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
}

impl Route {
    /// Build a route from raw samples, validating and computing totals.
    pub fn from_points(
        id: impl Into<String>,
        name: impl Into<String>,
        points: Vec<GeoPoint>,
    ) -> Result<Self, RouteError> {
        if points.is_empty() {
            return Err(RouteError::Parse {
                message: "route contains no points".to_string(),
            });
        }
        if let Some((index, point)) = points.iter().enumerate().find(|(_, p)| !p.is_valid()) {
            return Err(RouteError::Parse {
                message: format!(
                    "point {index} has invalid coordinates ({}, {})",
                    point.lat, point.lng
                ),
            });
        }

        Ok(Self {
            id: id.into(),
            name: name.into(),
            total_distance_m: path_distance(&points),
            total_duration: elapsed(&points),
            moving_duration: None,
            start_time: points.first().and_then(|p| p.timestamp),
            points,
        })
    }

    /// Build a processed route from new points.
    ///
    /// Identity, start time, and the recorded durations carry over from
    /// `self`; the distance is recomputed from `points`. An empty `points`
    /// falls back to a copy of `self`.
    pub fn derive(&self, points: Vec<GeoPoint>) -> Route {
        if points.is_empty() {
            return self.clone();
        }
        Route {
            id: self.id.clone(),
            name: self.name.clone(),
            total_distance_m: path_distance(&points),
            total_duration: self.total_duration,
            moving_duration: self.moving_duration,
            start_time: self.start_time,
            points,
        }
    }

    /// A copy of this route with a moving duration attached.
    pub fn with_moving_duration(&self, moving: Option<Duration>) -> Route {
        Route {
            moving_duration: moving,
            ..self.clone()
        }
    }

    /// Bounding box of all samples.
    pub fn bounds(&self) -> RouteBounds {
        RouteBounds::from_points(&self.points)
            .unwrap_or_else(|| RouteBounds::point(&GeoPoint::new(0.0, 0.0)))
    }

    /// Number of samples flagged as resuming after a pause.
    pub fn pause_count(&self) -> usize {
        self.points.iter().filter(|p| p.is_pause_resume).count()
    }

    /// Sum of positive elevation changes in meters.
    pub fn elevation_gain_m(&self) -> f64 {
        self.points
            .windows(2)
            .filter_map(|w| match (w[0].elevation, w[1].elevation) {
                (Some(a), Some(b)) if b > a => Some(b - a),
                _ => None,
            })
            .sum()
    }

    /// Average speed over moving time, falling back to total time.
    pub fn average_moving_speed_mps(&self) -> Option<f64> {
        let secs = self
            .moving_duration
            .or(self.total_duration)
            .map(|d| d.as_secs_f64())?;
        if secs <= 0.0 {
            return None;
        }
        Some(self.total_distance_m / secs)
    }
}

/// Time between the first and last samples, clamped to zero.
pub fn elapsed(points: &[GeoPoint]) -> Option<Duration> {
    let first = points.first()?.timestamp?;
    let last = points.last()?.timestamp?;
    Some((last - first).to_std().unwrap_or(Duration::ZERO))
}

/// Axis-aligned latitude/longitude bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl RouteBounds {
    /// Bounds of a set of points, or `None` when empty.
    pub fn from_points(points: &[GeoPoint]) -> Option<Self> {
        let first = points.first()?;
        let mut bounds = Self::point(first);
        for p in &points[1..] {
            bounds.min_lat = bounds.min_lat.min(p.lat);
            bounds.max_lat = bounds.max_lat.max(p.lat);
            bounds.min_lng = bounds.min_lng.min(p.lng);
            bounds.max_lng = bounds.max_lng.max(p.lng);
        }
        Some(bounds)
    }

    /// Zero-size bounds around one point.
    pub fn point(p: &GeoPoint) -> Self {
        Self {
            min_lat: p.lat,
            max_lat: p.lat,
            min_lng: p.lng,
            max_lng: p.lng,
        }
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }

    pub fn lat_span(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    pub fn lng_span(&self) -> f64 {
        self.max_lng - self.min_lng
    }

    pub fn contains(&self, p: &GeoPoint) -> bool {
        p.lat >= self.min_lat
            && p.lat <= self.max_lat
            && p.lng >= self.min_lng
            && p.lng <= self.max_lng
    }

    /// Grow each side by `fraction` of the span, clamped to valid ranges.
    pub fn expanded(&self, fraction: f64) -> Self {
        let fraction = fraction.max(0.0);
        let dlat = self.lat_span() * fraction;
        let dlng = self.lng_span() * fraction;
        Self {
            min_lat: (self.min_lat - dlat).max(-90.0),
            max_lat: (self.max_lat + dlat).min(90.0),
            min_lng: (self.min_lng - dlng).max(-180.0),
            max_lng: (self.max_lng + dlng).min(180.0),
        }
    }
}

/// Errors that can occur when loading or validating route data.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid route: {message}")]
    Parse { message: String },

    #[error("Invalid render configuration: {message}")]
    Validation { message: String },
}

impl From<RouteError> for flyover_common::FlyoverError {
    fn from(err: RouteError) -> Self {
        match err {
            RouteError::IoError { path, source }
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                Self::FileNotFound { path }
            }
            RouteError::IoError { source, .. } => Self::Io(source),
            RouteError::Parse { message } => Self::Parse { message },
            RouteError::Validation { message } => Self::Config { message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn timed(lat: f64, lng: f64, secs: i64) -> GeoPoint {
        let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 7, 0, 0).unwrap();
        GeoPoint::new(lat, lng).with_timestamp(t0 + chrono::Duration::seconds(secs))
    }

    #[test]
    fn test_from_points_computes_totals() {
        let route = Route::from_points(
            "r1",
            "Morning Ride",
            vec![timed(0.0, 0.0, 0), timed(0.0, 0.01, 60), timed(0.0, 0.02, 120)],
        )
        .unwrap();

        assert_eq!(route.points.len(), 3);
        assert!((route.total_distance_m - 2_223.9).abs() < 1.0);
        assert_eq!(route.total_duration, Some(Duration::from_secs(120)));
        assert_eq!(route.start_time, route.points[0].timestamp);
        assert_eq!(route.moving_duration, None);
    }

    #[test]
    fn test_from_points_rejects_empty_and_invalid() {
        assert!(matches!(
            Route::from_points("r", "empty", vec![]),
            Err(RouteError::Parse { .. })
        ));

        let mut bad = GeoPoint::new(0.0, 0.0);
        bad.lat = 95.0;
        assert!(Route::from_points("r", "bad", vec![bad]).is_err());
    }

    #[test]
    fn test_derive_keeps_identity_and_recomputes_distance() {
        let route = Route::from_points(
            "r1",
            "Loop",
            vec![timed(0.0, 0.0, 0), timed(0.0, 0.01, 30), timed(0.0, 0.0, 60)],
        )
        .unwrap()
        .with_moving_duration(Some(Duration::from_secs(50)));

        let derived = route.derive(vec![route.points[0], route.points[1]]);
        assert_eq!(derived.id, "r1");
        assert_eq!(derived.total_duration, Some(Duration::from_secs(60)));
        assert_eq!(derived.moving_duration, Some(Duration::from_secs(50)));
        assert!(derived.total_distance_m < route.total_distance_m);
        // The original is untouched.
        assert_eq!(route.points.len(), 3);
    }

    #[test]
    fn test_elapsed_requires_both_endpoints() {
        let points = vec![timed(0.0, 0.0, 0), GeoPoint::new(0.0, 0.1)];
        assert_eq!(elapsed(&points), None);
    }

    #[test]
    fn test_bounds_and_expand() {
        let points = vec![
            GeoPoint::new(10.0, 20.0),
            GeoPoint::new(12.0, 18.0),
            GeoPoint::new(11.0, 21.0),
        ];
        let bounds = RouteBounds::from_points(&points).unwrap();
        assert_eq!(bounds.min_lat, 10.0);
        assert_eq!(bounds.max_lng, 21.0);
        assert_eq!(bounds.center(), GeoPoint::new(11.0, 19.5));
        assert!(points.iter().all(|p| bounds.contains(p)));

        let wide = bounds.expanded(0.5);
        assert!((wide.min_lat - 9.0).abs() < 1e-12);
        assert!((wide.max_lng - 22.5).abs() < 1e-12);
    }

    #[test]
    fn test_converts_into_flyover_error() {
        let err: flyover_common::FlyoverError = RouteError::Parse {
            message: "route contains no points".to_string(),
        }
        .into();
        assert!(matches!(err, flyover_common::FlyoverError::Parse { .. }));

        let err: flyover_common::FlyoverError = RouteError::Validation {
            message: "fps".to_string(),
        }
        .into();
        assert!(matches!(err, flyover_common::FlyoverError::Config { .. }));
    }

    #[test]
    fn test_elevation_gain_and_speed() {
        let route = Route::from_points(
            "r",
            "Climb",
            vec![
                timed(0.0, 0.0, 0).with_elevation(100.0),
                timed(0.0, 0.01, 100).with_elevation(130.0),
                timed(0.0, 0.02, 200).with_elevation(120.0),
                timed(0.0, 0.03, 300).with_elevation(150.0),
            ],
        )
        .unwrap();
        assert!((route.elevation_gain_m() - 60.0).abs() < 1e-9);

        let speed = route.average_moving_speed_mps().unwrap();
        assert!((speed - route.total_distance_m / 300.0).abs() < 1e-9);
    }
}
