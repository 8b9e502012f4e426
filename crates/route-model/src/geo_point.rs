//! Geographic sample type.
//!
//! Latitude and longitude are in degrees, elevation in meters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::route::RouteError;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// One recorded (or synthesized) route sample.
///
/// Equality compares position only: two samples at the same coordinates
/// are equal regardless of time, elevation, or pause flag.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in `[-90, 90]`.
    pub lat: f64,
    /// Longitude in `[-180, 180]`.
    pub lng: f64,
    /// Elevation in meters, when recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f64>,
    /// Sample time, when recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// True for the first sample after a recording gap.
    #[serde(default)]
    pub is_pause_resume: bool,
}

impl GeoPoint {
    /// Create a point, clamping coordinates into the valid range.
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat: lat.clamp(-90.0, 90.0),
            lng: lng.clamp(-180.0, 180.0),
            elevation: None,
            timestamp: None,
            is_pause_resume: false,
        }
    }

    /// Create a point, rejecting out-of-range or non-finite coordinates.
    pub fn try_new(lat: f64, lng: f64) -> Result<Self, RouteError> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(RouteError::Parse {
                message: format!("latitude {lat} is outside [-90, 90]"),
            });
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(RouteError::Parse {
                message: format!("longitude {lng} is outside [-180, 180]"),
            });
        }
        Ok(Self::new(lat, lng))
    }

    pub fn with_elevation(mut self, elevation: f64) -> Self {
        self.elevation = Some(elevation);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// A copy of this point with the pause-resume flag set to `flag`.
    pub fn with_pause_resume(mut self, flag: bool) -> Self {
        self.is_pause_resume = flag;
        self
    }

    /// Whether the coordinates are within the valid range.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Great-circle distance to another point in meters (haversine).
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let delta_lat = (other.lat - self.lat).to_radians();
        let delta_lng = (other.lng - self.lng).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (delta_lng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_M * c
    }

    /// Seconds from this point's timestamp to `later`'s, when both exist.
    pub fn seconds_until(&self, later: &GeoPoint) -> Option<f64> {
        match (self.timestamp, later.timestamp) {
            (Some(a), Some(b)) => Some((b - a).num_milliseconds() as f64 / 1000.0),
            _ => None,
        }
    }

    /// Linearly interpolate position, elevation, and timestamp.
    ///
    /// Elevation and timestamp are only produced when both ends carry
    /// them. The result is never flagged as a pause resume.
    pub fn lerp(a: &GeoPoint, b: &GeoPoint, t: f64) -> GeoPoint {
        let t = t.clamp(0.0, 1.0);
        let elevation = match (a.elevation, b.elevation) {
            (Some(ea), Some(eb)) => Some(ea + (eb - ea) * t),
            _ => None,
        };
        let timestamp = match (a.timestamp, b.timestamp) {
            (Some(ta), Some(tb)) => {
                let span_us = (tb - ta).num_microseconds().unwrap_or(0) as f64;
                Some(ta + chrono::Duration::microseconds((span_us * t).round() as i64))
            }
            _ => None,
        };
        GeoPoint {
            lat: a.lat + (b.lat - a.lat) * t,
            lng: a.lng + (b.lng - a.lng) * t,
            elevation,
            timestamp,
            is_pause_resume: false,
        }
    }
}

impl PartialEq for GeoPoint {
    fn eq(&self, other: &Self) -> bool {
        self.lat == other.lat && self.lng == other.lng
    }
}

/// Normalize an angle in degrees into `[0, 360)`.
pub fn normalize_degrees(deg: f64) -> f64 {
    if !deg.is_finite() {
        return 0.0;
    }
    let wrapped = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs.
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Total path length of a polyline in meters.
pub fn path_distance(points: &[GeoPoint]) -> f64 {
    points.windows(2).map(|w| w[0].distance_to(&w[1])).sum()
}
