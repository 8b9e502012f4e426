//! Camera pose for a single animation frame.

use serde::{Deserialize, Serialize};

use crate::geo_point::{normalize_degrees, GeoPoint};

/// Camera configuration handed to the map surface for one frame.
///
/// Poses are computed on demand and discarded after use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub frame_index: u32,
    /// Point the camera looks at.
    pub center: GeoPoint,
    /// Compass heading in `[0, 360)`.
    pub bearing_deg: f64,
    /// Tilt from straight down, in degrees.
    pub pitch_deg: f64,
    /// Web-map zoom level.
    pub zoom: f64,
    /// Position through the route in `[0, 1]`.
    pub progress: f64,
}

impl CameraPose {
    /// Create a pose, normalizing bearing and clamping progress.
    pub fn new(
        frame_index: u32,
        center: GeoPoint,
        bearing_deg: f64,
        pitch_deg: f64,
        zoom: f64,
        progress: f64,
    ) -> Self {
        Self {
            frame_index,
            center,
            bearing_deg: normalize_degrees(bearing_deg),
            pitch_deg,
            zoom,
            progress: if progress.is_finite() {
                progress.clamp(0.0, 1.0)
            } else {
                0.0
            },
        }
    }

    /// A north-up, untilted pose at `center`.
    pub fn overhead(center: GeoPoint, zoom: f64) -> Self {
        Self::new(0, center, 0.0, 0.0, zoom, 0.0)
    }

    /// The same camera placed at a different frame index.
    pub fn at_frame(mut self, frame_index: u32) -> Self {
        self.frame_index = frame_index;
        self
    }
}
