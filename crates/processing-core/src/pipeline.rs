//! End-to-end route preparation: annotate, simplify, resample.

use std::time::Duration;

use flyover_common::{FlyoverResult, ProcessingDefaults};
use flyover_route_model::{RenderConfig, Route};
use serde::Serialize;

use crate::camera::{CameraController, ControllerConfig};
use crate::interpolate::resample_route;
use crate::pause::PauseDetector;
use crate::simplify::simplify_route;

/// Parameters for [`RouteProcessor`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessingConfig {
    /// RDP tolerance in meters.
    pub simplify_tolerance_m: f64,
    pub pause: PauseDetector,
    /// Bearing smoothing half-width used by the camera.
    pub bearing_window: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self::from(&ProcessingDefaults::default())
    }
}

impl From<&ProcessingDefaults> for ProcessingConfig {
    fn from(defaults: &ProcessingDefaults) -> Self {
        Self {
            simplify_tolerance_m: defaults.simplify_tolerance_m,
            pause: PauseDetector::new(
                secs(defaults.pause_flag_threshold_secs),
                secs(defaults.moving_time_threshold_secs),
            ),
            bearing_window: defaults.bearing_window,
        }
    }
}

fn secs(value: f64) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::from_secs_f64(value)
    } else {
        Duration::ZERO
    }
}

/// Point counts and totals at each stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingStats {
    pub raw_points: usize,
    pub simplified_points: usize,
    pub frame_points: usize,
    pub requested_frames: usize,
    pub pause_count: usize,
    pub total_distance_m: f64,
    pub total_duration_secs: Option<f64>,
    pub moving_duration_secs: Option<f64>,
}

/// Output of [`RouteProcessor::process`].
#[derive(Debug, Clone)]
pub struct ProcessedRoute {
    /// Annotated and simplified route.
    pub route: Route,
    /// Route resampled to one point per animation frame.
    pub frames: Route,
    pub stats: ProcessingStats,
}

impl ProcessedRoute {
    /// A paused camera controller over the frame points.
    pub fn camera(&self, config: ControllerConfig) -> FlyoverResult<CameraController> {
        CameraController::new(self.frames.points.clone(), config)
    }
}

/// Runs the processing stages in order. Every stage returns a new route.
#[derive(Debug, Clone, Default)]
pub struct RouteProcessor {
    config: ProcessingConfig,
}

impl RouteProcessor {
    pub fn new(config: ProcessingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProcessingConfig {
        &self.config
    }

    /// Flag pause resumes and compute moving time.
    pub fn annotate(&self, route: &Route) -> Route {
        self.config.pause.annotate_route(route)
    }

    /// Reduce GPS noise.
    pub fn simplify(&self, route: &Route) -> Route {
        simplify_route(route, self.config.simplify_tolerance_m)
    }

    /// Resample to about one point per frame.
    pub fn resample_to_frames(&self, route: &Route, frame_count: usize) -> Route {
        resample_route(route, frame_count)
    }

    /// Run every stage.
    pub fn process(&self, raw: &Route, frame_count: usize) -> ProcessedRoute {
        let annotated = self.annotate(raw);
        let simplified = self.simplify(&annotated);
        let frames = self.resample_to_frames(&simplified, frame_count);

        let stats = ProcessingStats {
            raw_points: raw.points.len(),
            simplified_points: simplified.points.len(),
            frame_points: frames.points.len(),
            requested_frames: frame_count,
            pause_count: annotated.pause_count(),
            total_distance_m: annotated.total_distance_m,
            total_duration_secs: annotated.total_duration.map(|d| d.as_secs_f64()),
            moving_duration_secs: annotated.moving_duration.map(|d| d.as_secs_f64()),
        };

        tracing::info!(
            route = %raw.name,
            raw = stats.raw_points,
            simplified = stats.simplified_points,
            frames = stats.frame_points,
            distance_m = stats.total_distance_m,
            "Route processed"
        );

        ProcessedRoute {
            route: simplified,
            frames,
            stats,
        }
    }

    /// Run every stage with the frame budget of a render configuration.
    pub fn process_for_render(&self, raw: &Route, render: &RenderConfig) -> ProcessedRoute {
        self.process(raw, render.route_frame_count())
    }

    /// Camera settings for a render configuration.
    pub fn camera_config(&self, render: &RenderConfig) -> ControllerConfig {
        ControllerConfig {
            fps: render.fps,
            pitch_deg: render.pitch_deg,
            base_zoom: render.zoom,
            bearing_window: self.config.bearing_window,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use flyover_route_model::GeoPoint;

    fn recorded_ride() -> Route {
        let t0 = Utc.with_ymd_and_hms(2024, 9, 14, 8, 0, 0).unwrap();
        let mut points = Vec::new();
        for i in 0..120 {
            // Gentle northeast line with a little jitter and a 2 minute stop.
            let jitter = if i % 2 == 0 { 2e-6 } else { -2e-6 };
            let secs = if i < 60 { i * 5 } else { i * 5 + 120 };
            points.push(
                GeoPoint::new(46.0 + i as f64 * 1e-4 + jitter, 7.0 + i as f64 * 1e-4)
                    .with_timestamp(t0 + chrono::Duration::seconds(secs)),
            );
        }
        Route::from_points("ride", "Saturday Ride", points).unwrap()
    }

    #[test]
    fn test_process_runs_all_stages() {
        let processor = RouteProcessor::default();
        let raw = recorded_ride();
        let processed = processor.process(&raw, 90);

        assert_eq!(processed.stats.raw_points, 120);
        assert!(processed.stats.simplified_points < 120);
        assert!((processed.stats.frame_points as i64 - 90).abs() <= 2);
        assert_eq!(processed.stats.pause_count, 1);

        let total = processed.stats.total_duration_secs.unwrap();
        let moving = processed.stats.moving_duration_secs.unwrap();
        assert_eq!(total - moving, 125.0);

        assert_eq!(processed.frames.points.first(), raw.points.first());
        assert_eq!(processed.frames.points.last(), raw.points.last());
        assert_eq!(raw.points.len(), 120);
    }

    #[test]
    fn test_camera_from_processed_route() {
        let processor = RouteProcessor::default();
        let processed = processor.process(&recorded_ride(), 30);
        let camera = processed.camera(ControllerConfig::default()).unwrap();
        assert_eq!(camera.total_frames() as usize, processed.frames.points.len());
    }

    #[test]
    fn test_config_from_defaults() {
        let defaults = ProcessingDefaults {
            simplify_tolerance_m: 5.0,
            pause_flag_threshold_secs: 10.0,
            moving_time_threshold_secs: 20.0,
            bearing_window: 3,
        };
        let config = ProcessingConfig::from(&defaults);
        assert_eq!(config.pause.flag_threshold, Duration::from_secs(10));
        assert_eq!(config.pause.accounting_threshold, Duration::from_secs(20));
        assert_eq!(config.bearing_window, 3);
    }
}
