//! Camera animation controller.
//!
//! Turns an interpolated point sequence into per-frame camera poses and
//! plays them back at a configurable rate. The controller owns no timer:
//! callers pass the current time into [`CameraController::play`] and
//! [`CameraController::poll`] and sleep until
//! [`CameraController::next_deadline`]. The same controller doubles as a
//! pure "pose for frame N" function during rendering.

use std::time::Duration;

use flyover_common::{frame_interval, FlyoverError, FlyoverResult, TickSchedule};
use flyover_route_model::{CameraPose, GeoPoint};

use crate::bearing::{bearing, bearing_delta, smoothed_bearing};

/// Playback speed bounds.
pub const MIN_SPEED: f64 = 0.25;
pub const MAX_SPEED: f64 = 4.0;

/// Zoom range used when widening the view on sharp turns.
pub const MIN_TURN_ZOOM: f64 = 14.0;
pub const MAX_TURN_ZOOM: f64 = 17.0;

/// Turns sharper than this (degrees) widen the view.
pub const TURN_ZOOM_THRESHOLD_DEG: f64 = 30.0;

/// Camera settings applied to every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerConfig {
    /// Playback frame rate at speed 1.0.
    pub fps: u32,
    /// Tilt applied to every pose.
    pub pitch_deg: f64,
    /// Zoom on straight sections.
    pub base_zoom: f64,
    /// Half-width, in points, of the bearing smoothing window.
    pub bearing_window: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            pitch_deg: 60.0,
            base_zoom: 16.0,
            bearing_window: 5,
        }
    }
}

/// Something the controller produced for its consumer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerEvent {
    /// Pose for the frame that just became current.
    Frame(CameraPose),
    /// Playback reached the last frame and stopped.
    Completed,
}

/// Playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Paused,
    Playing,
    Disposed,
}

/// Cooperative player over an interpolated route.
#[derive(Debug)]
pub struct CameraController {
    points: Vec<GeoPoint>,
    config: ControllerConfig,
    current_frame: u32,
    speed: f64,
    ticks: Option<TickSchedule>,
    disposed: bool,
}

impl CameraController {
    /// Create a paused controller at frame 0.
    pub fn new(points: Vec<GeoPoint>, config: ControllerConfig) -> FlyoverResult<Self> {
        if points.is_empty() {
            return Err(FlyoverError::parse("camera path has no points"));
        }
        if points.len() > u32::MAX as usize {
            return Err(FlyoverError::parse("camera path is too long"));
        }
        Ok(Self {
            points,
            config,
            current_frame: 0,
            speed: 1.0,
            ticks: None,
            disposed: false,
        })
    }

    pub fn total_frames(&self) -> u32 {
        self.points.len() as u32
    }

    pub fn current_frame(&self) -> u32 {
        self.current_frame
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn state(&self) -> PlaybackState {
        if self.disposed {
            PlaybackState::Disposed
        } else if self.ticks.is_some() {
            PlaybackState::Playing
        } else {
            PlaybackState::Paused
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state() == PlaybackState::Playing
    }

    fn last_frame(&self) -> u32 {
        self.total_frames().saturating_sub(1)
    }

    /// Interval between ticks at the current speed.
    pub fn tick_interval(&self) -> Duration {
        frame_interval(self.config.fps, self.speed)
    }

    /// Start ticking from `now`. Rewinds first if parked on the last frame.
    ///
    /// No-op while already playing or after [`dispose`](Self::dispose).
    pub fn play(&mut self, now: Duration) {
        if self.disposed || self.ticks.is_some() {
            return;
        }
        if self.current_frame >= self.last_frame() {
            self.current_frame = 0;
        }
        self.ticks = Some(TickSchedule::starting_at(now, self.tick_interval()));
        tracing::debug!(
            frame = self.current_frame,
            speed = self.speed,
            "Playback started"
        );
    }

    /// Stop ticking. Idempotent.
    pub fn pause(&mut self) {
        if self.ticks.take().is_some() {
            tracing::debug!(frame = self.current_frame, "Playback paused");
        }
    }

    /// Advance at most one frame if a tick is due.
    ///
    /// A late poll still advances a single frame, so consumers never see
    /// frames faster than the configured rate.
    pub fn poll(&mut self, now: Duration) -> Vec<PlayerEvent> {
        let Some(ticks) = self.ticks.as_mut() else {
            return Vec::new();
        };
        if !ticks.poll(now) {
            return Vec::new();
        }

        let last = self.last_frame();
        if self.current_frame >= last {
            self.ticks = None;
            return vec![PlayerEvent::Completed];
        }

        self.current_frame += 1;
        let mut events = vec![PlayerEvent::Frame(self.current_pose())];
        if self.current_frame >= last {
            self.ticks = None;
            events.push(PlayerEvent::Completed);
        }
        events
    }

    /// When the next tick is due, if playing.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.ticks.as_ref().map(TickSchedule::next_due)
    }

    /// Jump to a frame, clamped into range. Play state is unchanged.
    pub fn seek_to_frame(&mut self, frame: u32) -> CameraPose {
        self.current_frame = frame.min(self.last_frame());
        self.current_pose()
    }

    /// Jump to a fraction of the route. Non-finite values seek to the start.
    pub fn seek_to_progress(&mut self, progress: f64) -> CameraPose {
        let progress = if progress.is_finite() {
            progress.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let frame = (progress * self.last_frame() as f64).round() as u32;
        self.seek_to_frame(frame)
    }

    /// Change playback speed, clamped to `[MIN_SPEED, MAX_SPEED]`.
    ///
    /// While playing, the tick restarts at the new rate from `now`; the
    /// current frame is kept.
    pub fn set_speed(&mut self, multiplier: f64, now: Duration) {
        self.speed = if multiplier.is_finite() {
            multiplier.clamp(MIN_SPEED, MAX_SPEED)
        } else {
            1.0
        };
        if self.ticks.is_some() {
            self.ticks = Some(TickSchedule::starting_at(now, self.tick_interval()));
        }
    }

    /// Stop for good. Later `play` calls do nothing.
    pub fn dispose(&mut self) {
        self.ticks = None;
        self.disposed = true;
    }

    /// Pose for the current frame.
    pub fn current_pose(&self) -> CameraPose {
        self.pose_for_frame(self.current_frame)
    }

    /// Pose for any frame, clamped into range. Does not move playback.
    pub fn pose_for_frame(&self, frame: u32) -> CameraPose {
        let frame = frame.min(self.last_frame());
        let idx = frame as usize;
        let progress = if self.last_frame() == 0 {
            0.0
        } else {
            frame as f64 / self.last_frame() as f64
        };

        CameraPose::new(
            frame,
            self.points[idx],
            smoothed_bearing(&self.points, idx, self.config.bearing_window),
            self.config.pitch_deg,
            self.dynamic_zoom(idx),
            progress,
        )
    }

    /// Every pose in frame order.
    pub fn poses(&self) -> impl Iterator<Item = CameraPose> + '_ {
        (0..self.total_frames()).map(|f| self.pose_for_frame(f))
    }

    /// Base zoom, pulled toward [`MIN_TURN_ZOOM`] in proportion to how
    /// sharply the route turns at `idx`.
    ///
    /// The turn is measured between the segment arriving from two points
    /// back and the one leaving toward two points ahead. Within two points
    /// of either end there is not enough context and the base zoom is used.
    pub fn dynamic_zoom(&self, idx: usize) -> f64 {
        let base = self.config.base_zoom;
        if idx < 2 || idx + 2 >= self.points.len() {
            return base;
        }

        let p = &self.points;
        let incoming = bearing(&p[idx - 2], &p[idx]);
        let outgoing = bearing(&p[idx], &p[idx + 2]);
        let delta = bearing_delta(incoming, outgoing).abs();
        if delta <= TURN_ZOOM_THRESHOLD_DEG {
            return base;
        }

        let sharpness = (delta - TURN_ZOOM_THRESHOLD_DEG) / (180.0 - TURN_ZOOM_THRESHOLD_DEG);
        // Turns only ever widen the view; a base already below the floor stays put.
        (base - (base - MIN_TURN_ZOOM) * sharpness)
            .clamp(MIN_TURN_ZOOM, MAX_TURN_ZOOM)
            .min(base)
    }
}
