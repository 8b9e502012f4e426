//! Sequential render pipeline.
//!
//! One run walks `Initializing → ZoomInIntro → CapturingRoute →
//! ZoomOutOutro → [EndingSlideshow] → Finalizing → Complete`. Every frame
//! follows the same steps: move the camera (or slide), wait for the
//! surface to settle, capture, append, count. Frames are never captured
//! concurrently; the encoder sees them strictly in order.
//!
//! Cancellation is cooperative. The flag is checked at the top of every
//! frame, so an in-flight capture and append finish before the run stops.
//! A cancelled run never calls [`VideoEncoder::finish`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use flyover_common::{Clock, FlyoverError, FlyoverResult, MonotonicClock, RenderDefaults};
use flyover_processing_core::transition::pose_transition;
use flyover_processing_core::CameraController;
use flyover_route_model::{CameraPose, RenderConfig, RouteBounds};
use serde::Serialize;

use crate::collaborators::{FrameCapture, MapSurface, VideoEncoder};
use crate::slideshow::{plan_slideshow, slideshow_frame_count, SLIDE_SECONDS};

/// Share of overall progress covered by frame capture. Finalizing is not
/// frame-counted, so it is pinned just below completion.
pub const CAPTURE_PROGRESS_SHARE: f64 = 0.95;

/// Stage of a render run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderPhase {
    Initializing,
    ZoomInIntro,
    CapturingRoute,
    ZoomOutOutro,
    EndingSlideshow,
    Finalizing,
    Complete,
    Error,
    Cancelled,
}

impl RenderPhase {
    /// Whether the run is over.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error | Self::Cancelled)
    }

    /// Whether this phase captures frames.
    pub fn is_capturing(self) -> bool {
        matches!(
            self,
            Self::ZoomInIntro | Self::CapturingRoute | Self::ZoomOutOutro | Self::EndingSlideshow
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::ZoomInIntro => "intro",
            Self::CapturingRoute => "route",
            Self::ZoomOutOutro => "outro",
            Self::EndingSlideshow => "slideshow",
            Self::Finalizing => "finalizing",
            Self::Complete => "complete",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for RenderPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Estimated time remaining.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Eta {
    /// Not enough data yet (no frame captured).
    Calculating,
    Remaining(Duration),
}

impl fmt::Display for Eta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Calculating => f.write_str("calculating"),
            Self::Remaining(d) => {
                let secs = d.as_secs();
                write!(f, "{}:{:02}", secs / 60, secs % 60)
            }
        }
    }
}

/// Progress report emitted after every frame and on phase changes.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderProgress {
    pub phase: RenderPhase,
    /// Frames processed so far, including dropped captures.
    pub frames_captured: u64,
    /// Captures that returned no frame and were not appended.
    pub frames_dropped: u64,
    pub total_frames: u64,
    /// Overall progress in `[0, 1]`.
    pub overall: f64,
    pub elapsed: Duration,
    pub eta: Eta,
}

/// Overall progress for a phase and frame count.
pub fn overall_progress(phase: RenderPhase, frames_captured: u64, total_frames: u64) -> f64 {
    match phase {
        RenderPhase::Complete => 1.0,
        RenderPhase::Finalizing => CAPTURE_PROGRESS_SHARE,
        _ if total_frames == 0 => 0.0,
        _ => {
            let fraction = (frames_captured as f64 / total_frames as f64).min(1.0);
            fraction * CAPTURE_PROGRESS_SHARE
        }
    }
}

/// `elapsed / progress − elapsed`, or [`Eta::Calculating`] before the
/// first frame.
pub fn estimate_remaining(elapsed: Duration, progress: f64, frames_captured: u64) -> Eta {
    if frames_captured == 0 || !(progress > 0.0) {
        return Eta::Calculating;
    }
    let elapsed_secs = elapsed.as_secs_f64();
    let remaining = (elapsed_secs / progress.min(1.0) - elapsed_secs).max(0.0);
    Eta::Remaining(Duration::from_secs_f64(remaining))
}

/// Progress observer.
pub type ProgressCallback = Box<dyn Fn(&RenderProgress) + Send>;

/// Shared cancellation flag. Clones refer to the same run.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Knobs that are not part of the video itself.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorOptions {
    /// Wait between moving the camera and capturing.
    pub settle_delay: Duration,
    /// Capture resolution multiplier.
    pub pixel_scale: f64,
    /// Viewport fraction kept free around the route in the overview pose.
    pub overview_padding: f64,
    /// Seconds per ending image.
    pub slide_seconds: f64,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self::from(&RenderDefaults::default())
    }
}

impl From<&RenderDefaults> for OrchestratorOptions {
    fn from(defaults: &RenderDefaults) -> Self {
        Self {
            settle_delay: Duration::from_millis(defaults.settle_delay_ms),
            pixel_scale: defaults.pixel_scale,
            overview_padding: defaults.overview_padding,
            slide_seconds: SLIDE_SECONDS,
        }
    }
}

/// How a run ended, when it did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    Complete {
        output_path: PathBuf,
        frames_captured: u64,
        frames_dropped: u64,
    },
    Cancelled {
        frames_captured: u64,
    },
}

enum Flow {
    Continue,
    Cancelled,
}

/// Drives one render run. Create a new orchestrator for every run.
pub struct RenderOrchestrator {
    map: Box<dyn MapSurface>,
    capture: Box<dyn FrameCapture>,
    encoder: Box<dyn VideoEncoder>,
    options: OrchestratorOptions,
    cancel: CancelHandle,
    on_progress: Option<ProgressCallback>,

    phase: RenderPhase,
    frames_captured: u64,
    frames_dropped: u64,
    total_frames: u64,
    clock: Option<MonotonicClock>,
    output_path: Option<PathBuf>,
    error_message: Option<String>,
}

impl RenderOrchestrator {
    pub fn new(
        map: Box<dyn MapSurface>,
        capture: Box<dyn FrameCapture>,
        encoder: Box<dyn VideoEncoder>,
        options: OrchestratorOptions,
    ) -> Self {
        Self {
            map,
            capture,
            encoder,
            options,
            cancel: CancelHandle::new(),
            on_progress: None,
            phase: RenderPhase::Initializing,
            frames_captured: 0,
            frames_dropped: 0,
            total_frames: 0,
            clock: None,
            output_path: None,
            error_message: None,
        }
    }

    /// Report progress to `callback` after every frame and phase change.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    /// Use an existing cancellation flag, e.g. one already wired to a
    /// signal handler.
    pub fn with_cancel(mut self, handle: CancelHandle) -> Self {
        self.cancel = handle;
        self
    }

    /// Handle that cancels this run from anywhere.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn phase(&self) -> RenderPhase {
        self.phase
    }

    pub fn frames_captured(&self) -> u64 {
        self.frames_captured
    }

    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// User-facing message of the failure, once the run is in `Error`.
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// The finished file. Only available once the run is `Complete`.
    pub fn output_path(&self) -> Option<&Path> {
        match self.phase {
            RenderPhase::Complete => self.output_path.as_deref(),
            _ => None,
        }
    }

    /// Current progress snapshot.
    pub fn progress(&self) -> RenderProgress {
        let elapsed = self.clock.as_ref().map(|c| c.now()).unwrap_or_default();
        let overall = overall_progress(self.phase, self.frames_captured, self.total_frames);
        RenderProgress {
            phase: self.phase,
            frames_captured: self.frames_captured,
            frames_dropped: self.frames_dropped,
            total_frames: self.total_frames,
            overall,
            elapsed,
            eta: match self.phase {
                RenderPhase::Complete => Eta::Remaining(Duration::ZERO),
                _ => estimate_remaining(elapsed, overall, self.frames_captured),
            },
        }
    }

    /// Frame count for a configuration and camera path.
    pub fn planned_frames(&self, config: &RenderConfig, camera: &CameraController) -> u64 {
        let frames_per_slide = config.frames_per_slide(self.options.slide_seconds);
        config.intro_frames as u64
            + camera.total_frames() as u64
            + config.outro_frames as u64
            + slideshow_frame_count(&config.ending_images, frames_per_slide)
    }

    /// Render the whole video.
    ///
    /// Returns `Ok` for a completed or cancelled run. Any collaborator
    /// failure moves the run to `Error`, records a user-facing message,
    /// and is returned. Runs are single-use.
    pub async fn run(
        &mut self,
        config: &RenderConfig,
        camera: &CameraController,
    ) -> FlyoverResult<RenderOutcome> {
        if self.phase != RenderPhase::Initializing {
            return Err(FlyoverError::invalid_state(format!(
                "a render run can only start once (current phase: {})",
                self.phase
            )));
        }
        let clock = MonotonicClock::start();
        tracing::debug!(started_at = clock.epoch_wall(), "Render run starting");
        self.clock = Some(clock);

        match self.execute(config, camera).await {
            Ok(Flow::Continue) => {
                let output_path = self.output_path.clone().unwrap_or_default();
                tracing::info!(
                    output = %output_path.display(),
                    frames = self.frames_captured,
                    dropped = self.frames_dropped,
                    elapsed_secs = self.progress().elapsed.as_secs_f64(),
                    "Render complete"
                );
                Ok(RenderOutcome::Complete {
                    output_path,
                    frames_captured: self.frames_captured,
                    frames_dropped: self.frames_dropped,
                })
            }
            Ok(Flow::Cancelled) => {
                self.encoder.discard();
                self.enter(RenderPhase::Cancelled);
                tracing::info!(frames = self.frames_captured, "Render cancelled");
                Ok(RenderOutcome::Cancelled {
                    frames_captured: self.frames_captured,
                })
            }
            Err(err) => {
                self.encoder.discard();
                self.error_message = Some(err.user_message());
                self.enter(RenderPhase::Error);
                tracing::error!(
                    error = %err,
                    frames = self.frames_captured,
                    "Render failed"
                );
                Err(err)
            }
        }
    }

    async fn execute(
        &mut self,
        config: &RenderConfig,
        camera: &CameraController,
    ) -> FlyoverResult<Flow> {
        config.validate()?;
        let points = camera.points();
        let bounds = RouteBounds::from_points(points)
            .ok_or_else(|| FlyoverError::parse("route has no points"))?;

        self.total_frames = self.planned_frames(config, camera);
        tracing::info!(
            width = config.width,
            height = config.height,
            fps = config.fps,
            total_frames = self.total_frames,
            route_frames = camera.total_frames(),
            slides = config.ending_images.len(),
            "Starting render"
        );

        let output_path = self.encoder.setup(config)?;
        self.output_path = Some(output_path);
        let overview = self
            .map
            .compute_overview_pose(&bounds, self.options.overview_padding)?;
        self.report();

        let first = camera.pose_for_frame(0);
        let last = camera.pose_for_frame(camera.total_frames().saturating_sub(1));

        self.enter(RenderPhase::ZoomInIntro);
        self.map.set_route_trail(&[])?;
        let intro = pose_transition(&overview, &first, config.intro_frames);
        if let Flow::Cancelled = self.capture_poses(&intro).await? {
            return Ok(Flow::Cancelled);
        }

        self.enter(RenderPhase::CapturingRoute);
        for frame in 0..camera.total_frames() {
            if self.cancel.is_cancelled() {
                return Ok(Flow::Cancelled);
            }
            if config.overlays.trail {
                self.map.set_route_trail(&points[..=frame as usize])?;
            }
            self.map.set_camera(&camera.pose_for_frame(frame))?;
            self.settle_and_capture().await?;
        }

        self.enter(RenderPhase::ZoomOutOutro);
        let outro = pose_transition(&last, &overview, config.outro_frames);
        if let Flow::Cancelled = self.capture_poses(&outro).await? {
            return Ok(Flow::Cancelled);
        }

        if !config.ending_images.is_empty() {
            self.enter(RenderPhase::EndingSlideshow);
            let frames_per_slide = config.frames_per_slide(self.options.slide_seconds);
            for slide in plan_slideshow(&config.ending_images, frames_per_slide) {
                if self.cancel.is_cancelled() {
                    return Ok(Flow::Cancelled);
                }
                self.map.show_slide(&slide)?;
                self.settle_and_capture().await?;
            }
            self.map.clear_slide()?;
        }

        if self.cancel.is_cancelled() {
            return Ok(Flow::Cancelled);
        }

        self.enter(RenderPhase::Finalizing);
        self.encoder.finish()?;
        self.enter(RenderPhase::Complete);
        Ok(Flow::Continue)
    }

    async fn capture_poses(&mut self, poses: &[CameraPose]) -> FlyoverResult<Flow> {
        for pose in poses {
            if self.cancel.is_cancelled() {
                return Ok(Flow::Cancelled);
            }
            self.map.set_camera(pose)?;
            self.settle_and_capture().await?;
        }
        Ok(Flow::Continue)
    }

    async fn settle_and_capture(&mut self) -> FlyoverResult<()> {
        if !self.options.settle_delay.is_zero() {
            tokio::time::sleep(self.options.settle_delay).await;
        }

        match self.capture.capture(self.options.pixel_scale) {
            Some(frame) => self.encoder.append(&frame)?,
            None => {
                self.frames_dropped += 1;
                tracing::warn!(
                    phase = %self.phase,
                    frame = self.frames_captured,
                    "Capture returned no frame, skipping append"
                );
            }
        }

        self.frames_captured += 1;
        self.report();
        Ok(())
    }

    fn enter(&mut self, phase: RenderPhase) {
        tracing::info!(
            from = %self.phase,
            to = %phase,
            frames = self.frames_captured,
            "Render phase"
        );
        self.phase = phase;
        self.report();
    }

    fn report(&self) {
        if let Some(callback) = &self.on_progress {
            callback(&self.progress());
        }
    }
}
