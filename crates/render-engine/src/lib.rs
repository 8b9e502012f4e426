//! Flyover Render Engine
//!
//! Turns a camera path into a finished video, and plays one back live.
//!
//! # Render pipeline
//!
//! ```text
//! overview pose ──► intro (eased) ──► route frames ──► outro (eased)
//!                                                          │
//!                                      ending slideshow ◄──┘
//!                                              │
//!                                              ▼
//!                                  finalize encoder ──► output.mp4
//! ```
//!
//! Every frame goes through the same sequence: set camera, settle,
//! capture, append. The map surface, frame capture, and encoder are traits
//! so the orchestrator can be driven by the software [`HeadlessMap`] and
//! [`FfmpegEncoder`] or by test doubles.

pub mod collaborators;
pub mod ffmpeg;
pub mod headless;
pub mod orchestrator;
pub mod preview;
pub mod slideshow;

pub use collaborators::{FrameCapture, MapSurface, PixelBuffer, VideoEncoder};
pub use ffmpeg::{ffmpeg_available, FfmpegEncoder};
pub use headless::{HeadlessMap, MapStyle};
pub use orchestrator::{
    CancelHandle, Eta, OrchestratorOptions, ProgressCallback, RenderOrchestrator, RenderOutcome,
    RenderPhase, RenderProgress,
};
pub use preview::{PlaybackCommand, PlaybackDriver, PlaybackHandle};
pub use slideshow::{plan_slideshow, SlideFrame, SLIDE_SECONDS};
