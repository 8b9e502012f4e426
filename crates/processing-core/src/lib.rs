//! Flyover Processing Core
//!
//! Turns a recorded route into a camera animation:
//! - **Pause detection:** Flag recording gaps and compute moving time
//! - **Simplification:** Ramer–Douglas–Peucker noise reduction
//! - **Interpolation:** Resample to evenly spaced points, one per frame
//! - **Bearing:** Instantaneous and smoothed compass headings
//! - **Camera:** Per-frame poses and a cooperative playback controller
//!
//! This crate is pure computation: no I/O and no clocks of its own.
//! All inputs are data; all outputs are data.

pub mod bearing;
pub mod camera;
pub mod easing;
pub mod interpolate;
pub mod pause;
pub mod pipeline;
pub mod simplify;
pub mod transition;

pub use camera::{CameraController, ControllerConfig, PlaybackState, PlayerEvent};
pub use pause::PauseDetector;
pub use pipeline::{ProcessedRoute, ProcessingConfig, ProcessingStats, RouteProcessor};
