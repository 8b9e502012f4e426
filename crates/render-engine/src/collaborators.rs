//! Contracts for the external pieces a render run drives.
//!
//! The orchestrator only ever talks to these traits. The CLI plugs in the
//! software [`HeadlessMap`](crate::headless::HeadlessMap) and the
//! [`FfmpegEncoder`](crate::ffmpeg::FfmpegEncoder); tests plug in
//! recording mocks.

use std::path::PathBuf;

use flyover_common::{FlyoverError, FlyoverResult};
use flyover_route_model::{CameraPose, GeoPoint, RenderConfig, RouteBounds};

use crate::slideshow::SlideFrame;

/// A captured frame: tightly packed RGBA8, rows top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw RGBA bytes, checking the length against the size.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> FlyoverResult<Self> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(FlyoverError::capture(format!(
                "pixel buffer holds {} bytes, expected {expected} for {width}x{height}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// A buffer filled with one color.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * 4);
        for _ in 0..pixels {
            data.extend_from_slice(&rgba);
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn from_image(image: image::RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            data: image.into_raw(),
        }
    }

    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    /// RGBA of the pixel at `(x, y)`, if inside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }
}

/// The map rendering surface.
///
/// A camera change must be visible to the next capture. The orchestrator
/// waits a short settle delay after each change before capturing.
pub trait MapSurface: Send {
    fn set_camera(&mut self, pose: &CameraPose) -> FlyoverResult<()>;

    /// Replace the drawn trail. An empty slice hides it.
    fn set_route_trail(&mut self, points: &[GeoPoint]) -> FlyoverResult<()>;

    /// A pose whose viewport contains `bounds` with `padding` (fraction of
    /// the viewport) kept free on each side.
    fn compute_overview_pose(&self, bounds: &RouteBounds, padding: f64)
        -> FlyoverResult<CameraPose>;

    /// Draw an ending slide on top of the map.
    fn show_slide(&mut self, slide: &SlideFrame) -> FlyoverResult<()>;

    fn clear_slide(&mut self) -> FlyoverResult<()>;
}

/// Turns the current scene into pixels.
pub trait FrameCapture: Send {
    /// Capture at `pixel_scale` times the configured size.
    ///
    /// `None` is a transient miss: the frame is skipped and the run goes on.
    fn capture(&mut self, pixel_scale: f64) -> Option<PixelBuffer>;
}

/// Append-only video encoder.
pub trait VideoEncoder: Send {
    /// Prepare for a run and return where the file will be written.
    fn setup(&mut self, config: &RenderConfig) -> FlyoverResult<PathBuf>;

    /// Append one frame. Frames must arrive in presentation order.
    fn append(&mut self, frame: &PixelBuffer) -> FlyoverResult<()>;

    /// Seal the file. No appends are allowed afterwards.
    fn finish(&mut self) -> FlyoverResult<()>;

    /// Drop a run that will never be finished (cancelled or failed).
    fn discard(&mut self) {}
}
