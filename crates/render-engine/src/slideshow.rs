//! Ending slideshow planning.
//!
//! Each image is shown for a fixed time. Over that time the foreground
//! scales from 95% to 100% with a decelerating curve and fades in over
//! the first frames.

use std::path::PathBuf;

use flyover_processing_core::easing::ease_out_quad;

/// Seconds each ending image stays on screen.
pub const SLIDE_SECONDS: f64 = 3.0;

/// Frames over which a slide fades in.
pub const FADE_IN_FRAMES: u32 = 10;

/// Foreground scale on a slide's first frame.
pub const START_SCALE: f64 = 0.95;

/// What the map surface should draw for one slideshow frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SlideFrame {
    /// Position of the image in the configured list.
    pub image_index: usize,
    pub path: PathBuf,
    /// Frame number within this slide.
    pub frame: u32,
    pub frames_in_slide: u32,
    /// Foreground scale, `0.95..=1.0`.
    pub scale: f64,
    /// Slide opacity, `0.0..=1.0`.
    pub opacity: f64,
}

impl SlideFrame {
    pub fn new(image_index: usize, path: PathBuf, frame: u32, frames_in_slide: u32) -> Self {
        let t = if frames_in_slide > 1 {
            frame as f64 / (frames_in_slide - 1) as f64
        } else {
            1.0
        };
        Self {
            image_index,
            path,
            frame,
            frames_in_slide,
            scale: START_SCALE + (1.0 - START_SCALE) * ease_out_quad(t),
            opacity: (frame as f64 / FADE_IN_FRAMES as f64).min(1.0),
        }
    }
}

/// Every slideshow frame in order.
pub fn plan_slideshow(images: &[PathBuf], frames_per_slide: u32) -> Vec<SlideFrame> {
    images
        .iter()
        .enumerate()
        .flat_map(|(index, path)| {
            (0..frames_per_slide)
                .map(move |f| SlideFrame::new(index, path.clone(), f, frames_per_slide))
        })
        .collect()
}

/// Frame count of a slideshow without building it.
pub fn slideshow_frame_count(images: &[PathBuf], frames_per_slide: u32) -> u64 {
    images.len() as u64 * frames_per_slide as u64
}
