//! Render configuration passed into a render run.

use std::path::PathBuf;

use flyover_common::RenderDefaults;
use serde::{Deserialize, Serialize};

use crate::route::RouteError;

/// Maximum number of images shown after the route.
pub const MAX_ENDING_IMAGES: usize = 5;

/// Immutable settings for one render run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Output size in pixels.
    pub width: u32,
    pub height: u32,

    /// Output frame rate.
    pub fps: u32,

    /// Default camera tilt and zoom while following the route.
    pub pitch_deg: f64,
    pub zoom: f64,

    /// Length of the route section in seconds (intro, outro, and slides
    /// come on top).
    pub duration_secs: f64,

    /// Trail color as hex (`#RRGGBB` or `#RRGGBBAA`).
    pub route_color: String,

    /// Trail width in output pixels.
    pub route_width: f64,

    #[serde(default)]
    pub overlays: OverlayToggles,

    /// Images shown after the outro, in order.
    #[serde(default)]
    pub ending_images: Vec<PathBuf>,

    /// Map style identifier understood by the map surface.
    pub map_style: String,

    /// Output container/codec.
    #[serde(default)]
    pub format: VideoFormat,

    /// Frame count of the zoom-in intro and the zoom-out outro.
    pub intro_frames: u32,
    pub outro_frames: u32,
}

/// Optional decorations drawn on top of the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayToggles {
    /// Draw the growing route trail.
    pub trail: bool,
    /// Draw a marker at the camera center.
    pub position_marker: bool,
    /// Draw the distance/progress bar.
    pub progress_bar: bool,
}

impl Default for OverlayToggles {
    fn default() -> Self {
        Self {
            trail: true,
            position_marker: true,
            progress_bar: false,
        }
    }
}

/// Output video format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum VideoFormat {
    #[default]
    #[serde(rename = "mp4-h264")]
    Mp4H264,
    #[serde(rename = "mp4-h265")]
    Mp4H265,
    #[serde(rename = "webm")]
    Webm,
}

impl VideoFormat {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "mp4-h264" | "mp4" => Some(Self::Mp4H264),
            "mp4-h265" => Some(Self::Mp4H265),
            "webm" => Some(Self::Webm),
            _ => None,
        }
    }

    /// File extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp4H264 | Self::Mp4H265 => "mp4",
            Self::Webm => "webm",
        }
    }
}

/// Common output shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AspectPreset {
    /// 9:16 vertical (stories, reels).
    Portrait,
    /// 16:9 widescreen.
    Landscape,
    /// 1:1 square.
    Square,
}

impl AspectPreset {
    /// Output dimensions for a given short side, rounded to even numbers.
    pub fn dimensions(&self, short_side: u32) -> (u32, u32) {
        let short = even(short_side);
        let long = even((short_side as f64 * 16.0 / 9.0).round() as u32);
        match self {
            Self::Portrait => (short, long),
            Self::Landscape => (long, short),
            Self::Square => (short, short),
        }
    }
}

fn even(v: u32) -> u32 {
    v.max(2) & !1
}

impl From<&RenderDefaults> for RenderConfig {
    fn from(defaults: &RenderDefaults) -> Self {
        Self {
            width: defaults.width,
            height: defaults.height,
            fps: defaults.fps,
            pitch_deg: defaults.pitch_deg,
            zoom: defaults.zoom,
            duration_secs: defaults.duration_secs,
            route_color: defaults.route_color.clone(),
            route_width: defaults.route_width,
            overlays: OverlayToggles::default(),
            ending_images: Vec::new(),
            map_style: defaults.map_style.clone(),
            format: VideoFormat::default(),
            intro_frames: defaults.intro_frames,
            outro_frames: defaults.outro_frames,
        }
    }
}

impl RenderConfig {
    /// Width divided by height.
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height.max(1) as f64
    }

    /// Number of frames the route section should aim for (at least 2).
    pub fn route_frame_count(&self) -> usize {
        ((self.duration_secs * self.fps as f64).round() as usize).max(2)
    }

    /// Frames shown per ending image.
    pub fn frames_per_slide(&self, seconds: f64) -> u32 {
        ((seconds * self.fps as f64).round() as u32).max(1)
    }

    /// Trail color as RGBA bytes, if the hex string is well formed.
    pub fn route_rgba(&self) -> Option<[u8; 4]> {
        parse_hex_color(&self.route_color)
    }

    /// Check the configuration before starting a run.
    pub fn validate(&self) -> Result<(), RouteError> {
        let fail = |message: String| Err(RouteError::Validation { message });

        if self.width == 0 || self.height == 0 {
            return fail("width/height must be non-zero".to_string());
        }
        if self.width % 2 != 0 || self.height % 2 != 0 {
            return fail(format!(
                "width/height must be even for yuv420p output, got {}x{}",
                self.width, self.height
            ));
        }
        if !(1..=120).contains(&self.fps) {
            return fail(format!("fps must be in 1..=120, got {}", self.fps));
        }
        if !self.duration_secs.is_finite() || self.duration_secs <= 0.0 {
            return fail(format!(
                "duration must be positive, got {}",
                self.duration_secs
            ));
        }
        if !(0.0..=22.0).contains(&self.zoom) {
            return fail(format!("zoom must be in [0, 22], got {}", self.zoom));
        }
        if !(0.0..=85.0).contains(&self.pitch_deg) {
            return fail(format!("pitch must be in [0, 85], got {}", self.pitch_deg));
        }
        if self.ending_images.len() > MAX_ENDING_IMAGES {
            return fail(format!(
                "at most {MAX_ENDING_IMAGES} ending images are supported, got {}",
                self.ending_images.len()
            ));
        }
        if self.route_rgba().is_none() {
            return fail(format!("route color '{}' is not a hex color", self.route_color));
        }
        Ok(())
    }
}

/// Parse `#RRGGBB` or `#RRGGBBAA`.
pub fn parse_hex_color(hex: &str) -> Option<[u8; 4]> {
    let digits = hex.trim().strip_prefix('#')?;
    if !(digits.len() == 6 || digits.len() == 8) || !digits.is_ascii() {
        return None;
    }
    let byte = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    let alpha = if digits.len() == 8 { byte(6)? } else { 255 };
    Some([byte(0)?, byte(2)?, byte(4)?, alpha])
}
