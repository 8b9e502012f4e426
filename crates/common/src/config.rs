//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory where rendered videos are written.
    pub output_dir: PathBuf,

    /// Route cleanup and resampling parameters.
    pub processing: ProcessingDefaults,

    /// Default render settings.
    pub render: RenderDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default route processing parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingDefaults {
    /// Ramer-Douglas-Peucker tolerance in meters.
    pub simplify_tolerance_m: f64,

    /// Gap (seconds) above which a sample is flagged as a pause resume.
    pub pause_flag_threshold_secs: f64,

    /// Gap (seconds) at or above which time is excluded from moving time.
    pub moving_time_threshold_secs: f64,

    /// Half-width of the bearing smoothing window, in points.
    pub bearing_window: usize,
}

/// Default render parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderDefaults {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub pitch_deg: f64,
    pub zoom: f64,

    /// Length of the route section of the video.
    pub duration_secs: f64,

    /// Frame count of each of the zoom-in intro and zoom-out outro.
    pub intro_frames: u32,
    pub outro_frames: u32,

    /// Delay between moving the camera and capturing the frame.
    pub settle_delay_ms: u64,

    /// Fraction of the viewport kept free around the route in the overview.
    pub overview_padding: f64,

    pub pixel_scale: f64,
    pub map_style: String,
    pub route_color: String,
    pub route_width: f64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "flyover=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: dirs_default_output(),
            processing: ProcessingDefaults::default(),
            render: RenderDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ProcessingDefaults {
    fn default() -> Self {
        Self {
            simplify_tolerance_m: 2.0,
            pause_flag_threshold_secs: 15.0,
            moving_time_threshold_secs: 30.0,
            bearing_window: 5,
        }
    }
}

impl Default for RenderDefaults {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            fps: 30,
            pitch_deg: 60.0,
            zoom: 16.0,
            duration_secs: 30.0,
            intro_frames: 60,
            outro_frames: 60,
            settle_delay_ms: 50,
            overview_padding: 0.15,
            pixel_scale: 1.0,
            map_style: "outdoors".to_string(),
            route_color: "#FC4C02".to_string(),
            route_width: 4.0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }

    /// Where `load` and `save` look for the config file.
    pub fn path() -> PathBuf {
        config_file_path()
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("flyover").join("config.json")
}

/// Default output directory for rendered videos.
fn dirs_default_output() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("flyover").join("renders")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let parsed: AppConfig =
            serde_json::from_str(r#"{"render":{"fps":60},"logging":{"json":true}}"#).unwrap();
        assert_eq!(parsed.render.fps, 60);
        assert_eq!(parsed.render.intro_frames, 60);
        assert!(parsed.logging.json);
        assert_eq!(parsed.logging.level, "info");
        assert!((parsed.processing.pause_flag_threshold_secs - 15.0).abs() < 1e-9);
        assert!((parsed.processing.moving_time_threshold_secs - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_config_path_ends_with_app_dir() {
        let path = AppConfig::path();
        assert!(path.ends_with("flyover/config.json"));
    }
}
