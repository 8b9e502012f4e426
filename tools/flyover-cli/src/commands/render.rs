//! Render a flyover video.

use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use flyover_common::AppConfig;
use flyover_processing_core::{ProcessingConfig, RouteProcessor};
use flyover_render_engine::{
    CancelHandle, FfmpegEncoder, HeadlessMap, OrchestratorOptions, RenderOrchestrator,
    RenderOutcome, RenderProgress,
};
use flyover_route_model::{RenderConfig, VideoFormat};

use super::load_route;

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// GPX or route JSON file
    pub route: PathBuf,

    /// Output file (defaults to the configured output directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format: mp4-h264, mp4-h265, webm
    #[arg(long, default_value = "mp4-h264")]
    pub format: String,

    #[arg(long)]
    pub width: Option<u32>,

    #[arg(long)]
    pub height: Option<u32>,

    #[arg(long)]
    pub fps: Option<u32>,

    /// Route section length in seconds
    #[arg(long)]
    pub duration: Option<f64>,

    /// Map style: outdoors, streets, dark, satellite
    #[arg(long)]
    pub style: Option<String>,

    /// Trail color as #RRGGBB
    #[arg(long)]
    pub color: Option<String>,

    /// Image shown after the route (repeatable, up to 5)
    #[arg(long = "ending-image")]
    pub ending_images: Vec<PathBuf>,

    /// Hide the growing route trail
    #[arg(long)]
    pub no_trail: bool,

    /// Hide the position marker
    #[arg(long)]
    pub no_marker: bool,

    /// Draw a progress bar along the bottom edge
    #[arg(long)]
    pub progress_bar: bool,

    /// Capture resolution multiplier
    #[arg(long)]
    pub pixel_scale: Option<f64>,
}

impl RenderArgs {
    fn render_config(&self, config: &AppConfig) -> anyhow::Result<RenderConfig> {
        let mut render = RenderConfig::from(&config.render);
        if let Some(width) = self.width {
            render.width = width;
        }
        if let Some(height) = self.height {
            render.height = height;
        }
        if let Some(fps) = self.fps {
            render.fps = fps;
        }
        if let Some(duration) = self.duration {
            render.duration_secs = duration;
        }
        if let Some(style) = &self.style {
            render.map_style = style.clone();
        }
        if let Some(color) = &self.color {
            render.route_color = color.clone();
        }
        render.format = VideoFormat::parse(&self.format).ok_or_else(|| {
            anyhow::anyhow!(
                "Unknown format: {}. Use: mp4-h264, mp4-h265, webm",
                self.format
            )
        })?;
        render.overlays.trail = !self.no_trail;
        render.overlays.position_marker = !self.no_marker;
        render.overlays.progress_bar = self.progress_bar;

        for image in &self.ending_images {
            if !image.is_file() {
                anyhow::bail!("Ending image not found: {}", image.display());
            }
        }
        render.ending_images = self.ending_images.clone();

        render.validate()?;
        Ok(render)
    }
}

pub async fn run(args: RenderArgs, config: &AppConfig) -> anyhow::Result<()> {
    let route = load_route(&args.route)?;
    let render = args.render_config(config)?;

    let processor = RouteProcessor::new(ProcessingConfig::from(&config.processing));
    let processed = processor.process_for_render(&route, &render);
    let camera = processed.camera(processor.camera_config(&render))?;

    let output_path = args.output.clone().unwrap_or_else(|| {
        config
            .output_dir
            .join(format!("{}.{}", file_stem(&route.name), render.format.extension()))
    });

    println!("Rendering '{}'", route.name);
    println!("  Output: {}", output_path.display());
    println!(
        "  Video: {}x{} @ {}fps, {:.0}s route section",
        render.width, render.height, render.fps, render.duration_secs
    );
    println!(
        "  Route: {} points -> {} frames",
        processed.stats.raw_points, processed.stats.frame_points
    );

    let mut options = OrchestratorOptions::from(&config.render);
    if let Some(scale) = args.pixel_scale {
        options.pixel_scale = scale;
    }

    let cancel = CancelHandle::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nCancelling after the current frame...");
            on_signal.cancel();
        }
    });

    let map = HeadlessMap::new(&render);
    let mut orchestrator = RenderOrchestrator::new(
        Box::new(map.clone()),
        Box::new(map),
        Box::new(FfmpegEncoder::new(output_path)),
        options,
    )
    .with_cancel(cancel)
    .with_progress(Box::new(print_progress));

    match orchestrator.run(&render, &camera).await {
        Ok(RenderOutcome::Complete {
            output_path,
            frames_captured,
            frames_dropped,
        }) => {
            println!("\nRender complete: {}", output_path.display());
            if frames_dropped > 0 {
                println!("  {frames_dropped} of {frames_captured} captures were dropped");
            }
            Ok(())
        }
        Ok(RenderOutcome::Cancelled { frames_captured }) => {
            println!("\nRender cancelled after {frames_captured} frames");
            Ok(())
        }
        Err(e) => {
            println!("\nRender failed: {}", e.user_message());
            Err(e.into())
        }
    }
}

fn print_progress(p: &RenderProgress) {
    print!(
        "\r  {:<10} {:5.1}% ({}/{} frames, ETA: {})  ",
        p.phase.label(),
        p.overall * 100.0,
        p.frames_captured,
        p.total_frames,
        p.eta,
    );
    let _ = std::io::stdout().flush();
}

/// A filesystem-friendly version of a route name.
fn file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    let stem = stem
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if stem.is_empty() {
        "flyover".to_string()
    } else {
        stem
    }
}
