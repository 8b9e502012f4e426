//! Write the per-frame camera path as JSON.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::Context;
use flyover_common::AppConfig;
use flyover_processing_core::{ProcessingConfig, ProcessingStats, RouteProcessor};
use flyover_route_model::{source, CameraPose, RenderConfig};
use serde::Serialize;

use super::load_route;

#[derive(Serialize)]
struct PosePlan<'a> {
    route: &'a str,
    fps: u32,
    stats: &'a ProcessingStats,
    poses: Vec<CameraPose>,
}

pub fn run(
    path: PathBuf,
    output: PathBuf,
    route_json: Option<PathBuf>,
    duration: Option<f64>,
    fps: Option<u32>,
    config: &AppConfig,
) -> anyhow::Result<()> {
    let route = load_route(&path)?;

    let mut render = RenderConfig::from(&config.render);
    if let Some(duration) = duration {
        render.duration_secs = duration;
    }
    if let Some(fps) = fps {
        render.fps = fps;
    }
    render.validate()?;

    let processor = RouteProcessor::new(ProcessingConfig::from(&config.processing));
    let processed = processor.process_for_render(&route, &render);
    let camera = processed.camera(processor.camera_config(&render))?;

    let plan = PosePlan {
        route: &route.name,
        fps: render.fps,
        stats: &processed.stats,
        poses: camera.poses().collect(),
    };

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(&output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &plan)?;

    println!("Planned {} frames for '{}'", plan.poses.len(), route.name);
    println!(
        "  Points: {} raw, {} simplified, {} frames",
        processed.stats.raw_points, processed.stats.simplified_points, processed.stats.frame_points
    );
    println!("  Poses: {}", output.display());

    if let Some(route_path) = route_json {
        source::save_json(&processed.route, &route_path)?;
        println!("  Route: {}", route_path.display());
    }

    Ok(())
}
