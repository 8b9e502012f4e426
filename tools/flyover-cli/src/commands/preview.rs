//! Play the camera path in real time.

use std::path::PathBuf;

use flyover_common::AppConfig;
use flyover_processing_core::{PlayerEvent, ProcessingConfig, RouteProcessor};
use flyover_render_engine::{PlaybackCommand, PlaybackDriver};
use flyover_route_model::RenderConfig;

use super::load_route;

pub async fn run(
    path: PathBuf,
    speed: f64,
    frames: Option<u32>,
    duration: Option<f64>,
    config: &AppConfig,
) -> anyhow::Result<()> {
    let route = load_route(&path)?;

    let mut render = RenderConfig::from(&config.render);
    if let Some(duration) = duration {
        render.duration_secs = duration;
    }
    render.validate()?;

    let processor = RouteProcessor::new(ProcessingConfig::from(&config.processing));
    let processed = processor.process_for_render(&route, &render);
    let camera = processed.camera(processor.camera_config(&render))?;
    let total = camera.total_frames();

    println!(
        "Previewing '{}': {} frames at {} fps x{}",
        route.name, total, render.fps, speed
    );

    let (driver, handle, mut events) = PlaybackDriver::new(camera);
    let task = tokio::spawn(driver.run());

    handle.send(PlaybackCommand::SetSpeed(speed)).await?;
    handle.play().await?;

    let limit = frames.unwrap_or(u32::MAX);
    let mut shown = 0u32;
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(PlayerEvent::Frame(pose)) => {
                    shown += 1;
                    tracing::info!(
                        frame = pose.frame_index,
                        lat = pose.center.lat,
                        lng = pose.center.lng,
                        bearing = pose.bearing_deg,
                        zoom = pose.zoom,
                        progress = pose.progress,
                        "Pose"
                    );
                    if shown >= limit {
                        break;
                    }
                }
                Some(PlayerEvent::Completed) => {
                    println!("Playback complete");
                    break;
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                println!("\nStopping preview");
                break;
            }
        }
    }

    // The driver may already be gone after completion.
    let _ = handle.dispose().await;
    let controller = task.await?;
    println!("Stopped at frame {}/{}", controller.current_frame(), total.saturating_sub(1));

    Ok(())
}
