//! Show route statistics.

use std::path::PathBuf;

use flyover_common::AppConfig;
use flyover_processing_core::{ProcessingConfig, RouteProcessor};

use super::{format_duration, load_route};

pub fn run(path: PathBuf, config: &AppConfig) -> anyhow::Result<()> {
    let route = load_route(&path)?;
    let processor = RouteProcessor::new(ProcessingConfig::from(&config.processing));
    let annotated = processor.annotate(&route);
    let simplified = processor.simplify(&annotated);

    println!("Route: {}", route.name);
    println!("  ID: {}", route.id);
    if let Some(start) = route.start_time {
        println!("  Started: {}", start.to_rfc3339());
    }
    println!();

    println!("Distance: {:.2} km", route.total_distance_m / 1000.0);
    println!("Duration:");
    println!("  Total: {}", format_duration(annotated.total_duration));
    println!("  Moving: {}", format_duration(annotated.moving_duration));
    println!("  Pauses: {}", annotated.pause_count());
    match annotated.average_moving_speed_mps() {
        Some(speed) => println!("  Avg moving speed: {:.1} km/h", speed * 3.6),
        None => println!("  Avg moving speed: -"),
    }
    println!("Elevation gain: {:.0} m", route.elevation_gain_m());
    println!();

    println!("Points:");
    println!("  Raw: {}", route.points.len());
    println!(
        "  Simplified ({} m tolerance): {}",
        processor.config().simplify_tolerance_m,
        simplified.points.len()
    );

    let bounds = route.bounds();
    println!();
    println!("Bounds:");
    println!(
        "  Lat: {:.5} .. {:.5}",
        bounds.min_lat, bounds.max_lat
    );
    println!(
        "  Lng: {:.5} .. {:.5}",
        bounds.min_lng, bounds.max_lng
    );

    Ok(())
}
