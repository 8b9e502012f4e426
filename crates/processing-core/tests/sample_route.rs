use std::path::PathBuf;
use std::time::Duration;

use flyover_processing_core::bearing::smoothed_bearing;
use flyover_processing_core::{ControllerConfig, PauseDetector, PlayerEvent, RouteProcessor};
use flyover_route_model::source::load_gpx;
use flyover_route_model::Route;

fn load_fixture_route() -> Route {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("fixtures")
        .join("sample-route")
        .join("morning-loop.gpx");

    load_gpx(path).expect("fixture route should parse")
}

fn fnv1a_64(input: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in input.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

#[test]
fn fixture_loads_with_timing() {
    let route = load_fixture_route();

    assert_eq!(route.name, "Morning Loop");
    assert_eq!(route.points.len(), 200);
    assert_eq!(route.total_duration, Some(Duration::from_secs(701)));
    // A 500 m radius loop.
    assert!((route.total_distance_m - 3_141.0).abs() < 20.0);
}

#[test]
fn fixture_pauses_and_moving_time() {
    let route = load_fixture_route();
    let annotated = PauseDetector::default().annotate_route(&route);

    // 90 s and 20 s gaps are flagged, only the 90 s gap is stopped time.
    assert_eq!(annotated.pause_count(), 2);
    assert!(annotated.points[100].is_pause_resume);
    assert!(annotated.points[150].is_pause_resume);
    assert_eq!(annotated.moving_duration, Some(Duration::from_secs(611)));
}

#[test]
fn fixture_pipeline_matches_frame_budget() {
    let route = load_fixture_route();
    let processed = RouteProcessor::default().process(&route, 300);

    assert!(processed.stats.simplified_points <= 200);
    assert!((processed.stats.frame_points as i64 - 300).abs() <= 2);
    assert_eq!(processed.frames.points.first(), route.points.first());
    assert_eq!(processed.frames.points.last(), route.points.last());
    assert_eq!(processed.frames.moving_duration, Some(Duration::from_secs(611)));
}

#[test]
fn fixture_loop_turns_all_the_way_around() {
    let route = load_fixture_route();
    let processed = RouteProcessor::default().process(&route, 120);
    let points = &processed.frames.points;

    // Counter-clockwise start heads north, the far side heads south.
    let start = smoothed_bearing(points, 2, 2);
    let half = smoothed_bearing(points, points.len() / 2, 2);
    assert!(start < 20.0 || start > 340.0, "start bearing {start}");
    assert!((half - 180.0).abs() < 20.0, "half-way bearing {half}");
}

#[test]
fn fixture_camera_signature_is_stable_across_runs() {
    let signature = || {
        let processed = RouteProcessor::default().process(&load_fixture_route(), 150);
        let camera = processed.camera(ControllerConfig::default()).unwrap();
        let text = camera
            .poses()
            .map(|p| {
                format!(
                    "{}|{:.6}|{:.6}|{:.3}|{:.3}|{:.4}",
                    p.frame_index, p.center.lat, p.center.lng, p.bearing_deg, p.zoom, p.progress
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        fnv1a_64(&text)
    };

    assert_eq!(signature(), signature());
}

#[test]
fn fixture_playback_reaches_completion() {
    let processed = RouteProcessor::default().process(&load_fixture_route(), 60);
    let mut camera = processed.camera(ControllerConfig::default()).unwrap();
    let interval = camera.tick_interval();

    let mut now = Duration::ZERO;
    camera.play(now);
    let mut frames = 0;
    let mut completed = false;
    while !completed && frames < 1_000 {
        now += interval;
        for event in camera.poll(now) {
            match event {
                PlayerEvent::Frame(_) => frames += 1,
                PlayerEvent::Completed => completed = true,
            }
        }
    }

    assert!(completed);
    assert_eq!(frames, camera.total_frames() - 1);
}
