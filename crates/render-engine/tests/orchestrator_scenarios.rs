//! Render runs against recording collaborators.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use flyover_common::{FlyoverError, FlyoverResult};
use flyover_processing_core::{CameraController, ControllerConfig};
use flyover_render_engine::{
    CancelHandle, FrameCapture, HeadlessMap, MapSurface, OrchestratorOptions, PixelBuffer, RenderOrchestrator,
    RenderOutcome, RenderPhase, RenderProgress, SlideFrame, VideoEncoder,
};
use flyover_route_model::{
    CameraPose, GeoPoint, OverlayToggles, RenderConfig, RouteBounds, VideoFormat,
};

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Setup,
    Overview,
    Camera { frame: u32, center: GeoPoint, zoom: f64 },
    Trail(usize),
    Slide { image: usize, frame: u32 },
    ClearSlide,
    Capture,
    Append(u64),
    Finish,
    Discard,
}

type Log = Arc<Mutex<Vec<Call>>>;

fn record(log: &Log, call: Call) {
    log.lock().unwrap().push(call);
}

const OVERVIEW_ZOOM: f64 = 10.0;

struct MockMap {
    log: Log,
    cameras_set: usize,
    fail_on_camera: Option<usize>,
}

impl MapSurface for MockMap {
    fn set_camera(&mut self, pose: &CameraPose) -> FlyoverResult<()> {
        self.cameras_set += 1;
        if self.fail_on_camera == Some(self.cameras_set) {
            return Err(FlyoverError::map_surface("style failed to load"));
        }
        record(
            &self.log,
            Call::Camera {
                frame: pose.frame_index,
                center: pose.center,
                zoom: pose.zoom,
            },
        );
        Ok(())
    }

    fn set_route_trail(&mut self, points: &[GeoPoint]) -> FlyoverResult<()> {
        record(&self.log, Call::Trail(points.len()));
        Ok(())
    }

    fn compute_overview_pose(
        &self,
        bounds: &RouteBounds,
        _padding: f64,
    ) -> FlyoverResult<CameraPose> {
        record(&self.log, Call::Overview);
        Ok(CameraPose::overhead(bounds.center(), OVERVIEW_ZOOM))
    }

    fn show_slide(&mut self, slide: &SlideFrame) -> FlyoverResult<()> {
        record(
            &self.log,
            Call::Slide {
                image: slide.image_index,
                frame: slide.frame,
            },
        );
        Ok(())
    }

    fn clear_slide(&mut self) -> FlyoverResult<()> {
        record(&self.log, Call::ClearSlide);
        Ok(())
    }
}

/// Stamps a sequence number into every frame so append order is visible.
struct MockCapture {
    log: Log,
    captures: u64,
    cancel_after: Option<(u64, CancelHandle)>,
    drop_every: Option<u64>,
}

impl FrameCapture for MockCapture {
    fn capture(&mut self, _pixel_scale: f64) -> Option<PixelBuffer> {
        self.captures += 1;
        record(&self.log, Call::Capture);
        if let Some((at, handle)) = &self.cancel_after {
            if self.captures == *at {
                handle.cancel();
            }
        }
        if let Some(every) = self.drop_every {
            if self.captures % every == 0 {
                return None;
            }
        }
        let mut data = vec![0u8; 16];
        data[..8].copy_from_slice(&self.captures.to_le_bytes());
        Some(PixelBuffer::new(2, 2, data).unwrap())
    }
}

struct MockEncoder {
    log: Log,
    appends: usize,
    fail_on_append: Option<usize>,
    fail_on_finish: bool,
}

impl MockEncoder {
    fn new(log: Log) -> Self {
        Self {
            log,
            appends: 0,
            fail_on_append: None,
            fail_on_finish: false,
        }
    }
}

impl VideoEncoder for MockEncoder {
    fn setup(&mut self, _config: &RenderConfig) -> FlyoverResult<PathBuf> {
        record(&self.log, Call::Setup);
        Ok(PathBuf::from("/tmp/flyover-mock.mp4"))
    }

    fn append(&mut self, frame: &PixelBuffer) -> FlyoverResult<()> {
        self.appends += 1;
        if self.fail_on_append == Some(self.appends) {
            return Err(FlyoverError::encoder("broken pipe"));
        }
        let mut seq = [0u8; 8];
        seq.copy_from_slice(&frame.data[..8]);
        record(&self.log, Call::Append(u64::from_le_bytes(seq)));
        Ok(())
    }

    fn finish(&mut self) -> FlyoverResult<()> {
        record(&self.log, Call::Finish);
        if self.fail_on_finish {
            return Err(FlyoverError::encoder("ffmpeg exited with status 1"));
        }
        Ok(())
    }

    fn discard(&mut self) {
        record(&self.log, Call::Discard);
    }
}

struct Harness {
    log: Log,
    progress: Arc<Mutex<Vec<RenderProgress>>>,
    orchestrator: RenderOrchestrator,
}

#[derive(Default)]
struct Faults {
    fail_on_camera: Option<usize>,
    cancel_after: Option<u64>,
    drop_every: Option<u64>,
    fail_on_append: Option<usize>,
    fail_on_finish: bool,
}

fn harness(faults: Faults) -> Harness {
    let log: Log = Arc::default();
    let progress: Arc<Mutex<Vec<RenderProgress>>> = Arc::default();

    let map = MockMap {
        log: log.clone(),
        cameras_set: 0,
        fail_on_camera: faults.fail_on_camera,
    };
    let options = OrchestratorOptions {
        settle_delay: Duration::ZERO,
        ..OrchestratorOptions::default()
    };

    let cancel = CancelHandle::new();
    let capture = MockCapture {
        log: log.clone(),
        captures: 0,
        cancel_after: faults.cancel_after.map(|at| (at, cancel.clone())),
        drop_every: faults.drop_every,
    };
    let encoder = MockEncoder {
        fail_on_append: faults.fail_on_append,
        fail_on_finish: faults.fail_on_finish,
        ..MockEncoder::new(log.clone())
    };

    let sink = progress.clone();
    let orchestrator =
        RenderOrchestrator::new(Box::new(map), Box::new(capture), Box::new(encoder), options)
            .with_cancel(cancel)
            .with_progress(Box::new(move |p: &RenderProgress| {
                sink.lock().unwrap().push(p.clone())
            }));

    Harness {
        log,
        progress,
        orchestrator,
    }
}

fn config(intro: u32, outro: u32, images: usize) -> RenderConfig {
    RenderConfig {
        width: 1080,
        height: 1920,
        fps: 30,
        pitch_deg: 60.0,
        zoom: 16.0,
        duration_secs: 10.0,
        route_color: "#FC4C02".to_string(),
        route_width: 4.0,
        overlays: OverlayToggles::default(),
        ending_images: (0..images)
            .map(|i| PathBuf::from(format!("ending-{i}.jpg")))
            .collect(),
        map_style: "outdoors".to_string(),
        format: VideoFormat::Mp4H264,
        intro_frames: intro,
        outro_frames: outro,
    }
}

fn camera(frames: usize) -> CameraController {
    let points = (0..frames)
        .map(|i| GeoPoint::new(47.0 + i as f64 * 1e-4, 8.0 + i as f64 * 5e-5))
        .collect();
    CameraController::new(points, ControllerConfig::default()).unwrap()
}

fn calls(log: &Log) -> Vec<Call> {
    log.lock().unwrap().clone()
}

fn appended(log: &Log) -> Vec<u64> {
    calls(log)
        .into_iter()
        .filter_map(|c| match c {
            Call::Append(seq) => Some(seq),
            _ => None,
        })
        .collect()
}

fn phases(progress: &Arc<Mutex<Vec<RenderProgress>>>) -> Vec<RenderPhase> {
    let mut phases: Vec<RenderPhase> = Vec::new();
    for report in progress.lock().unwrap().iter() {
        if phases.last() != Some(&report.phase) {
            phases.push(report.phase);
        }
    }
    phases
}

#[tokio::test]
async fn full_run_walks_every_phase_in_order() {
    let mut h = harness(Faults::default());
    let outcome = h
        .orchestrator
        .run(&config(5, 5, 2), &camera(20))
        .await
        .unwrap();

    let total = 5 + 20 + 5 + 2 * 90;
    assert_eq!(
        outcome,
        RenderOutcome::Complete {
            output_path: PathBuf::from("/tmp/flyover-mock.mp4"),
            frames_captured: total,
            frames_dropped: 0,
        }
    );
    assert_eq!(
        phases(&h.progress),
        vec![
            RenderPhase::Initializing,
            RenderPhase::ZoomInIntro,
            RenderPhase::CapturingRoute,
            RenderPhase::ZoomOutOutro,
            RenderPhase::EndingSlideshow,
            RenderPhase::Finalizing,
            RenderPhase::Complete,
        ]
    );
    assert_eq!(appended(&h.log), (1..=total).collect::<Vec<u64>>());

    let calls = calls(&h.log);
    assert_eq!(calls.first(), Some(&Call::Setup));
    assert_eq!(calls.last(), Some(&Call::Finish));
    assert_eq!(calls.iter().filter(|c| **c == Call::Finish).count(), 1);
    assert!(!calls.contains(&Call::Discard));
    assert!(calls.contains(&Call::ClearSlide));

    assert_eq!(h.orchestrator.phase(), RenderPhase::Complete);
    assert_eq!(
        h.orchestrator.output_path(),
        Some(PathBuf::from("/tmp/flyover-mock.mp4").as_path())
    );
    let last = h.progress.lock().unwrap().last().cloned().unwrap();
    assert_eq!(last.overall, 1.0);
    assert_eq!(last.total_frames, total);
}

#[tokio::test]
async fn slideshow_is_skipped_without_images() {
    let mut h = harness(Faults::default());
    h.orchestrator
        .run(&config(3, 3, 0), &camera(10))
        .await
        .unwrap();

    let seen = phases(&h.progress);
    assert!(!seen.contains(&RenderPhase::EndingSlideshow));
    assert_eq!(seen.last(), Some(&RenderPhase::Complete));
    assert_eq!(appended(&h.log).len(), 16);
    assert!(!calls(&h.log).contains(&Call::ClearSlide));
}

#[tokio::test]
async fn intro_and_outro_connect_overview_and_route() {
    let mut h = harness(Faults::default());
    let path = camera(12);
    h.orchestrator
        .run(&config(4, 4, 0), &path)
        .await
        .unwrap();

    let cameras: Vec<(u32, GeoPoint, f64)> = calls(&h.log)
        .into_iter()
        .filter_map(|c| match c {
            Call::Camera {
                frame,
                center,
                zoom,
            } => Some((frame, center, zoom)),
            _ => None,
        })
        .collect();
    assert_eq!(cameras.len(), 4 + 12 + 4);

    let first_route = path.pose_for_frame(0);
    let last_route = path.pose_for_frame(11);

    assert_eq!(cameras[0].2, OVERVIEW_ZOOM);
    assert_eq!(cameras[3].1, first_route.center);
    assert_eq!(cameras[3].2, first_route.zoom);

    let route: Vec<u32> = cameras[4..16].iter().map(|c| c.0).collect();
    assert_eq!(route, (0..12).collect::<Vec<u32>>());

    assert_eq!(cameras[16].1, last_route.center);
    assert_eq!(cameras[19].2, OVERVIEW_ZOOM);
}

#[tokio::test]
async fn trail_grows_with_the_route() {
    let mut h = harness(Faults::default());
    h.orchestrator
        .run(&config(2, 2, 0), &camera(8))
        .await
        .unwrap();

    let trails: Vec<usize> = calls(&h.log)
        .into_iter()
        .filter_map(|c| match c {
            Call::Trail(n) => Some(n),
            _ => None,
        })
        .collect();
    assert_eq!(trails, vec![0, 1, 2, 3, 4, 5, 6, 7, 8]);
}

#[tokio::test]
async fn trail_stays_hidden_when_disabled() {
    let mut h = harness(Faults::default());
    let mut cfg = config(2, 2, 0);
    cfg.overlays.trail = false;
    h.orchestrator.run(&cfg, &camera(8)).await.unwrap();

    let trails: Vec<Call> = calls(&h.log)
        .into_iter()
        .filter(|c| matches!(c, Call::Trail(_)))
        .collect();
    assert_eq!(trails, vec![Call::Trail(0)]);
}

#[tokio::test]
async fn cancel_mid_route_stops_without_finalizing() {
    let mut h = harness(Faults {
        cancel_after: Some(50),
        ..Faults::default()
    });
    let handle = h.orchestrator.cancel_handle();

    let outcome = h
        .orchestrator
        .run(&config(0, 0, 0), &camera(300))
        .await
        .unwrap();

    // The in-flight 50th frame completes; nothing after it is captured.
    assert_eq!(outcome, RenderOutcome::Cancelled { frames_captured: 50 });
    assert!(handle.is_cancelled());
    assert_eq!(h.orchestrator.phase(), RenderPhase::Cancelled);
    assert_eq!(h.orchestrator.output_path(), None);

    let calls = calls(&h.log);
    assert!(!calls.contains(&Call::Finish));
    assert!(calls.contains(&Call::Discard));
    assert_eq!(appended(&h.log), (1..=50).collect::<Vec<u64>>());
    assert_eq!(
        calls.iter().filter(|c| **c == Call::Capture).count(),
        50
    );
}

#[tokio::test]
async fn cancel_before_start_captures_nothing() {
    let mut h = harness(Faults::default());
    h.orchestrator.cancel_handle().cancel();
    let outcome = h
        .orchestrator
        .run(&config(5, 5, 1), &camera(30))
        .await
        .unwrap();

    assert_eq!(outcome, RenderOutcome::Cancelled { frames_captured: 0 });
    assert!(appended(&h.log).is_empty());
    assert!(!calls(&h.log).contains(&Call::Finish));
}

#[tokio::test]
async fn map_failure_moves_run_to_error() {
    let mut h = harness(Faults {
        fail_on_camera: Some(10),
        ..Faults::default()
    });
    let err = h
        .orchestrator
        .run(&config(0, 0, 0), &camera(50))
        .await
        .unwrap_err();

    assert!(err.is_collaborator());
    assert_eq!(h.orchestrator.phase(), RenderPhase::Error);
    assert!(h.orchestrator.error_message().is_some());
    assert_eq!(h.orchestrator.output_path(), None);
    assert_eq!(appended(&h.log).len(), 9);

    let calls = calls(&h.log);
    assert!(!calls.contains(&Call::Finish));
    assert!(calls.contains(&Call::Discard));
    assert_eq!(phases(&h.progress).last(), Some(&RenderPhase::Error));
}

#[tokio::test]
async fn encoder_append_failure_stops_capturing() {
    let mut h = harness(Faults {
        fail_on_append: Some(7),
        ..Faults::default()
    });
    let err = h
        .orchestrator
        .run(&config(0, 0, 0), &camera(40))
        .await
        .unwrap_err();

    assert!(err.is_collaborator());
    assert_eq!(h.orchestrator.phase(), RenderPhase::Error);
    assert_eq!(h.orchestrator.output_path(), None);
    assert_eq!(appended(&h.log), (1..=6).collect::<Vec<u64>>());

    let calls = calls(&h.log);
    assert_eq!(calls.iter().filter(|c| **c == Call::Capture).count(), 7);
    assert!(!calls.contains(&Call::Finish));
    assert_eq!(calls.last(), Some(&Call::Discard));
}

#[tokio::test]
async fn encoder_finish_failure_leaves_no_output() {
    let mut h = harness(Faults {
        fail_on_finish: true,
        ..Faults::default()
    });
    let err = h
        .orchestrator
        .run(&config(2, 2, 0), &camera(10))
        .await
        .unwrap_err();

    assert!(err.is_collaborator());
    assert_eq!(h.orchestrator.phase(), RenderPhase::Error);
    assert!(h.orchestrator.error_message().is_some());
    assert_eq!(h.orchestrator.output_path(), None);
    assert_eq!(appended(&h.log).len(), 14);

    let calls = calls(&h.log);
    assert_eq!(calls.iter().filter(|c| **c == Call::Finish).count(), 1);
    assert_eq!(calls.last(), Some(&Call::Discard));
    let seen = phases(&h.progress);
    assert!(seen.contains(&RenderPhase::Finalizing));
    assert_eq!(seen.last(), Some(&RenderPhase::Error));
}

#[tokio::test]
async fn corrupt_ending_image_fails_the_run() {
    let dir = std::env::temp_dir().join("flyover_test_corrupt_ending");
    std::fs::create_dir_all(&dir).unwrap();
    let image = dir.join("summit.jpg");
    std::fs::write(&image, b"definitely not a jpeg").unwrap();

    let mut cfg = config(0, 0, 0);
    cfg.width = 64;
    cfg.height = 64;
    cfg.ending_images = vec![image];

    let log: Log = Arc::default();
    let map = HeadlessMap::new(&cfg);
    let options = OrchestratorOptions {
        settle_delay: Duration::ZERO,
        ..OrchestratorOptions::default()
    };
    let mut orchestrator = RenderOrchestrator::new(
        Box::new(map.clone()),
        Box::new(map),
        Box::new(MockEncoder::new(log.clone())),
        options,
    );

    let err = orchestrator.run(&cfg, &camera(5)).await.unwrap_err();

    assert!(err.is_collaborator());
    assert_eq!(orchestrator.phase(), RenderPhase::Error);
    assert_eq!(orchestrator.output_path(), None);
    assert_eq!(orchestrator.frames_captured(), 5);
    assert_eq!(orchestrator.frames_dropped(), 0);

    let calls = calls(&log);
    assert_eq!(appended(&log).len(), 5);
    assert!(!calls.contains(&Call::Finish));
    assert!(calls.contains(&Call::Discard));

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn dropped_captures_are_counted_not_appended() {
    let mut h = harness(Faults {
        drop_every: Some(4),
        ..Faults::default()
    });
    let outcome = h
        .orchestrator
        .run(&config(0, 0, 0), &camera(40))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        RenderOutcome::Complete {
            output_path: PathBuf::from("/tmp/flyover-mock.mp4"),
            frames_captured: 40,
            frames_dropped: 10,
        }
    );
    let appended = appended(&h.log);
    assert_eq!(appended.len(), 30);
    assert!(appended.iter().all(|seq| seq % 4 != 0));
    assert!(appended.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn invalid_config_fails_before_setup() {
    let mut h = harness(Faults::default());
    let mut cfg = config(0, 0, 0);
    cfg.width = 0;
    let err = h.orchestrator.run(&cfg, &camera(10)).await.unwrap_err();

    assert!(matches!(err, FlyoverError::Config { .. }));
    assert_eq!(h.orchestrator.phase(), RenderPhase::Error);
    assert!(!calls(&h.log).contains(&Call::Setup));
}

#[tokio::test]
async fn orchestrator_runs_only_once() {
    let mut h = harness(Faults::default());
    let cfg = config(0, 0, 0);
    let path = camera(5);
    h.orchestrator.run(&cfg, &path).await.unwrap();

    let err = h.orchestrator.run(&cfg, &path).await.unwrap_err();
    assert!(matches!(err, FlyoverError::InvalidState { .. }));
    assert_eq!(h.orchestrator.phase(), RenderPhase::Complete);
    assert_eq!(appended(&h.log).len(), 5);
}

#[tokio::test]
async fn progress_is_monotonic_with_eta_after_first_frame() {
    let mut h = harness(Faults::default());
    h.orchestrator
        .run(&config(2, 2, 0), &camera(20))
        .await
        .unwrap();

    let reports = h.progress.lock().unwrap().clone();
    assert!(reports.windows(2).all(|w| w[0].overall <= w[1].overall));
    assert!(reports
        .iter()
        .filter(|r| r.phase.is_capturing())
        .all(|r| r.overall <= 0.95));
    let first = reports
        .iter()
        .find(|r| r.frames_captured == 0)
        .unwrap();
    assert_eq!(first.eta, flyover_render_engine::Eta::Calculating);
}
