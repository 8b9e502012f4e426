//! Eased camera moves between two poses (intro and outro).

use flyover_route_model::{CameraPose, GeoPoint};

use crate::easing::{lerp, lerp_bearing, Ease};

/// Pose at normalized time `t` between `from` and `to`.
///
/// Latitude, longitude, bearing, pitch, zoom, and progress are each eased
/// independently with the same curve. Bearing follows the shorter arc.
pub fn pose_between(from: &CameraPose, to: &CameraPose, t: f64, ease: Ease) -> CameraPose {
    let e = ease.apply(t);
    let center = GeoPoint::new(
        lerp(from.center.lat, to.center.lat, e),
        lerp(from.center.lng, to.center.lng, e),
    );
    CameraPose::new(
        from.frame_index,
        center,
        lerp_bearing(from.bearing_deg, to.bearing_deg, e),
        lerp(from.pitch_deg, to.pitch_deg, e),
        lerp(from.zoom, to.zoom, e),
        lerp(from.progress, to.progress, e),
    )
}

/// `frame_count` poses moving from `from` to `to` with in-out cubic easing.
///
/// Frame `i` uses `t = i / (frame_count - 1)`, so the first pose equals
/// `from` and the last equals `to`. A single frame is just `to`. Frame
/// indices count from zero; callers re-index into their own timeline.
pub fn pose_transition(from: &CameraPose, to: &CameraPose, frame_count: u32) -> Vec<CameraPose> {
    pose_transition_with(from, to, frame_count, Ease::InOutCubic)
}

pub fn pose_transition_with(
    from: &CameraPose,
    to: &CameraPose,
    frame_count: u32,
    ease: Ease,
) -> Vec<CameraPose> {
    match frame_count {
        0 => Vec::new(),
        1 => vec![to.at_frame(0)],
        n => {
            let last = (n - 1) as f64;
            (0..n)
                .map(|i| match i {
                    0 => from.at_frame(0),
                    i if i == n - 1 => to.at_frame(i),
                    i => pose_between(from, to, i as f64 / last, ease).at_frame(i),
                })
                .collect()
        }
    }
}
