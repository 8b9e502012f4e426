//! Compass bearings between route points.

use flyover_route_model::{normalize_degrees, GeoPoint};

/// Initial great-circle bearing from `from` to `to`, in `[0, 360)`.
///
/// Identical points give 0.
pub fn bearing(from: &GeoPoint, to: &GeoPoint) -> f64 {
    let phi1 = from.lat.to_radians();
    let phi2 = to.lat.to_radians();
    let delta_lambda = (to.lng - from.lng).to_radians();

    let y = delta_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    // atan2(0, 0) is 0, so coincident points stay well defined.
    normalize_degrees(y.atan2(x).to_degrees())
}

/// Heading at `index`, averaged over neighbouring segments.
///
/// Takes every consecutive pair inside `[index - window, index + window]`
/// (clamped to the slice), sums the unit vectors of their bearings, and
/// returns the bearing of the sum. Averaging vectors instead of angles
/// keeps headings near north from collapsing toward 180°.
///
/// Returns 0 when the window holds no pair.
pub fn smoothed_bearing(points: &[GeoPoint], index: usize, window: usize) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    let index = index.min(points.len() - 1);
    let start = index.saturating_sub(window);
    let end = index.saturating_add(window).min(points.len() - 1);

    let (sum_sin, sum_cos) = points[start..=end]
        .windows(2)
        .map(|w| bearing(&w[0], &w[1]).to_radians())
        .fold((0.0, 0.0), |(s, c), b| (s + b.sin(), c + b.cos()));

    if sum_sin == 0.0 && sum_cos == 0.0 {
        return 0.0;
    }
    normalize_degrees(sum_sin.atan2(sum_cos).to_degrees())
}

/// Signed turn from bearing `from` to bearing `to`, in `[-180, 180]`.
///
/// Positive is clockwise.
pub fn bearing_delta(from: f64, to: f64) -> f64 {
    let delta = (to - from).rem_euclid(360.0);
    if delta > 180.0 {
        delta - 360.0
    } else {
        delta
    }
}
