//! Ramer–Douglas–Peucker route simplification.
//!
//! Distances are measured in a local equirectangular projection around
//! each chord, in meters. That is accurate to well under a meter for the
//! segment lengths GPS noise reduction deals with, and much cheaper than
//! cross-track geodesics.

use flyover_route_model::{GeoPoint, Route, EARTH_RADIUS_M};

/// Meters per degree of latitude on the mean-radius sphere.
const METERS_PER_DEGREE: f64 = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;

/// Simplify a polyline, keeping points that deviate more than
/// `epsilon_m` meters from the chord between their retained neighbours.
///
/// The first and last points are always kept, order is preserved, and the
/// result never grows. Inputs with fewer than 3 points come back
/// unchanged. Negative or non-finite tolerances behave like zero, which
/// only removes exactly collinear points.
pub fn simplify(points: &[GeoPoint], epsilon_m: f64) -> Vec<GeoPoint> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let keep = keep_mask(points, sanitize_epsilon(epsilon_m));
    points
        .iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(*p))
        .collect()
}

/// Indices of the points [`simplify`] would keep.
pub fn simplify_indices(points: &[GeoPoint], epsilon_m: f64) -> Vec<usize> {
    if points.len() < 3 {
        return (0..points.len()).collect();
    }
    keep_mask(points, sanitize_epsilon(epsilon_m))
        .into_iter()
        .enumerate()
        .filter_map(|(i, k)| k.then_some(i))
        .collect()
}

/// Simplify a route into a new derived route.
pub fn simplify_route(route: &Route, epsilon_m: f64) -> Route {
    let simplified = simplify(&route.points, epsilon_m);
    tracing::debug!(
        before = route.points.len(),
        after = simplified.len(),
        epsilon_m,
        "Simplified route"
    );
    route.derive(simplified)
}

fn sanitize_epsilon(epsilon_m: f64) -> f64 {
    if epsilon_m.is_finite() {
        epsilon_m.max(0.0)
    } else {
        0.0
    }
}

/// Iterative RDP over an explicit stack of spans.
fn keep_mask(points: &[GeoPoint], epsilon_m: f64) -> Vec<bool> {
    let last = points.len() - 1;
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[last] = true;

    let mut stack = vec![(0usize, last)];
    while let Some((start, end)) = stack.pop() {
        if end <= start + 1 {
            continue;
        }

        let mut max_distance = -1.0;
        let mut split = start;
        for (i, point) in points.iter().enumerate().take(end).skip(start + 1) {
            let d = distance_to_chord(point, &points[start], &points[end]);
            if d > max_distance {
                max_distance = d;
                split = i;
            }
        }

        if max_distance > epsilon_m {
            keep[split] = true;
            stack.push((split, end));
            stack.push((start, split));
        }
    }

    keep
}

/// Distance in meters from `point` to the segment `start..end`.
///
/// The projection is anchored on the chord alone, so the result does not
/// depend on which other points are present. That keeps repeated
/// simplification at the same tolerance stable.
pub fn distance_to_chord(point: &GeoPoint, start: &GeoPoint, end: &GeoPoint) -> f64 {
    let ref_lat = ((start.lat + end.lat) / 2.0).to_radians();
    let x_scale = METERS_PER_DEGREE * ref_lat.cos();

    let to_local = |p: &GeoPoint| {
        (
            wrap_longitude_delta(p.lng - start.lng) * x_scale,
            (p.lat - start.lat) * METERS_PER_DEGREE,
        )
    };

    let (ex, ey) = to_local(end);
    let (px, py) = to_local(point);

    let length_sq = ex * ex + ey * ey;
    if length_sq <= f64::EPSILON {
        return (px * px + py * py).sqrt();
    }

    let t = ((px * ex + py * ey) / length_sq).clamp(0.0, 1.0);
    let dx = px - t * ex;
    let dy = py - t * ey;
    (dx * dx + dy * dy).sqrt()
}

fn wrap_longitude_delta(delta: f64) -> f64 {
    if delta > 180.0 {
        delta - 360.0
    } else if delta < -180.0 {
        delta + 360.0
    } else {
        delta
    }
}
