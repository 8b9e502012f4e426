//! Resampling routes to evenly spaced points.
//!
//! Both entry points walk the polyline once, accumulating haversine
//! distance, and emit a linearly interpolated point each time the running
//! distance reaches the next multiple of the spacing. The first and last
//! input points are always part of the output.

use flyover_route_model::{path_distance, GeoPoint, Route};

/// Resample at a fixed geographic spacing in meters.
///
/// Interpolated points carry elevation and timestamp when both neighbours
/// have them, and take the pause flag of the real point that follows
/// them. Fewer than 2 points, or a spacing that is not a positive finite
/// number, returns the input unchanged.
pub fn interpolate(points: &[GeoPoint], spacing_m: f64) -> Vec<GeoPoint> {
    if points.len() < 2 || !spacing_m.is_finite() || spacing_m <= 0.0 {
        return points.to_vec();
    }

    let total = path_distance(points);
    // Stop short of the end so the real last point is not doubled.
    let cutoff = total - spacing_m * 1e-6;

    let mut out = Vec::with_capacity(((total / spacing_m).ceil() as usize).saturating_add(2));
    out.push(points[0]);

    let mut k: u64 = 1;
    let mut target = spacing_m;
    let mut covered = 0.0;

    for w in points.windows(2) {
        let (a, b) = (&w[0], &w[1]);
        let segment = a.distance_to(b);
        if segment > 0.0 {
            while target <= covered + segment && target < cutoff {
                let t = (target - covered) / segment;
                out.push(GeoPoint::lerp(a, b, t).with_pause_resume(b.is_pause_resume));
                k += 1;
                target = k as f64 * spacing_m;
            }
        }
        covered += segment;
    }

    if let Some(last) = points.last() {
        out.push(*last);
    }
    out
}

/// Resample to roughly `target_count` points.
///
/// Uses `spacing = total_distance / (target_count - 1)`. The result is
/// usually exactly `target_count` long but may drift by a point or two
/// where floating-point accumulation lands on a boundary. Returns the
/// input unchanged when `target_count < 2`, the input has fewer than 2
/// points, or the route has zero length.
pub fn interpolate_to_count(points: &[GeoPoint], target_count: usize) -> Vec<GeoPoint> {
    if target_count < 2 || points.len() < 2 {
        return points.to_vec();
    }
    let total = path_distance(points);
    if total <= 0.0 {
        return points.to_vec();
    }
    interpolate(points, total / (target_count - 1) as f64)
}

/// Resample a route at a fixed spacing into a new derived route.
pub fn interpolate_route(route: &Route, spacing_m: f64) -> Route {
    route.derive(interpolate(&route.points, spacing_m))
}

/// Resample a route to about `target_count` points.
pub fn resample_route(route: &Route, target_count: usize) -> Route {
    let points = interpolate_to_count(&route.points, target_count);
    if points.len() != target_count {
        tracing::debug!(
            requested = target_count,
            produced = points.len(),
            "Resampled point count differs from target"
        );
    }
    route.derive(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn east_line(n: usize, step_deg: f64) -> Vec<GeoPoint> {
        (0..n)
            .map(|i| GeoPoint::new(0.0, i as f64 * step_deg))
            .collect()
    }

    #[test]
    fn test_degenerate_inputs_unchanged() {
        let one = vec![GeoPoint::new(1.0, 1.0)];
        assert_eq!(interpolate(&one, 10.0), one);
        assert_eq!(interpolate_to_count(&one, 50), one);

        let two = east_line(2, 0.01);
        assert_eq!(interpolate(&two, 0.0), two);
        assert_eq!(interpolate(&two, f64::NAN), two);
        assert_eq!(interpolate_to_count(&two, 1), two);

        let stationary = vec![GeoPoint::new(1.0, 1.0); 4];
        assert_eq!(interpolate_to_count(&stationary, 10).len(), 4);
    }

    #[test]
    fn test_spacing_is_even_and_endpoints_kept() {
        let points = east_line(5, 0.001);
        let out = interpolate(&points, 10.0);

        assert_eq!(out.first(), points.first());
        assert_eq!(out.last(), points.last());
        for w in out[..out.len() - 1].windows(2) {
            let d = w[0].distance_to(&w[1]);
            assert!((d - 10.0).abs() < 0.01, "spacing {d}");
        }
    }

    #[test]
    fn test_to_count_hits_target() {
        let points = vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 0.003),
            GeoPoint::new(0.002, 0.004),
            GeoPoint::new(0.004, 0.004),
        ];
        for target in [2usize, 3, 10, 97, 300] {
            let out = interpolate_to_count(&points, target);
            let drift = (out.len() as i64 - target as i64).abs();
            assert!(drift <= 2, "target {target} produced {}", out.len());
        }
        assert_eq!(interpolate_to_count(&points, 2).len(), 2);
    }

    #[test]
    fn test_pause_flag_propagates_from_next_real_point() {
        let points = vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 0.001),
            GeoPoint::new(0.0, 0.002).with_pause_resume(true),
            GeoPoint::new(0.0, 0.003),
        ];
        let segment = points[0].distance_to(&points[1]);
        let out = interpolate(&points, segment / 4.0);

        let in_flagged_span: Vec<&GeoPoint> = out
            .iter()
            .filter(|p| p.lng > 0.001 + 1e-9 && p.lng < 0.002 - 1e-9)
            .collect();
        assert!(!in_flagged_span.is_empty());
        assert!(in_flagged_span.iter().all(|p| p.is_pause_resume));

        assert!(out
            .iter()
            .filter(|p| p.lng < 0.001 - 1e-9 || p.lng > 0.002 + 1e-9)
            .all(|p| !p.is_pause_resume));
    }

    #[test]
    fn test_interpolates_time_and_elevation() {
        let t0 = Utc.with_ymd_and_hms(2024, 8, 2, 6, 30, 0).unwrap();
        let a = GeoPoint::new(0.0, 0.0)
            .with_timestamp(t0)
            .with_elevation(100.0);
        let b = GeoPoint::new(0.0, 0.002)
            .with_timestamp(t0 + chrono::Duration::seconds(100))
            .with_elevation(200.0);
        let out = interpolate_to_count(&[a, b], 3);

        assert_eq!(out.len(), 3);
        let mid = out[1];
        assert!((mid.elevation.unwrap() - 150.0).abs() < 1e-6);
        let offset = (mid.timestamp.unwrap() - t0).num_milliseconds();
        assert!((offset - 50_000).abs() <= 1);
    }

    #[test]
    fn test_resample_route_keeps_identity() {
        let route = Route::from_points("ride", "Ride", east_line(3, 0.01)).unwrap();
        let resampled = resample_route(&route, 25);
        assert_eq!(resampled.id, "ride");
        assert_eq!(resampled.points.len(), 25);
        assert!((resampled.total_distance_m - route.total_distance_m).abs() < 1.0);
    }
}
