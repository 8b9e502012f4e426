//! Route sources: GPX files and serialized routes.
//!
//! These are thin adapters. Anything richer (activity APIs, FIT files)
//! lives outside this crate and only needs to hand back a [`Route`].

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::geo_point::GeoPoint;
use crate::route::{Route, RouteError};

/// Load a route from a `.gpx` or `.json` file, chosen by extension.
pub fn load_route(path: impl AsRef<Path>) -> Result<Route, RouteError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("json") => load_json(path),
        _ => load_gpx(path),
    }
}

/// Load every track (or, failing that, every route) of a GPX file as one
/// route, keeping document order.
pub fn load_gpx(path: impl AsRef<Path>) -> Result<Route, RouteError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| RouteError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let gpx = gpx::read(BufReader::new(file)).map_err(|e| RouteError::Parse {
        message: format!("failed to parse GPX {}: {e}", path.display()),
    })?;

    let fallback_name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("route")
        .to_string();
    route_from_gpx(&gpx, &fallback_name)
}

/// Convert a parsed GPX document into a route.
pub fn route_from_gpx(gpx: &gpx::Gpx, fallback_name: &str) -> Result<Route, RouteError> {
    let mut points = Vec::new();
    let mut name = None;

    for track in &gpx.tracks {
        if name.is_none() {
            name = track.name.clone();
        }
        for segment in &track.segments {
            for waypoint in &segment.points {
                points.push(geo_point_from_waypoint(waypoint)?);
            }
        }
    }

    if points.is_empty() {
        for route in &gpx.routes {
            if name.is_none() {
                name = route.name.clone();
            }
            for waypoint in &route.points {
                points.push(geo_point_from_waypoint(waypoint)?);
            }
        }
    }

    let name = name.unwrap_or_else(|| fallback_name.to_string());
    tracing::debug!(name = %name, points = points.len(), "Parsed GPX route");
    Route::from_points(route_id(&name, &points), name, points)
}

fn geo_point_from_waypoint(waypoint: &gpx::Waypoint) -> Result<GeoPoint, RouteError> {
    let position = waypoint.point();
    let mut point = GeoPoint::try_new(position.y(), position.x())?;
    if let Some(elevation) = waypoint.elevation {
        point = point.with_elevation(elevation);
    }
    if let Some(time) = &waypoint.time {
        if let Some(timestamp) = gpx_time_to_utc(time) {
            point = point.with_timestamp(timestamp);
        }
    }
    Ok(point)
}

fn gpx_time_to_utc(time: &gpx::Time) -> Option<DateTime<Utc>> {
    let formatted = time.format().ok()?;
    DateTime::parse_from_rfc3339(&formatted)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Load a route previously written with [`save_json`].
pub fn load_json(path: impl AsRef<Path>) -> Result<Route, RouteError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| RouteError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let route: Route = serde_json::from_str(&content).map_err(|e| RouteError::Parse {
        message: format!("failed to parse route JSON {}: {e}", path.display()),
    })?;
    // Re-run validation and totals in case the file was edited by hand.
    let moving = route.moving_duration;
    Ok(Route::from_points(route.id, route.name, route.points)?.with_moving_duration(moving))
}

/// Write a route as pretty JSON.
pub fn save_json(route: &Route, path: impl AsRef<Path>) -> Result<(), RouteError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| RouteError::IoError {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    let json = serde_json::to_string_pretty(route).map_err(|e| RouteError::Parse {
        message: format!("failed to serialize route: {e}"),
    })?;
    std::fs::write(path, json).map_err(|e| RouteError::IoError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Stable identifier derived from the route name and samples.
fn route_id(name: &str, points: &[GeoPoint]) -> String {
    let mut hash: u64 = 0xcbf29ce484222325;
    let mut feed = |bytes: &[u8]| {
        for byte in bytes {
            hash ^= *byte as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
    };
    feed(name.as_bytes());
    for p in points.iter().take(64) {
        feed(&p.lat.to_le_bytes());
        feed(&p.lng.to_le_bytes());
    }
    feed(&(points.len() as u64).to_le_bytes());
    format!("{hash:016x}")
}
