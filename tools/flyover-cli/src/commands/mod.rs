pub mod check;
pub mod inspect;
pub mod plan;
pub mod preview;
pub mod render;

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use flyover_route_model::{source, Route};

/// Load a GPX or route JSON file.
pub fn load_route(path: &Path) -> anyhow::Result<Route> {
    source::load_route(path).with_context(|| format!("Failed to load route {}", path.display()))
}

/// `h:mm:ss`, or `-` when unknown.
pub fn format_duration(duration: Option<Duration>) -> String {
    match duration {
        Some(d) => {
            let secs = d.as_secs();
            format!("{}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
        }
        None => "-".to_string(),
    }
}
