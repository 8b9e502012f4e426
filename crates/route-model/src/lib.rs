//! Flyover Route Model
//!
//! Defines the core data contracts shared by every processing stage:
//! - **GeoPoint:** One GPS sample (position, optional elevation and time)
//! - **Route:** An ordered, immutable sequence of samples with totals
//! - **CameraPose:** The camera configuration for one animation frame
//! - **RenderConfig:** Output size, pacing, styling, and ending slides
//!
//! Processing stages never mutate a route in place; they build new values.

pub mod camera;
pub mod geo_point;
pub mod render_config;
pub mod route;
pub mod source;

pub use camera::*;
pub use geo_point::*;
pub use render_config::*;
pub use route::*;
