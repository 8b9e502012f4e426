//! Easing curves and scalar interpolation for camera moves.

use flyover_route_model::normalize_degrees;
use serde::{Deserialize, Serialize};

use crate::bearing::bearing_delta;

/// Easing curve over normalized time `t ∈ [0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Ease {
    Linear,
    OutQuad,
    #[default]
    InOutCubic,
}

impl Ease {
    pub fn apply(self, t: f64) -> f64 {
        match self {
            Self::Linear => clamp_unit(t),
            Self::OutQuad => ease_out_quad(t),
            Self::InOutCubic => ease_in_out_cubic(t),
        }
    }
}

/// `4t³` for the first half, `1 − (−2t + 2)³ / 2` for the second.
pub fn ease_in_out_cubic(t: f64) -> f64 {
    let t = clamp_unit(t);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// Decelerating quadratic: `1 − (1 − t)²`.
pub fn ease_out_quad(t: f64) -> f64 {
    let t = clamp_unit(t);
    1.0 - (1.0 - t) * (1.0 - t)
}

pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Interpolate between two headings along the shorter arc.
pub fn lerp_bearing(from: f64, to: f64, t: f64) -> f64 {
    normalize_degrees(from + bearing_delta(from, to) * t)
}

fn clamp_unit(t: f64) -> f64 {
    if t.is_nan() {
        0.0
    } else {
        t.clamp(0.0, 1.0)
    }
}
