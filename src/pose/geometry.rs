//! Planar joint-angle geometry.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Interior angle at `vertex`, in degrees, between the rays `vertex→a` and `vertex→c`.
///
/// The result is folded into `[0, 180]`. Coincident or collinear points yield 0° or 180°
/// rather than an error; callers filter unreliable joints before getting here.
pub fn angle_at(a: Point, vertex: Point, c: Point) -> f64 {
    let radians = (c.y - vertex.y).atan2(c.x - vertex.x) - (a.y - vertex.y).atan2(a.x - vertex.x);
    let angle = radians.to_degrees().abs();

    if angle > 180.0 {
        360.0 - angle
    } else {
        angle
    }
}
