//! Grid snapping shared by drop previews and committed placements.

#[cfg(test)]
#[path = "grid_test.rs"]
mod grid_test;

use crate::camera::Point;

/// Snap a scalar to the nearest multiple of `grid`.
///
/// A non-positive or non-finite grid disables snapping.
#[must_use]
pub fn snap(v: f64, grid: f64) -> f64 {
    if !(grid.is_finite() && grid > 0.0) {
        return v;
    }
    (v / grid).round() * grid
}

/// Snap each axis of a point independently.
#[must_use]
pub fn snap_point(pt: Point, grid: f64) -> Point {
    Point::new(snap(pt.x, grid), snap(pt.y, grid))
}
