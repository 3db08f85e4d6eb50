//! Coordinate types and the viewport camera.

#[cfg(test)]
#[path = "camera_test.rs"]
mod camera_test;

use serde::{Deserialize, Serialize};

use crate::consts::{ZOOM_MAX, ZOOM_MIN};

/// A point in either screen or world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Component-wise offset.
    #[must_use]
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self { x: self.x + dx, y: self.y + dy }
    }
}

/// Axis-aligned rectangle in world space. `x`/`y` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    /// Inclusive containment test.
    #[must_use]
    pub fn contains(&self, pt: Point) -> bool {
        pt.x >= self.x && pt.x <= self.right() && pt.y >= self.y && pt.y <= self.bottom()
    }

    /// Smallest rectangle covering both `self` and `other`.
    #[must_use]
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect {
            x,
            y,
            width: self.right().max(other.right()) - x,
            height: self.bottom().max(other.bottom()) - y,
        }
    }

    /// Grow the rectangle by `pad` on every side.
    #[must_use]
    pub fn inflate(&self, pad: f64) -> Rect {
        Rect {
            x: self.x - pad,
            y: self.y - pad,
            width: self.width + pad * 2.0,
            height: self.height + pad * 2.0,
        }
    }
}

/// Inclusive zoom range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomLimits {
    pub min: f64,
    pub max: f64,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self { min: ZOOM_MIN, max: ZOOM_MAX }
    }
}

impl ZoomLimits {
    /// Clamp `zoom` into the range. Non-finite input falls back to `min`.
    #[must_use]
    pub fn clamp(&self, zoom: f64) -> f64 {
        if zoom.is_finite() { zoom.clamp(self.min, self.max) } else { self.min }
    }
}

/// Pan and zoom of the diagram viewport.
///
/// `screen = world * zoom + pan`. Pan is in screen pixels; a zoom of 1.0
/// shows world units one-to-one. View state only, never persisted.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub pan_x: f64,
    pub pan_y: f64,
    pub zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self { pan_x: 0.0, pan_y: 0.0, zoom: 1.0 }
    }
}

impl Camera {
    /// Inverse of [`Camera::world_to_screen`].
    #[must_use]
    pub fn screen_to_world(&self, screen: Point) -> Point {
        Point {
            x: (screen.x - self.pan_x) / self.zoom,
            y: (screen.y - self.pan_y) / self.zoom,
        }
    }

    #[must_use]
    pub fn world_to_screen(&self, world: Point) -> Point {
        Point {
            x: world.x * self.zoom + self.pan_x,
            y: world.y * self.zoom + self.pan_y,
        }
    }

    /// Length in world units of `screen_dist` pixels.
    #[must_use]
    pub fn screen_dist_to_world(&self, screen_dist: f64) -> f64 {
        screen_dist / self.zoom
    }

    /// Shift the view by a screen-space delta.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan_x += dx;
        self.pan_y += dy;
    }

    /// Set a new zoom while keeping the world point under `pointer` fixed on screen.
    ///
    /// The requested zoom is clamped into `limits` before the pan is recomputed.
    /// Returns `false` when the clamped zoom equals the current one.
    pub fn zoom_at(&mut self, pointer: Point, requested: f64, limits: ZoomLimits) -> bool {
        let next = limits.clamp(requested);
        if (next - self.zoom).abs() < f64::EPSILON {
            return false;
        }
        let ratio = next / self.zoom;
        self.pan_x = pointer.x - (pointer.x - self.pan_x) * ratio;
        self.pan_y = pointer.y - (pointer.y - self.pan_y) * ratio;
        self.zoom = next;
        true
    }
}
