//! Shared numeric constants for the canvas crate.

// ── Viewport ────────────────────────────────────────────────────

/// Smallest zoom factor the camera accepts.
pub const ZOOM_MIN: f64 = 0.1;

/// Largest zoom factor the camera accepts.
pub const ZOOM_MAX: f64 = 4.0;

/// Multiplicative zoom step per wheel pixel when ctrl/meta is held.
pub const WHEEL_ZOOM_SENSITIVITY: f64 = 0.0015;

/// Default snapping grid pitch in world units.
pub const GRID_SIZE: f64 = 20.0;

// ── Hit-testing ─────────────────────────────────────────────────

/// Screen-space hit slop in pixels for connection anchors.
pub const ANCHOR_RADIUS_PX: f64 = 8.0;

// ── Layout ──────────────────────────────────────────────────────

/// Width of a resource card in world units.
pub const RESOURCE_WIDTH: f64 = 160.0;

/// Height of a resource card in world units.
pub const RESOURCE_HEIGHT: f64 = 60.0;

/// Gap between a domain edge and the resources placed inside it.
pub const DOMAIN_PADDING: f64 = 40.0;

/// Width of a domain created by a palette drop.
pub const NEW_DOMAIN_WIDTH: f64 = 400.0;

/// Height of a domain created by a palette drop.
pub const NEW_DOMAIN_HEIGHT: f64 = 300.0;
