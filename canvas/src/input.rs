//! Input model: modes, modifier keys, mouse buttons, and the gesture state machine.
//!
//! This module defines the types consumed by the interaction engine. `Mode`
//! and `Modifiers` capture the user's intent at the time of a pointer event.
//! `InputState` is the single active gesture tracked between pointer-down and
//! pointer-up, carrying the transient context (drag position, draft cursor)
//! that is shown on screen but never written to the store until release.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use crate::camera::Point;
use crate::doc::{EntityId, EntityRef};

/// Top-level interaction mode. Exactly one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Select, move and delete entities (default).
    #[default]
    Select,
    /// Draw connections between entities.
    Connect,
    /// Drag anywhere to pan the view.
    Pan,
}

impl Mode {
    /// Mode bound to a single-letter keyboard shortcut.
    #[must_use]
    pub fn from_shortcut(key: &str) -> Option<Self> {
        match key {
            "v" | "V" => Some(Self::Select),
            "c" | "C" => Some(Self::Connect),
            "h" | "H" => Some(Self::Pan),
            _ => None,
        }
    }
}

/// Keyboard/mouse modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl on most platforms, Command on macOS.
    #[must_use]
    pub fn zoom_key(self) -> bool {
        self.ctrl || self.meta
    }
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// Left mouse button (or single-finger tap).
    Primary,
    /// Middle mouse button (scroll wheel click).
    Middle,
    /// Right mouse button (or two-finger tap).
    Secondary,
}

/// A keyboard key as reported by the host (e.g. `"Delete"`, `"Escape"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

impl Key {
    #[must_use]
    pub fn is_delete(&self) -> bool {
        matches!(self.0.as_str(), "Delete" | "Backspace")
    }

    #[must_use]
    pub fn is_escape(&self) -> bool {
        self.0 == "Escape"
    }
}

/// Wheel / trackpad scroll delta.
#[derive(Debug, Clone, Copy)]
pub struct WheelDelta {
    /// Horizontal scroll amount in pixels.
    pub dx: f64,
    /// Vertical scroll amount in pixels (positive = down).
    pub dy: f64,
}

/// Persistent UI state visible to the renderer.
#[derive(Debug, Clone, Default)]
pub struct UiState {
    pub mode: Mode,
    pub selected: Option<EntityRef>,
}

/// An in-progress connection that has a source but no target yet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectionDraft {
    pub source: EntityRef,
    /// World position of the anchor the draft started from.
    pub source_anchor: Point,
    /// World position of the pointer; only this moves while drafting.
    pub cursor: Point,
}

/// Internal state for the input state machine.
///
/// Each active variant carries gesture context needed to render previews and
/// emit the final mutation on pointer-up.
#[derive(Debug, Clone, Default)]
pub enum InputState {
    /// No gesture in progress; waiting for the next pointer-down.
    #[default]
    Idle,
    /// The user is panning the canvas.
    Panning {
        /// Screen-space position of the previous pointer event.
        last_screen: Point,
    },
    /// The user is moving a resource. Nothing is written until release.
    DraggingResource {
        id: EntityId,
        /// Pointer minus resource origin at grab time, in world units.
        grab_offset: Point,
        /// Resource position before the drag, restored on cancel.
        origin: Point,
        /// Unsnapped position following the pointer.
        current: Point,
    },
    /// The user is drawing a connection.
    Drafting(ConnectionDraft),
}

impl InputState {
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// The active connection draft, if any.
    #[must_use]
    pub fn draft(&self) -> Option<&ConnectionDraft> {
        match self {
            Self::Drafting(draft) => Some(draft),
            _ => None,
        }
    }
}
