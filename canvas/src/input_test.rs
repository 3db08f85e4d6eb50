use uuid::Uuid;

use super::*;

// =============================================================
// Mode
// =============================================================

#[test]
fn mode_default_is_select() {
    assert_eq!(Mode::default(), Mode::Select);
}

#[test]
fn mode_shortcuts() {
    assert_eq!(Mode::from_shortcut("v"), Some(Mode::Select));
    assert_eq!(Mode::from_shortcut("C"), Some(Mode::Connect));
    assert_eq!(Mode::from_shortcut("h"), Some(Mode::Pan));
    assert_eq!(Mode::from_shortcut("x"), None);
}

// =============================================================
// Modifiers and keys
// =============================================================

#[test]
fn modifiers_default_all_false() {
    let m = Modifiers::default();
    assert!(!m.shift && !m.ctrl && !m.alt && !m.meta);
    assert!(!m.zoom_key());
}

#[test]
fn zoom_key_accepts_ctrl_or_meta() {
    assert!(Modifiers { ctrl: true, ..Default::default() }.zoom_key());
    assert!(Modifiers { meta: true, ..Default::default() }.zoom_key());
    assert!(!Modifiers { shift: true, ..Default::default() }.zoom_key());
}

#[test]
fn key_classification() {
    assert!(Key("Delete".into()).is_delete());
    assert!(Key("Backspace".into()).is_delete());
    assert!(!Key("d".into()).is_delete());
    assert!(Key("Escape".into()).is_escape());
}

// =============================================================
// UiState / InputState
// =============================================================

#[test]
fn ui_state_default() {
    let ui = UiState::default();
    assert_eq!(ui.mode, Mode::Select);
    assert!(ui.selected.is_none());
}

#[test]
fn input_state_default_is_idle() {
    let state = InputState::default();
    assert!(state.is_idle());
    assert!(state.draft().is_none());
}

#[test]
fn drafting_exposes_draft() {
    let draft = ConnectionDraft {
        source: EntityRef::resource(Uuid::new_v4()),
        source_anchor: Point::new(0.0, 0.0),
        cursor: Point::new(10.0, 10.0),
    };
    let state = InputState::Drafting(draft);
    assert!(!state.is_idle());
    assert_eq!(state.draft(), Some(&draft));
}

#[test]
fn dragging_is_not_idle() {
    let state = InputState::DraggingResource {
        id: Uuid::new_v4(),
        grab_offset: Point::new(5.0, 5.0),
        origin: Point::new(0.0, 0.0),
        current: Point::new(0.0, 0.0),
    };
    assert!(!state.is_idle());
    assert!(state.draft().is_none());
}
