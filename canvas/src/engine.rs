//! Interaction engine: turns pointer, wheel, key and drop events into graph
//! mutations.
//!
//! `EngineCore` owns the store, the camera, the UI mode and the single active
//! gesture. Every handler returns the [`Action`]s the host should react to
//! (re-render, update the cursor, confirm a destructive delete). Transient
//! gesture state (a resource mid-drag, a connection draft following the
//! pointer) is held in [`InputState`] and only written to the store on
//! release, as one update.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::args::Arguments;
use crate::camera::{Camera, Point, Rect, ZoomLimits};
use crate::catalog;
use crate::consts::{DOMAIN_PADDING, GRID_SIZE, NEW_DOMAIN_HEIGHT, NEW_DOMAIN_WIDTH, WHEEL_ZOOM_SENSITIVITY};
use crate::deploy::{self, DeployError, DeploymentConfig, DeploymentDescriptor, ResolvedInstance};
use crate::diag::{Diagnostics, ValidationReport};
use crate::doc::{
    Connection, DocStore, Domain, DomainType, EntityId, EntityKind, EntityRef, ImportReport, PartialResource,
    Removal, Resource,
};
use crate::grid::snap_point;
use crate::hit::{self, Hit, HitPart};
use crate::input::{Button, ConnectionDraft, InputState, Key, Mode, Modifiers, UiState, WheelDelta};
use crate::project::ProjectSnapshot;
use crate::route::{self, Route, anchor_point};

/// Tunables for the interaction engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Grid cell size in world units; non-positive disables snapping.
    pub grid_size: f64,
    pub zoom_limits: ZoomLimits,
    /// Zoom factor per wheel pixel, applied exponentially.
    pub wheel_zoom_sensitivity: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            grid_size: GRID_SIZE,
            zoom_limits: ZoomLimits::default(),
            wheel_zoom_sensitivity: WHEEL_ZOOM_SENSITIVITY,
        }
    }
}

/// A failed gesture. The gesture is abandoned and the store is untouched.
#[derive(Debug, thiserror::Error)]
pub enum GestureError {
    #[error("malformed drop payload: {0}")]
    MalformedPayload(#[source] serde_json::Error),
    #[error("drop payload has an empty resource type")]
    EmptyResourceType,
    #[error("resource type `{0}` has no domain category; pass one explicitly")]
    UnknownDomainType(String),
}

/// Palette entry carried by a drag-and-drop payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    #[serde(alias = "type")]
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Overrides the catalog's domain category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_type: Option<DomainType>,
    /// Merged over the catalog's default arguments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Arguments>,
}

impl ServiceDescriptor {
    /// Parse a raw drop payload.
    pub fn parse(payload: &str) -> Result<Self, GestureError> {
        let descriptor: Self = serde_json::from_str(payload).map_err(GestureError::MalformedPayload)?;
        if descriptor.resource_type.trim().is_empty() {
            return Err(GestureError::EmptyResourceType);
        }
        Ok(descriptor)
    }

    fn domain_type(&self) -> Result<DomainType, GestureError> {
        self.domain_type
            .or_else(|| catalog::domain_type_for(&self.resource_type))
            .ok_or_else(|| GestureError::UnknownDomainType(self.resource_type.clone()))
    }
}

/// Where a drop would land.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropPreview {
    /// Snapped world position of the new resource.
    pub position: Point,
    /// Existing domain that would receive the resource; `None` means a new
    /// domain would be created around `position`.
    pub target_domain: Option<EntityId>,
}

/// Actions returned from input handlers for the host to process.
#[derive(Debug, Clone)]
pub enum Action {
    DomainCreated(Domain),
    ResourceCreated(Resource),
    ResourceUpdated { id: EntityId, fields: PartialResource },
    ConnectionCreated(Connection),
    EntitiesDeleted(Removal),
    /// Deleting this domain would cascade; the host should confirm and then
    /// call [`EngineCore::confirm_delete_domain`].
    ConfirmDeleteRequested { domain_id: EntityId, resources: usize, connections: usize },
    /// The active gesture was discarded with no graph mutation.
    GestureCancelled,
    SelectionChanged(Option<EntityRef>),
    SetCursor(String),
    RenderNeeded,
}

/// Core engine state.
pub struct EngineCore {
    pub doc: DocStore,
    pub camera: Camera,
    pub ui: UiState,
    pub input: InputState,
    pub config: EngineConfig,
    pub deployment: DeploymentConfig,
    diagnostics: Diagnostics,
}

impl Default for EngineCore {
    fn default() -> Self {
        Self::with_config(EngineConfig::default())
    }
}

impl EngineCore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            doc: DocStore::new(),
            camera: Camera::default(),
            ui: UiState::default(),
            input: InputState::default(),
            config,
            deployment: DeploymentConfig::default(),
            diagnostics: Diagnostics::default(),
        }
    }

    // --- Project ---

    /// Replace the graph and deployment targets from a saved project.
    ///
    /// Any active gesture, the selection and the diagnostics are discarded.
    pub fn load_project(&mut self, project: ProjectSnapshot) -> ImportReport {
        self.input = InputState::Idle;
        self.ui.selected = None;
        let report = self.doc.import_snapshot(project.graph);
        self.deployment = project.deployment;
        self.diagnostics = Diagnostics::cleared(self.doc.generation());
        if !report.is_clean() {
            warn!(?report, "project loaded with repairs");
        }
        report
    }

    /// Snapshot of the graph and deployment targets for saving.
    #[must_use]
    pub fn project(&self) -> ProjectSnapshot {
        ProjectSnapshot { graph: self.doc.export_snapshot(), deployment: self.deployment.clone() }
    }

    /// Empty the graph.
    pub fn clear_graph(&mut self) -> Vec<Action> {
        self.input = InputState::Idle;
        self.doc.clear();
        self.diagnostics = Diagnostics::cleared(self.doc.generation());
        let mut actions = self.set_selection(None);
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Expand every resource against the project's deployment targets.
    pub fn resolve_deployment(&self) -> Result<Vec<ResolvedInstance>, DeployError> {
        deploy::resolve_graph(&self.doc.export_snapshot(), &self.deployment)
    }

    // --- Diagnostics ---

    /// Apply a validation result evaluated against `generation`.
    ///
    /// Results for any generation other than the current one are stale and
    /// dropped. Returns whether the result was applied.
    pub fn apply_validation(&mut self, generation: u64, report: ValidationReport) -> bool {
        let current = self.doc.generation();
        if generation != current {
            debug!(generation, current, "stale validation result discarded");
            return false;
        }
        self.diagnostics = Diagnostics::from_report(generation, report);
        true
    }

    /// Drop all diagnostics, e.g. when the graph became empty.
    pub fn clear_diagnostics(&mut self) {
        self.diagnostics = Diagnostics::cleared(self.doc.generation());
    }

    #[must_use]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    // --- Mode ---

    /// Switch the interaction mode. Any gesture in progress is cancelled.
    pub fn set_mode(&mut self, mode: Mode) -> Vec<Action> {
        if self.ui.mode == mode {
            return Vec::new();
        }
        let mut actions = self.cancel_gesture();
        self.ui.mode = mode;
        actions.push(Action::SetCursor(Self::mode_cursor(mode).into()));
        actions
    }

    /// Discard the active gesture without touching the store.
    pub fn cancel_gesture(&mut self) -> Vec<Action> {
        match std::mem::take(&mut self.input) {
            InputState::Idle => Vec::new(),
            InputState::Panning { .. } => vec![Action::SetCursor(Self::mode_cursor(self.ui.mode).into())],
            InputState::DraggingResource { .. } | InputState::Drafting(_) => {
                vec![Action::GestureCancelled, Action::RenderNeeded]
            }
        }
    }

    // --- Input events ---

    pub fn on_pointer_down(&mut self, screen_pt: Point, button: Button, _modifiers: Modifiers) -> Vec<Action> {
        if !self.input.is_idle() {
            return Vec::new();
        }
        if button == Button::Middle || (button == Button::Primary && self.ui.mode == Mode::Pan) {
            self.input = InputState::Panning { last_screen: screen_pt };
            return vec![Action::SetCursor("grabbing".into())];
        }
        if button != Button::Primary {
            return Vec::new();
        }

        let world = self.camera.screen_to_world(screen_pt);
        let hit = hit::hit_test(world, &self.doc, &self.camera);
        match (self.ui.mode, hit) {
            (Mode::Select | Mode::Connect, Some(Hit { entity, part: HitPart::Anchor(side) })) => {
                match self.doc.entity_rect(entity) {
                    Some(rect) => self.start_draft(entity, anchor_point(&rect, side), world),
                    None => Vec::new(),
                }
            }
            (Mode::Connect, Some(Hit { entity, part: HitPart::Body })) => match self.doc.entity_rect(entity) {
                Some(rect) => self.start_draft(entity, rect.center(), world),
                None => Vec::new(),
            },
            (Mode::Connect, None) => Vec::new(),
            (Mode::Select, Some(Hit { entity, part: HitPart::Body })) => {
                let mut actions = self.set_selection(Some(entity));
                if entity.kind == EntityKind::Resource {
                    if let Some(origin) = self.doc.resource(&entity.id).and_then(|r| r.position) {
                        self.input = InputState::DraggingResource {
                            id: entity.id,
                            grab_offset: Point::new(world.x - origin.x, world.y - origin.y),
                            origin,
                            current: origin,
                        };
                        actions.push(Action::SetCursor("move".into()));
                    }
                }
                actions.push(Action::RenderNeeded);
                actions
            }
            (Mode::Select, None) => {
                let mut actions = self.set_selection(None);
                self.input = InputState::Panning { last_screen: screen_pt };
                actions.push(Action::SetCursor("grabbing".into()));
                actions
            }
            (Mode::Pan, _) => Vec::new(),
        }
    }

    pub fn on_pointer_move(&mut self, screen_pt: Point, _modifiers: Modifiers) -> Vec<Action> {
        let world = self.camera.screen_to_world(screen_pt);
        if self.input.is_idle() {
            return self.hover_cursor(world);
        }
        match &mut self.input {
            InputState::Idle => Vec::new(),
            InputState::Panning { last_screen } => {
                let (dx, dy) = (screen_pt.x - last_screen.x, screen_pt.y - last_screen.y);
                *last_screen = screen_pt;
                self.camera.pan_by(dx, dy);
                vec![Action::RenderNeeded]
            }
            InputState::DraggingResource { grab_offset, current, .. } => {
                *current = Point::new(world.x - grab_offset.x, world.y - grab_offset.y);
                vec![Action::RenderNeeded]
            }
            InputState::Drafting(draft) => {
                draft.cursor = world;
                vec![Action::RenderNeeded]
            }
        }
    }

    pub fn on_pointer_up(&mut self, screen_pt: Point, _button: Button, _modifiers: Modifiers) -> Vec<Action> {
        let world = self.camera.screen_to_world(screen_pt);
        let cursor = Action::SetCursor(Self::mode_cursor(self.ui.mode).into());
        match std::mem::take(&mut self.input) {
            InputState::Idle => Vec::new(),
            InputState::Panning { .. } => vec![cursor],
            InputState::DraggingResource { id, origin, current, .. } => {
                let snapped = snap_point(current, self.config.grid_size);
                if snapped == origin {
                    return vec![cursor, Action::RenderNeeded];
                }
                let fields = PartialResource { position: Some(snapped), ..Default::default() };
                if self.doc.update_resource(&id, &fields) {
                    vec![Action::ResourceUpdated { id, fields }, cursor, Action::RenderNeeded]
                } else {
                    vec![Action::GestureCancelled, cursor, Action::RenderNeeded]
                }
            }
            InputState::Drafting(draft) => {
                let mut actions = self.commit_draft(draft, world);
                actions.push(cursor);
                actions
            }
        }
    }

    /// Ctrl/meta + wheel zooms at the pointer; a plain wheel pans.
    pub fn on_wheel(&mut self, screen_pt: Point, delta: WheelDelta, modifiers: Modifiers) -> Vec<Action> {
        if modifiers.zoom_key() {
            let factor = (-delta.dy * self.config.wheel_zoom_sensitivity).exp();
            let requested = self.camera.zoom * factor;
            if self.camera.zoom_at(screen_pt, requested, self.config.zoom_limits) {
                return vec![Action::RenderNeeded];
            }
            return Vec::new();
        }
        self.camera.pan_by(-delta.dx, -delta.dy);
        vec![Action::RenderNeeded]
    }

    pub fn on_key_down(&mut self, key: &Key, modifiers: Modifiers) -> Vec<Action> {
        if key.is_escape() {
            return self.cancel_gesture();
        }
        if key.is_delete() {
            return self.delete_selected();
        }
        if modifiers.zoom_key() || modifiers.alt {
            return Vec::new();
        }
        match Mode::from_shortcut(&key.0) {
            Some(mode) => self.set_mode(mode),
            None => Vec::new(),
        }
    }

    // --- Drop ---

    /// Where a palette drop at `screen_pt` would land. Pure.
    pub fn drop_preview(&self, screen_pt: Point, payload: &str) -> Result<DropPreview, GestureError> {
        let descriptor = ServiceDescriptor::parse(payload)?;
        Ok(self.preview_for(screen_pt, &descriptor)?.0)
    }

    /// Place a palette service at `screen_pt`.
    ///
    /// The snapped drop point goes into an existing domain of the service's
    /// category when it lies inside one, otherwise a new domain is created
    /// around it. A malformed payload aborts the gesture with the store untouched.
    pub fn on_drop(&mut self, screen_pt: Point, payload: &str) -> Result<Vec<Action>, GestureError> {
        let descriptor = ServiceDescriptor::parse(payload)?;
        let (preview, domain_type) = self.preview_for(screen_pt, &descriptor)?;

        let mut actions = self.cancel_gesture();
        let domain_id = match preview.target_domain {
            Some(id) => id,
            None => {
                let mut domain = Domain::new(format!("{} domain", domain_type.label()), domain_type);
                domain.bounds = Some(Rect::new(
                    preview.position.x - DOMAIN_PADDING,
                    preview.position.y - DOMAIN_PADDING,
                    NEW_DOMAIN_WIDTH,
                    NEW_DOMAIN_HEIGHT,
                ));
                let id = domain.id;
                self.doc.add_domain(domain.clone());
                actions.push(Action::DomainCreated(domain));
                id
            }
        };

        let mut arguments = catalog::default_arguments(&descriptor.resource_type);
        if let Some(overrides) = descriptor.arguments {
            arguments.extend(overrides);
        }
        let resource = Resource {
            id: Uuid::new_v4(),
            name: descriptor.name.unwrap_or_else(|| catalog::default_name(&descriptor.resource_type)),
            deployment: DeploymentDescriptor::for_resource_type(&descriptor.resource_type),
            resource_type: descriptor.resource_type,
            domain_id,
            arguments,
            position: Some(preview.position),
        };
        let entity = EntityRef::resource(resource.id);
        if !self.doc.add_resource(resource.clone()) {
            actions.push(Action::GestureCancelled);
            return Ok(actions);
        }
        actions.push(Action::ResourceCreated(resource));
        actions.extend(self.set_selection(Some(entity)));
        actions.push(Action::RenderNeeded);
        Ok(actions)
    }

    fn preview_for(&self, screen_pt: Point, descriptor: &ServiceDescriptor) -> Result<(DropPreview, DomainType), GestureError> {
        let domain_type = descriptor.domain_type()?;
        let world = self.camera.screen_to_world(screen_pt);
        let position = snap_point(world, self.config.grid_size);
        let target_domain = hit::domain_at(position, &self.doc, Some(domain_type));
        Ok((DropPreview { position, target_domain }, domain_type))
    }

    // --- Deletes ---

    /// Delete the selected entity. A domain with members asks for
    /// confirmation first.
    pub fn delete_selected(&mut self) -> Vec<Action> {
        let Some(selected) = self.ui.selected else {
            return Vec::new();
        };
        let mut actions = self.cancel_gesture();
        match selected.kind {
            EntityKind::Resource => {
                let removal = self.doc.delete_resource(&selected.id);
                actions.extend(self.after_removal(removal));
            }
            EntityKind::Domain => {
                let plan = self.doc.plan_domain_removal(&selected.id);
                if plan.resources.is_empty() {
                    let removal = self.doc.delete_domain(&selected.id);
                    actions.extend(self.after_removal(removal));
                } else {
                    actions.push(Action::ConfirmDeleteRequested {
                        domain_id: selected.id,
                        resources: plan.resources.len(),
                        connections: plan.connections.len(),
                    });
                }
            }
        }
        actions
    }

    /// Delete a domain and everything it owns after the user confirmed.
    pub fn confirm_delete_domain(&mut self, id: &EntityId) -> Vec<Action> {
        let mut actions = self.cancel_gesture();
        let removal = self.doc.delete_domain(id);
        actions.extend(self.after_removal(removal));
        actions
    }

    /// Delete a single connection.
    pub fn delete_connection(&mut self, id: &EntityId) -> Vec<Action> {
        if !self.doc.delete_connection(id) {
            return Vec::new();
        }
        vec![
            Action::EntitiesDeleted(Removal { connections: vec![*id], ..Removal::default() }),
            Action::RenderNeeded,
        ]
    }

    fn after_removal(&mut self, removal: Removal) -> Vec<Action> {
        if removal.is_empty() {
            return Vec::new();
        }
        let mut actions = Vec::new();
        if let Some(selected) = self.ui.selected {
            if removal.domains.contains(&selected.id) || removal.resources.contains(&selected.id) {
                actions.extend(self.set_selection(None));
            }
        }
        actions.push(Action::EntitiesDeleted(removal));
        actions.push(Action::RenderNeeded);
        actions
    }

    // --- Queries ---

    #[must_use]
    pub fn selection(&self) -> Option<EntityRef> {
        self.ui.selected
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.ui.mode
    }

    #[must_use]
    pub fn camera(&self) -> Camera {
        self.camera
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.doc.generation()
    }

    /// Position to draw a resource at: the transient drag position while it
    /// is being moved, otherwise the stored one.
    #[must_use]
    pub fn display_position(&self, id: &EntityId) -> Option<Point> {
        match self.input {
            InputState::DraggingResource { id: dragged, current, .. } if dragged == *id => Some(current),
            _ => self.doc.resource(id).and_then(|r| r.position),
        }
    }

    /// Routes for every committed connection, following any resource mid-drag.
    #[must_use]
    pub fn routes(&self) -> Vec<(EntityId, Route)> {
        let mut overrides = HashMap::new();
        if let InputState::DraggingResource { id, current, .. } = self.input {
            overrides.insert(id, current);
        }
        route::connection_routes(&self.doc, &overrides)
    }

    /// Dashed preview for the connection being drafted.
    #[must_use]
    pub fn draft_preview(&self) -> Option<Route> {
        let draft = self.input.draft()?;
        let rect = self.doc.entity_rect(draft.source)?;
        Some(route::draft_route(&rect, draft.cursor))
    }

    // --- Internals ---

    fn start_draft(&mut self, source: EntityRef, source_anchor: Point, world: Point) -> Vec<Action> {
        self.input = InputState::Drafting(ConnectionDraft { source, source_anchor, cursor: world });
        vec![Action::SetCursor("crosshair".into()), Action::RenderNeeded]
    }

    fn commit_draft(&mut self, draft: ConnectionDraft, world: Point) -> Vec<Action> {
        let target = match (self.ui.mode, hit::hit_test(world, &self.doc, &self.camera)) {
            (_, Some(Hit { entity, part: HitPart::Anchor(_) })) | (Mode::Connect, Some(Hit { entity, part: HitPart::Body })) => {
                Some(entity)
            }
            _ => None,
        };
        let Some(target) = target.filter(|t| t.id != draft.source.id) else {
            return vec![Action::GestureCancelled, Action::RenderNeeded];
        };
        let connection = Connection::between(draft.source, target);
        if !self.doc.add_connection(connection.clone()) {
            return vec![Action::GestureCancelled, Action::RenderNeeded];
        }
        vec![Action::ConnectionCreated(connection), Action::RenderNeeded]
    }

    fn hover_cursor(&self, world: Point) -> Vec<Action> {
        let cursor = match hit::hit_test(world, &self.doc, &self.camera) {
            Some(Hit { part: HitPart::Anchor(_), .. }) if self.ui.mode != Mode::Pan => "crosshair",
            Some(Hit { entity, part: HitPart::Body }) if self.ui.mode == Mode::Select && entity.kind == EntityKind::Resource => {
                "move"
            }
            _ => Self::mode_cursor(self.ui.mode),
        };
        vec![Action::SetCursor(cursor.into())]
    }

    fn set_selection(&mut self, selected: Option<EntityRef>) -> Vec<Action> {
        if self.ui.selected == selected {
            return Vec::new();
        }
        self.ui.selected = selected;
        vec![Action::SelectionChanged(selected)]
    }

    fn mode_cursor(mode: Mode) -> &'static str {
        match mode {
            Mode::Select => "default",
            Mode::Connect => "crosshair",
            Mode::Pan => "grab",
        }
    }
}
