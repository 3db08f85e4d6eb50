//! Document model: domains, resources, connections, and the in-memory store.
//!
//! This module defines the entities that make up an infrastructure diagram
//! (`Domain`, `Resource`, `Connection`), sparse-update types for incremental
//! edits (`PartialDomain`, `PartialResource`, `PartialConnection`), the
//! array-based `GraphSnapshot` used for persistence and service calls, and the
//! runtime store that owns all live entities (`DocStore`).
//!
//! The store maintains two invariants on every mutation:
//!
//! - every resource's `domain_id` names a live domain, and that domain's
//!   `resource_ids` lists exactly the resources pointing at it, once each;
//! - every connection endpoint resolves to a live entity of the declared kind.
//!
//! Mutations never fail loudly. An operation that would break an invariant, or
//! that targets an unknown id, is a no-op that logs a warning and reports
//! `false` (or an empty [`Removal`]). Deletes compute the full cascade first
//! and apply it as a single step, so no caller ever sees a dangling reference.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::args::Arguments;
use crate::camera::{Point, Rect};
use crate::consts::{DOMAIN_PADDING, RESOURCE_HEIGHT, RESOURCE_WIDTH};
use crate::deploy::DeploymentDescriptor;

/// Unique identifier for a domain, resource or connection.
pub type EntityId = Uuid;

/// Which collection an id lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Resource,
    Domain,
}

/// A typed reference to a connectable entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: EntityId,
    pub kind: EntityKind,
}

impl EntityRef {
    #[must_use]
    pub fn resource(id: EntityId) -> Self {
        Self { id, kind: EntityKind::Resource }
    }

    #[must_use]
    pub fn domain(id: EntityId) -> Self {
        Self { id, kind: EntityKind::Domain }
    }
}

// =============================================================
// Domains
// =============================================================

/// Semantic category of a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainType {
    Networking,
    Compute,
    Serverless,
    Data,
    Storage,
    Messaging,
    Identity,
    Observability,
    Edge,
}

impl DomainType {
    /// Lowercase label, identical to the wire form.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Networking => "networking",
            Self::Compute => "compute",
            Self::Serverless => "serverless",
            Self::Data => "data",
            Self::Storage => "storage",
            Self::Messaging => "messaging",
            Self::Identity => "identity",
            Self::Observability => "observability",
            Self::Edge => "edge",
        }
    }

    /// Scope a freshly created domain of this type starts with.
    #[must_use]
    pub fn default_scope(self) -> DomainScope {
        match self {
            Self::Identity | Self::Edge => DomainScope::Global,
            Self::Networking | Self::Compute | Self::Data => DomainScope::MultiZone,
            Self::Serverless | Self::Storage | Self::Messaging | Self::Observability => DomainScope::Regional,
        }
    }
}

/// Deployment reach of a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DomainScope {
    Global,
    #[default]
    Regional,
    MultiZone,
}

/// Declared module input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainInput {
    pub name: String,
    #[serde(rename = "type")]
    pub value_type: String,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Declared module output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainOutput {
    pub name: String,
    #[serde(rename = "type")]
    pub value_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A logical grouping of resources; roughly one deployable module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    pub id: EntityId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: DomainType,
    /// Member resources, unique and in insertion order. Owned by the store.
    #[serde(default)]
    pub resource_ids: Vec<EntityId>,
    #[serde(default)]
    pub inputs: Vec<DomainInput>,
    #[serde(default)]
    pub outputs: Vec<DomainOutput>,
    #[serde(default)]
    pub scope: DomainScope,
    /// Explicit visual bounds. When absent the bounds are derived from members.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Rect>,
}

impl Domain {
    /// A new empty domain with a fresh id and the type's default scope.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: DomainType) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            resource_ids: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            scope: kind.default_scope(),
            bounds: None,
        }
    }

    /// Convert a world point into coordinates relative to the explicit bounds origin.
    #[must_use]
    pub fn local_position(&self, world: Point) -> Option<Point> {
        self.bounds.map(|b| Point::new(world.x - b.x, world.y - b.y))
    }
}

// =============================================================
// Resources
// =============================================================

/// A single infrastructure object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: EntityId,
    /// Provider resource type, e.g. `aws_subnet`.
    #[serde(rename = "type")]
    pub resource_type: String,
    pub domain_id: EntityId,
    pub name: String,
    #[serde(default)]
    pub arguments: Arguments,
    #[serde(default)]
    pub deployment: DeploymentDescriptor,
    /// Top-left corner of the card in world coordinates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Point>,
}

impl Resource {
    /// Card rectangle in world space, if the resource has been placed.
    #[must_use]
    pub fn rect(&self) -> Option<Rect> {
        self.position
            .map(|p| Rect::new(p.x, p.y, RESOURCE_WIDTH, RESOURCE_HEIGHT))
    }
}

// =============================================================
// Connections
// =============================================================

/// Semantic kind of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    /// A value flows from an output into an input.
    Data,
    /// Ordering-only dependency between two resources.
    Dependency,
    /// Module-level relationship between two domains.
    Implicit,
}

impl ConnectionKind {
    /// Kind implied by the endpoint kinds: domain↔domain is implicit,
    /// resource↔resource is a dependency, anything mixed is data flow.
    #[must_use]
    pub fn infer(source: EntityKind, target: EntityKind) -> Self {
        match (source, target) {
            (EntityKind::Domain, EntityKind::Domain) => Self::Implicit,
            (EntityKind::Resource, EntityKind::Resource) => Self::Dependency,
            _ => Self::Data,
        }
    }
}

/// A typed edge between two entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub id: EntityId,
    pub source_id: EntityId,
    #[serde(rename = "source_type")]
    pub source_kind: EntityKind,
    pub target_id: EntityId,
    #[serde(rename = "target_type")]
    pub target_kind: EntityKind,
    #[serde(rename = "connection_type")]
    pub kind: ConnectionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_name: Option<String>,
}

impl Connection {
    /// A new unbound connection between two entities with an inferred kind.
    #[must_use]
    pub fn between(source: EntityRef, target: EntityRef) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_id: source.id,
            source_kind: source.kind,
            target_id: target.id,
            target_kind: target.kind,
            kind: ConnectionKind::infer(source.kind, target.kind),
            output_name: None,
            input_name: None,
        }
    }

    #[must_use]
    pub fn source(&self) -> EntityRef {
        EntityRef { id: self.source_id, kind: self.source_kind }
    }

    #[must_use]
    pub fn target(&self) -> EntityRef {
        EntityRef { id: self.target_id, kind: self.target_kind }
    }

    /// Whether either endpoint is `id`.
    #[must_use]
    pub fn touches(&self, id: &EntityId) -> bool {
        self.source_id == *id || self.target_id == *id
    }
}

// =============================================================
// Sparse updates
// =============================================================

/// Sparse update for a domain. Only present fields are applied.
///
/// Membership is not editable here; it follows the resources' `domain_id`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartialDomain {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<DomainType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Vec<DomainInput>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Vec<DomainOutput>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<DomainScope>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Rect>,
}

/// Sparse update for a resource. Only present fields are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartialResource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Move the resource to another live domain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_id: Option<EntityId>,
    /// Argument keys to insert or overwrite.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Arguments>,
    /// Argument keys to remove.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed_arguments: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment: Option<DeploymentDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Point>,
}

/// Sparse update for a connection. Only present fields are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartialConnection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ConnectionKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<EntityRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<EntityRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_name: Option<String>,
}

// =============================================================
// Snapshots and reports
// =============================================================

/// Array-based graph snapshot for persistence and service calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub domains: Vec<Domain>,
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl GraphSnapshot {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty() && self.resources.is_empty() && self.connections.is_empty()
    }
}

/// Ids removed by one delete, grouped by collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Removal {
    pub domains: Vec<EntityId>,
    pub resources: Vec<EntityId>,
    pub connections: Vec<EntityId>,
}

impl Removal {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty() && self.resources.is_empty() && self.connections.is_empty()
    }
}

/// Repairs performed while importing an external snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Resources whose domain did not exist.
    pub dropped_resources: usize,
    /// Connections with an endpoint that did not resolve.
    pub dropped_connections: usize,
    /// Domains whose member list had to be rewritten.
    pub repaired_domains: usize,
}

impl ImportReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.dropped_resources == 0 && self.dropped_connections == 0 && self.repaired_domains == 0
    }
}

/// A broken invariant found by [`DocStore::check_integrity`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntegrityViolation {
    #[error("connection {connection} points at missing {kind:?} {endpoint}")]
    DanglingEndpoint { connection: EntityId, endpoint: EntityId, kind: EntityKind },
    #[error("connection {connection} loops back onto {endpoint}")]
    SelfLoop { connection: EntityId, endpoint: EntityId },
    #[error("resource {resource} belongs to missing domain {domain}")]
    OrphanResource { resource: EntityId, domain: EntityId },
    #[error("domain {domain} does not list member {resource}")]
    MissingMember { domain: EntityId, resource: EntityId },
    #[error("domain {domain} lists {resource}, which is not its member")]
    StrayMember { domain: EntityId, resource: EntityId },
    #[error("domain {domain} lists {resource} more than once")]
    DuplicateMember { domain: EntityId, resource: EntityId },
}

// =============================================================
// Store
// =============================================================

/// In-memory store of domains, resources and connections.
pub struct DocStore {
    domains: HashMap<EntityId, Domain>,
    resources: HashMap<EntityId, Resource>,
    connections: HashMap<EntityId, Connection>,
    generation: u64,
}

impl DocStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            domains: HashMap::new(),
            resources: HashMap::new(),
            connections: HashMap::new(),
            generation: 0,
        }
    }

    /// Counter bumped once per applied mutation. Diagnostics and service
    /// requests are tagged with it so stale results can be recognized.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn bump(&mut self) {
        self.generation += 1;
    }

    // --- Inserts ---

    /// Insert or overwrite a domain.
    ///
    /// The incoming member list is reconciled against the live resources: ids
    /// that do not point back at this domain are dropped, missing members are
    /// appended.
    pub fn add_domain(&mut self, mut domain: Domain) -> bool {
        domain.resource_ids = self.reconcile_members(domain.id, &domain.resource_ids);
        self.domains.insert(domain.id, domain);
        self.bump();
        true
    }

    /// Insert or overwrite a resource and register it with its domain.
    ///
    /// Returns `false` when the owning domain does not exist.
    pub fn add_resource(&mut self, resource: Resource) -> bool {
        if !self.domains.contains_key(&resource.domain_id) {
            warn!(id = %resource.id, domain_id = %resource.domain_id, "add_resource: unknown domain; ignoring");
            return false;
        }
        if let Some(previous) = self.resources.get(&resource.id) {
            if previous.domain_id != resource.domain_id {
                let (id, old_domain) = (previous.id, previous.domain_id);
                self.unlist_member(old_domain, id);
            }
        }
        if let Some(domain) = self.domains.get_mut(&resource.domain_id) {
            if !domain.resource_ids.contains(&resource.id) {
                domain.resource_ids.push(resource.id);
            }
        }
        self.resources.insert(resource.id, resource);
        self.bump();
        true
    }

    /// Insert or overwrite a connection.
    ///
    /// Returns `false` when an endpoint does not resolve to a live entity of
    /// the declared kind, or when both endpoints are the same entity.
    pub fn add_connection(&mut self, connection: Connection) -> bool {
        if !self.endpoints_valid(connection.source(), connection.target()) {
            warn!(id = %connection.id, source = %connection.source_id, target = %connection.target_id, "add_connection: invalid endpoints; ignoring");
            return false;
        }
        self.connections.insert(connection.id, connection);
        self.bump();
        true
    }

    // --- Sparse updates ---

    /// Merge a partial update into a domain. Unknown ids are a no-op.
    pub fn update_domain(&mut self, id: &EntityId, partial: &PartialDomain) -> bool {
        let Some(domain) = self.domains.get_mut(id) else {
            warn!(%id, "update_domain: unknown id; ignoring");
            return false;
        };
        if let Some(ref name) = partial.name {
            domain.name.clone_from(name);
        }
        if let Some(kind) = partial.kind {
            domain.kind = kind;
        }
        if let Some(ref inputs) = partial.inputs {
            domain.inputs.clone_from(inputs);
        }
        if let Some(ref outputs) = partial.outputs {
            domain.outputs.clone_from(outputs);
        }
        if let Some(scope) = partial.scope {
            domain.scope = scope;
        }
        if let Some(bounds) = partial.bounds {
            domain.bounds = Some(bounds);
        }
        self.bump();
        true
    }

    /// Merge a partial update into a resource. Unknown ids, and moves to a
    /// domain that does not exist, are a no-op.
    pub fn update_resource(&mut self, id: &EntityId, partial: &PartialResource) -> bool {
        let Some(current_domain) = self.resources.get(id).map(|r| r.domain_id) else {
            warn!(%id, "update_resource: unknown id; ignoring");
            return false;
        };
        if let Some(target) = partial.domain_id {
            if !self.domains.contains_key(&target) {
                warn!(%id, domain_id = %target, "update_resource: unknown target domain; ignoring");
                return false;
            }
            if target != current_domain {
                self.unlist_member(current_domain, *id);
                if let Some(domain) = self.domains.get_mut(&target) {
                    domain.resource_ids.push(*id);
                }
            }
        }
        let Some(resource) = self.resources.get_mut(id) else {
            return false;
        };
        if let Some(target) = partial.domain_id {
            resource.domain_id = target;
        }
        if let Some(ref name) = partial.name {
            resource.name.clone_from(name);
        }
        if let Some(ref args) = partial.arguments {
            for (key, value) in args {
                resource.arguments.insert(key.clone(), value.clone());
            }
        }
        for key in &partial.removed_arguments {
            resource.arguments.remove(key);
        }
        if let Some(ref deployment) = partial.deployment {
            resource.deployment = deployment.clone();
        }
        if let Some(position) = partial.position {
            resource.position = Some(position);
        }
        self.bump();
        true
    }

    /// Merge a partial update into a connection. Unknown ids, and endpoint
    /// changes that would dangle, are a no-op.
    pub fn update_connection(&mut self, id: &EntityId, partial: &PartialConnection) -> bool {
        let Some(current) = self.connections.get(id) else {
            warn!(%id, "update_connection: unknown id; ignoring");
            return false;
        };
        let source = partial.source.unwrap_or(current.source());
        let target = partial.target.unwrap_or(current.target());
        if (partial.source.is_some() || partial.target.is_some()) && !self.endpoints_valid(source, target) {
            warn!(%id, "update_connection: invalid endpoints; ignoring");
            return false;
        }
        let Some(conn) = self.connections.get_mut(id) else {
            return false;
        };
        conn.source_id = source.id;
        conn.source_kind = source.kind;
        conn.target_id = target.id;
        conn.target_kind = target.kind;
        if let Some(kind) = partial.kind {
            conn.kind = kind;
        }
        if let Some(ref output) = partial.output_name {
            conn.output_name = Some(output.clone());
        }
        if let Some(ref input) = partial.input_name {
            conn.input_name = Some(input.clone());
        }
        self.bump();
        true
    }

    // --- Domain ports ---

    /// Append an input declaration, replacing any input with the same name.
    pub fn add_domain_input(&mut self, id: &EntityId, input: DomainInput) -> bool {
        let Some(domain) = self.domains.get_mut(id) else {
            warn!(%id, "add_domain_input: unknown domain; ignoring");
            return false;
        };
        domain.inputs.retain(|i| i.name != input.name);
        domain.inputs.push(input);
        self.bump();
        true
    }

    /// Remove an input declaration by name. Returns whether one was removed.
    pub fn remove_domain_input(&mut self, id: &EntityId, name: &str) -> bool {
        let Some(domain) = self.domains.get_mut(id) else {
            warn!(%id, "remove_domain_input: unknown domain; ignoring");
            return false;
        };
        let before = domain.inputs.len();
        domain.inputs.retain(|i| i.name != name);
        let removed = domain.inputs.len() != before;
        if removed {
            self.bump();
        }
        removed
    }

    /// Append an output declaration, replacing any output with the same name.
    pub fn add_domain_output(&mut self, id: &EntityId, output: DomainOutput) -> bool {
        let Some(domain) = self.domains.get_mut(id) else {
            warn!(%id, "add_domain_output: unknown domain; ignoring");
            return false;
        };
        domain.outputs.retain(|o| o.name != output.name);
        domain.outputs.push(output);
        self.bump();
        true
    }

    /// Remove an output declaration by name. Returns whether one was removed.
    pub fn remove_domain_output(&mut self, id: &EntityId, name: &str) -> bool {
        let Some(domain) = self.domains.get_mut(id) else {
            warn!(%id, "remove_domain_output: unknown domain; ignoring");
            return false;
        };
        let before = domain.outputs.len();
        domain.outputs.retain(|o| o.name != name);
        let removed = domain.outputs.len() != before;
        if removed {
            self.bump();
        }
        removed
    }

    // --- Deletes ---

    /// Everything deleting resource `id` would remove. Pure.
    #[must_use]
    pub fn plan_resource_removal(&self, id: &EntityId) -> Removal {
        if !self.resources.contains_key(id) {
            return Removal::default();
        }
        let mut connections: Vec<EntityId> = self
            .connections
            .values()
            .filter(|c| c.touches(id))
            .map(|c| c.id)
            .collect();
        connections.sort();
        Removal { domains: Vec::new(), resources: vec![*id], connections }
    }

    /// Everything deleting domain `id` would remove: the domain, its members,
    /// and every connection touching any of them. Pure.
    #[must_use]
    pub fn plan_domain_removal(&self, id: &EntityId) -> Removal {
        let Some(domain) = self.domains.get(id) else {
            return Removal::default();
        };
        let mut doomed: HashSet<EntityId> = HashSet::new();
        doomed.insert(*id);
        let mut resources: Vec<EntityId> = self
            .resources
            .values()
            .filter(|r| r.domain_id == domain.id)
            .map(|r| r.id)
            .collect();
        resources.sort();
        doomed.extend(resources.iter().copied());
        let mut connections: Vec<EntityId> = self
            .connections
            .values()
            .filter(|c| doomed.contains(&c.source_id) || doomed.contains(&c.target_id))
            .map(|c| c.id)
            .collect();
        connections.sort();
        Removal { domains: vec![*id], resources, connections }
    }

    /// Delete a resource, unlist it from its domain, and cascade to every
    /// connection touching it.
    pub fn delete_resource(&mut self, id: &EntityId) -> Removal {
        let removal = self.plan_resource_removal(id);
        if removal.is_empty() {
            warn!(%id, "delete_resource: unknown id; ignoring");
            return removal;
        }
        self.apply_removal(&removal);
        removal
    }

    /// Delete a domain together with all its resources and every connection
    /// touching the domain or any of those resources.
    pub fn delete_domain(&mut self, id: &EntityId) -> Removal {
        let removal = self.plan_domain_removal(id);
        if removal.is_empty() {
            warn!(%id, "delete_domain: unknown id; ignoring");
            return removal;
        }
        self.apply_removal(&removal);
        removal
    }

    /// Delete a single connection.
    pub fn delete_connection(&mut self, id: &EntityId) -> bool {
        if self.connections.remove(id).is_none() {
            warn!(%id, "delete_connection: unknown id; ignoring");
            return false;
        }
        self.bump();
        true
    }

    fn apply_removal(&mut self, removal: &Removal) {
        for id in &removal.connections {
            self.connections.remove(id);
        }
        for id in &removal.resources {
            if let Some(resource) = self.resources.remove(id) {
                if let Some(domain) = self.domains.get_mut(&resource.domain_id) {
                    domain.resource_ids.retain(|member| member != id);
                }
            }
        }
        for id in &removal.domains {
            self.domains.remove(id);
        }
        self.bump();
    }

    // --- Whole-graph operations ---

    /// Empty all three collections in one step.
    pub fn clear(&mut self) {
        self.domains.clear();
        self.resources.clear();
        self.connections.clear();
        self.bump();
    }

    /// Replace the whole graph with `snapshot`. Never merges with prior state.
    ///
    /// The snapshot is built into fresh collections and repaired before the
    /// swap: resources of unknown domains and connections with unresolved
    /// endpoints are dropped, member lists are reconciled.
    pub fn import_snapshot(&mut self, snapshot: GraphSnapshot) -> ImportReport {
        let mut report = ImportReport::default();
        let mut next = DocStore { generation: self.generation, ..DocStore::new() };

        for domain in snapshot.domains {
            next.domains.insert(domain.id, domain);
        }
        for resource in snapshot.resources {
            if next.domains.contains_key(&resource.domain_id) {
                next.resources.insert(resource.id, resource);
            } else {
                warn!(id = %resource.id, domain_id = %resource.domain_id, "import: resource of unknown domain dropped");
                report.dropped_resources += 1;
            }
        }
        let domain_ids: Vec<EntityId> = next.domains.keys().copied().collect();
        for id in domain_ids {
            let proposed = next.domains.get(&id).map(|d| d.resource_ids.clone()).unwrap_or_default();
            let reconciled = next.reconcile_members(id, &proposed);
            if reconciled != proposed {
                report.repaired_domains += 1;
            }
            if let Some(domain) = next.domains.get_mut(&id) {
                domain.resource_ids = reconciled;
            }
        }
        for connection in snapshot.connections {
            if next.endpoints_valid(connection.source(), connection.target()) {
                next.connections.insert(connection.id, connection);
            } else {
                warn!(id = %connection.id, "import: connection with unresolved endpoint dropped");
                report.dropped_connections += 1;
            }
        }

        *self = next;
        self.bump();
        report
    }

    /// Array-based snapshot of the whole graph, each collection ordered by id.
    #[must_use]
    pub fn export_snapshot(&self) -> GraphSnapshot {
        let mut domains: Vec<Domain> = self.domains.values().cloned().collect();
        domains.sort_by_key(|d| d.id);
        let mut resources: Vec<Resource> = self.resources.values().cloned().collect();
        resources.sort_by_key(|r| r.id);
        let mut connections: Vec<Connection> = self.connections.values().cloned().collect();
        connections.sort_by_key(|c| c.id);
        GraphSnapshot { domains, resources, connections }
    }

    // --- Queries ---

    #[must_use]
    pub fn domain(&self, id: &EntityId) -> Option<&Domain> {
        self.domains.get(id)
    }

    #[must_use]
    pub fn resource(&self, id: &EntityId) -> Option<&Resource> {
        self.resources.get(id)
    }

    #[must_use]
    pub fn connection(&self, id: &EntityId) -> Option<&Connection> {
        self.connections.get(id)
    }

    /// All domains ordered by id.
    #[must_use]
    pub fn sorted_domains(&self) -> Vec<&Domain> {
        let mut out: Vec<&Domain> = self.domains.values().collect();
        out.sort_by_key(|d| d.id);
        out
    }

    /// All resources ordered by id.
    #[must_use]
    pub fn sorted_resources(&self) -> Vec<&Resource> {
        let mut out: Vec<&Resource> = self.resources.values().collect();
        out.sort_by_key(|r| r.id);
        out
    }

    /// All connections ordered by id.
    #[must_use]
    pub fn sorted_connections(&self) -> Vec<&Connection> {
        let mut out: Vec<&Connection> = self.connections.values().collect();
        out.sort_by_key(|c| c.id);
        out
    }

    /// Members of a domain in membership order.
    #[must_use]
    pub fn resources_in(&self, domain_id: &EntityId) -> Vec<&Resource> {
        self.domains
            .get(domain_id)
            .map(|d| d.resource_ids.iter().filter_map(|id| self.resources.get(id)).collect())
            .unwrap_or_default()
    }

    /// Connections with `id` as source or target, ordered by connection id.
    #[must_use]
    pub fn connections_touching(&self, id: &EntityId) -> Vec<&Connection> {
        let mut out: Vec<&Connection> = self.connections.values().filter(|c| c.touches(id)).collect();
        out.sort_by_key(|c| c.id);
        out
    }

    /// Which collection holds `id`, if any.
    #[must_use]
    pub fn entity_kind(&self, id: &EntityId) -> Option<EntityKind> {
        if self.resources.contains_key(id) {
            Some(EntityKind::Resource)
        } else if self.domains.contains_key(id) {
            Some(EntityKind::Domain)
        } else {
            None
        }
    }

    /// Whether `entity` names a live entity of its declared kind.
    #[must_use]
    pub fn resolves(&self, entity: EntityRef) -> bool {
        match entity.kind {
            EntityKind::Resource => self.resources.contains_key(&entity.id),
            EntityKind::Domain => self.domains.contains_key(&entity.id),
        }
    }

    /// Domain rectangle: explicit bounds, or the padded union of its placed members.
    #[must_use]
    pub fn domain_rect(&self, id: &EntityId) -> Option<Rect> {
        let domain = self.domains.get(id)?;
        if let Some(bounds) = domain.bounds {
            return Some(bounds);
        }
        self.resources_in(id)
            .iter()
            .filter_map(|r| r.rect())
            .reduce(|acc, r| acc.union(&r))
            .map(|r| r.inflate(DOMAIN_PADDING))
    }

    /// Rectangle of any connectable entity.
    #[must_use]
    pub fn entity_rect(&self, entity: EntityRef) -> Option<Rect> {
        match entity.kind {
            EntityKind::Resource => self.resources.get(&entity.id).and_then(Resource::rect),
            EntityKind::Domain => self.domain_rect(&entity.id),
        }
    }

    #[must_use]
    pub fn domain_count(&self) -> usize {
        self.domains.len()
    }

    #[must_use]
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Returns `true` if all three collections are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty() && self.resources.is_empty() && self.connections.is_empty()
    }

    /// Every broken invariant, in a stable order. Empty for a healthy store.
    #[must_use]
    pub fn check_integrity(&self) -> Vec<IntegrityViolation> {
        let mut out = Vec::new();
        for conn in self.sorted_connections() {
            for endpoint in [conn.source(), conn.target()] {
                if !self.resolves(endpoint) {
                    out.push(IntegrityViolation::DanglingEndpoint {
                        connection: conn.id,
                        endpoint: endpoint.id,
                        kind: endpoint.kind,
                    });
                }
            }
            if conn.source_id == conn.target_id {
                out.push(IntegrityViolation::SelfLoop { connection: conn.id, endpoint: conn.source_id });
            }
        }
        for resource in self.sorted_resources() {
            match self.domains.get(&resource.domain_id) {
                None => out.push(IntegrityViolation::OrphanResource { resource: resource.id, domain: resource.domain_id }),
                Some(domain) if !domain.resource_ids.contains(&resource.id) => {
                    out.push(IntegrityViolation::MissingMember { domain: domain.id, resource: resource.id });
                }
                Some(_) => {}
            }
        }
        for domain in self.sorted_domains() {
            let mut seen = HashSet::new();
            for member in &domain.resource_ids {
                if !seen.insert(*member) {
                    out.push(IntegrityViolation::DuplicateMember { domain: domain.id, resource: *member });
                    continue;
                }
                let belongs = self.resources.get(member).is_some_and(|r| r.domain_id == domain.id);
                if !belongs {
                    out.push(IntegrityViolation::StrayMember { domain: domain.id, resource: *member });
                }
            }
        }
        out
    }

    // --- Internals ---

    fn endpoints_valid(&self, source: EntityRef, target: EntityRef) -> bool {
        source.id != target.id && self.resolves(source) && self.resolves(target)
    }

    fn unlist_member(&mut self, domain_id: EntityId, resource_id: EntityId) {
        if let Some(domain) = self.domains.get_mut(&domain_id) {
            domain.resource_ids.retain(|member| *member != resource_id);
        }
    }

    /// Keep `proposed` ids that really belong to `domain_id` (first occurrence
    /// only), then append unlisted members ordered by id.
    fn reconcile_members(&self, domain_id: EntityId, proposed: &[EntityId]) -> Vec<EntityId> {
        let mut seen = HashSet::new();
        let mut members: Vec<EntityId> = proposed
            .iter()
            .copied()
            .filter(|id| self.resources.get(id).is_some_and(|r| r.domain_id == domain_id))
            .filter(|id| seen.insert(*id))
            .collect();
        let mut missing: Vec<EntityId> = self
            .resources
            .values()
            .filter(|r| r.domain_id == domain_id && !seen.contains(&r.id))
            .map(|r| r.id)
            .collect();
        missing.sort();
        members.extend(missing);
        if members.as_slice() != proposed {
            warn!(%domain_id, "domain member list reconciled against live resources");
        }
        members
    }
}

impl Default for DocStore {
    fn default() -> Self {
        Self::new()
    }
}
