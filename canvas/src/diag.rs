//! Per-entity validation diagnostics.
//!
//! Diagnostics live beside the store rather than inside it: applying a
//! validation result never mutates the graph and never bumps its generation.
//! Each applied report replaces the previous one wholesale.

#[cfg(test)]
#[path = "diag_test.rs"]
mod diag_test;

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::doc::EntityId;

/// Validation service response.
///
/// Keys that are not entity ids are dropped with a warning so one bad key
/// does not discard the whole report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    #[serde(default, deserialize_with = "entity_keyed")]
    pub errors: HashMap<EntityId, Vec<String>>,
    #[serde(default, deserialize_with = "entity_keyed")]
    pub warnings: HashMap<EntityId, Vec<String>>,
    /// Absent means "exportable when there are no errors".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_export: Option<bool>,
}

impl ValidationReport {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.errors.values().any(|list| !list.is_empty())
    }
}

fn entity_keyed<'de, D>(deserializer: D) -> Result<HashMap<EntityId, Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = HashMap::<String, Vec<String>>::deserialize(deserializer)?;
    let mut out = HashMap::with_capacity(raw.len());
    for (key, messages) in raw {
        match key.parse::<EntityId>() {
            Ok(id) => {
                out.insert(id, messages);
            }
            Err(err) => warn!(key = %key, error = %err, "validation report key is not an entity id; dropped"),
        }
    }
    Ok(out)
}

/// Diagnostics for a single entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityDiagnostics<'a> {
    pub errors: &'a [String],
    pub warnings: &'a [String],
}

impl EntityDiagnostics<'_> {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// The current diagnostic state, tagged with the graph generation it describes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    generation: u64,
    errors: HashMap<EntityId, Vec<String>>,
    warnings: HashMap<EntityId, Vec<String>>,
    can_export: bool,
}

impl Diagnostics {
    /// Build diagnostics from a report evaluated against `generation`.
    #[must_use]
    pub fn from_report(generation: u64, report: ValidationReport) -> Self {
        let can_export = report.can_export.unwrap_or_else(|| !report.has_errors());
        let mut errors = report.errors;
        let mut warnings = report.warnings;
        errors.retain(|_, list| !list.is_empty());
        warnings.retain(|_, list| !list.is_empty());
        Self { generation, errors, warnings, can_export }
    }

    /// Empty diagnostics for an empty graph.
    #[must_use]
    pub fn cleared(generation: u64) -> Self {
        Self { generation, ..Self::default() }
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn can_export(&self) -> bool {
        self.can_export
    }

    #[must_use]
    pub fn for_entity(&self, id: &EntityId) -> EntityDiagnostics<'_> {
        EntityDiagnostics {
            errors: self.errors.get(id).map_or(&[], Vec::as_slice),
            warnings: self.warnings.get(id).map_or(&[], Vec::as_slice),
        }
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.warnings.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}
