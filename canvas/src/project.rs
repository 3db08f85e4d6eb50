//! Persisted project file: the graph plus its deployment targets.

#[cfg(test)]
#[path = "project_test.rs"]
mod project_test;

use serde::{Deserialize, Serialize};

use crate::deploy::DeploymentConfig;
use crate::doc::GraphSnapshot;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to encode project: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode project: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Everything needed to reopen a diagram. View state (camera, selection) is
/// not persisted.
///
/// Entity ids are UUIDs. A snapshot with any other id form fails to load as a
/// whole rather than being partially imported.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    #[serde(flatten)]
    pub graph: GraphSnapshot,
    #[serde(default, rename = "deployment_config")]
    pub deployment: DeploymentConfig,
}

impl ProjectSnapshot {
    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string_pretty(self).map_err(SnapshotError::Encode)
    }

    pub fn from_json(raw: &str) -> Result<Self, SnapshotError> {
        serde_json::from_str(raw).map_err(SnapshotError::Decode)
    }
}
