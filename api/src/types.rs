//! Wire types for the diagram services, plus pure body parsing.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use std::collections::BTreeMap;

use canvas::args::ArgumentSchema;
use canvas::doc::{DomainType, GraphSnapshot};
use canvas::engine::ServiceDescriptor;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Archive format accepted by the export endpoint.
pub const EXPORT_FORMAT_ZIP: &str = "zip";

// =============================================================================
// REQUESTS
// =============================================================================

#[derive(Debug, Serialize)]
pub struct CostEstimateRequest<'a> {
    pub graph: &'a GraphSnapshot,
    pub stack_type: &'a str,
    pub region: &'a str,
    pub currency: &'a str,
}

#[derive(Debug, Serialize)]
pub struct CostCompareRequest<'a> {
    pub graph: &'a GraphSnapshot,
    pub stack_type: &'a str,
    pub regions: &'a [String],
    pub currency: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ExportRequest<'a> {
    pub graph: &'a GraphSnapshot,
    pub format: &'a str,
}

// =============================================================================
// COST
// =============================================================================

/// One input to a resource's price, e.g. instance hours or request count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostDriver {
    pub name: String,
    #[serde(default)]
    pub value: serde_json::Value,
    pub cost: f64,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceCost {
    pub resource_id: String,
    pub resource_type: String,
    pub resource_name: String,
    pub monthly_cost: f64,
    pub annual_cost: f64,
    #[serde(default)]
    pub cost_drivers: Vec<CostDriver>,
    #[serde(default)]
    pub optimization_suggestions: Vec<String>,
}

/// Cost of the whole stack under one usage scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioCost {
    pub scenario: String,
    pub total_monthly: f64,
    pub total_annual: f64,
    #[serde(default)]
    pub breakdown: Vec<ResourceCost>,
}

impl ScenarioCost {
    /// Breakdown entries ordered by monthly cost, most expensive first.
    #[must_use]
    pub fn top_costs(&self) -> Vec<&ResourceCost> {
        let mut costs: Vec<&ResourceCost> = self.breakdown.iter().collect();
        costs.sort_by(|a, b| b.monthly_cost.total_cmp(&a.monthly_cost));
        costs
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostReport {
    pub stack_type: String,
    pub region: String,
    pub currency: String,
    /// Keyed by scenario name (`idle`, `10_users`, ...).
    pub scenarios: BTreeMap<String, ScenarioCost>,
    #[serde(default)]
    pub free_tier_eligible: bool,
    #[serde(default)]
    pub optimization_recommendations: Vec<String>,
}

impl CostReport {
    #[must_use]
    pub fn scenario(&self, name: &str) -> Option<&ScenarioCost> {
        self.scenarios.get(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionCost {
    pub monthly_cost: f64,
    pub annual_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionComparison {
    pub stack_type: String,
    pub comparisons: BTreeMap<String, RegionCost>,
}

impl RegionComparison {
    /// Region with the lowest monthly cost; ties resolve to the first region
    /// by name.
    #[must_use]
    pub fn cheapest(&self) -> Option<(&str, RegionCost)> {
        self.comparisons
            .iter()
            .min_by(|(_, a), (_, b)| a.monthly_cost.total_cmp(&b.monthly_cost))
            .map(|(region, cost)| (region.as_str(), *cost))
    }
}

// =============================================================================
// TERRAFORM
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerraformModule {
    pub name: String,
    pub main_tf: String,
    pub variables_tf: String,
    pub outputs_tf: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerraformProject {
    pub modules: BTreeMap<String, TerraformModule>,
    pub root_main: String,
    pub providers: String,
    pub terraform_config: String,
}

impl TerraformProject {
    /// Relative file paths and contents, laid out the same way as the export
    /// archive.
    #[must_use]
    pub fn files(&self) -> Vec<(String, &str)> {
        let mut files = Vec::with_capacity(self.modules.len() * 3 + 3);
        for (name, module) in &self.modules {
            files.push((format!("modules/{name}/main.tf"), module.main_tf.as_str()));
            files.push((format!("modules/{name}/variables.tf"), module.variables_tf.as_str()));
            files.push((format!("modules/{name}/outputs.tf"), module.outputs_tf.as_str()));
        }
        files.push(("main.tf".to_owned(), self.root_main.as_str()));
        files.push(("providers.tf".to_owned(), self.providers.as_str()));
        files.push(("terraform.tf".to_owned(), self.terraform_config.as_str()));
        files
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub output_type: String,
    #[serde(default)]
    pub description: String,
}

/// Inputs and outputs of one resource type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSchema {
    pub resource_type: String,
    #[serde(default)]
    pub inputs: BTreeMap<String, ArgumentSchema>,
    #[serde(default)]
    pub outputs: BTreeMap<String, OutputSchema>,
}

impl ResourceSchema {
    /// Input schemas, required first, then by name.
    #[must_use]
    pub fn arguments(&self) -> Vec<ArgumentSchema> {
        let mut args: Vec<ArgumentSchema> = self.inputs.values().cloned().collect();
        args.sort_by(|a, b| b.required.cmp(&a.required).then_with(|| a.name.cmp(&b.name)));
        args
    }
}

/// A palette entry offered by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    pub resource_type: String,
    pub domain: DomainType,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub required_inputs: Vec<String>,
    #[serde(default)]
    pub optional_inputs: Vec<String>,
    #[serde(default)]
    pub exports: Vec<String>,
    #[serde(default)]
    pub allowed_consumers: Vec<String>,
}

impl ServiceDefinition {
    /// Drop payload that places this service in a domain of its registry
    /// category.
    #[must_use]
    pub fn descriptor(&self) -> ServiceDescriptor {
        ServiceDescriptor {
            resource_type: self.resource_type.clone(),
            name: None,
            domain_type: Some(self.domain),
            arguments: None,
        }
    }
}

// =============================================================================
// PARSING
// =============================================================================

/// Decode a JSON response body.
pub fn parse_body<T: DeserializeOwned>(text: &str) -> Result<T, ApiError> {
    serde_json::from_str(text).map_err(|e| ApiError::Parse(e.to_string()))
}
