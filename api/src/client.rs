//! HTTP client for the validation, cost, artifact and registry services.
//!
//! Every call goes through the configured [`RetryPolicy`](crate::retry::RetryPolicy):
//! transient transport failures and 429/502/503/504 responses are retried,
//! everything else is returned to the caller on the first failure. Response
//! bodies are decoded by [`parse_body`] so the decoding is testable without a
//! server.

#[cfg(test)]
#[path = "client_test.rs"]
mod client_test;

use std::time::Duration;

use canvas::diag::ValidationReport;
use canvas::doc::GraphSnapshot;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::types::{
    CostCompareRequest, CostEstimateRequest, CostReport, EXPORT_FORMAT_ZIP, ExportRequest, RegionComparison,
    ResourceSchema, ServiceDefinition, TerraformProject, parse_body,
};

pub const VALIDATE_PATH: &str = "/api/v1/graph/validate";
pub const COST_ESTIMATE_PATH: &str = "/api/v1/cost/estimate";
pub const COST_COMPARE_PATH: &str = "/api/v1/cost/compare";
pub const TERRAFORM_GENERATE_PATH: &str = "/api/v1/terraform/generate";
pub const TERRAFORM_EXPORT_PATH: &str = "/api/v1/terraform/export";
pub const REGISTRY_SCHEMA_PATH: &str = "/api/v1/registry/schema";
pub const REGISTRY_SERVICES_PATH: &str = "/api/v1/registry/services";

// =============================================================================
// CLIENT
// =============================================================================

pub struct ApiClient {
    http: reqwest::Client,
    config: ApiConfig,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let config = config.validated()?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, config })
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Validate a full graph snapshot.
    pub async fn validate(&self, graph: &GraphSnapshot) -> Result<ValidationReport, ApiError> {
        let report: ValidationReport = self.post_json("validate", VALIDATE_PATH, graph).await?;
        debug!(
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            can_export = ?report.can_export,
            "validation response"
        );
        Ok(report)
    }

    /// Cost estimate for every usage scenario of a stack in one region.
    pub async fn estimate_costs(
        &self,
        graph: &GraphSnapshot,
        stack_type: &str,
        region: &str,
        currency: &str,
    ) -> Result<CostReport, ApiError> {
        let body = CostEstimateRequest { graph, stack_type, region, currency };
        let report: CostReport = self.post_json("cost estimate", COST_ESTIMATE_PATH, &body).await?;
        info!(stack_type, region, scenarios = report.scenarios.len(), "cost estimate received");
        Ok(report)
    }

    /// Monthly and annual totals of the same stack across regions.
    pub async fn compare_regions(
        &self,
        graph: &GraphSnapshot,
        stack_type: &str,
        regions: &[String],
        currency: &str,
    ) -> Result<RegionComparison, ApiError> {
        let body = CostCompareRequest { graph, stack_type, regions, currency };
        self.post_json("cost compare", COST_COMPARE_PATH, &body).await
    }

    /// Generated module text keyed by module name.
    pub async fn generate_terraform(&self, graph: &GraphSnapshot) -> Result<TerraformProject, ApiError> {
        let project: TerraformProject = self.post_json("terraform generate", TERRAFORM_GENERATE_PATH, graph).await?;
        info!(modules = project.modules.len(), "terraform generated");
        Ok(project)
    }

    /// Zip archive of the generated project.
    pub async fn export_archive(&self, graph: &GraphSnapshot) -> Result<Vec<u8>, ApiError> {
        let body = encode(&ExportRequest { graph, format: EXPORT_FORMAT_ZIP })?;
        let bytes = self.call("terraform export", TERRAFORM_EXPORT_PATH, Some(body)).await?;
        info!(bytes = bytes.len(), "terraform archive received");
        Ok(bytes)
    }

    /// Argument and output schema for one resource type.
    pub async fn resource_schema(&self, resource_type: &str) -> Result<ResourceSchema, ApiError> {
        let path = format!("{REGISTRY_SCHEMA_PATH}/{resource_type}");
        let bytes = self.call("registry schema", &path, None).await?;
        decode(&bytes)
    }

    /// Palette service definitions.
    pub async fn services(&self) -> Result<Vec<ServiceDefinition>, ApiError> {
        let bytes = self.call("registry services", REGISTRY_SERVICES_PATH, None).await?;
        decode(&bytes)
    }

    // -------------------------------------------------------------------------
    // Transport
    // -------------------------------------------------------------------------

    async fn post_json<B, T>(&self, label: &str, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let bytes = self.call(label, path, Some(encode(body)?)).await?;
        decode(&bytes)
    }

    /// POST when `body` is present, GET otherwise, under the retry policy.
    async fn call(&self, label: &str, path: &str, body: Option<Vec<u8>>) -> Result<Vec<u8>, ApiError> {
        let url = self.config.url(path);
        let url = url.as_str();
        let body = body.as_deref();
        self.config.retry.run(label, move || self.send_once(url, body)).await
    }

    async fn send_once(&self, url: &str, body: Option<&[u8]>) -> Result<Vec<u8>, ApiError> {
        let request = match body {
            Some(bytes) => self.http.post(url).header(CONTENT_TYPE, "application/json").body(bytes.to_vec()),
            None => self.http.get(url),
        };
        let response = request.send().await.map_err(|e| ApiError::from_transport(&e))?;

        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(|e| ApiError::from_transport(&e))?;

        if !(200..300).contains(&status) {
            return Err(ApiError::Status { status, body: String::from_utf8_lossy(&bytes).into_owned() });
        }
        Ok(bytes.to_vec())
    }
}

fn encode<B: Serialize + ?Sized>(body: &B) -> Result<Vec<u8>, ApiError> {
    serde_json::to_vec(body).map_err(|e| ApiError::Parse(format!("request encode failed: {e}")))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ApiError> {
    let text = std::str::from_utf8(bytes).map_err(|e| ApiError::Parse(e.to_string()))?;
    parse_body(text)
}
