use std::fs;
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};

use api::config::{
    ApiTimeouts, DEFAULT_API_URL, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_RETRY_ATTEMPTS,
    DEFAULT_RETRY_BASE_MS, DEFAULT_VALIDATE_DEBOUNCE_MS,
};
use api::retry::RetryPolicy;
use api::{ApiClient, ApiConfig, ApiError};
use canvas::args::{ArgIssue, validate_arguments};
use canvas::deploy::{self, DeployError};
use canvas::diag::Diagnostics;
use canvas::doc::DocStore;
use canvas::project::{ProjectSnapshot, SnapshotError};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[cfg(test)]
#[path = "main_test.rs"]
mod main_test;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("failed to read {path}: {source}")]
    Read { path: String, source: io::Error },
    #[error("failed to write {path}: {source}")]
    Write { path: String, source: io::Error },
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error("deployment resolution failed: {0}")]
    Deploy(#[from] DeployError),
    #[error("{code}: {source}")]
    Api { code: &'static str, source: ApiError },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("project has {0} integrity violation(s)")]
    Integrity(usize),
    #[error("{0} argument issue(s) found")]
    Arguments(usize),
    #[error("refusing to write module {0:?}: name is not a plain directory name")]
    UnsafeModuleName(String),
}

impl From<ApiError> for CliError {
    fn from(source: ApiError) -> Self {
        use api::ErrorCode;
        Self::Api { code: source.error_code(), source }
    }
}

#[derive(Parser, Debug)]
#[command(name = "stackboard", about = "Infrastructure diagram project tool")]
struct Cli {
    #[arg(long, env = "STACKBOARD_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    #[arg(long, env = "STACKBOARD_REQUEST_TIMEOUT_SECS", default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    request_timeout_secs: u64,

    #[arg(long, env = "STACKBOARD_CONNECT_TIMEOUT_SECS", default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS)]
    connect_timeout_secs: u64,

    #[arg(long, env = "STACKBOARD_RETRY_ATTEMPTS", default_value_t = DEFAULT_RETRY_ATTEMPTS)]
    retry_attempts: usize,

    #[arg(long, env = "STACKBOARD_RETRY_BASE_MS", default_value_t = DEFAULT_RETRY_BASE_MS)]
    retry_base_ms: u64,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.api_url.clone(),
            timeouts: ApiTimeouts { request_secs: self.request_timeout_secs, connect_secs: self.connect_timeout_secs },
            retry: RetryPolicy { attempts: self.retry_attempts, base_ms: self.retry_base_ms },
            debounce_ms: DEFAULT_VALIDATE_DEBOUNCE_MS,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load a project, report import repairs and integrity violations.
    Check(ProjectArg),
    /// Expand deployment strategies into concrete instances.
    Resolve(ResolveArgs),
    /// Send the graph to the validation service.
    Validate(ProjectArg),
    /// Check every resource's arguments against its registry schema.
    CheckArgs(ProjectArg),
    /// Cost estimate for every usage scenario.
    Estimate(EstimateArgs),
    /// Compare stack cost across regions.
    Compare(CompareArgs),
    /// Generate Terraform modules.
    Generate(GenerateArgs),
    /// Download the generated project as a zip archive.
    Export(ExportArgs),
    /// Print the registry schema of one resource type.
    Schema { resource_type: String },
    /// List the registry's palette services.
    Services,
}

#[derive(Args, Debug)]
struct ProjectArg {
    #[arg(help = "Project file path, or - for stdin")]
    project: String,
}

#[derive(Args, Debug)]
struct ResolveArgs {
    #[command(flatten)]
    project: ProjectArg,

    #[arg(long, value_delimiter = ',', help = "Override the project's availability zones")]
    zones: Vec<String>,
}

#[derive(Args, Debug)]
struct EstimateArgs {
    #[command(flatten)]
    project: ProjectArg,

    #[arg(long)]
    stack_type: String,

    #[arg(long, help = "Defaults to the project's primary region")]
    region: Option<String>,

    #[arg(long, default_value = "USD")]
    currency: String,
}

#[derive(Args, Debug)]
struct CompareArgs {
    #[command(flatten)]
    project: ProjectArg,

    #[arg(long)]
    stack_type: String,

    #[arg(long, value_delimiter = ',', help = "Defaults to the project's primary and replica regions")]
    regions: Vec<String>,

    #[arg(long, default_value = "USD")]
    currency: String,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    #[command(flatten)]
    project: ProjectArg,

    #[arg(long, help = "Write module files under this directory instead of printing JSON")]
    out_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ExportArgs {
    #[command(flatten)]
    project: ProjectArg,

    #[arg(long, short, default_value = "terraform-project.zip")]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.api_config();

    match cli.command {
        Command::Check(args) => run_check(&args.project),
        Command::Resolve(args) => run_resolve(&args),
        Command::Validate(args) => run_validate(config, &args.project).await,
        Command::CheckArgs(args) => run_check_args(config, &args.project).await,
        Command::Estimate(args) => run_estimate(config, &args).await,
        Command::Compare(args) => run_compare(config, &args).await,
        Command::Generate(args) => run_generate(config, &args).await,
        Command::Export(args) => run_export(config, &args).await,
        Command::Schema { resource_type } => {
            let client = ApiClient::new(config)?;
            print_json(&client.resource_schema(&resource_type).await?)
        }
        Command::Services => {
            let client = ApiClient::new(config)?;
            print_json(&client.services().await?)
        }
    }
}

// =============================================================================
// LOCAL COMMANDS
// =============================================================================

fn run_check(path: &str) -> Result<(), CliError> {
    let project = load_project(path)?;
    let (doc, summary) = check_project(project);
    print_json(&summary)?;
    let violations = doc.check_integrity().len();
    if violations > 0 {
        return Err(CliError::Integrity(violations));
    }
    Ok(())
}

/// Import a project and summarize what the import had to repair.
fn check_project(project: ProjectSnapshot) -> (DocStore, serde_json::Value) {
    let mut doc = DocStore::new();
    let report = doc.import_snapshot(project.graph);
    if !report.is_clean() {
        warn!(
            dropped_resources = report.dropped_resources,
            dropped_connections = report.dropped_connections,
            repaired_domains = report.repaired_domains,
            "project needed repairs on import"
        );
    }
    let violations: Vec<String> = doc.check_integrity().iter().map(ToString::to_string).collect();
    let summary = json!({
        "domains": doc.domain_count(),
        "resources": doc.resource_count(),
        "connections": doc.connection_count(),
        "dropped_resources": report.dropped_resources,
        "dropped_connections": report.dropped_connections,
        "repaired_domains": report.repaired_domains,
        "violations": violations,
    });
    (doc, summary)
}

fn run_resolve(args: &ResolveArgs) -> Result<(), CliError> {
    let mut project = load_project(&args.project.project)?;
    if !args.zones.is_empty() {
        project.deployment.availability_zones.clone_from(&args.zones);
    }
    let instances = deploy::resolve_graph(&project.graph, &project.deployment)?;
    info!(resources = project.graph.resources.len(), instances = instances.len(), "deployment resolved");
    print_json(&instances)
}

// =============================================================================
// SERVICE COMMANDS
// =============================================================================

async fn run_validate(config: ApiConfig, path: &str) -> Result<(), CliError> {
    let project = load_project(path)?;
    let client = ApiClient::new(config)?;
    let report = client.validate(&project.graph).await?;
    let diagnostics = Diagnostics::from_report(0, report.clone());
    print_json(&json!({
        "errors": report.errors,
        "warnings": report.warnings,
        "can_export": diagnostics.can_export(),
    }))
}

async fn run_check_args(config: ApiConfig, path: &str) -> Result<(), CliError> {
    let project = load_project(path)?;
    let client = ApiClient::new(config)?;

    let mut types: Vec<&str> = project.graph.resources.iter().map(|r| r.resource_type.as_str()).collect();
    types.sort_unstable();
    types.dedup();

    let mut schemas = std::collections::HashMap::new();
    for resource_type in types {
        let schema = client.resource_schema(resource_type).await?;
        schemas.insert(resource_type, schema.arguments());
    }

    let mut findings = Vec::new();
    for resource in &project.graph.resources {
        let Some(schema) = schemas.get(resource.resource_type.as_str()) else {
            continue;
        };
        let issues: Vec<ArgIssue> = validate_arguments(&resource.arguments, schema);
        if !issues.is_empty() {
            findings.push(json!({
                "resource_id": resource.id,
                "name": resource.name,
                "issues": issues.iter().map(ToString::to_string).collect::<Vec<_>>(),
            }));
        }
    }
    let count = findings.len();
    print_json(&findings)?;
    if count > 0 {
        return Err(CliError::Arguments(count));
    }
    Ok(())
}

async fn run_estimate(config: ApiConfig, args: &EstimateArgs) -> Result<(), CliError> {
    let project = load_project(&args.project.project)?;
    let region = args.region.as_deref().unwrap_or(&project.deployment.primary_region);
    let client = ApiClient::new(config)?;
    let report = client.estimate_costs(&project.graph, &args.stack_type, region, &args.currency).await?;
    print_json(&report)
}

async fn run_compare(config: ApiConfig, args: &CompareArgs) -> Result<(), CliError> {
    let project = load_project(&args.project.project)?;
    let regions: Vec<String> = if args.regions.is_empty() {
        project.deployment.regions().into_iter().map(str::to_owned).collect()
    } else {
        args.regions.clone()
    };
    let client = ApiClient::new(config)?;
    let comparison = client.compare_regions(&project.graph, &args.stack_type, &regions, &args.currency).await?;
    if let Some((region, cost)) = comparison.cheapest() {
        info!(region, monthly = cost.monthly_cost, "cheapest region");
    }
    print_json(&comparison)
}

async fn run_generate(config: ApiConfig, args: &GenerateArgs) -> Result<(), CliError> {
    let project = load_project(&args.project.project)?;
    let client = ApiClient::new(config)?;
    let generated = client.generate_terraform(&project.graph).await?;
    let Some(out_dir) = &args.out_dir else {
        return print_json(&generated);
    };
    for name in generated.modules.keys() {
        check_module_name(name)?;
    }
    for (relative, contents) in generated.files() {
        write_file(&out_dir.join(relative), contents.as_bytes())?;
    }
    info!(dir = %out_dir.display(), modules = generated.modules.len(), "terraform written");
    Ok(())
}

async fn run_export(config: ApiConfig, args: &ExportArgs) -> Result<(), CliError> {
    let project = load_project(&args.project.project)?;
    let client = ApiClient::new(config)?;
    let archive = client.export_archive(&project.graph).await?;
    write_file(&args.output, &archive)?;
    info!(path = %args.output.display(), bytes = archive.len(), "archive written");
    Ok(())
}

// =============================================================================
// HELPERS
// =============================================================================

fn load_project(path: &str) -> Result<ProjectSnapshot, CliError> {
    let mut raw = String::new();
    if path == "-" {
        io::stdin()
            .read_to_string(&mut raw)
            .map_err(|source| CliError::Read { path: "stdin".to_owned(), source })?;
    } else {
        raw = fs::read_to_string(path).map_err(|source| CliError::Read { path: path.to_owned(), source })?;
    }
    Ok(ProjectSnapshot::from_json(&raw)?)
}

/// Module names become directories under `--out-dir`; only a single normal
/// path component is allowed.
fn check_module_name(name: &str) -> Result<(), CliError> {
    let mut components = Path::new(name).components();
    let single_normal = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if single_normal && !name.contains(['/', '\\']) {
        Ok(())
    } else {
        Err(CliError::UnsafeModuleName(name.to_owned()))
    }
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), CliError> {
    let err = |source| CliError::Write { path: path.display().to_string(), source };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(err)?;
    }
    fs::write(path, contents).map_err(err)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{rendered}").map_err(|source| CliError::Write { path: "stdout".to_owned(), source })
}
