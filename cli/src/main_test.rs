use canvas::args::Arguments;
use canvas::deploy::{DeploymentConfig, DeploymentDescriptor};
use canvas::doc::{Connection, Domain, DomainType, EntityRef, GraphSnapshot, Resource};
use serde_json::json;
use uuid::Uuid;

use super::*;

fn resource(domain: &Domain, resource_type: &str) -> Resource {
    Resource {
        id: Uuid::new_v4(),
        resource_type: resource_type.to_owned(),
        domain_id: domain.id,
        name: resource_type.trim_start_matches("aws_").to_owned(),
        arguments: Arguments::new(),
        deployment: DeploymentDescriptor::for_resource_type(resource_type),
        position: None,
    }
}

#[test]
fn resolve_parses_zone_list() {
    let cli = Cli::try_parse_from(["stackboard", "resolve", "project.json", "--zones", "eu-west-1a,eu-west-1b"]).unwrap();
    let Command::Resolve(args) = cli.command else {
        panic!("expected resolve");
    };
    assert_eq!(args.project.project, "project.json");
    assert_eq!(args.zones, ["eu-west-1a", "eu-west-1b"]);
}

#[test]
fn flags_build_api_config() {
    let cli = Cli::try_parse_from([
        "stackboard",
        "--api-url",
        "http://example.test:9000",
        "--retry-attempts",
        "5",
        "services",
    ])
    .unwrap();
    let config = cli.api_config();
    assert_eq!(config.base_url, "http://example.test:9000");
    assert_eq!(config.retry.attempts, 5);
}

#[test]
fn estimate_requires_stack_type() {
    assert!(Cli::try_parse_from(["stackboard", "estimate", "project.json"]).is_err());
}

#[test]
fn check_reports_repairs_and_no_violations() {
    let mut domain = Domain::new("app", DomainType::Compute);
    let web = resource(&domain, "aws_instance");
    domain.resource_ids.push(web.id);
    let ghost_domain = Domain::new("ghost", DomainType::Data);
    let orphan = resource(&ghost_domain, "aws_db_instance");
    let dangling = Connection::between(EntityRef::resource(web.id), EntityRef::resource(orphan.id));

    let project = ProjectSnapshot {
        graph: GraphSnapshot { domains: vec![domain], resources: vec![web, orphan], connections: vec![dangling] },
        deployment: DeploymentConfig::default(),
    };
    let (doc, summary) = check_project(project);
    assert!(doc.check_integrity().is_empty());
    assert_eq!(summary["resources"], json!(1));
    assert_eq!(summary["dropped_resources"], json!(1));
    assert_eq!(summary["dropped_connections"], json!(1));
    assert_eq!(summary["violations"], json!([]));
}

#[test]
fn api_errors_carry_their_code() {
    let err = CliError::from(ApiError::Timeout("30s".into()));
    assert_eq!(err.to_string(), "E_TIMEOUT: request timed out: 30s");
}

#[test]
fn module_names_must_stay_inside_out_dir() {
    for name in ["network", "app-tier", "data_1"] {
        assert!(check_module_name(name).is_ok(), "{name}");
    }
    for name in ["", ".", "..", "../../../tmp/escape", "/etc", "a/b", "nested\\dir", "ok/.."] {
        assert!(
            matches!(check_module_name(name), Err(CliError::UnsafeModuleName(ref n)) if n == name),
            "{name}"
        );
    }
}
