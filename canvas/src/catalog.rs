//! Static per-resource-type tables.
//!
//! These are the client-side defaults used when a service is dropped from the
//! palette: which domain it belongs in, how it deploys, and which arguments it
//! starts with. The registry service remains authoritative for argument
//! schemas; nothing here is a validation rule.

#[cfg(test)]
#[path = "catalog_test.rs"]
mod catalog_test;

use crate::args::{ArgValue, Arguments};
use crate::deploy::DeploymentStrategy;
use crate::doc::DomainType;

/// Semantic domain a resource type is placed into on drop.
#[must_use]
pub fn domain_type_for(resource_type: &str) -> Option<DomainType> {
    let kind = match resource_type {
        "aws_vpc" | "aws_subnet" | "aws_internet_gateway" | "aws_nat_gateway" | "aws_route_table"
        | "aws_security_group" | "aws_eip" => DomainType::Networking,
        "aws_instance" | "aws_launch_template" | "aws_autoscaling_group" | "aws_lb" | "aws_alb"
        | "aws_lb_target_group" | "aws_ecs_cluster" | "aws_ecs_service" => DomainType::Compute,
        "aws_lambda_function" | "aws_api_gateway_rest_api" | "aws_apigatewayv2_api" => DomainType::Serverless,
        "aws_db_instance" | "aws_rds_cluster" | "aws_dynamodb_table" | "aws_elasticache_cluster" => DomainType::Data,
        "aws_s3_bucket" | "aws_efs_file_system" | "aws_ebs_volume" => DomainType::Storage,
        "aws_sqs_queue" | "aws_sns_topic" | "aws_kinesis_stream" => DomainType::Messaging,
        "aws_iam_role" | "aws_iam_policy" | "aws_kms_key" => DomainType::Identity,
        "aws_cloudwatch_log_group" | "aws_cloudwatch_metric_alarm" => DomainType::Observability,
        "aws_cloudfront_distribution" | "aws_route53_zone" | "aws_route53_record" => DomainType::Edge,
        _ => return None,
    };
    Some(kind)
}

/// Deployment strategy a fresh resource of this type starts with.
#[must_use]
pub fn default_strategy(resource_type: &str) -> DeploymentStrategy {
    match resource_type {
        "aws_subnet" | "aws_nat_gateway" | "aws_eip" => DeploymentStrategy::PerZone,
        "aws_lb" | "aws_alb" | "aws_rds_cluster" | "aws_autoscaling_group" | "aws_elasticache_cluster" => {
            DeploymentStrategy::MultiZone
        }
        "aws_s3_bucket" | "aws_dynamodb_table" | "aws_lambda_function" | "aws_sqs_queue" | "aws_sns_topic" => {
            DeploymentStrategy::Regional
        }
        _ => DeploymentStrategy::Single,
    }
}

/// Whether per-zone instances of this type get their own address block.
#[must_use]
pub fn auto_cidr(resource_type: &str) -> bool {
    resource_type == "aws_subnet"
}

/// Whether this type owns the address space other resources in its domain carve from.
#[must_use]
pub fn is_network_container(resource_type: &str) -> bool {
    resource_type == "aws_vpc"
}

/// Starting arguments for a fresh resource of this type.
#[must_use]
pub fn default_arguments(resource_type: &str) -> Arguments {
    let pairs: Vec<(&str, ArgValue)> = match resource_type {
        "aws_vpc" => vec![
            ("cidr_block", "10.0.0.0/16".into()),
            ("enable_dns_hostnames", true.into()),
            ("enable_dns_support", true.into()),
        ],
        "aws_subnet" => vec![("map_public_ip_on_launch", false.into())],
        "aws_security_group" => vec![("description", "Managed security group".into())],
        "aws_instance" => vec![("instance_type", "t3.micro".into())],
        "aws_lb" | "aws_alb" => vec![("load_balancer_type", "application".into()), ("internal", false.into())],
        "aws_lambda_function" => vec![
            ("runtime", "python3.12".into()),
            ("handler", "index.handler".into()),
            ("memory_size", 128.0.into()),
            ("timeout", 30.0.into()),
        ],
        "aws_db_instance" => vec![
            ("engine", "postgres".into()),
            ("instance_class", "db.t3.micro".into()),
            ("allocated_storage", 20.0.into()),
        ],
        "aws_dynamodb_table" => vec![("billing_mode", "PAY_PER_REQUEST".into())],
        "aws_sqs_queue" => vec![("visibility_timeout_seconds", 30.0.into())],
        "aws_cloudwatch_log_group" => vec![("retention_in_days", 14.0.into())],
        _ => Vec::new(),
    };
    pairs.into_iter().map(|(k, v)| (k.to_owned(), v)).collect()
}

/// Display name for a fresh resource: the type without its provider prefix.
#[must_use]
pub fn default_name(resource_type: &str) -> String {
    resource_type
        .split_once('_')
        .map_or(resource_type, |(_, rest)| rest)
        .to_owned()
}
