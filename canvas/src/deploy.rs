//! Deployment strategies and their expansion into concrete instances.
//!
//! A resource is declared once on the canvas but may be realized as several
//! concrete instances: one per availability zone, one spanning all zones, or
//! exactly one. [`resolve`] performs that expansion for a single resource and
//! [`resolve_graph`] for a whole snapshot. Both are pure: the same resource,
//! zone list and base block always produce identical names and address
//! blocks.
//!
//! Address blocks for per-zone instances are carved from a base IPv4 block by
//! adding 8 bits to its prefix and numbering the subnets by zone ordinal, so
//! `10.0.0.0/16` across three zones yields `10.0.0.0/24`, `10.0.1.0/24`,
//! `10.0.2.0/24`.

#[cfg(test)]
#[path = "deploy_test.rs"]
mod deploy_test;

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::args::{ArgValue, Arguments};
use crate::catalog;
use crate::doc::{EntityId, GraphSnapshot, Resource};

/// Base block used when nothing more specific is available.
pub const DEFAULT_BASE_CIDR: &str = "10.0.0.0/16";

/// Bits added to the base prefix for each per-zone block.
pub const ZONE_SUBNET_BITS: u8 = 8;

/// Argument key carrying an address block.
pub const CIDR_ARGUMENT: &str = "cidr_block";

/// Argument key carrying the zone of a per-zone instance.
pub const ZONE_ARGUMENT: &str = "availability_zone";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeployError {
    #[error("invalid CIDR block: {0}")]
    InvalidCidr(String),
    #[error("cannot carve subnet {netnum} with {newbits} extra bits out of {base}")]
    AddressSpaceExhausted { base: String, newbits: u8, netnum: usize },
}

/// How one logical resource is realized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeploymentStrategy {
    #[default]
    Single,
    #[serde(alias = "per-az")]
    PerZone,
    #[serde(alias = "multi-az")]
    MultiZone,
    Regional,
}

impl DeploymentStrategy {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::PerZone => "per-zone",
            Self::MultiZone => "multi-zone",
            Self::Regional => "regional",
        }
    }
}

/// Per-resource deployment intent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeploymentDescriptor {
    #[serde(default)]
    pub strategy: DeploymentStrategy,
    /// Zones pinned for this resource. Empty means "use the active zones".
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub zones: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Allocate a distinct address block per zone instance.
    #[serde(default)]
    pub auto_cidr: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_cidr: Option<String>,
}

impl DeploymentDescriptor {
    /// Descriptor a freshly placed resource of `resource_type` starts with.
    #[must_use]
    pub fn for_resource_type(resource_type: &str) -> Self {
        Self {
            strategy: catalog::default_strategy(resource_type),
            auto_cidr: catalog::auto_cidr(resource_type),
            ..Self::default()
        }
    }
}

/// A secondary region the project replicates into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaRegion {
    pub region: String,
}

/// Project-wide deployment targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    pub primary_region: String,
    pub availability_zones: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replica_regions: Vec<ReplicaRegion>,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            primary_region: "us-east-1".into(),
            availability_zones: vec!["us-east-1a".into(), "us-east-1b".into()],
            replica_regions: Vec::new(),
        }
    }
}

impl DeploymentConfig {
    /// Primary region followed by every replica region.
    #[must_use]
    pub fn regions(&self) -> Vec<&str> {
        std::iter::once(self.primary_region.as_str())
            .chain(self.replica_regions.iter().map(|r| r.region.as_str()))
            .collect()
    }
}

// =============================================================
// IPv4 blocks
// =============================================================

/// An IPv4 network in CIDR notation. The address is always the network address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Cidr {
    network: Ipv4Addr,
    prefix: u8,
}

impl Ipv4Cidr {
    /// Build a block, masking `addr` down to its network address.
    pub fn new(addr: Ipv4Addr, prefix: u8) -> Result<Self, DeployError> {
        if prefix > 32 {
            return Err(DeployError::InvalidCidr(format!("{addr}/{prefix}")));
        }
        let network = Ipv4Addr::from(u32::from(addr) & Self::mask(prefix));
        Ok(Self { network, prefix })
    }

    #[must_use]
    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    #[must_use]
    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Sub-block number `netnum` after extending the prefix by `newbits`,
    /// matching Terraform's `cidrsubnet`.
    pub fn subnet(&self, newbits: u8, netnum: usize) -> Result<Self, DeployError> {
        let exhausted = || DeployError::AddressSpaceExhausted {
            base: self.to_string(),
            newbits,
            netnum,
        };
        let prefix = self.prefix.checked_add(newbits).filter(|p| *p <= 32).ok_or_else(exhausted)?;
        let netnum = u32::try_from(netnum).map_err(|_| exhausted())?;
        if newbits < 32 && netnum >> newbits != 0 {
            return Err(exhausted());
        }
        let shift = 32 - u32::from(prefix);
        let offset = netnum.checked_shl(shift).unwrap_or(0);
        Self::new(Ipv4Addr::from(u32::from(self.network) | offset), prefix)
    }

    fn mask(prefix: u8) -> u32 {
        if prefix == 0 { 0 } else { u32::MAX << (32 - u32::from(prefix)) }
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}

impl FromStr for Ipv4Cidr {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DeployError::InvalidCidr(s.to_owned());
        let (addr, prefix) = s.trim().split_once('/').ok_or_else(invalid)?;
        let addr = Ipv4Addr::from_str(addr).map_err(|_| invalid())?;
        let prefix = prefix.parse::<u8>().map_err(|_| invalid())?;
        Self::new(addr, prefix).map_err(|_| invalid())
    }
}

// =============================================================
// Resolution
// =============================================================

/// One concrete instance of a logical resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedInstance {
    pub resource_id: EntityId,
    pub resource_type: String,
    /// Stable key within the resource: the zone for per-zone instances,
    /// empty otherwise.
    pub instance_key: String,
    /// Generated name, zone-suffixed for per-zone instances.
    pub name: String,
    pub strategy: DeploymentStrategy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    /// Every zone a multi-zone instance spans.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub zones: Vec<String>,
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cidr_block: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    pub arguments: Arguments,
}

/// Last dash-separated segment of a zone name: `us-east-1a` → `1a`.
#[must_use]
pub fn short_zone(zone: &str) -> &str {
    zone.rsplit('-').next().unwrap_or(zone)
}

/// Expand one resource against `zones`.
///
/// `single` and `regional` yield the resource unchanged, `multi-zone` yields
/// it tagged with every zone, `per-zone` yields one instance per zone (zero
/// zones, zero instances). Pinned zones in the descriptor take precedence
/// over `zones`.
pub fn resolve(resource: &Resource, zones: &[String]) -> Result<Vec<ResolvedInstance>, DeployError> {
    resolve_with_fallback(resource, zones, None, None)
}

/// Expand every resource in `snapshot`, ordered by resource id.
///
/// Auto-allocated resources without a descriptor base carve from the
/// `cidr_block` of a network container in the same domain.
pub fn resolve_graph(snapshot: &GraphSnapshot, config: &DeploymentConfig) -> Result<Vec<ResolvedInstance>, DeployError> {
    let mut resources: Vec<&Resource> = snapshot.resources.iter().collect();
    resources.sort_by_key(|r| r.id);

    let mut out = Vec::new();
    for resource in resources {
        let container_cidr = resources_container_cidr(snapshot, resource);
        out.extend(resolve_with_fallback(
            resource,
            &config.availability_zones,
            container_cidr,
            Some(config.primary_region.as_str()),
        )?);
    }
    Ok(out)
}

fn resources_container_cidr<'a>(snapshot: &'a GraphSnapshot, resource: &Resource) -> Option<&'a str> {
    let mut containers: Vec<&Resource> = snapshot
        .resources
        .iter()
        .filter(|r| r.domain_id == resource.domain_id && r.id != resource.id)
        .filter(|r| catalog::is_network_container(&r.resource_type))
        .collect();
    containers.sort_by_key(|r| r.id);
    containers
        .into_iter()
        .find_map(|r| r.arguments.get(CIDR_ARGUMENT).and_then(ArgValue::as_str))
}

fn resolve_with_fallback(
    resource: &Resource,
    active_zones: &[String],
    container_cidr: Option<&str>,
    default_region: Option<&str>,
) -> Result<Vec<ResolvedInstance>, DeployError> {
    let deployment = &resource.deployment;
    let zones = if deployment.zones.is_empty() { active_zones } else { deployment.zones.as_slice() };
    let region = deployment.region.clone().or_else(|| default_region.map(str::to_owned));

    let base = ResolvedInstance {
        resource_id: resource.id,
        resource_type: resource.resource_type.clone(),
        instance_key: String::new(),
        name: resource.name.clone(),
        strategy: deployment.strategy,
        zone: None,
        zones: Vec::new(),
        index: 0,
        cidr_block: resource.arguments.get(CIDR_ARGUMENT).and_then(ArgValue::as_str).map(str::to_owned),
        region,
        arguments: resource.arguments.clone(),
    };

    match deployment.strategy {
        DeploymentStrategy::Single | DeploymentStrategy::Regional => Ok(vec![base]),
        DeploymentStrategy::MultiZone => Ok(vec![ResolvedInstance { zones: zones.to_vec(), ..base }]),
        DeploymentStrategy::PerZone if zones.is_empty() => Ok(Vec::new()),
        DeploymentStrategy::PerZone => {
            let block = if deployment.auto_cidr {
                Some(base_block(resource, container_cidr)?)
            } else {
                None
            };
            let mut out = Vec::with_capacity(zones.len());
            for (index, zone) in zones.iter().enumerate() {
                let mut arguments = resource.arguments.clone();
                arguments.insert(ZONE_ARGUMENT.into(), ArgValue::from(zone.as_str()));
                let cidr_block = match block {
                    Some(block) => {
                        let cidr = block.subnet(ZONE_SUBNET_BITS, index)?.to_string();
                        arguments.insert(CIDR_ARGUMENT.into(), ArgValue::from(cidr.as_str()));
                        Some(cidr)
                    }
                    None => base.cidr_block.clone(),
                };
                out.push(ResolvedInstance {
                    instance_key: zone.clone(),
                    name: format!("{}_{}", resource.name, short_zone(zone)),
                    zone: Some(zone.clone()),
                    index,
                    cidr_block,
                    arguments,
                    ..base.clone()
                });
            }
            Ok(out)
        }
    }
}

/// Base block for auto allocation: descriptor, container, default.
///
/// A resource's own `cidr_block` is its base only when it is itself a
/// network container. A subnet's block is the output of allocation, not the
/// space it is carved from.
fn base_block(resource: &Resource, container_cidr: Option<&str>) -> Result<Ipv4Cidr, DeployError> {
    let own = if catalog::is_network_container(&resource.resource_type) {
        resource.arguments.get(CIDR_ARGUMENT).and_then(ArgValue::as_str)
    } else {
        None
    };
    let raw = resource
        .deployment
        .base_cidr
        .as_deref()
        .or(own)
        .or(container_cidr)
        .unwrap_or(DEFAULT_BASE_CIDR);
    raw.parse()
}
