//! Resource argument values and schema checks.
//!
//! Argument maps are open-ended: the set of keys and their types depends on
//! the resource type, and the authoritative schema is fetched from the
//! registry service at runtime. Values are therefore a small tagged variant
//! ([`ArgValue`]) that round-trips through JSON unchanged, and checks against
//! a fetched [`ArgumentSchema`] list happen at the edge (forms, imports)
//! rather than in the type system.

#[cfg(test)]
#[path = "args_test.rs"]
mod args_test;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Argument map of a resource, ordered by key for stable snapshots.
pub type Arguments = BTreeMap<String, ArgValue>;

/// A single argument value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<ArgValue>),
    Map(BTreeMap<String, ArgValue>),
}

impl ArgValue {
    /// Short tag used in diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    /// Whether this value is acceptable for a schema type.
    #[must_use]
    pub fn matches(&self, ty: ArgType) -> bool {
        matches!(
            (ty, self),
            (ArgType::Any, _)
                | (ArgType::Bool, Self::Bool(_))
                | (ArgType::Number, Self::Number(_))
                | (ArgType::String, Self::String(_))
                | (ArgType::List, Self::List(_))
                | (ArgType::Map, Self::Map(_))
        )
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f64> for ArgValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Declared type of an argument in a registry schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgType {
    String,
    Number,
    #[serde(alias = "boolean")]
    Bool,
    #[serde(alias = "array")]
    List,
    #[serde(alias = "object")]
    Map,
    /// Anything the client does not model; accepts every value.
    #[serde(other)]
    Any,
}

/// Schema entry for one argument of a resource type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgumentSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub arg_type: ArgType,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<ArgValue>,
    #[serde(default)]
    pub description: String,
}

/// One finding from checking an argument map against a schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArgIssue {
    #[error("missing required argument `{name}`")]
    MissingRequired { name: String },
    #[error("argument `{name}` expects {expected:?}, found {found}")]
    TypeMismatch { name: String, expected: ArgType, found: &'static str },
    #[error("argument `{name}` is not part of the schema")]
    Unknown { name: String },
}

/// Check `args` against `schema`. Findings come back in schema order, then
/// unknown keys in key order.
#[must_use]
pub fn validate_arguments(args: &Arguments, schema: &[ArgumentSchema]) -> Vec<ArgIssue> {
    let mut issues = Vec::new();
    for entry in schema {
        match args.get(&entry.name) {
            None if entry.required => issues.push(ArgIssue::MissingRequired { name: entry.name.clone() }),
            None => {}
            Some(value) if !value.matches(entry.arg_type) => issues.push(ArgIssue::TypeMismatch {
                name: entry.name.clone(),
                expected: entry.arg_type,
                found: value.type_name(),
            }),
            Some(_) => {}
        }
    }
    for key in args.keys() {
        if !schema.iter().any(|entry| &entry.name == key) {
            issues.push(ArgIssue::Unknown { name: key.clone() });
        }
    }
    issues
}

/// Default argument map derived from the schema entries that declare a default.
#[must_use]
pub fn defaults_from_schema(schema: &[ArgumentSchema]) -> Arguments {
    schema
        .iter()
        .filter_map(|entry| entry.default.clone().map(|value| (entry.name.clone(), value)))
        .collect()
}
