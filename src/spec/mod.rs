// src/spec/mod.rs

//! Declarative specs for queries, labels and packs
//!
//! These are the shapes operators write (usually as YAML documents, see
//! [`document`]) and the shapes the reconciler reads back out of the
//! database. A spec read back after an apply compares equal to the spec
//! that was applied.
//!
//! # Example pack document
//!
//! ```yaml
//! apiVersion: v1
//! kind: pack
//! spec:
//!   name: osquery_monitoring
//!   description: Fleet health
//!   queries:
//!     - query: osquery_version
//!       name: osquery_version_differential
//!       interval: 7200
//!     - query: osquery_schedule
//!       name: osquery_schedule_snapshot
//!       interval: 86400
//!       snapshot: true
//!       shard: 10
//!   targets:
//!     labels:
//!       - All Hosts
//! ```

pub mod document;

pub use document::{SpecDocument, SpecGroup, SpecKind, API_VERSION};

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// A named query body that packs schedule by name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySpec {
    pub name: String,

    #[serde(default)]
    pub description: String,

    pub query: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    /// Minimum agent version able to run the query
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_version: Option<String>,
}

impl QuerySpec {
    pub fn validate(&self) -> Result<()> {
        require_name("query", &self.name)?;
        if self.query.trim().is_empty() {
            return Err(Error::InvalidSpec(format!(
                "query '{}' has an empty query body",
                self.name
            )));
        }
        Ok(())
    }
}

/// How a label's host membership is decided
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelMembership {
    /// Hosts evaluate the label query and report a boolean
    #[default]
    Dynamic,
    /// Membership is fed in from outside; targeting treats it like a dynamic result
    Manual,
}

impl LabelMembership {
    pub fn as_str(&self) -> &str {
        match self {
            LabelMembership::Dynamic => "dynamic",
            LabelMembership::Manual => "manual",
        }
    }
}

impl FromStr for LabelMembership {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "dynamic" => Ok(LabelMembership::Dynamic),
            "manual" => Ok(LabelMembership::Manual),
            _ => Err(format!("Invalid label membership type: {}", s)),
        }
    }
}

fn is_dynamic(membership: &LabelMembership) -> bool {
    *membership == LabelMembership::Dynamic
}

/// A named host predicate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSpec {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub query: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    #[serde(
        default,
        rename = "label_membership_type",
        skip_serializing_if = "is_dynamic"
    )]
    pub membership: LabelMembership,
}

impl LabelSpec {
    pub fn validate(&self) -> Result<()> {
        require_name("label", &self.name)?;
        if self.membership == LabelMembership::Dynamic && self.query.trim().is_empty() {
            return Err(Error::InvalidSpec(format!(
                "dynamic label '{}' needs a query",
                self.name
            )));
        }
        Ok(())
    }
}

/// The declarative form of a pack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackSpec {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    /// Scheduled queries, in the order they were declared
    #[serde(default)]
    pub queries: Vec<PackSpecQuery>,

    #[serde(default)]
    pub targets: PackSpecTargets,
}

impl PackSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            platform: None,
            queries: Vec::new(),
            targets: PackSpecTargets::default(),
        }
    }

    /// Check everything that can be checked without the database
    pub fn validate(&self) -> Result<()> {
        require_name("pack", &self.name)?;

        for q in &self.queries {
            if q.query_name.trim().is_empty() {
                return Err(Error::InvalidSpec(format!(
                    "pack '{}' has a scheduled query without a query reference",
                    self.name
                )));
            }
            if q.name.trim().is_empty() {
                return Err(Error::InvalidSpec(format!(
                    "pack '{}' schedules query '{}' without a name",
                    self.name, q.query_name
                )));
            }
            if let Some(shard) = q.shard {
                if shard > 100 {
                    return Err(Error::InvalidSpec(format!(
                        "scheduled query '{}' in pack '{}' has shard {} (must be 0-100)",
                        q.name, self.name, shard
                    )));
                }
            }
        }

        check_unique(&self.name, "label", &self.targets.labels)?;
        check_unique(&self.name, "host", &self.targets.hosts)?;
        Ok(())
    }
}

/// One scheduled query entry inside a pack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackSpecQuery {
    /// Name of the referenced query
    #[serde(rename = "query")]
    pub query_name: String,

    /// Display name of this schedule entry within the pack
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Seconds between runs
    #[serde(default)]
    pub interval: u32,

    #[serde(default)]
    pub snapshot: bool,

    /// Whether hosts report rows that disappear; unspecified means true
    #[serde(default = "default_removed")]
    pub removed: bool,

    /// Percentage of hosts (0-100) that run the query; unset means all
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shard: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

fn default_removed() -> bool {
    true
}

impl PackSpecQuery {
    pub fn new(query_name: impl Into<String>, name: impl Into<String>, interval: u32) -> Self {
        Self {
            query_name: query_name.into(),
            name: name.into(),
            description: String::new(),
            interval,
            snapshot: false,
            removed: default_removed(),
            shard: None,
            platform: None,
            version: None,
        }
    }
}

/// Who receives a pack
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackSpecTargets {
    /// Label names; every host currently matching one of them is targeted
    #[serde(default)]
    pub labels: Vec<String>,

    /// Hostnames targeted explicitly
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hosts: Vec<String>,
}

/// Kind of a pack target row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Label,
    Host,
}

impl TargetKind {
    pub fn as_str(&self) -> &str {
        match self {
            TargetKind::Label => "label",
            TargetKind::Host => "host",
        }
    }
}

impl FromStr for TargetKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "label" => Ok(TargetKind::Label),
            "host" => Ok(TargetKind::Host),
            _ => Err(format!("Invalid target type: {}", s)),
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn require_name(kind: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidSpec(format!("{kind} name must not be empty")));
    }
    Ok(())
}

fn check_unique(pack: &str, kind: &str, names: &[String]) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(Error::InvalidSpec(format!(
                "pack '{pack}' targets {kind} '{name}' more than once"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduled_query_defaults() {
        let q: PackSpecQuery = serde_yaml::from_str("query: uptime\nname: uptime_hourly\n").unwrap();
        assert_eq!(q.query_name, "uptime");
        assert_eq!(q.interval, 0);
        assert!(!q.snapshot);
        assert!(q.removed);
        assert_eq!(q.shard, None);
    }

    #[test]
    fn test_pack_validate_rejects_bad_shard() {
        let mut pack = PackSpec::new("base");
        let mut q = PackSpecQuery::new("uptime", "uptime", 60);
        q.shard = Some(150);
        pack.queries.push(q);

        let err = pack.validate().unwrap_err();
        assert!(matches!(err, Error::InvalidSpec(_)));
    }

    #[test]
    fn test_pack_validate_rejects_duplicate_targets() {
        let mut pack = PackSpec::new("base");
        pack.targets.labels = vec!["All Hosts".to_string(), "All Hosts".to_string()];
        assert!(pack.validate().is_err());
    }

    #[test]
    fn test_pack_validate_rejects_empty_name() {
        assert!(PackSpec::new("  ").validate().is_err());
    }

    #[test]
    fn test_label_validate() {
        let label = LabelSpec {
            name: "macOS".to_string(),
            description: String::new(),
            query: String::new(),
            platform: None,
            membership: LabelMembership::Dynamic,
        };
        assert!(label.validate().is_err());

        let manual = LabelSpec {
            membership: LabelMembership::Manual,
            ..label
        };
        assert!(manual.validate().is_ok());
    }

    #[test]
    fn test_target_kind_parse() {
        assert_eq!("label".parse::<TargetKind>().unwrap(), TargetKind::Label);
        assert_eq!("host".parse::<TargetKind>().unwrap(), TargetKind::Host);
        assert!("team".parse::<TargetKind>().is_err());
    }
}
