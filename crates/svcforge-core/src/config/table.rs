//! Keyed storage table configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Attribute type of a key column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AttributeType {
    String,
    Number,
    Binary,
}

/// A key attribute: name plus type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyAttribute {
    pub name: String,
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
}

/// How the table is billed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingMode {
    #[default]
    PayPerRequest,
    Provisioned,
}

/// Provisioned read/write capacity units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capacity {
    pub read: u32,
    pub write: u32,
}

/// What happens to the table when the service is torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RemovalPolicy {
    Destroy,
    #[default]
    Retain,
}

impl FromStr for RemovalPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("destroy") {
            Ok(RemovalPolicy::Destroy)
        } else if s.eq_ignore_ascii_case("retain") {
            Ok(RemovalPolicy::Retain)
        } else {
            Err(s.to_string())
        }
    }
}

impl fmt::Display for RemovalPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemovalPolicy::Destroy => write!(f, "DESTROY"),
            RemovalPolicy::Retain => write!(f, "RETAIN"),
        }
    }
}

/// Table configuration. Exactly one per service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSpec {
    /// Logical name; the provisioned name is `{service}-{stage}-{logicalName}`.
    pub logical_name: String,

    pub partition_key: KeyAttribute,

    #[serde(default)]
    pub sort_key: Option<KeyAttribute>,

    #[serde(default)]
    pub billing_mode: BillingMode,

    /// Only meaningful with `PROVISIONED` billing.
    #[serde(default)]
    pub capacity: Option<Capacity>,

    /// Raw removal policy, parsed during validation so that a bad value is
    /// reported alongside every other problem in the document.
    #[serde(default)]
    pub removal_policy: Option<String>,
}

impl TableSpec {
    /// Parse the removal policy. Absent means `RETAIN`.
    pub fn parsed_removal_policy(&self) -> Result<RemovalPolicy, String> {
        match &self.removal_policy {
            Some(raw) => raw.parse(),
            None => Ok(RemovalPolicy::default()),
        }
    }
}
