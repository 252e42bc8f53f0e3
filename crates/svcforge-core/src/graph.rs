//! The provisioning output: named nodes plus wiring and grant edges.

use crate::config::{
    AuthenticationType, BillingMode, BundlingOptions, Capacity, FieldLogLevel, KeyAttribute,
    RemovalPolicy,
};
use crate::environment::ResolvedEnvironment;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Action the API front end needs on a compute node it routes to.
pub const INVOKE_ACTION: &str = "lambda:InvokeFunction";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableNode {
    pub name: String,
    pub arn: String,
    pub partition_key: KeyAttribute,
    pub sort_key: Option<KeyAttribute>,
    pub billing_mode: BillingMode,
    pub capacity: Option<Capacity>,
    pub removal_policy: RemovalPolicy,
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    Allow,
}

/// One least-privilege statement attached to a compute node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PolicyStatement {
    pub effect: Effect,
    pub actions: Vec<String>,
    pub resource_ids: Vec<String>,
}

impl PolicyStatement {
    pub fn allow(actions: Vec<String>, resource_ids: Vec<String>) -> Self {
        Self {
            effect: Effect::Allow,
            actions,
            resource_ids,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeNode {
    /// Logical key in `ServiceSpec.functions`.
    pub key: String,
    /// Provisioned name, `{service}-{stage}-{name}`.
    pub name: String,
    pub entry: String,
    pub handler: String,
    pub runtime: String,
    pub timeout_seconds: u32,
    pub memory_size: u32,
    pub log_retention_days: Option<u32>,
    pub bundling: BundlingOptions,
    pub environment: ResolvedEnvironment,
    pub tags: BTreeMap<String, String>,
    /// Attached by the permission granter.
    #[serde(default)]
    pub grants: Vec<PolicyStatement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiNode {
    pub name: String,
    pub schema: String,
    pub authentication: AuthenticationType,
    pub api_key_expiry_days: Option<u32>,
    pub log_level: Option<FieldLogLevel>,
    pub xray_enabled: bool,
    pub tags: BTreeMap<String, String>,
}

/// Routes one API field to exactly one compute node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApiEdge {
    pub type_name: String,
    pub field_name: String,
    /// Logical key of the target compute node.
    pub function: String,
    /// Provisioned name of the target compute node.
    pub compute_name: String,
    pub actions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GrantTarget {
    Table,
    Secret { name: String },
    External { resource_id: String },
}

/// Access from a compute node to a resource.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GrantEdge {
    /// Logical key of the compute node.
    pub function: String,
    pub target: GrantTarget,
    pub actions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGraph {
    pub table: TableNode,
    /// Compute nodes keyed by logical function name.
    pub compute: BTreeMap<String, ComputeNode>,
    pub api: ApiNode,
    pub api_edges: Vec<ApiEdge>,
    #[serde(default)]
    pub grant_edges: Vec<GrantEdge>,
}

impl ResourceGraph {
    pub fn compute_node(&self, key: &str) -> Option<&ComputeNode> {
        self.compute.get(key)
    }

    /// Grant edges leaving one compute node.
    pub fn grants_of<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a GrantEdge> + 'a {
        self.grant_edges.iter().filter(move |e| e.function == key)
    }

    /// Total number of nodes: table, compute units and API.
    pub fn node_count(&self) -> usize {
        self.compute.len() + 2
    }
}
