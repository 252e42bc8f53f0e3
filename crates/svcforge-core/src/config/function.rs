//! Compute function configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Runtime used when neither the function nor the template sets one.
pub const DEFAULT_RUNTIME: &str = "nodejs20.x";
/// Timeout in seconds used when neither the function nor the template sets one.
pub const DEFAULT_TIMEOUT_SECONDS: u32 = 30;
/// Memory size in MB used when neither the function nor the template sets one.
pub const DEFAULT_MEMORY_SIZE: u32 = 256;
/// Handler export used when neither the function nor the template sets one.
pub const DEFAULT_HANDLER: &str = "handler";

/// An access-grant request attached to a function.
///
/// A resource id of `${table}` refers to the service's own table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub actions: Vec<String>,
    pub resource_ids: Vec<String>,
}

impl Permission {
    pub fn new(
        actions: impl IntoIterator<Item = impl Into<String>>,
        resource_ids: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            actions: actions.into_iter().map(Into::into).collect(),
            resource_ids: resource_ids.into_iter().map(Into::into).collect(),
        }
    }
}

/// Packaging options. Each field is merged independently.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundlingOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minify: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_map: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_modules: Option<Vec<String>>,
}

/// Configuration of one compute function.
///
/// Every field may be left unset and inherited from the service's
/// `defaultFunction` template; see [`super::ConfigMerger`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionSpec {
    /// Name fragment for the provisioned unit. Defaults to the map key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Source entry point of the function body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,

    /// Exported handler within the entry point.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_size: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_retention_days: Option<u32>,

    /// Literal environment variables.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,

    /// Explicit grants for this function.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<Permission>>,

    /// Secret documents this function draws from. Unset means all declared secrets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secrets: Option<Vec<String>>,

    #[serde(default)]
    pub bundling: BundlingOptions,
}

impl FunctionSpec {
    /// Name fragment of the provisioned unit for the function stored under `key`.
    pub fn unit_name<'a>(&'a self, key: &'a str) -> &'a str {
        self.name.as_deref().unwrap_or(key)
    }

    pub fn runtime_or_default(&self) -> &str {
        self.runtime.as_deref().unwrap_or(DEFAULT_RUNTIME)
    }

    pub fn handler_or_default(&self) -> &str {
        self.handler.as_deref().unwrap_or(DEFAULT_HANDLER)
    }

    pub fn timeout_or_default(&self) -> u32 {
        self.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS)
    }

    pub fn memory_or_default(&self) -> u32 {
        self.memory_size.unwrap_or(DEFAULT_MEMORY_SIZE)
    }

    /// Declared permissions, empty when none were requested.
    pub fn permissions(&self) -> &[Permission] {
        self.permissions.as_deref().unwrap_or(&[])
    }
}
