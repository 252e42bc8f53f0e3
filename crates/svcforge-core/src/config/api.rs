//! API front-end configuration.

use serde::{Deserialize, Serialize};

/// How callers authenticate against the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthenticationType {
    #[default]
    ApiKey,
    Iam,
    UserPool,
    Oidc,
}

/// Field-level request logging of the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldLogLevel {
    All,
    Error,
    None,
}

/// Routes one `(typeName, fieldName)` pair to a function by its logical name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolverSpec {
    pub type_name: String,
    pub field_name: String,
    /// Key into `ServiceSpec.functions`.
    pub data_source: String,
}

impl ResolverSpec {
    pub fn new(
        type_name: impl Into<String>,
        field_name: impl Into<String>,
        data_source: impl Into<String>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            field_name: field_name.into(),
            data_source: data_source.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSpec {
    /// Logical name; the provisioned name is `{service}-{stage}-{name}`.
    pub name: String,

    /// Path of the GraphQL schema document.
    pub schema: String,

    #[serde(default)]
    pub authentication: AuthenticationType,

    /// Lifetime of the generated API key (api_key authentication only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_expiry_days: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<FieldLogLevel>,

    #[serde(default)]
    pub xray_enabled: bool,

    #[serde(default)]
    pub resolvers: Vec<ResolverSpec>,
}
