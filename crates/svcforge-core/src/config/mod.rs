//! Service configuration types for svcforge.
//!
//! A single `ServiceSpec` document describes one deployable service: the keyed
//! table, the compute functions, the API front end that routes to them, and the
//! secret documents their environments draw from.
//!
//! # Configuration Files
//!
//! - **service.yaml** / **service.yml**: YAML form (preferred)
//! - **service.toml**: TOML form, same shape
//!
//! Both forms may use `${stage}`, `${region}`, `${account}` and `${service}`
//! placeholders, which are substituted from the [`StageContext`] before the
//! document is parsed.

pub mod api;
pub mod function;
pub mod merge;
pub mod secret;
pub mod table;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub use api::{ApiSpec, AuthenticationType, FieldLogLevel, ResolverSpec};
pub use function::{BundlingOptions, FunctionSpec, Permission};
pub use merge::ConfigMerger;
pub use secret::{SecretSpec, SecretVariable, VariableSource};
pub use table::{AttributeType, BillingMode, Capacity, KeyAttribute, RemovalPolicy, TableSpec};

/// Stage used when none is supplied by the invoking tool.
pub const DEFAULT_STAGE: &str = "dev";

/// Region used when none is supplied by the invoking tool.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Deployment target parameters supplied by the invoking tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageContext {
    pub stage: String,
    pub region: String,
    pub account: Option<String>,
}

impl StageContext {
    /// Create a context for the given stage with the default region and no account.
    pub fn new(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            region: DEFAULT_REGION.to_string(),
            account: None,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }
}

impl Default for StageContext {
    fn default() -> Self {
        Self::new(DEFAULT_STAGE)
    }
}

/// Complete service description for one deployment target.
///
/// Built once per provisioning run and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSpec {
    /// Service name, first component of every resource name.
    pub service_name: String,

    /// Stage identifier (dev, staging, prod, ...). Overridden by the stage context on load.
    #[serde(default)]
    pub stage: String,

    /// Target region. Overridden by the stage context on load.
    #[serde(default)]
    pub region: String,

    /// Target account id. Overridden by the stage context on load.
    #[serde(default)]
    pub account: String,

    /// Tags applied to every provisioned resource.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,

    /// The keyed storage table.
    pub table: TableSpec,

    /// API front end and its resolver wiring.
    pub api: ApiSpec,

    /// Compute functions keyed by logical name.
    #[serde(default)]
    pub functions: BTreeMap<String, FunctionSpec>,

    /// Secret documents the functions draw environment values from.
    #[serde(default)]
    pub secrets: Vec<SecretSpec>,

    /// Template whose fields fill in anything a function leaves unset.
    #[serde(default)]
    pub default_function: Option<FunctionSpec>,
}

impl ServiceSpec {
    /// Load a spec from a YAML or TOML file, chosen by extension.
    pub fn from_file(path: impl AsRef<Path>, context: &StageContext) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let is_toml = path.extension().map(|e| e == "toml").unwrap_or(false);
        if is_toml {
            Self::from_toml(&content, context)
        } else {
            Self::from_yaml(&content, context)
        }
    }

    /// Parse a spec from YAML content.
    pub fn from_yaml(content: &str, context: &StageContext) -> Result<Self, ConfigError> {
        let account = required_account(context)?;
        let service_name = peek_service_name_yaml(content)?;
        if let Some(name) = &service_name {
            check_identifier("serviceName", name)?;
        }
        let rendered = interpolate(content, context, account, service_name.as_deref());
        let spec: Self = serde_yaml::from_str(&rendered)?;
        Ok(spec.bind_context(context, account))
    }

    /// Parse a spec from TOML content.
    pub fn from_toml(content: &str, context: &StageContext) -> Result<Self, ConfigError> {
        let account = required_account(context)?;
        let service_name = peek_service_name_toml(content)?;
        if let Some(name) = &service_name {
            check_identifier("serviceName", name)?;
        }
        let rendered = interpolate(content, context, account, service_name.as_deref());
        let spec: Self = toml::from_str(&rendered)?;
        Ok(spec.bind_context(context, account))
    }

    fn bind_context(mut self, context: &StageContext, account: &str) -> Self {
        self.stage = context.stage.clone();
        self.region = context.region.clone();
        self.account = account.to_string();
        self
    }

    /// Deterministic name of a resource: `{serviceName}-{stage}-{kind}`.
    pub fn resource_name(&self, kind: &str) -> String {
        format!("{}-{}-{}", self.service_name, self.stage, kind)
    }

    /// Provisioned name of the table.
    pub fn table_name(&self) -> String {
        self.resource_name(&self.table.logical_name)
    }

    /// Identifier of the provisioned table, used as a grant resource.
    pub fn table_arn(&self) -> String {
        format!(
            "arn:aws:dynamodb:{}:{}:table/{}",
            self.region,
            self.account,
            self.table_name()
        )
    }

    /// Identifier of a secret document, scoped to that one secret name.
    ///
    /// The store appends `-` and six random characters to every secret id;
    /// `??????` matches exactly that suffix, so `dev/app` never covers
    /// `dev/app-admin`.
    pub fn secret_arn(&self, secret_name: &str) -> String {
        format!(
            "arn:aws:secretsmanager:{}:{}:secret:{}-??????",
            self.region, self.account, secret_name
        )
    }

    /// Look up a declared secret by name.
    pub fn get_secret(&self, name: &str) -> Option<&SecretSpec> {
        self.secrets.iter().find(|s| s.name == name)
    }
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("account id is required: pass --account or set SVCFORGE_ACCOUNT")]
    MissingAccount,

    #[error("invalid {field} '{value}': only letters, digits, '-' and '_' are allowed")]
    InvalidStage { field: &'static str, value: String },
}

/// Values substituted into the raw document must not be able to change its
/// structure.
fn check_identifier(field: &'static str, value: &str) -> Result<(), ConfigError> {
    let valid = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidStage {
            field,
            value: value.to_string(),
        })
    }
}

fn required_account(context: &StageContext) -> Result<&str, ConfigError> {
    let account = match context.account.as_deref() {
        Some(account) if !account.trim().is_empty() => account,
        _ => return Err(ConfigError::MissingAccount),
    };
    check_identifier("stage", &context.stage)?;
    check_identifier("region", &context.region)?;
    check_identifier("account", account)?;
    Ok(account)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceNameOnly {
    #[serde(default)]
    service_name: Option<String>,
}

// `${service}` may appear anywhere, so the name is read before substitution.
fn peek_service_name_yaml(content: &str) -> Result<Option<String>, ConfigError> {
    let value: serde_yaml::Value = serde_yaml::from_str(content)?;
    let peek: ServiceNameOnly = serde_yaml::from_value(value)?;
    Ok(peek.service_name)
}

fn peek_service_name_toml(content: &str) -> Result<Option<String>, ConfigError> {
    let value: toml::Value = toml::from_str(content)?;
    Ok(value
        .get("serviceName")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string()))
}

/// Substitute known `${...}` placeholders; unknown ones are left as-is.
pub fn interpolate(
    content: &str,
    context: &StageContext,
    account: &str,
    service_name: Option<&str>,
) -> String {
    let Ok(pattern) = Regex::new(r"\$\{([A-Za-z_]+)\}") else {
        return content.to_string();
    };

    pattern
        .replace_all(content, |caps: &regex::Captures<'_>| match &caps[1] {
            "stage" => context.stage.clone(),
            "region" => context.region.clone(),
            "account" => account.to_string(),
            "service" => match service_name {
                Some(name) => name.to_string(),
                None => caps[0].to_string(),
            },
            _ => caps[0].to_string(),
        })
        .into_owned()
}
