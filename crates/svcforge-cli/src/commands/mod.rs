//! CLI command implementations for svcforge.

pub mod check;
pub mod plan;
pub mod secrets;

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use svcforge_core::config::{DEFAULT_REGION, DEFAULT_STAGE};
use svcforge_core::{ServiceSpec, StageContext};
use svcforge_secrets::{FileSecretStore, SecretStore};

/// Which service, and where it is deployed.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Service configuration file (YAML, or TOML by extension)
    #[arg(long, short = 'c', default_value = "svcforge.yaml")]
    pub config: PathBuf,

    /// Stage identifier
    #[arg(long, env = "SVCFORGE_STAGE", default_value = DEFAULT_STAGE)]
    pub stage: String,

    /// Target region
    #[arg(long, env = "SVCFORGE_REGION", default_value = DEFAULT_REGION)]
    pub region: String,

    /// Target account id
    #[arg(long, env = "SVCFORGE_ACCOUNT")]
    pub account: Option<String>,
}

impl TargetArgs {
    pub fn stage_context(&self) -> StageContext {
        let context = StageContext::new(&self.stage).with_region(&self.region);
        match &self.account {
            Some(account) => context.with_account(account),
            None => context,
        }
    }

    pub fn load_spec(&self) -> Result<ServiceSpec> {
        ServiceSpec::from_file(&self.config, &self.stage_context())
            .with_context(|| format!("Failed to load {}", self.config.display()))
    }
}

/// Where secret documents are read from.
#[derive(Args, Debug, Clone)]
pub struct SecretsArgs {
    /// JSON file mapping secret names to key/value documents
    #[arg(long = "secrets-file", env = "SVCFORGE_SECRETS_FILE")]
    pub secrets_file: PathBuf,
}

impl SecretsArgs {
    pub fn open_store(&self) -> Result<Arc<dyn SecretStore>> {
        let store = FileSecretStore::open(&self.secrets_file)
            .with_context(|| format!("Failed to open {}", self.secrets_file.display()))?;
        Ok(Arc::new(store))
    }
}
