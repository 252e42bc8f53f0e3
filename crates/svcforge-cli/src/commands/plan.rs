//! `svcforge plan` command implementation.
//!
//! Runs every provisioning phase against a recording target, so nothing is
//! created, and prints the resulting graph and handles.

use anyhow::{Context, Result};
use clap::ValueEnum;
use svcforge_runtime::{Orchestrator, ProvisionOutcome, RecordingTarget};

use super::{SecretsArgs, TargetArgs};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Yaml,
}

pub fn render(outcome: &ProvisionOutcome, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(outcome).context("Failed to render plan as JSON")
        }
        OutputFormat::Yaml => {
            serde_yaml::to_string(outcome).context("Failed to render plan as YAML")
        }
    }
}

pub async fn plan(target: &TargetArgs, secrets: &SecretsArgs) -> Result<ProvisionOutcome> {
    let spec = target.load_spec()?;
    let orchestrator = Orchestrator::new(secrets.open_store()?, RecordingTarget::new());

    let outcome = match orchestrator.run(&spec).await {
        Ok(outcome) => outcome,
        Err(report) => {
            eprintln!("{}", report);
            anyhow::bail!("Provisioning plan failed with {} error(s)", report.len());
        }
    };

    tracing::info!(
        calls = orchestrator.target().call_count(),
        "Dry run recorded target calls"
    );
    Ok(outcome)
}

pub async fn run(target: &TargetArgs, secrets: &SecretsArgs, format: OutputFormat) -> Result<()> {
    let outcome = plan(target, secrets).await?;
    println!("{}", render(&outcome, format)?);
    Ok(())
}
