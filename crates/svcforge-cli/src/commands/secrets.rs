//! `svcforge verify-secrets` command implementation.

use anyhow::Result;
use svcforge_runtime::{Orchestrator, RecordingTarget};

use super::{SecretsArgs, TargetArgs};

pub async fn run(target: &TargetArgs, secrets: &SecretsArgs) -> Result<()> {
    let spec = target.load_spec()?;
    let orchestrator = Orchestrator::new(secrets.open_store()?, RecordingTarget::new());

    match orchestrator.verify_secrets(&spec).await {
        Ok(()) => {
            println!(
                "All {} secret(s) present for stage {}.",
                spec.secrets.len(),
                spec.stage
            );
            for secret in &spec.secrets {
                println!("  {} ({} required key(s))", secret.name, secret.required_keys().count());
            }
            Ok(())
        }
        Err(report) => {
            eprintln!("{}", report);
            anyhow::bail!("Secret verification failed with {} error(s)", report.len())
        }
    }
}
