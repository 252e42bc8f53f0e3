use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{SecretsArgs, TargetArgs, plan::OutputFormat};

#[derive(Parser, Debug)]
#[command(name = "svcforge", version, about = "svcforge CLI")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a service configuration without contacting the secret store.
    Check {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Check that every declared secret exists with all required keys.
    VerifySecrets {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        secrets: SecretsArgs,
    },

    /// Run a full provisioning pass against a dry-run target and print the result.
    Plan {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        secrets: SecretsArgs,

        /// Output format for the resource graph
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Check { target } => commands::check::run(&target)?,
        Command::VerifySecrets { target, secrets } => {
            commands::secrets::run(&target, &secrets).await?
        }
        Command::Plan {
            target,
            secrets,
            format,
        } => commands::plan::run(&target, &secrets, format).await?,
    }

    Ok(())
}
