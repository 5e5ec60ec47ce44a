//! Reverse Replication CLI
//!
//! Provisions a reverse replication pipeline from a JSON job request:
//! - `create`: runs the full provisioning flow
//! - `validate`: normalizes the request without provisioning anything
//!
//! Resource managers are in-memory, so every run is a dry run that prints
//! the resulting job and the equivalent `gcloud` launch commands.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use reverse_repl_application::{CreateReverseReplicationResponse, CreateReverseReplicationUseCase};
use reverse_repl_domain::{JobRequest, RunId};
use reverse_repl_infrastructure::{InMemoryResourceManagers, TracingConfig, init_tracing};
use reverse_repl_shared::config::ConfigLoader;

#[derive(Parser)]
#[command(name = "rrctl")]
#[command(about = "Provision Spanner to source database reverse replication", long_about = None)]
#[command(version)]
struct Cli {
    /// Optional .env file loaded before the process environment
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    /// Leader location reported for every instance in dry-run mode
    #[arg(long, default_value = "us-central1", global = true)]
    location: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision the pipeline described by a job request
    Create {
        /// Path to the JSON job request
        #[arg(short, long)]
        request: PathBuf,
    },
    /// Normalize a job request and print the result
    Validate {
        /// Path to the JSON job request
        #[arg(short, long)]
        request: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::new(cli.env_file.clone())
        .load_app_config()
        .context("loading configuration")?;

    let tracing_result = init_tracing(&TracingConfig::from(&config.logging));
    for error in &tracing_result.errors {
        eprintln!("⚠️  {}", error);
    }

    let managers = InMemoryResourceManagers::new(cli.location.clone());
    let use_case = CreateReverseReplicationUseCase::new(managers.ports(), config);

    match cli.command {
        Commands::Create { request } => {
            let request = read_request(&request).await?;
            let cancellation = CancellationToken::new();
            spawn_interrupt_handler(cancellation.clone());

            match use_case.execute(request, cancellation).await {
                Ok(response) => print_created(&response)?,
                Err(e) => {
                    eprintln!("❌ Failed to create reverse replication job: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Validate { request } => {
            let request = read_request(&request).await?;
            let normalized = use_case
                .validate(request, &RunId::generate())
                .await
                .context("validating job request")?;
            println!("✅ Job request is valid");
            println!("{}", serde_json::to_string_pretty(&normalized)?);
        }
    }

    Ok(())
}

async fn read_request(path: &Path) -> anyhow::Result<JobRequest> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading job request {}", path.display()))?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("parsing job request {}", path.display()))
}

/// Cancels `token` on Ctrl+C so in-flight port calls abort and the run rolls back.
fn spawn_interrupt_handler(token: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Interrupt received, cancelling provisioning");
                token.cancel();
            }
            Err(e) => tracing::error!("Failed to setup signal handler: {}", e),
        }
    });
}

fn print_created(response: &CreateReverseReplicationResponse) -> anyhow::Result<()> {
    info!(job_id = %response.job_id, "Reverse replication job created");

    println!("✅ Reverse replication job created");
    println!("   Job ID: {}", response.job_id);
    println!("   Location: {}", response.location);
    if let Some(bucket) = &response.staging_bucket {
        println!("   Staging bucket: {}", bucket);
    }
    println!();
    println!("{}", serde_json::to_string_pretty(response)?);
    println!();
    println!("Equivalent launch commands:");
    println!("  {}", response.reader.gcloud_command);
    println!("  {}", response.writer.gcloud_command);
    Ok(())
}
