// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use kube::Client;
use std::time::Duration;
use tracing::info;

use muster::config::{RolloutConfig, TeardownConfig};
use muster::constants::{operator, paths, poll};
use muster::rollout::RolloutSequencer;
use muster::teardown::TeardownSequencer;

#[derive(Parser)]
#[command(
    name = "muster",
    about = "Roll out and tear down a Feast feature-store stack via the Feast Operator",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy the stack: namespace, operator, datastores, FeatureStore CR,
    /// post-apply materialization job
    Up(UpArgs),
    /// Remove the stack in reverse dependency order
    Down(DownArgs),
}

#[derive(Args)]
struct UpArgs {
    /// Target namespace
    #[arg(long, env = "MUSTER_NAMESPACE")]
    namespace: String,

    /// Create the namespace if it does not exist
    #[arg(long)]
    create_namespace: bool,

    /// Install the Feast Operator before the stack
    #[arg(long)]
    install_operator: bool,

    /// Skip the PostgreSQL/Redis stage
    #[arg(long)]
    skip_datastores: bool,

    /// Skip the FeatureStore CR stage
    #[arg(long)]
    skip_feast: bool,

    /// Skip the post-apply materialization job
    #[arg(long)]
    skip_post_apply: bool,

    /// Per-stage readiness wait, in seconds
    #[arg(long, default_value_t = poll::WAIT_TIMEOUT_SECS)]
    wait_timeout: u64,

    /// Post-apply job completion wait, in seconds
    #[arg(long, default_value_t = poll::APPLY_TIMEOUT_SECS)]
    apply_timeout: u64,

    /// Directory holding manifest templates
    #[arg(long, default_value = paths::TEMPLATE_DIR)]
    template_dir: PathBuf,

    /// Staging directory for rendered manifests
    #[arg(long, default_value = paths::STAGING_DIR)]
    staging_dir: PathBuf,

    /// Pre-built operator installation manifest
    #[arg(long, default_value = operator::MANIFEST_PATH)]
    operator_manifest: PathBuf,
}

impl UpArgs {
    fn into_config(self) -> RolloutConfig {
        let mut config = RolloutConfig::new(self.namespace);
        config.create_namespace = self.create_namespace;
        config.install_operator = self.install_operator;
        config.skip_datastores = self.skip_datastores;
        config.skip_feast = self.skip_feast;
        config.skip_post_apply = self.skip_post_apply;
        config.wait_timeout = Duration::from_secs(self.wait_timeout);
        config.apply_timeout = Duration::from_secs(self.apply_timeout);
        config.template_dir = self.template_dir;
        config.staging_dir = self.staging_dir;
        config.operator_manifest = self.operator_manifest;
        config
    }
}

#[derive(Args)]
struct DownArgs {
    /// Namespace the stack was deployed into
    #[arg(long, env = "MUSTER_NAMESPACE")]
    namespace: String,

    /// Also delete the operator installation
    #[arg(long)]
    uninstall_operator: bool,

    /// Also delete the namespace itself
    #[arg(long)]
    delete_namespace: bool,

    /// Staging directory to remove
    #[arg(long, default_value = paths::STAGING_DIR)]
    staging_dir: PathBuf,

    /// Operator installation manifest to delete from
    #[arg(long, default_value = operator::MANIFEST_PATH)]
    operator_manifest: PathBuf,
}

impl DownArgs {
    fn into_config(self) -> TeardownConfig {
        let mut config = TeardownConfig::new(self.namespace);
        config.uninstall_operator = self.uninstall_operator;
        config.delete_namespace = self.delete_namespace;
        config.staging_dir = self.staging_dir;
        config.operator_manifest = self.operator_manifest;
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    // Create Kubernetes client
    let client = Client::try_default().await?;

    let summary = match cli.command {
        Commands::Up(args) => {
            info!("Starting rollout");
            let mut sequencer = RolloutSequencer::new(client, args.into_config());
            sequencer.run().await?
        }
        Commands::Down(args) => {
            info!("Starting teardown");
            let mut sequencer = TeardownSequencer::new(client, args.into_config());
            sequencer.run().await?
        }
    };

    // Soft timeouts and degraded stages exit 0; explicit failure signals
    // from the cluster do not
    if summary.has_failure() {
        std::process::exit(1);
    }

    Ok(())
}
