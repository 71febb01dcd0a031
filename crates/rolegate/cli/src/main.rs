//! Rolegate CLI - operator tooling for fragment authorization
//!
//! - `scan`: complete marker rescan over view sources, replacing the forest
//! - `show`: print the reconciled access configuration
//! - `reconcile`: rewrite the persisted record in canonical form
//! - `check`: evaluate markers for a role

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use rolegate_service::ConfigService;
use rolegate_store::AccessConfigStore;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod error;

use commands::{check, reconcile, scan, show};
use config::RolegateConfig;

#[derive(Parser)]
#[command(name = "rolegate")]
#[command(about = "Role-based visibility control for rendered view fragments", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "ROLEGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Access config record, overriding `store.path`
    #[arg(short, long, env = "ROLEGATE_STORE")]
    store: Option<PathBuf>,

    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rescan view sources and replace the persisted marker forest
    Scan(scan::ScanArgs),

    /// Print the access configuration
    Show(show::ShowArgs),

    /// Rewrite the persisted record in canonical form
    Reconcile,

    /// Evaluate markers for a role
    Check(check::CheckArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());
    if cli.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let mut config =
        RolegateConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(path) = cli.store {
        config.store.path = path;
    }
    debug!(store = %config.store.path.display(), "Configuration loaded");

    let store = Arc::new(AccessConfigStore::open(&config.store));
    let (client, service) = ConfigService::new(store.clone()).spawn(16);

    let result = match cli.command {
        Commands::Scan(args) => scan::execute(args, &config, &client).await,
        Commands::Show(args) => show::execute(args, &client).await,
        Commands::Reconcile => reconcile::execute(&store),
        Commands::Check(args) => check::execute(args, &config, &client).await,
    };

    drop(client);
    if let Err(e) = service.await {
        debug!(error = %e, "Config service task ended abnormally");
    }

    result.map_err(Into::into)
}
