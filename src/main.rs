//! numpool service binary
//!
//! Loads configuration, opens the database, builds the game engine and
//! serves the HTTP API.

use clap::Parser;
use numpool::api::ApiServer;
use numpool::config::{generate_sample_config, ConfigLoader};
use numpool::engine::GameEngine;
use numpool::storage::Store;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "numpool")]
#[command(about = "Numbers-betting round and settlement service", long_about = None)]
struct Args {
    /// Path to TOML configuration file
    #[arg(long)]
    config: Option<String>,

    /// Override API server host
    #[arg(long)]
    host: Option<String>,

    /// Override API server port
    #[arg(long)]
    port: Option<u16>,

    /// Override database directory
    #[arg(long)]
    data_dir: Option<String>,

    /// Write a sample configuration file to the given path and exit
    #[arg(long)]
    generate_config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "numpool=info,tower_http=info".into()),
        )
        .init();

    let args = Args::parse();

    if let Some(path) = args.generate_config {
        generate_sample_config(&path)?;
        info!("sample configuration written to {}", path);
        return Ok(());
    }

    let mut loader = ConfigLoader::new();
    if let Some(ref path) = args.config {
        loader = loader.with_path(path);
    }
    let mut config = loader.load()?;

    if let Some(host) = args.host {
        config.api.host = host;
    }
    if let Some(port) = args.port {
        config.api.port = port;
    }
    if let Some(data_dir) = args.data_dir {
        config.storage.data_dir = data_dir;
    }

    info!("opening database: {}", config.storage.data_dir);
    let store = Store::open(&config.storage.data_dir)?;

    info!(
        min_stake = config.game.min_stake,
        payout_multiplier = config.game.payout_multiplier,
        reward_expiry_hours = config.game.reward_expiry_hours,
        admins = config.game.admin_accounts.len(),
        "game configuration loaded"
    );
    let engine = Arc::new(GameEngine::new(store, config.game.clone()));

    ApiServer::new(config.api, engine).run().await
}
