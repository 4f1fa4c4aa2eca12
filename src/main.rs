//! # Spacebot — chat-space notification bot
//!
//! Watches space membership through the platform webhook, runs one
//! recurring timer per configured notification, and tracks which tagged
//! members have acknowledged each notification thread.
//!
//! Usage:
//!   spacebot                         # Start with ~/.spacebot/config.toml
//!   spacebot --port 8080             # Override the gateway port
//!   spacebot --config ./bot.toml     # Custom config path

use anyhow::Result;
use clap::Parser;
use spacebot_core::SpacebotConfig;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "spacebot", version, about = "🤖 Spacebot — chat-space notification bot")]
struct Cli {
    /// Config file path (default: ~/.spacebot/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Gateway bind host
    #[arg(long)]
    host: Option<String>,

    /// Gateway port
    #[arg(short, long)]
    port: Option<u16>,

    /// SQLite database path
    #[arg(long)]
    db: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn expand_path(p: &str) -> String {
    shellexpand::tilde(p).to_string()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "spacebot=debug,tower_http=debug"
    } else {
        "spacebot=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    // Load config once; CLI flags override file values
    let mut config = match &cli.config {
        Some(path) => SpacebotConfig::load_from(std::path::Path::new(&expand_path(path)))?,
        None => SpacebotConfig::load()?,
    };
    if let Some(host) = cli.host {
        config.gateway.host = host;
    }
    if let Some(port) = cli.port {
        config.gateway.port = port;
    }
    if let Some(db) = cli.db {
        config.storage.db_path = db;
    }

    // Open storage
    let db_path = expand_path(&config.storage.db_path);
    let store = Arc::new(spacebot_store::Store::open(std::path::Path::new(&db_path))?);
    tracing::info!("💾 Store opened: {db_path}");

    // Chat platform client
    let chat: Arc<dyn spacebot_core::ChatClient> =
        Arc::new(spacebot_chat::RestChatClient::new(config.chat.clone()));

    // Arm one timer per notification of every enabled space
    let scheduler = Arc::new(spacebot_scheduler::NotificationScheduler::new(
        store.clone(),
        chat.clone(),
        &config.scheduler,
    ));
    scheduler.start().await?;

    // Serve the webhook gateway
    let state = Arc::new(spacebot_gateway::AppState {
        gateway_config: config.gateway.clone(),
        store,
        chat,
        scheduler,
        start_time: std::time::Instant::now(),
    });
    spacebot_gateway::start(state).await
}
