//! Axion Bot - Main entry point
//!
//! Webhook server answering build-availability questions for AxionAOSP
//! devices over the Telegram Bot API.

mod api;
mod build_fetch;
mod config;
mod registry_fetch;
mod router;
mod server;
mod state;
mod telegram;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "axion-bot")]
#[command(about = "AxionAOSP build checker bot")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "axion-bot.toml")]
    config: PathBuf,

    /// Bind address for the webhook server
    #[arg(short, long)]
    bind: Option<String>,

    /// Bot API token
    #[arg(short, long, env = "AXION_BOT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Look up one codename, print the summary and exit
    #[arg(long, value_name = "CODENAME")]
    check: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Axion bot v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = config::load_config(&args.config)?;

    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(token) = args.token {
        config.telegram.token = token;
    }

    info!(
        registry = %config.sources.registry_url,
        builds = %config.sources.build_base_url,
        "Configuration loaded"
    );

    if let Some(codename) = args.check {
        // One-shot mode: no messaging, just the rendered summary
        let state = state::AppState::new(config)?;
        let reply = state.router.summary_view(&codename.to_lowercase()).await?;
        println!("{}", reply.text);
        return Ok(());
    }

    if config.telegram.token.is_empty() {
        anyhow::bail!(
            "No bot token configured: set [telegram] token, pass --token or export AXION_BOT_TOKEN"
        );
    }

    let bind = config.server.bind.clone();
    let state = state::AppState::new(config)?;
    server::run(state, &bind).await?;

    Ok(())
}
