//! # Livery Server
//!
//! Serves the theme preference API and theme assets.
//!
//! Configuration is read from `livery.toml` (or `--config`), an optional
//! `.env` file and the environment, in increasing order of precedence.

use std::{net::SocketAddr, path::PathBuf, time::Duration};

use anyhow::Context;
use clap::Parser;
use livery_server::{
    create_app,
    infra::{
        config::{ConfigLoader, ConfigLoaderOptions},
        startup::{build_state, spawn_session_pruner},
    },
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "livery-server")]
#[command(about = "Theme, color mode and font preferences over HTTP")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "LIVERY_CONFIG")]
    config: Option<PathBuf>,

    /// Path to a .env file loaded before reading the environment
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Server port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Server host (overrides config)
    #[arg(long)]
    host: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let load = ConfigLoader::with_options(ConfigLoaderOptions {
        config_path: cli.config.clone(),
        env_file: cli.env_file.clone(),
    })
    .load()
    .context("failed to load configuration")?;

    let mut config = load.config;
    for warning in &load.warnings.items {
        match &warning.hint {
            Some(hint) => warn!(hint = %hint, "{}", warning.message),
            None => warn!("{}", warning.message),
        }
    }

    if config.metadata.env_file_loaded {
        info!("loaded .env file");
    }
    if let Some(path) = &config.metadata.config_path {
        info!(path = %path.display(), "loaded configuration file");
    }

    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(host) = cli.host.clone() {
        config.server.host = host;
    }

    let listen = format!("{}:{}", config.server.host, config.server.port);
    let addr: SocketAddr = listen
        .parse()
        .with_context(|| format!("invalid listen address {listen}"))?;

    info!(
        themes_root = %config.theme.themes_root.display(),
        app_url = %config.theme.app_url,
        app_dir = %config.theme.app_dir,
        "theme configuration"
    );

    let idle_timeout = config.sessions.idle_timeout;
    let state = build_state(config).await?;
    spawn_session_pruner(&state, sweep_interval(idle_timeout));

    let router = create_app(state);

    info!("Starting Livery server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

/// Sweep often enough that sessions do not outlive the timeout by much.
fn sweep_interval(idle_timeout: Duration) -> Duration {
    (idle_timeout / 4)
        .clamp(Duration::from_secs(30), Duration::from_secs(15 * 60))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
