//! trust-gateway: HTTP front end for the AgenticTrust verification engine.
//!
//! Issues challenges, verifies credentials and presentations, and serves
//! issuer/agent lookups. The registry is synced in the background; the
//! verification routes answer 503 until the first sync completes.

mod app;
mod config;
mod error;
mod http;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};

use crate::config::GatewayConfig;
use crate::error::{ServerError, ServerResult};
use crate::http::{build_router, AppState};

/// AgenticTrust gateway
///
/// Decides whether an agent's credential presentation should be trusted.
#[derive(Parser, Debug)]
#[command(name = "trust-gateway", version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Override the bind address
    #[arg(long)]
    bind: Option<String>,

    /// Override the port
    #[arg(long)]
    port: Option<u16>,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("trust_gateway=debug,agentic_trust=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("trust_gateway=info,agentic_trust=info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> ServerResult<GatewayConfig> {
    match path {
        Some(p) => GatewayConfig::load(p),
        None => GatewayConfig::load(&GatewayConfig::default_config_path()),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> ServerResult<()> {
    let mut config = load_config(cli.config.as_ref())?;
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    config.validate()?;

    if cli.check {
        println!("Configuration OK.");
        println!("  Listen:   {}:{}", config.server.bind, config.server.port);
        println!("  Registry: {:?}", config.registry);
        let policies = match &config.policy.file {
            Some(path) => path.display().to_string(),
            None => "built-in".to_string(),
        };
        println!("  Policies: {}", policies);
        return Ok(());
    }

    let verifier = app::build_verifier(&config)?;
    let tasks = app::spawn_maintenance(verifier.clone(), &config);

    let state = Arc::new(AppState::new(
        verifier,
        config.default_audience(),
        Duration::from_secs(config.server.request_timeout_secs),
    ));
    let router = build_router(state);

    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "trust gateway listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Io)?;

    for task in tasks {
        task.abort();
    }
    info!("trust gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
