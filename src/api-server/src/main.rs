//! Bastion asset API server
//!
//! # Usage
//!
//! ```bash
//! # Start with default settings (0.0.0.0:8080)
//! bastion-server
//!
//! # Load fixtures and forward tasks to a worker
//! bastion-server --seed seed.json --task-api-url http://tasks:8000
//!
//! # Enable debug logging
//! RUST_LOG=debug bastion-server
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Log filter (default: info)
//! - `BASTION_HOST`: Server host (default: 0.0.0.0)
//! - `BASTION_PORT`: Server port (default: 8080)
//! - `BASTION_REQUEST_TIMEOUT`: Request timeout in seconds (default: 30)
//! - `BASTION_TASK_API_URL`: Base URL of the remote task API
//! - `BASTION_TASK_API_TIMEOUT`: Task API timeout in seconds (default: 3)
//! - `BASTION_SEED`: JSON fixture applied at startup
//! - `BASTION_JSON_LOGS`: Emit JSON logs

use anyhow::{Context, Result};
use bastion_api_server::{spawn_forwarder, AppState, Seed, ServerBuilder, TaskApiClient};
use bastion_assets::{ChannelDispatcher, InMemoryAssetStore};
use bastion_authz::{InMemoryRbacStore, RbacEngine};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Bastion asset API server
#[derive(Parser, Debug)]
#[command(name = "bastion-server", version, about = "REST API for the Bastion asset inventory", long_about = None)]
struct Args {
    /// Host to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0", env = "BASTION_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short = 'p', long, default_value = "8080", env = "BASTION_PORT")]
    port: u16,

    /// Request timeout in seconds
    #[arg(long, default_value = "30", env = "BASTION_REQUEST_TIMEOUT")]
    request_timeout: u64,

    /// Base URL of the remote task API
    #[arg(long, env = "BASTION_TASK_API_URL")]
    task_api_url: Option<String>,

    /// Task API timeout in seconds
    #[arg(long, default_value = "3", env = "BASTION_TASK_API_TIMEOUT")]
    task_api_timeout: u64,

    /// JSON fixture applied at startup
    #[arg(long, env = "BASTION_SEED")]
    seed: Option<PathBuf>,

    /// Enable JSON logging format
    #[arg(long, env = "BASTION_JSON_LOGS")]
    json_logs: bool,

    /// Log filter, e.g. `info` or `bastion_authz=debug`
    #[arg(short = 'l', long, default_value = "info", env = "RUST_LOG")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting Bastion asset API server");

    let task_api_timeout = Duration::from_secs(args.task_api_timeout);
    let task_api = TaskApiClient::new(args.task_api_url.clone(), task_api_timeout)
        .context("Failed to build task API client")?;
    if !task_api.is_configured() {
        info!("No task API configured; sync and background tasks will report failures");
    }

    let assets = Arc::new(InMemoryAssetStore::new());
    let rbac = Arc::new(RbacEngine::new(Arc::new(InMemoryRbacStore::new())));

    let (dispatcher, queue) = ChannelDispatcher::new();
    let _forwarder = spawn_forwarder(task_api.clone(), queue);

    if let Some(path) = &args.seed {
        let seed = Seed::load(path)
            .await
            .with_context(|| format!("Failed to read seed {}", path.display()))?;
        seed.apply(assets.as_ref(), &rbac)
            .await
            .context("Failed to apply seed")?;
    }

    let state = AppState::new(assets, rbac, Arc::new(dispatcher), task_api);

    let server = ServerBuilder::new()
        .host(&args.host)
        .port(args.port)
        .request_timeout(args.request_timeout)
        .task_api_url(args.task_api_url.clone())
        .task_api_timeout(task_api_timeout)
        .seed_path(args.seed.clone())
        .state(state)
        .build()?;

    if let Err(e) = server.run().await {
        error!("Server error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn init_tracing(args: &Args) {
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| {
        eprintln!("Invalid log filter '{}', using 'info'", args.log_level);
        EnvFilter::new("info")
    });

    if args.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from([
            "bastion-server",
            "--host",
            "127.0.0.1",
            "--port",
            "9090",
            "--task-api-url",
            "http://tasks:8000",
            "--seed",
            "fixtures.json",
        ]);

        assert_eq!(args.host, "127.0.0.1");
        assert_eq!(args.port, 9090);
        assert_eq!(args.task_api_url.as_deref(), Some("http://tasks:8000"));
        assert_eq!(args.seed, Some(PathBuf::from("fixtures.json")));
        assert!(!args.json_logs);
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["bastion-server"]);

        assert_eq!(args.port, 8080);
        assert_eq!(args.request_timeout, 30);
        assert_eq!(args.task_api_timeout, 3);
    }

    #[test]
    fn test_args_json_logs() {
        let args = Args::parse_from(["bastion-server", "--json-logs"]);
        assert!(args.json_logs);
    }
}
