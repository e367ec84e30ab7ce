//! HTTP server setup and lifecycle management
//!
//! This module handles:
//! - Server configuration
//! - TCP listener setup
//! - Graceful shutdown on SIGTERM and SIGINT

use crate::{routes, state::AppState, task_client};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::timeout::TimeoutLayer;
use tracing::{info, warn};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Request timeout in seconds
    pub request_timeout: u64,
    /// Base URL of the remote task API; sync and task forwarding are
    /// disabled without it
    pub task_api_url: Option<String>,
    pub task_api_timeout: Duration,
    /// JSON fixture applied at startup
    pub seed_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout: 30,
            task_api_url: None,
            task_api_timeout: task_client::DEFAULT_TIMEOUT,
            seed_path: None,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// HTTP server instance
pub struct Server {
    config: ServerConfig,
    state: AppState,
}

impl Server {
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Serve requests until a shutdown signal arrives
    pub async fn run(self) -> Result<()> {
        let addr = self.config.addr();

        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind to {}", addr))?;

        let local_addr = listener.local_addr()?;
        info!("Server listening on http://{}", local_addr);
        info!("API documentation available at http://{}/api-docs/", local_addr);

        let app = routes::create_router(self.state)
            .layer(TimeoutLayer::new(Duration::from_secs(self.config.request_timeout)));

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("Server error")?;

        info!("Server shutdown complete");
        Ok(())
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }
}

/// Wait for SIGINT or SIGTERM
///
/// A handler that cannot be installed is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        },
    }
}

/// Builder for creating a server with custom configuration
pub struct ServerBuilder {
    config: ServerConfig,
    state: Option<AppState>,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            state: None,
        }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the request timeout in seconds
    pub fn request_timeout(mut self, timeout: u64) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn task_api_url(mut self, url: Option<String>) -> Self {
        self.config.task_api_url = url;
        self
    }

    pub fn task_api_timeout(mut self, timeout: Duration) -> Self {
        self.config.task_api_timeout = timeout;
        self
    }

    pub fn seed_path(mut self, path: Option<PathBuf>) -> Self {
        self.config.seed_path = path;
        self
    }

    pub fn state(mut self, state: AppState) -> Self {
        self.state = Some(state);
        self
    }

    /// The configuration collected so far
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn build(self) -> Result<Server> {
        let state = self.state.context("Application state is required")?;
        Ok(Server::new(self.config, state))
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
