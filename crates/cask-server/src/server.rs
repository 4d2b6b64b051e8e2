use std::sync::Arc;

use cask_provider::DiskProvider;
use cask_store::DiskFileSystem;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::{build_router, AppState};

/// A cask instance: disk store and policy directory behind the HTTP API.
pub struct CaskServer {
    config: ServerConfig,
    state: AppState,
}

impl CaskServer {
    /// Open the store and policy directory named by `config`.
    pub async fn open(config: ServerConfig) -> ServerResult<Self> {
        let provider = DiskProvider::new(&config.provider_dir)?;
        let fs = DiskFileSystem::open(&config.fs_root, config.digest).await?;
        let state = AppState::new(Arc::new(provider), Arc::new(fs));
        Ok(Self::with_state(config, state))
    }

    /// Serve an existing provider and store, e.g. in-memory doubles.
    pub fn with_state(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone(), self.config.max_connections)
    }

    /// Serve until Ctrl-C.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!(
            addr = %self.config.bind_addr,
            fs_root = %self.config.fs_root.display(),
            provider_dir = %self.config.provider_dir.display(),
            digest = %self.config.digest,
            "cask listening"
        );
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
