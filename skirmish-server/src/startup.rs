//! Server startup and shutdown logic

use crate::app::{create_app, AppState};
use anyhow::{Context, Result};
use axum::Router;
use skirmish_config::SkirmishConfig;
use skirmish_http::{HttpClient, HttpManager};
use skirmish_orchestrator::Coordinator;
use skirmish_player::{ChatEndpoint, GameBackend, HttpGameBackend, PlayerDriver, PlayerRunner};
use skirmish_timers::{Timers, TokioTimers};
use std::sync::Arc;
use tokio::net::TcpListener;

/// A node: the coordinator, the player runner and the routes in front of them
pub struct Server {
    config: SkirmishConfig,
    coordinator: Arc<Coordinator>,
}

impl Server {
    /// Wire every service from configuration
    pub fn new(config: SkirmishConfig) -> Result<Self> {
        let http: Arc<dyn HttpClient> = Arc::new(
            HttpManager::with_config(config.http.clone().into())
                .context("Failed to build HTTP client")?,
        );
        let timers: Arc<dyn Timers> = Arc::new(TokioTimers::new());

        let backend: Arc<dyn GameBackend> =
            Arc::new(HttpGameBackend::new(http.clone(), config.backend.clone()));
        let runner: Arc<dyn PlayerDriver> = Arc::new(PlayerRunner::new(
            backend,
            timers.clone(),
            config.timing.clone(),
            ChatEndpoint::from_config(&config.backend),
        ));

        let coordinator = Coordinator::new(&config, http, timers, runner);
        Ok(Self {
            config,
            coordinator,
        })
    }

    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    pub fn build_app(&self) -> Router {
        create_app(AppState::new(self.coordinator.clone()))
    }

    /// Serve until ctrl-c or SIGTERM
    pub async fn start(self) -> Result<()> {
        let app = self.build_app();
        let addr = format!(
            "{}:{}",
            self.config.server.bind_address, self.config.server.port
        );

        self.log_config_summary();

        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    fn log_config_summary(&self) {
        tracing::info!("=== Skirmish Node Configuration ===");
        tracing::info!("Bind Address: {}:{}", self.config.server.bind_address, self.config.server.port);
        tracing::info!("Worker Nodes: {}", self.config.cluster.load_test_uris.join(", "));
        tracing::info!("Lobbies: {}", self.config.backend.lobbies_uri);
        tracing::info!("Player Accounts: {}", self.config.backend.player_accounts_uri);
        tracing::info!("Player Stats: {}", self.config.backend.player_stats_uri);
        tracing::info!("Chat Relay: {}:{}", self.config.backend.chat_host, self.config.backend.chat_port);
        tracing::info!("===================================");
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
