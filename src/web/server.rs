//! HTTP server for Evura.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;

use crate::auth::SessionManager;
use crate::config::{Config, ServerConfig};
use crate::db::SessionRepository;
use crate::{Database, EvuraError};

use super::handlers::{AppState, SharedDatabase};
use super::router::create_router;

/// Interval between sweeps of revoked session rows.
const CLEANUP_INTERVAL_SECS: u64 = 3600;

/// Web server serving the entry page and dashboard.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
}

impl WebServer {
    /// Create a new web server.
    pub fn new(config: &ServerConfig, app_state: Arc<AppState>) -> crate::Result<Self> {
        let addr = format!("{}:{}", config.host, config.port)
            .parse()
            .map_err(|e| {
                EvuraError::Config(format!(
                    "invalid server address {}:{}: {e}",
                    config.host, config.port
                ))
            })?;

        Ok(Self { addr, app_state })
    }

    /// Create a web server from the full configuration and an opened database.
    pub fn from_config(config: &Config, db: Database) -> crate::Result<Self> {
        let sessions = SessionManager::from_config(&config.session);
        let app_state = AppState::new(Arc::new(db), sessions)?;
        Self::new(&config.server, Arc::new(app_state))
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    fn into_router(self) -> (Router, SharedDatabase) {
        let db = self.app_state.db.clone();
        let router = create_router(self.app_state).layer(CompressionLayer::new());
        (router, db)
    }

    /// Start the session cleanup background task.
    ///
    /// Runs every hour and deletes revoked session rows.
    fn start_session_cleanup_task(db: SharedDatabase) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(CLEANUP_INTERVAL_SECS));

            // Skip the first immediate tick
            interval.tick().await;

            loop {
                interval.tick().await;

                match SessionRepository::new(db.pool()).cleanup_revoked().await {
                    Ok(0) => tracing::debug!("No revoked sessions to clean up"),
                    Ok(count) => {
                        tracing::info!(deleted_count = count, "Cleaned up revoked sessions")
                    }
                    Err(e) => tracing::warn!(error = %e, "Failed to clean up sessions"),
                }
            }
        });
    }

    /// Run the web server until it fails.
    pub async fn run(self) -> Result<(), std::io::Error> {
        let addr = self.addr;
        let (router, db) = self.into_router();

        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        Self::start_session_cleanup_task(db);
        tracing::info!("Web server listening on http://{}", local_addr);

        axum::serve(listener, router).await
    }

    /// Run the server in the background and return the actual bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> Result<SocketAddr, std::io::Error> {
        let addr = self.addr;
        let (router, db) = self.into_router();

        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        Self::start_session_cleanup_task(db);
        tracing::info!("Web server listening on http://{}", local_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}
