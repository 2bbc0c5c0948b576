use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::application::{BalanceService, DEFAULT_ITEMS_TTL, DEFAULT_REQUEST_TIMEOUT, ItemService};
use crate::cache::TtlCache;
use crate::http::{AppState, build_router};
use crate::market::{DEFAULT_SKINPORT_BASE_URL, SkinportClient};
use crate::storage::{DEFAULT_MAX_CONNECTIONS, Repository, sqlite_url};

/// How long in-flight requests may drain after a shutdown signal.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Timeout for one marketplace HTTP round-trip.
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub database: String,
    pub skinport_base_url: String,
    pub request_timeout: Duration,
    pub items_cache_ttl: Duration,
    pub max_connections: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            database: "tradedesk.db".to_string(),
            skinport_base_url: DEFAULT_SKINPORT_BASE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            items_cache_ttl: DEFAULT_ITEMS_TTL,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

/// Wire the services together over an opened repository.
pub fn app_state(config: &ServerConfig, repo: Repository) -> Result<AppState> {
    let http = reqwest::Client::builder()
        .timeout(UPSTREAM_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")?;
    let market = SkinportClient::new(http, config.skinport_base_url.clone());

    let balances = BalanceService::new(Arc::new(repo)).with_timeout(config.request_timeout);
    let items = ItemService::new(Arc::new(market), Arc::new(TtlCache::new()))
        .with_ttl(config.items_cache_ttl);

    Ok(AppState::new(balances, items))
}

/// Run the API server until SIGINT/SIGTERM, then drain for at most [`SHUTDOWN_GRACE`].
pub async fn serve(config: ServerConfig) -> Result<()> {
    let repo = Repository::init(&sqlite_url(&config.database), config.max_connections).await?;
    let app = build_router(app_state(&config, repo.clone())?);

    let listener = TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.addr))?;
    info!(addr = %config.addr, "Running API server");

    let (stop_tx, mut stop_rx) = watch::channel(false);
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!("Shutting down API server...");
            let _ = stop_tx.send(true);
        })
        .into_future();

    tokio::select! {
        result = server => result.context("API server stopped unexpectedly")?,
        _ = async {
            if stop_rx.wait_for(|stopped| *stopped).await.is_err() {
                std::future::pending::<()>().await;
            }
            tokio::time::sleep(SHUTDOWN_GRACE).await;
        } => warn!(grace = ?SHUTDOWN_GRACE, "In-flight requests did not drain in time"),
    }

    repo.close().await;
    info!("API server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to listen for SIGTERM");
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
}
