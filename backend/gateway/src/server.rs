//! Main HTTP Gateway Server.
//!
//! Owns the per-server state (dispatcher, broadcaster, identity lookup) and
//! the route table.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

use heartlog_core::{
    Broadcaster, Dispatcher, EventStore, DEFAULT_KEEPALIVE, DEFAULT_LISTENER_CAPACITY,
    DEFAULT_WINDOW_HOURS,
};

use crate::identity::IdentityResolver;
use crate::{dashboard, health_api, ingest, live_feed};

/// Tunables for the HTTP layer.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Hourly buckets shown per source on the monitor dashboard.
    pub monitor_hours: usize,
    /// Interval between live feed keepalive frames.
    pub keepalive: Duration,
    /// Events buffered per live viewer before new ones are dropped.
    pub listener_buffer: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            monitor_hours: DEFAULT_WINDOW_HOURS,
            keepalive: DEFAULT_KEEPALIVE,
            listener_buffer: DEFAULT_LISTENER_CAPACITY,
        }
    }
}

/// Application state shared across routes. Built once per server.
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub identity: Arc<dyn IdentityResolver>,
    pub config: GatewayConfig,
    started_at: Instant,
    shutdown_tx: watch::Sender<bool>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn EventStore>,
        identity: Arc<dyn IdentityResolver>,
        config: GatewayConfig,
    ) -> Arc<Self> {
        let broadcaster = Broadcaster::with_capacity(config.listener_buffer);
        let (shutdown_tx, _) = watch::channel(false);

        Arc::new(Self {
            dispatcher: Dispatcher::new(store, broadcaster),
            identity,
            config,
            started_at: Instant::now(),
            shutdown_tx,
        })
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Tell every open live feed to close.
    pub fn begin_shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// Resolves once [`AppState::begin_shutdown`] has been called.
    pub fn shutdown_signal(&self) -> impl Future<Output = ()> + Send + use<> {
        let mut rx = self.shutdown_tx.subscribe();
        async move {
            loop {
                let down = *rx.borrow_and_update();
                if down || rx.changed().await.is_err() {
                    break;
                }
            }
        }
    }
}

/// Build the router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // display
        .route("/", get(dashboard::events_page))
        .route("/monitor", get(dashboard::monitor_page))
        // collect
        .route("/.log", post(ingest::log_event))
        .route("/.monitor", post(ingest::monitor_ping))
        .route("/.clear", post(ingest::clear_events))
        .route("/.sse", get(live_feed::live_updates))
        .route("/api/health", get(health_api::get_health))
        .with_state(state)
}

/// Serve `app` on `listener` until `signal` resolves.
///
/// Live feeds are closed when the signal fires so graceful shutdown does
/// not wait on long-lived streams.
pub async fn serve<F>(
    listener: TcpListener,
    app: Router,
    state: Arc<AppState>,
    signal: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!(addr = %listener.local_addr()?, "Gateway HTTP server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        signal.await;
        info!("Shutdown requested, closing live feeds");
        state.begin_shutdown();
    })
    .await?;

    info!("Gateway HTTP server stopped");
    Ok(())
}
