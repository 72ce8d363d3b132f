//! API server
//!
//! Server setup with the middleware stack and graceful shutdown.

use super::{
    handlers::AppState,
    middleware::{create_cors_layer, metrics_middleware, request_id_middleware},
    monitoring::MetricsRegistry,
    routes::create_router,
};
use crate::config::ApiConfig;
use crate::engine::GameEngine;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

pub struct ApiServer {
    config: ApiConfig,
    engine: Arc<GameEngine>,
}

impl ApiServer {
    pub fn new(config: ApiConfig, engine: Arc<GameEngine>) -> Self {
        Self { config, engine }
    }

    /// Start the API server and serve until shutdown.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let app = self.create_app();
        let addr = self.socket_addr()?;

        info!("starting numpool API server");
        info!("listen: http://{}", addr);
        self.log_endpoints();

        let listener = tokio::net::TcpListener::bind(addr).await?;

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("API server stopped gracefully");
        Ok(())
    }

    fn create_app(&self) -> axum::Router {
        let metrics = Arc::new(MetricsRegistry::new());
        let state = Arc::new(AppState {
            engine: self.engine.clone(),
            metrics: metrics.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        });

        create_router(state)
            // Request ID middleware (first for tracing)
            .layer(axum::middleware::from_fn(request_id_middleware))
            .layer(axum::middleware::from_fn_with_state(
                metrics,
                metrics_middleware,
            ))
            // CORS layer (before timeout to handle preflight)
            .layer(create_cors_layer(self.config.allowed_origins.clone()))
            .layer(TimeoutLayer::new(Duration::from_secs(
                self.config.request_timeout_secs,
            )))
            // Tracing layer (last for complete request tracing)
            .layer(TraceLayer::new_for_http())
    }

    fn socket_addr(&self) -> Result<SocketAddr, Box<dyn std::error::Error>> {
        Ok(SocketAddr::from((
            self.config.host.parse::<std::net::IpAddr>()?,
            self.config.port,
        )))
    }

    fn log_endpoints(&self) {
        info!("available endpoints:");
        info!("  GET  /health                  - Health check");
        info!("  GET  /metrics                 - Prometheus metrics");
        info!("  POST /accounts                - Create account");
        info!("  GET  /accounts/:id/balance    - Account balance");
        info!("  POST /accounts/:id/deposit    - Top up an account");
        info!("  GET  /accounts/:id/bets       - Account bet history");
        info!("  POST /rounds                  - Create round (admin)");
        info!("  GET  /rounds                  - List rounds");
        info!("  GET  /rounds/:id              - Round details");
        info!("  POST /rounds/:id/activate     - Open round for betting (admin)");
        info!("  POST /rounds/:id/winner       - Declare winner and settle (admin)");
        info!("  POST /rounds/:id/cancel       - Cancel round with refunds (admin)");
        info!("  GET  /rounds/:id/bets         - Bets in a round");
        info!("  POST /bets                    - Place a bet");
        info!("  POST /rewards/redeem          - Redeem a reward code");
        info!("  GET  /rewards/:code/status    - Reward code status");
    }
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received Ctrl+C signal");
        },
        _ = terminate => {
            info!("received terminate signal");
        },
    }
}
