//! HTTP Server implementation
//!
//! This module provides the HTTP server using Axum framework with:
//! - Configurable host/port binding
//! - Graceful shutdown handling
//! - Security headers, trace ids and CORS on every response
//! - Periodic cleanup of idle rate limiter entries

use crate::api::handlers::AppState;
use crate::api::middleware::{
    security_headers_middleware, trace_id_middleware, RateLimiter, SecurityHeadersConfig,
};
use crate::api::routes::build_api_routes;
use crate::core::config::{Config, ServerConfig};
use crate::core::services::CredentialService;
use crate::db::repository::CredentialStore;
use axum::{middleware, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, error, info};

/// HTTP API Server
pub struct ApiServer {
    router: Router,
    config: ServerConfig,
    rate_limiter: RateLimiter,
    cleanup_interval: Duration,
}

impl ApiServer {
    /// Create a new API server over the given credential store
    pub fn new(config: &Config, store: Arc<dyn CredentialStore>) -> Self {
        let rate_limiter = RateLimiter::from_config(
            config.security.rate_limit_requests,
            config.security.rate_limit_window,
            config.security.trust_proxy_headers,
        );

        let service = Arc::new(CredentialService::new(store, config.database.max_results));

        let state = AppState {
            service,
            rate_limiter: rate_limiter.clone(),
        };

        Self {
            router: Self::build_router(config, state),
            config: config.server.clone(),
            rate_limiter,
            cleanup_interval: Duration::from_secs(config.security.rate_limit_window),
        }
    }

    /// Build the Axum router with all routes and middleware
    fn build_router(config: &Config, state: AppState) -> Router {
        let security_headers_config = SecurityHeadersConfig::from(&config.security);

        build_api_routes(state).layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn_with_state(
                    security_headers_config,
                    security_headers_middleware,
                ))
                .layer(middleware::from_fn(trace_id_middleware))
                .layer(TraceLayer::new_for_http())
                .layer(Self::build_cors_layer(&config.security.allowed_origins)),
        )
    }

    /// Build CORS layer from allowed origins configuration
    fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
        use tower_http::cors::Any;

        let cors = CorsLayer::new();

        // If allowed_origins contains "*", allow any origin
        if allowed_origins.iter().any(|origin| origin == "*") {
            cors.allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<_> = allowed_origins
                .iter()
                .filter_map(|origin| origin.parse().ok())
                .collect();

            cors.allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    }

    /// Start the HTTP server and listen for requests
    ///
    /// This method will block until the server is shut down gracefully.
    pub async fn serve(self) -> anyhow::Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let socket_addr: SocketAddr = addr.parse()?;

        info!(
            host = %self.config.host,
            port = self.config.port,
            rate_limit = self.rate_limiter.max_requests(),
            rate_limit_window = self.rate_limiter.window_seconds(),
            "Starting HTTP server"
        );

        let cleanup = tokio::spawn(run_rate_limit_cleanup(
            self.rate_limiter.clone(),
            self.cleanup_interval,
        ));

        let listener = tokio::net::TcpListener::bind(socket_addr).await?;
        info!(addr = %socket_addr, "HTTP server listening");

        // Connect info gives the rate limiter the peer address
        let result = axum::serve(
            listener,
            self.router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await;

        cleanup.abort();
        result?;

        info!("HTTP server shut down gracefully");
        Ok(())
    }

    /// Get a reference to the router
    pub fn router(&self) -> &Router {
        &self.router
    }
}

/// Drop rate limiter entries for clients that went quiet
async fn run_rate_limit_cleanup(rate_limiter: RateLimiter, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    // The first tick completes immediately
    ticker.tick().await;
    loop {
        ticker.tick().await;
        rate_limiter.cleanup_expired().await;
        let tracked_clients = rate_limiter.tracked_clients().await;
        debug!(tracked_clients, "Rate limiter cleanup finished");
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }

    info!("Initiating graceful shutdown...");
}
