//! HTTP server assembly: shared state, router and lifecycle.

use std::fmt;
use std::sync::Arc;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use numera_core::{Error, MemoryStore, Result};
use numera_registry::{RegistryStore, RegistryWriter};
use numera_scheduler::{Scheduler, SchedulerConfig};
use serde::Serialize;
use tokio::sync::watch;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::metrics::{init_metrics, metrics_middleware, serve_metrics};
use crate::routes;

/// Shared state handed to every handler.
pub struct AppState {
    /// Server configuration.
    pub config: Config,
    /// Read-side registry snapshots.
    pub registry: Arc<RegistryStore>,
    /// Write-side batch executor.
    pub writer: RegistryWriter,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
struct ReadyResponse {
    ready: bool,
    message: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn ready() -> Json<ReadyResponse> {
    Json(ReadyResponse {
        ready: true,
        message: "registry loaded",
    })
}

/// The API server.
pub struct Server {
    config: Config,
}

impl Server {
    /// Creates a server from configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Builds the full router over the given state.
    pub fn create_router(state: Arc<AppState>) -> Result<Router> {
        let cors = build_cors_layer(&state.config)?;

        let router = Router::new()
            .route("/health", get(health))
            .route("/ready", get(ready))
            .route("/metrics", get(serve_metrics))
            .route("/webhook", post(routes::webhook::receive_update))
            .nest("/api/v1", routes::api_v1_routes())
            .layer(middleware::from_fn(metrics_middleware))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .with_state(state);

        Ok(router)
    }

    /// Validates configuration, binds the listener and serves until ctrl-c.
    ///
    /// # Errors
    ///
    /// Fails if configuration is invalid, the port cannot be bound, or the
    /// initial registry load fails.
    pub async fn serve(self) -> Result<()> {
        self.config.validate()?;
        init_metrics();

        let backend = Arc::new(MemoryStore::new());
        let registry = Arc::new(RegistryStore::new(backend));
        registry.init().await?;
        let writer = RegistryWriter::new(Arc::clone(&registry));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let scheduler = Scheduler::new(writer.clone(), SchedulerConfig::from_env());
        let scheduler_handle = tokio::spawn(scheduler.run(shutdown_rx));

        let state = Arc::new(AppState {
            config: self.config.clone(),
            registry,
            writer,
        });
        let router = Self::create_router(state)?;

        let addr = format!("0.0.0.0:{}", self.config.http_port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::internal(format!("failed to bind {addr}: {e}")))?;
        tracing::info!(%addr, "API server listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| Error::internal(format!("server error: {e}")))?;

        let _ = shutdown_tx.send(true);
        let _ = scheduler_handle.await;
        tracing::info!("API server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}

fn build_cors_layer(config: &Config) -> Result<CorsLayer> {
    let origins = &config.cors.allowed_origins;
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::from(Any)
    } else {
        let parsed = origins
            .iter()
            .map(|o| {
                o.parse::<HeaderValue>()
                    .map_err(|_| Error::validation(format!("invalid CORS origin: {o}")))
            })
            .collect::<Result<Vec<_>>>()?;
        AllowOrigin::list(parsed)
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(
            config.cors.max_age_seconds,
        )))
}

/// Builds a router over a fresh in-memory registry, for tests.
///
/// # Errors
///
/// Fails if the initial registry load fails.
pub async fn test_router(config: Config) -> Result<(Router, Arc<AppState>)> {
    let backend = Arc::new(MemoryStore::new());
    let registry = Arc::new(RegistryStore::new(backend));
    registry.init().await?;
    let writer = RegistryWriter::new(Arc::clone(&registry));

    let state = Arc::new(AppState {
        config,
        registry,
        writer,
    });
    let router = Server::create_router(Arc::clone(&state))?;
    Ok((router, state))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_cors_builds() {
        let config = Config::default();
        assert!(build_cors_layer(&config).is_ok());
    }

    #[test]
    fn bad_origin_rejected() {
        let mut config = Config::default();
        config.cors.allowed_origins = vec!["not a url\u{7f}".to_string()];
        assert!(build_cors_layer(&config).is_err());
    }
}
