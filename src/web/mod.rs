//! Web layer
//!
//! Thin handlers over the catalog service: parameter validation happens in
//! extractors, business logic in the service, and error mapping in
//! [`responses`]. Stored covers are served statically under `/images`.

use anyhow::Result;
use axum::{
    Router,
    routing::{get, put},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir};

use crate::services::CatalogService;

pub mod extractors;
pub mod handlers;
pub mod openapi;
pub mod responses;

pub use responses::ErrorResponse;

/// Shared state for all request handlers
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<CatalogService>,
}

/// Web server configuration and setup
pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(catalog: Arc<CatalogService>, addr: SocketAddr) -> Self {
        let app = Self::create_router(AppState { catalog });
        Self { app, addr }
    }

    /// Build the full application router; also used by the API tests
    pub fn create_router(state: AppState) -> Router {
        let images = ServeDir::new(state.catalog.covers().dir());

        Router::new()
            .route(
                "/books",
                get(handlers::books::search).post(handlers::books::create),
            )
            .route(
                "/books/{id}",
                put(handlers::books::replace)
                    .patch(handlers::books::update)
                    .delete(handlers::books::remove),
            )
            .route("/authors", get(handlers::authors::search))
            .route("/health", get(handlers::health::health))
            .route("/api/openapi.json", get(openapi::serve_openapi_spec))
            .nest_service("/images", images)
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    /// Bind and serve until shutdown
    pub async fn run(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("Web server listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
