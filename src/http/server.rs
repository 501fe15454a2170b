//! HTTP API Server
//!
//! Axum-based HTTP server for the parse REST API.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::Method;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServiceConfig;
use crate::pipeline::PipelineAdapter;

use super::handlers::AppState;
use super::routes::create_router;

/// HTTP API server
pub struct HttpServer {
    config: ServiceConfig,
    adapter: Arc<PipelineAdapter>,
}

impl HttpServer {
    /// Create a new HTTP server
    pub fn new(config: ServiceConfig, adapter: Arc<PipelineAdapter>) -> Self {
        Self { config, adapter }
    }

    /// Run the HTTP server
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.bind_ip, self.config.port)
            .parse()
            .context("Invalid HTTP listen address")?;

        // Create application state
        let app_state = AppState {
            adapter: self.adapter.clone(),
        };

        // Create router; operation resolution fails here, before binding
        let mut app = create_router(app_state, &self.config.base_path)?;

        // Add CORS if enabled
        if self.config.cors_enabled {
            let cors = CorsLayer::new()
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers(Any)
                .allow_origin(Any);
            app = app.layer(cors);
        }

        // Add tracing
        app = app.layer(TraceLayer::new_for_http());

        // Bind to address
        let listener = TcpListener::bind(&addr)
            .await
            .context("Failed to bind HTTP server")?;

        info!(
            "HTTP API server listening on http://{}{}",
            addr, self.config.base_path
        );

        // Run server with graceful shutdown
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                info!("HTTP server shutting down");
            })
            .await
            .context("HTTP server error")?;

        Ok(())
    }
}
