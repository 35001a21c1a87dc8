//! Status server: Axum web server exposing the bot's status snapshot.
//!
//! Runs as an independent background task. It never writes bot state; it
//! only reads snapshots published by the `StatusLog`.

pub mod routes;

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{
    http::{header, Method},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::config::StatusServerConfig;
use routes::AppState;

/// A status sub-service with its own start/stop lifecycle.
#[async_trait]
pub trait StatusReporter: Send {
    async fn start(&mut self, config: &StatusServerConfig) -> Result<()>;
    async fn stop(&mut self) -> Result<()>;
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/status", get(routes::get_status))
        .route("/api/log", get(routes::get_log))
        .route("/health", get(routes::health))
        .layer(cors)
        .with_state(state)
}

pub struct StatusServer {
    state: AppState,
    running: Option<Running>,
}

struct Running {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl StatusServer {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            running: None,
        }
    }

    /// Address the server is bound to, while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.addr)
    }
}

#[async_trait]
impl StatusReporter for StatusServer {
    async fn start(&mut self, config: &StatusServerConfig) -> Result<()> {
        if self.running.is_some() {
            return Ok(());
        }
        let bind = format!("{}:{}", config.host, config.port);
        let listener = tokio::net::TcpListener::bind(&bind)
            .await
            .with_context(|| format!("Failed to bind status server on {bind}"))?;
        let addr = listener.local_addr().context("Status server has no local address")?;
        let app = build_router(self.state.clone());
        let (shutdown, signal) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = signal.await;
                })
                .await;
            if let Err(e) = served {
                error!(error = %e, "Status server error");
            }
        });

        info!(%addr, "Status server started on http://{addr}");
        self.running = Some(Running { addr, shutdown, task });
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        let Some(running) = self.running.take() else {
            return Ok(());
        };
        let _ = running.shutdown.send(());
        running.task.await.context("Status server task failed")?;
        info!(addr = %running.addr, "Status server stopped");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
