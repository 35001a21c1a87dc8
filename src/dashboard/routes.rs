//! Status server route handlers.
//!
//! Handlers only read the latest published `StatusSnapshot`.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tokio::sync::watch;

use crate::status::{LogEntry, StatusSnapshot};

pub type AppState = watch::Receiver<StatusSnapshot>;

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub extra: String,
    pub revision: u64,
    pub updated_at: Option<String>,
}

/// GET /api/status
pub async fn get_status(State(rx): State<AppState>) -> Json<StatusResponse> {
    let snap = rx.borrow();
    Json(StatusResponse {
        status: snap.status.clone(),
        extra: snap.extra.clone(),
        revision: snap.revision,
        updated_at: snap.updated_at.map(|t| t.to_rfc3339()),
    })
}

/// GET /api/log
pub async fn get_log(State(rx): State<AppState>) -> Json<Vec<LogEntry>> {
    Json(rx.borrow().log.iter().cloned().collect())
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}
