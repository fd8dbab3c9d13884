//! REST API over a finished decision run.
//!
//! - `GET /state` — engine config, run summary and latest decision
//! - `GET /decisions` — recorded decisions with optional time window
//! - `POST /recommend` — one fresh decision for a caller-supplied context

mod handlers;
mod types;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tracing::info;

use crate::config::EngineConfig;
use crate::decision::allocation::Preferences;
use crate::decision::engine::DecisionEngine;
use crate::decision::summary::DecisionSummary;
use crate::decision::types::{Decision, SwitchEvent};

pub use types::{DecisionQuery, ErrorResponse, RecommendRequest, StateResponse};

/// Application state shared across all request handlers.
///
/// Built once after the batch run and wrapped in `Arc`; nothing in it is
/// mutated, so no locks are needed.
pub struct AppState {
    pub engine: DecisionEngine,
    pub config: EngineConfig,
    pub preferences: Preferences,
    pub summary: DecisionSummary,
    pub decisions: Vec<Decision>,
    pub events: Vec<SwitchEvent>,
}

/// Builds the axum router with all API routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/state", get(handlers::get_state))
        .route("/decisions", get(handlers::get_decisions))
        .route("/recommend", post(handlers::post_recommend))
        .with_state(state)
}

/// Binds to `addr` and serves the API until ctrl-c.
///
/// # Errors
///
/// Returns an `io::Error` if the listener cannot bind or the server fails.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(crate::telemetry::shutdown_signal())
        .await
}
