//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::AppState;
use super::types::{DecisionQuery, ErrorResponse, RecommendRequest, StateResponse};
use crate::decision::types::Decision;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Returns the engine config, run summary, and latest decision.
///
/// `GET /state` → 200 + `StateResponse` JSON
pub async fn get_state(State(state): State<Arc<AppState>>) -> Json<StateResponse> {
    Json(StateResponse {
        config: state.config.clone(),
        preferences: state.preferences,
        summary: state.summary.clone(),
        latest_decision: state.decisions.last().cloned(),
        switch_events: state.events.len(),
    })
}

/// Returns recorded decisions, optionally filtered by timestamp.
///
/// `GET /decisions` → 200 + `Vec<Decision>` JSON
/// `GET /decisions?from=T1&to=T2` → decisions with `T1 <= timestamp <= T2`
/// `from` after `to` → 400 + `ErrorResponse`
pub async fn get_decisions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DecisionQuery>,
) -> impl IntoResponse {
    let from = query.from.unwrap_or(DateTime::<Utc>::MIN_UTC);
    let to = query.to.unwrap_or(DateTime::<Utc>::MAX_UTC);

    if from > to {
        return Err(error(
            StatusCode::BAD_REQUEST,
            format!("`from` ({from}) must be <= `to` ({to})"),
        ));
    }

    let decisions: Vec<Decision> = state
        .decisions
        .iter()
        .filter(|d| d.timestamp >= from && d.timestamp <= to)
        .cloned()
        .collect();

    Ok(Json(decisions))
}

/// Makes a fresh decision for the supplied context and load.
///
/// `POST /recommend` → 200 + `Decision` JSON
/// invalid preference weights → 400
/// no source available → 503
pub async fn post_recommend(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RecommendRequest>,
) -> impl IntoResponse {
    let preferences = request.preferences.unwrap_or(state.preferences);
    let problems = preferences.validate("preferences");
    if !problems.is_empty() {
        let message = problems
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(error(StatusCode::BAD_REQUEST, message));
    }

    match state.engine.decide(
        &request.context,
        &request.load,
        &request.current_source,
        &preferences,
    ) {
        Ok(decision) => {
            debug!(
                load = %decision.load,
                source = %decision.recommended_source,
                "served recommendation"
            );
            Ok(Json(decision))
        }
        Err(e) => {
            warn!(load = %request.load.name, error = %e, "recommendation failed");
            Err(error(StatusCode::SERVICE_UNAVAILABLE, e.to_string()))
        }
    }
}
