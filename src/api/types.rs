//! API request, response and query types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::context::Context;
use crate::decision::allocation::Preferences;
use crate::decision::summary::DecisionSummary;
use crate::decision::types::{Decision, LoadDescriptor};

/// Run configuration, aggregate summary and the most recent decision.
#[derive(Debug, Serialize)]
pub struct StateResponse {
    pub config: EngineConfig,
    pub preferences: Preferences,
    pub summary: DecisionSummary,
    /// `None` when the run produced no decisions.
    pub latest_decision: Option<Decision>,
    /// Number of recorded switch events.
    pub switch_events: usize,
}

/// Optional time window for the decisions endpoint (inclusive, RFC 3339).
#[derive(Debug, Deserialize)]
pub struct DecisionQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

fn default_current_source() -> String {
    "grid".to_string()
}

/// Body of `POST /recommend`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecommendRequest {
    pub context: Context,
    pub load: LoadDescriptor,
    #[serde(default = "default_current_source")]
    pub current_source: String,
    /// Overrides the server's preference weights for this call.
    #[serde(default)]
    pub preferences: Option<Preferences>,
}

/// Error response body for 4xx/5xx errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recommend_request_defaults() {
        let body = r#"{
            "context": { "observed_at": "2026-06-01T12:00:00Z", "carbon_intensity": 550.0 },
            "load": { "name": "HVAC", "priority": "high", "rated_power_w": 2000.0, "can_defer": false }
        }"#;
        let req: RecommendRequest = serde_json::from_str(body).expect("valid request");
        assert_eq!(req.current_source, "grid");
        assert!(req.preferences.is_none());
        assert_eq!(req.context.carbon_intensity(), Some(550.0));
    }

    #[test]
    fn recommend_request_rejects_unknown_fields() {
        let body = r#"{
            "context": { "observed_at": "2026-06-01T12:00:00Z" },
            "load": { "name": "HVAC", "priority": "high", "rated_power_w": 2000.0, "can_defer": false },
            "mode": "turbo"
        }"#;
        assert!(serde_json::from_str::<RecommendRequest>(body).is_err());
    }
}
