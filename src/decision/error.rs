//! Errors raised by the decision core.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by the decision core.
///
/// The core has exactly one failure mode; falling back (e.g., to the grid as
/// a last resort) is a caller policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionError {
    #[error("no energy source is available for this load")]
    AllSourcesUnavailable,
}
