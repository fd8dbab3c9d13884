//! Source scoring, switch hysteresis, load shedding and decision assembly.
//!
//! Everything in this module is pure: no I/O, no logging, no shared state.

pub mod allocation;
pub mod engine;
pub mod error;
pub mod scorer;
pub mod shedding;
pub mod summary;
pub mod switch;
pub mod types;

pub use allocation::{Allocation, Allocator, Preferences};
pub use engine::{CycleOutcome, DecisionEngine, LoadFailure};
pub use error::DecisionError;
pub use scorer::SourceScorer;
pub use shedding::{LoadClass, SheddingAdvisor, SheddingPlan, classify, is_deferrable};
pub use summary::DecisionSummary;
pub use switch::SwitchAdvisor;
pub use types::{
    Decision, DeferralAdvice, DeferralTrigger, LoadDescriptor, LoadPriority, ScoreBreakdown,
    SourceCandidate, SourceScore, SwitchAdvice, SwitchEvent, TriggeredBy, UnknownSource,
};
