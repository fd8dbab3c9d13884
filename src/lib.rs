//! Home energy orchestrator: picks a power source for each household load.
//!
//! Given a [`context::Context`] snapshot, the [`decision::DecisionEngine`]
//! scores solar, battery, grid and generator, applies switch hysteresis,
//! flags deferrable loads under high carbon or price, and splits the load
//! across sources by cost and emissions.

#[cfg(feature = "api")]
pub mod api;
pub mod config;
pub mod context;
pub mod decision;
pub mod io;
pub mod loads;
pub mod runner;
pub mod telemetry;
