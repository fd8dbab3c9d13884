//! File export for decision records.

pub mod export;
