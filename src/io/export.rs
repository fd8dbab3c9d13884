//! CSV export for decision logs and switch events.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::decision::types::{Decision, SourceCandidate, SwitchEvent};

/// Column header for the decision log.
const DECISION_HEADER: &str = "timestamp,load,recommended_source,confidence,\
                               solar_score,battery_score,grid_score,generator_score,\
                               should_switch,current_source,score_improvement,\
                               defer,defer_reason,solar_kw,battery_kw,grid_kw,unserved_kw,\
                               cost,carbon_g,reasoning";

/// Column header for the switch event log.
const EVENT_HEADER: &str = "timestamp,load,from_source,to_source,triggered_by,reason";

/// Exports decisions to a CSV file at the given path.
///
/// One row per decision, in the order given. Output is deterministic for
/// identical inputs.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_decisions_csv(decisions: &[Decision], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_decisions_csv(decisions, buf)
}

/// Writes decisions as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_decisions_csv(decisions: &[Decision], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(DECISION_HEADER.split(',').map(str::trim))?;

    for d in decisions {
        wtr.write_record(&[
            d.timestamp.to_rfc3339(),
            d.load.clone(),
            d.recommended_source.to_string(),
            format!("{:.4}", d.confidence),
            d.scores.score(SourceCandidate::Solar).to_string(),
            d.scores.score(SourceCandidate::Battery).to_string(),
            d.scores.score(SourceCandidate::Grid).to_string(),
            d.scores.score(SourceCandidate::Generator).to_string(),
            d.switch.should_switch.to_string(),
            d.switch.current_source.clone(),
            d.switch.score_improvement.to_string(),
            d.deferral.defer.to_string(),
            d.deferral.reason.clone(),
            format!("{:.4}", d.allocation.solar_kw),
            format!("{:.4}", d.allocation.battery_kw),
            format!("{:.4}", d.allocation.grid_kw),
            format!("{:.4}", d.allocation.unserved_kw),
            format!("{:.4}", d.allocation.cost),
            format!("{:.2}", d.allocation.carbon_g),
            d.reasoning_text(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Exports switch events to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_events_csv(events: &[SwitchEvent], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_events_csv(events, buf)
}

/// Writes switch events as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_events_csv(events: &[SwitchEvent], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(EVENT_HEADER.split(','))?;

    for e in events {
        wtr.write_record([
            e.timestamp.to_rfc3339().as_str(),
            e.load.as_str(),
            e.from_source.as_str(),
            e.to_source.as_str(),
            e.triggered_by.as_str(),
            e.reason.as_str(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
