//! Aggregate statistics over a batch of decisions.

use std::fmt;

use serde::Serialize;

use super::types::{Decision, SourceCandidate, SwitchEvent};

/// Post-hoc summary of a decision run.
///
/// Computed from the decision records themselves so the report always agrees
/// with the exported log.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DecisionSummary {
    /// Number of decisions.
    pub decisions: usize,
    /// How often each source was recommended, in tie-break order.
    pub recommended: [usize; 4],
    /// Decisions that advised a switch.
    pub switches_advised: usize,
    /// Switch events actually carried out.
    pub switches_executed: usize,
    /// Decisions that advised deferring the load.
    pub deferrals: usize,
    /// Loads that could not be placed on any source.
    pub failures: usize,
    /// Mean heuristic confidence.
    pub mean_confidence: f64,
    /// Sum of allocated running cost.
    pub total_cost: f64,
    /// Sum of allocated emissions (g CO2eq).
    pub total_carbon_g: f64,
    /// Sum of emissions avoided by advised deferrals (g CO2eq).
    pub carbon_avoided_g: f64,
}

impl DecisionSummary {
    pub fn from_decisions(decisions: &[Decision], events: &[SwitchEvent], failures: usize) -> Self {
        if decisions.is_empty() {
            return Self {
                switches_executed: events.len(),
                failures,
                ..Self::default()
            };
        }

        let mut summary = Self {
            decisions: decisions.len(),
            switches_executed: events.len(),
            failures,
            ..Self::default()
        };
        let mut confidence_sum = 0.0;

        for d in decisions {
            summary.recommended[d.recommended_source.index()] += 1;
            if d.switch.should_switch {
                summary.switches_advised += 1;
            }
            if d.deferral.defer {
                summary.deferrals += 1;
                summary.carbon_avoided_g += d.deferral.carbon_savings_g;
            }
            confidence_sum += d.confidence;
            summary.total_cost += d.allocation.cost;
            summary.total_carbon_g += d.allocation.carbon_g;
        }

        summary.mean_confidence = confidence_sum / decisions.len() as f64;
        summary
    }

    /// Times `source` was recommended.
    pub fn recommended_count(&self, source: SourceCandidate) -> usize {
        self.recommended[source.index()]
    }
}

impl fmt::Display for DecisionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Decision Summary ---")?;
        writeln!(f, "Decisions:             {}", self.decisions)?;
        for source in SourceCandidate::ALL {
            writeln!(
                f,
                "  {:<10}           {}",
                source.as_str(),
                self.recommended_count(source)
            )?;
        }
        writeln!(
            f,
            "Switches:              {} advised, {} executed",
            self.switches_advised, self.switches_executed
        )?;
        writeln!(f, "Deferrals advised:     {}", self.deferrals)?;
        writeln!(f, "Unplaced loads:        {}", self.failures)?;
        writeln!(f, "Mean confidence:       {:.2}", self.mean_confidence)?;
        writeln!(f, "Allocated cost:        {:.2}", self.total_cost)?;
        writeln!(f, "Allocated emissions:   {:.0} g", self.total_carbon_g)?;
        write!(f, "Emissions avoidable:   {:.0} g", self.carbon_avoided_g)
    }
}
