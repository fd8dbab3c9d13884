//! Batch loop driving the decision engine over a sequence of contexts.

use tracing::{debug, info, warn};

use crate::context::{ContextProvider, ProviderError};
use crate::decision::allocation::Preferences;
use crate::decision::engine::{DecisionEngine, LoadFailure};
use crate::decision::summary::DecisionSummary;
use crate::decision::types::{Decision, SourceCandidate, SwitchEvent, TriggeredBy};
use crate::loads::LoadRegistry;

/// Knobs for [`run_batch`].
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Number of decision cycles to attempt.
    pub steps: usize,
    /// Source a load is moved to when nothing is available for it.
    pub fallback_source: SourceCandidate,
    /// Carry out advised switches by updating each load's current source.
    pub apply_switches: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            steps: 24,
            fallback_source: SourceCandidate::Grid,
            apply_switches: true,
        }
    }
}

/// Everything a batch run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub cycles: usize,
    pub decisions: Vec<Decision>,
    pub events: Vec<SwitchEvent>,
    pub failures: Vec<LoadFailure>,
    pub summary: DecisionSummary,
}

/// Runs up to `options.steps` decision cycles.
///
/// Advised switches are recorded as [`SwitchEvent`]s and, when
/// `apply_switches` is set, written back to `registry`. Loads with no
/// available source are moved to `fallback_source`. A replay that runs out
/// after at least one cycle ends the run early.
///
/// # Errors
///
/// Returns the provider's error if the first cycle cannot gather a context,
/// or on any error other than exhaustion.
pub fn run_batch(
    engine: &DecisionEngine,
    provider: &mut dyn ContextProvider,
    registry: &mut LoadRegistry,
    preferences: &Preferences,
    options: &RunOptions,
) -> Result<RunReport, ProviderError> {
    info!(
        provider = provider.name(),
        loads = registry.len(),
        steps = options.steps,
        "starting decision run"
    );

    let mut decisions = Vec::new();
    let mut events = Vec::new();
    let mut failures = Vec::new();
    let mut cycles = 0;

    for step in 0..options.steps {
        let outcome = match engine.run_cycle(provider, registry, preferences) {
            Ok(outcome) => outcome,
            Err(ProviderError::Exhausted) if cycles > 0 => {
                info!(step, "context source exhausted, ending run");
                break;
            }
            Err(e) => return Err(e),
        };
        cycles += 1;
        let at = outcome.context.observed_at();

        for decision in &outcome.decisions {
            debug!(
                load = %decision.load,
                source = %decision.recommended_source,
                confidence = decision.confidence,
                switch = decision.switch.should_switch,
                defer = decision.deferral.defer,
                "decision"
            );
            if let Some(event) =
                SwitchEvent::from_advice(&decision.load, &decision.switch, TriggeredBy::Ai, at)
            {
                if options.apply_switches {
                    registry.set_current_source(&event.load, event.to_source.as_str());
                }
                events.push(event);
            }
        }

        for failure in &outcome.failures {
            warn!(
                load = %failure.load,
                fallback = %options.fallback_source,
                "no source available, applying fallback"
            );
            if failure.current_source != options.fallback_source.as_str() {
                let event = SwitchEvent {
                    load: failure.load.clone(),
                    from_source: failure.current_source.clone(),
                    to_source: options.fallback_source,
                    reason: failure.error.to_string(),
                    triggered_by: TriggeredBy::Fallback,
                    timestamp: at,
                };
                if options.apply_switches {
                    registry.set_current_source(&event.load, event.to_source.as_str());
                }
                events.push(event);
            }
        }

        info!(
            step,
            observed_at = %at,
            decisions = outcome.decisions.len(),
            failures = outcome.failures.len(),
            shedding = %outcome.shedding,
            "cycle complete"
        );

        decisions.extend(outcome.decisions);
        failures.extend(outcome.failures);
    }

    let summary = DecisionSummary::from_decisions(&decisions, &events, failures.len());
    info!(
        cycles,
        decisions = decisions.len(),
        switches = events.len(),
        "decision run finished"
    );

    Ok(RunReport {
        cycles,
        decisions,
        events,
        failures,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::context::{Context, FileContextProvider, SimulatedContextProvider};

    #[test]
    fn switches_are_applied_once() {
        let engine = DecisionEngine::default();
        let mut registry = LoadRegistry::household_defaults();
        let start = Utc.with_ymd_and_hms(2026, 6, 1, 11, 0, 0).unwrap();
        let mut provider = SimulatedContextProvider::new(5, start);
        let options = RunOptions {
            steps: 2,
            ..RunOptions::default()
        };

        let report = run_batch(
            &engine,
            &mut provider,
            &mut registry,
            &Preferences::default(),
            &options,
        )
        .expect("simulation never fails");

        assert_eq!(report.cycles, 2);
        assert_eq!(report.decisions.len(), 2 * registry.len());
        // Every load starts on grid and moves to solar in the first cycle only.
        assert_eq!(report.events.len(), registry.len());
        assert!(registry.iter().all(|l| l.current_source == "solar"));
        assert_eq!(report.summary.switches_executed, registry.len());
    }

    #[test]
    fn replay_end_stops_the_run() {
        let csv = "timestamp,carbon_intensity\n2026-01-01T00:00:00Z,420\n";
        let mut provider = FileContextProvider::from_reader(csv.as_bytes()).expect("valid csv");
        let report = run_batch(
            &DecisionEngine::default(),
            &mut provider,
            &mut LoadRegistry::household_defaults(),
            &Preferences::default(),
            &RunOptions::default(),
        )
        .expect("one row replays");
        assert_eq!(report.cycles, 1);
    }

    struct Blackout;

    impl ContextProvider for Blackout {
        fn gather(&mut self) -> Result<Context, ProviderError> {
            Ok(Context::builder(Utc::now())
                .available(SourceCandidate::Solar, false)
                .available(SourceCandidate::Battery, false)
                .available(SourceCandidate::Grid, false)
                .build())
        }

        fn name(&self) -> &'static str {
            "blackout"
        }
    }

    #[test]
    fn unplaced_loads_fall_back() {
        let mut registry = LoadRegistry::household_defaults();
        registry.set_current_source("dishwasher", "battery");
        let report = run_batch(
            &DecisionEngine::default(),
            &mut Blackout,
            &mut registry,
            &Preferences::default(),
            &RunOptions {
                steps: 1,
                ..RunOptions::default()
            },
        )
        .expect("provider succeeds");

        assert!(report.decisions.is_empty());
        assert_eq!(report.failures.len(), registry.len());
        assert_eq!(report.events.len(), 1);
        assert_eq!(report.events[0].triggered_by, TriggeredBy::Fallback);
        assert_eq!(
            registry.get("dishwasher").map(|l| l.current_source.as_str()),
            Some("grid")
        );
    }

    #[test]
    fn empty_replay_is_an_error() {
        let csv = "timestamp,carbon_intensity\n";
        let mut provider = FileContextProvider::from_reader(csv.as_bytes()).expect("valid csv");
        let result = run_batch(
            &DecisionEngine::default(),
            &mut provider,
            &mut LoadRegistry::household_defaults(),
            &Preferences::default(),
            &RunOptions::default(),
        );
        assert!(matches!(result, Err(ProviderError::Exhausted)));
    }
}
