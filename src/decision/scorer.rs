//! Weighted additive source scoring.

use crate::config::ScoringConfig;
use crate::context::Context;

use super::types::{LoadDescriptor, ScoreBreakdown, SourceCandidate};

/// Scores every candidate source for a load under a given context.
///
/// Adjustments are applied in a fixed order so the reasoning strings are
/// reproducible for identical inputs. Absent readings contribute nothing.
#[derive(Debug, Clone, Default)]
pub struct SourceScorer {
    config: ScoringConfig,
}

impl SourceScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Computes the full score breakdown for `load`.
    ///
    /// Unavailable sources keep their computed score but are flagged so that
    /// [`ScoreBreakdown::recommended`] skips them.
    pub fn score_sources(&self, context: &Context, load: &LoadDescriptor) -> ScoreBreakdown {
        let c = &self.config;
        let mut breakdown = ScoreBreakdown::from_base(c.base.as_array());

        // Weather
        if let Some(cloud) = context.cloud_cover_pct() {
            if cloud < c.clear_sky_cloud_pct {
                breakdown.adjust(
                    SourceCandidate::Solar,
                    c.clear_sky_solar_bonus,
                    "Clear weather favors solar",
                );
            } else if cloud < c.partly_cloudy_cloud_pct {
                breakdown.adjust(
                    SourceCandidate::Solar,
                    c.partly_cloudy_solar_bonus,
                    "Partly cloudy, moderate solar favor",
                );
            }
        }

        // Ambient light
        if context
            .ambient_light()
            .is_some_and(|light| light > c.high_light_threshold)
        {
            breakdown.adjust(
                SourceCandidate::Solar,
                c.high_light_solar_bonus,
                "High light intensity detected",
            );
        }

        // Grid carbon intensity
        if let Some(carbon) = context.carbon_intensity() {
            if carbon > c.high_carbon_threshold {
                breakdown.adjust(
                    SourceCandidate::Grid,
                    -c.high_carbon_grid_penalty,
                    "High grid carbon intensity — avoid grid",
                );
            } else if carbon < c.low_carbon_threshold {
                breakdown.adjust(
                    SourceCandidate::Grid,
                    c.low_carbon_grid_bonus,
                    "Low grid carbon intensity — grid is clean",
                );
            }
        }

        // Load priority
        if load.priority >= c.battery_priority_threshold {
            breakdown.adjust(
                SourceCandidate::Battery,
                c.priority_battery_bonus,
                "High-priority load favors reliable battery backup",
            );
        }

        // Availability gating
        for source in SourceCandidate::ALL {
            let available = context.source(source).can_supply(load.rated_power_w);
            breakdown.set_available(source, available);
        }

        breakdown
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::context::SourceStatus;
    use crate::decision::error::DecisionError;
    use crate::decision::types::LoadPriority;

    fn hvac() -> LoadDescriptor {
        LoadDescriptor::new("HVAC", LoadPriority::High, 2000.0, false)
    }

    fn sunny_dirty_grid(carbon: f64) -> Context {
        Context::builder(Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap())
            .weather(20.0, Some(31.0))
            .carbon_intensity(carbon)
            .ambient_light(750.0)
            .build()
    }

    #[test]
    fn sunny_high_carbon_scenario() {
        let scorer = SourceScorer::default();
        let breakdown = scorer.score_sources(&sunny_dirty_grid(550.0), &hvac());

        assert_eq!(breakdown.score(SourceCandidate::Solar), 135);
        assert_eq!(breakdown.score(SourceCandidate::Battery), 90);
        assert_eq!(breakdown.score(SourceCandidate::Grid), 20);
        assert_eq!(breakdown.score(SourceCandidate::Generator), 25);
        assert_eq!(breakdown.recommended(), Ok(SourceCandidate::Solar));
        assert!((breakdown.confidence(SourceCandidate::Solar) - 0.6333).abs() < 1e-3);
        assert_eq!(
            breakdown.reasoning(),
            [
                "Clear weather favors solar",
                "High light intensity detected",
                "High grid carbon intensity — avoid grid",
                "High-priority load favors reliable battery backup",
            ]
        );
    }

    #[test]
    fn sunny_low_carbon_scenario() {
        let scorer = SourceScorer::default();
        let breakdown = scorer.score_sources(&sunny_dirty_grid(250.0), &hvac());

        assert_eq!(breakdown.score(SourceCandidate::Grid), 70);
        assert_eq!(breakdown.score(SourceCandidate::Solar), 135);
        assert_eq!(breakdown.recommended(), Ok(SourceCandidate::Solar));
    }

    #[test]
    fn partly_cloudy_gives_smaller_bonus() {
        let ctx = Context::builder(Utc::now()).weather(45.0, None).build();
        let load = LoadDescriptor::new("lamp", LoadPriority::Low, 60.0, false);
        let breakdown = SourceScorer::default().score_sources(&ctx, &load);
        assert_eq!(breakdown.score(SourceCandidate::Solar), 110);
        assert_eq!(breakdown.reasoning(), ["Partly cloudy, moderate solar favor"]);
    }

    #[test]
    fn thresholds_are_strict() {
        let ctx = Context::builder(Utc::now())
            .weather(30.0, None)
            .ambient_light(500.0)
            .carbon_intensity(500.0)
            .build();
        let load = LoadDescriptor::new("tv", LoadPriority::Medium, 150.0, false);
        let breakdown = SourceScorer::default().score_sources(&ctx, &load);
        // 30% is partly cloudy, 500 light and 500 carbon trigger nothing.
        assert_eq!(breakdown.score(SourceCandidate::Solar), 110);
        assert_eq!(breakdown.score(SourceCandidate::Grid), 50);
        assert_eq!(breakdown.score(SourceCandidate::Battery), 75);
    }

    #[test]
    fn empty_context_scores_base_weights() {
        let ctx = Context::builder(Utc::now()).build();
        let load = LoadDescriptor::new("router", LoadPriority::Low, 10.0, false);
        let breakdown = SourceScorer::default().score_sources(&ctx, &load);
        assert_eq!(breakdown.score(SourceCandidate::Solar), 100);
        assert_eq!(breakdown.score(SourceCandidate::Battery), 75);
        assert_eq!(breakdown.score(SourceCandidate::Grid), 50);
        assert_eq!(breakdown.score(SourceCandidate::Generator), 25);
        assert!(breakdown.reasoning().is_empty());
    }

    #[test]
    fn unavailable_sources_keep_scores_but_cannot_win() {
        let ctx = Context::builder(Utc::now())
            .weather(10.0, None)
            .available(SourceCandidate::Solar, false)
            .build();
        let breakdown = SourceScorer::default().score_sources(&ctx, &hvac());
        assert_eq!(breakdown.score(SourceCandidate::Solar), 120);
        assert!(!breakdown.is_available(SourceCandidate::Solar));
        assert_eq!(breakdown.recommended(), Ok(SourceCandidate::Battery));
    }

    #[test]
    fn exhausted_capacity_gates_source() {
        let ctx = Context::builder(Utc::now())
            .source(SourceCandidate::Solar, SourceStatus::with_capacity(3000.0, 2500.0))
            .build();
        let breakdown = SourceScorer::default().score_sources(&ctx, &hvac());
        assert!(!breakdown.is_available(SourceCandidate::Solar));

        let small = LoadDescriptor::new("fan", LoadPriority::Low, 400.0, false);
        let breakdown = SourceScorer::default().score_sources(&ctx, &small);
        assert!(breakdown.is_available(SourceCandidate::Solar));
    }

    #[test]
    fn all_unavailable_is_an_error() {
        let ctx = Context::builder(Utc::now())
            .available(SourceCandidate::Grid, false)
            .available(SourceCandidate::Solar, false)
            .available(SourceCandidate::Battery, false)
            .build();
        let breakdown = SourceScorer::default().score_sources(&ctx, &hvac());
        assert_eq!(
            breakdown.recommended(),
            Err(DecisionError::AllSourcesUnavailable)
        );
    }
}
