//! Hysteresis check deciding whether a load should change source.

use crate::config::SwitchingConfig;
use crate::context::Context;

use super::error::DecisionError;
use super::scorer::SourceScorer;
use super::types::{LoadDescriptor, ScoreBreakdown, SourceCandidate, SwitchAdvice};

/// Recommends a switch only when the score gain beats a fixed margin.
///
/// The margin keeps two nearly-equal sources from flapping back and forth.
#[derive(Debug, Clone, Default)]
pub struct SwitchAdvisor {
    config: SwitchingConfig,
}

impl SwitchAdvisor {
    pub fn new(config: SwitchingConfig) -> Self {
        Self { config }
    }

    pub fn margin(&self) -> i32 {
        self.config.hysteresis_margin
    }

    /// Scores the sources and compares the winner with `current_source`.
    ///
    /// # Errors
    ///
    /// Returns [`DecisionError::AllSourcesUnavailable`] if nothing can be
    /// recommended.
    pub fn should_switch(
        &self,
        scorer: &SourceScorer,
        context: &Context,
        load: &LoadDescriptor,
        current_source: &str,
    ) -> Result<SwitchAdvice, DecisionError> {
        let breakdown = scorer.score_sources(context, load);
        self.advise(&breakdown, current_source)
    }

    /// Compares an existing breakdown's winner with `current_source`.
    ///
    /// An unrecognized or unavailable current source scores 0, so moving off
    /// it is favored.
    ///
    /// # Errors
    ///
    /// Returns [`DecisionError::AllSourcesUnavailable`] if nothing can be
    /// recommended.
    pub fn advise(
        &self,
        breakdown: &ScoreBreakdown,
        current_source: &str,
    ) -> Result<SwitchAdvice, DecisionError> {
        let recommended = breakdown.recommended()?;
        let current = current_source.parse::<SourceCandidate>().ok();

        if current == Some(recommended) {
            return Ok(SwitchAdvice {
                should_switch: false,
                current_source: current_source.to_string(),
                recommended_source: recommended,
                reasoning: "Current source is optimal".to_string(),
                score_improvement: 0,
            });
        }

        let current_score = match current {
            Some(source) if breakdown.is_available(source) => breakdown.score(source),
            _ => 0,
        };
        let improvement = breakdown.score(recommended) - current_score;

        let (should_switch, reasoning) = if improvement > self.config.hysteresis_margin {
            let mut reasoning = format!("Switch from {current_source} to {recommended}.");
            for reason in breakdown.reasoning() {
                reasoning.push(' ');
                reasoning.push_str(reason);
            }
            (true, reasoning)
        } else {
            (
                false,
                "Improvement not significant enough to justify switching".to_string(),
            )
        };

        Ok(SwitchAdvice {
            should_switch,
            current_source: current_source.to_string(),
            recommended_source: recommended,
            reasoning,
            score_improvement: improvement,
        })
    }
}
