//! Decision assembly: sequences scoring, switch advice, shedding and dispatch.

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::context::{Context, ContextProvider, ProviderError};
use crate::loads::LoadRegistry;

use super::allocation::{Allocator, Preferences};
use super::error::DecisionError;
use super::scorer::SourceScorer;
use super::shedding::{SheddingAdvisor, SheddingPlan};
use super::switch::SwitchAdvisor;
use super::types::{Decision, LoadDescriptor};

/// Stateless decision pipeline built from an [`EngineConfig`].
///
/// Safe to share across threads; every call works only on its arguments.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    scorer: SourceScorer,
    switcher: SwitchAdvisor,
    shedder: SheddingAdvisor,
    allocator: Allocator,
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl DecisionEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            scorer: SourceScorer::new(config.scoring.clone()),
            switcher: SwitchAdvisor::new(config.switching.clone()),
            shedder: SheddingAdvisor::new(config.shedding.clone()),
            allocator: Allocator::new(config.allocation.clone()),
        }
    }

    pub fn scorer(&self) -> &SourceScorer {
        &self.scorer
    }

    pub fn switcher(&self) -> &SwitchAdvisor {
        &self.switcher
    }

    pub fn shedder(&self) -> &SheddingAdvisor {
        &self.shedder
    }

    pub fn allocator(&self) -> &Allocator {
        &self.allocator
    }

    /// Builds a complete [`Decision`] for one load.
    ///
    /// Order: score, recommend, switch advice, then deferral and allocation.
    /// Deferral is reported alongside the recommendation and never gates it.
    ///
    /// # Errors
    ///
    /// Returns [`DecisionError::AllSourcesUnavailable`] when no source can
    /// carry the load. Choosing a fallback is up to the caller.
    pub fn decide(
        &self,
        context: &Context,
        load: &LoadDescriptor,
        current_source: &str,
        preferences: &Preferences,
    ) -> Result<Decision, DecisionError> {
        let scores = self.scorer.score_sources(context, load);
        let recommended = scores.recommended()?;
        let switch = self.switcher.advise(&scores, current_source)?;
        let deferral = self.shedder.advise(load, context);
        let allocation = self.allocator.allocate(context, load, preferences);

        let mut reasoning = Vec::with_capacity(scores.reasoning().len() + 1);
        reasoning.push(format!("Selected {recommended} for {}", load.name));
        reasoning.extend(scores.reasoning().iter().cloned());

        Ok(Decision {
            load: load.name.clone(),
            recommended_source: recommended,
            reasoning,
            confidence: scores.confidence(recommended),
            scores,
            switch,
            deferral,
            allocation,
            timestamp: context.observed_at(),
        })
    }

    /// Gathers one fresh context and decides for every registered load.
    ///
    /// Loads with no available source are collected in
    /// [`CycleOutcome::failures`] instead of aborting the cycle.
    ///
    /// # Errors
    ///
    /// Returns the provider's error if no context could be gathered.
    pub fn run_cycle(
        &self,
        provider: &mut dyn ContextProvider,
        loads: &LoadRegistry,
        preferences: &Preferences,
    ) -> Result<CycleOutcome, ProviderError> {
        let context = provider.gather()?;

        let mut decisions = Vec::with_capacity(loads.len());
        let mut failures = Vec::new();
        for entry in loads.iter() {
            match self.decide(&context, &entry.descriptor, &entry.current_source, preferences) {
                Ok(decision) => decisions.push(decision),
                Err(error) => failures.push(LoadFailure {
                    load: entry.descriptor.name.clone(),
                    current_source: entry.current_source.clone(),
                    error,
                }),
            }
        }

        let shedding = self.shedder.plan(&loads.descriptors(), &context);

        Ok(CycleOutcome {
            context,
            decisions,
            failures,
            shedding,
        })
    }
}

/// A load the engine could not place on any source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadFailure {
    pub load: String,
    pub current_source: String,
    pub error: DecisionError,
}

/// Everything produced by one [`DecisionEngine::run_cycle`] call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleOutcome {
    pub context: Context,
    pub decisions: Vec<Decision>,
    pub failures: Vec<LoadFailure>,
    pub shedding: SheddingPlan,
}
