//! Load classification and carbon/price driven shedding.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::SheddingConfig;
use crate::context::Context;

use super::types::{DeferralAdvice, DeferralTrigger, LoadDescriptor, LoadPriority};

/// Static load class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadClass {
    Critical,
    Deferrable,
}

/// Classifies a load independent of any context.
pub fn classify(load: &LoadDescriptor) -> LoadClass {
    if is_deferrable(load) {
        LoadClass::Deferrable
    } else {
        LoadClass::Critical
    }
}

/// `true` when the load may be postponed. CRITICAL loads never are.
pub fn is_deferrable(load: &LoadDescriptor) -> bool {
    load.can_defer && load.priority != LoadPriority::Critical
}

/// Decides whether deferrable loads should wait for cleaner or cheaper power.
///
/// Pure predicate over its inputs; carbon and price are independent triggers.
#[derive(Debug, Clone, Default)]
pub struct SheddingAdvisor {
    config: SheddingConfig,
}

impl SheddingAdvisor {
    pub fn new(config: SheddingConfig) -> Self {
        Self { config }
    }

    /// `true` if `load` is deferrable and either threshold is exceeded.
    pub fn should_defer(&self, load: &LoadDescriptor, context: &Context) -> bool {
        is_deferrable(load) && self.trigger(context).is_some()
    }

    fn trigger(&self, context: &Context) -> Option<DeferralTrigger> {
        if context
            .carbon_intensity()
            .is_some_and(|c| c > self.config.carbon_threshold)
        {
            Some(DeferralTrigger::Carbon)
        } else if context
            .grid_price_per_kwh()
            .is_some_and(|p| p > self.config.price_threshold)
        {
            Some(DeferralTrigger::Price)
        } else {
            None
        }
    }

    /// Deferral verdict with a reason and estimated savings.
    pub fn advise(&self, load: &LoadDescriptor, context: &Context) -> DeferralAdvice {
        if !is_deferrable(load) {
            return DeferralAdvice {
                defer: false,
                reason: "Critical load - cannot defer".to_string(),
                trigger: None,
                carbon_savings_g: 0.0,
                cost_savings: 0.0,
            };
        }

        let power_kw = load.rated_power_kw();
        match self.trigger(context) {
            Some(DeferralTrigger::Carbon) => {
                let carbon = context.carbon_intensity().unwrap_or_default();
                DeferralAdvice {
                    defer: true,
                    reason: format!(
                        "High carbon intensity ({carbon:.0} gCO2eq/kWh) - defer until cleaner"
                    ),
                    trigger: Some(DeferralTrigger::Carbon),
                    carbon_savings_g: power_kw * (carbon - self.config.clean_carbon_baseline).max(0.0),
                    cost_savings: 0.0,
                }
            }
            Some(DeferralTrigger::Price) => {
                let price = context.grid_price_per_kwh().unwrap_or_default();
                DeferralAdvice {
                    defer: true,
                    reason: format!("High grid price ({price:.2}/kWh) - defer until cheaper"),
                    trigger: Some(DeferralTrigger::Price),
                    carbon_savings_g: 0.0,
                    cost_savings: power_kw * (price - self.config.normal_grid_price).max(0.0),
                }
            }
            None => DeferralAdvice {
                defer: false,
                reason: "Good conditions - proceed with load".to_string(),
                trigger: None,
                carbon_savings_g: 0.0,
                cost_savings: 0.0,
            },
        }
    }

    /// Deferral advice for every load plus aggregate savings.
    pub fn plan(&self, loads: &[LoadDescriptor], context: &Context) -> SheddingPlan {
        let mut entries = Vec::with_capacity(loads.len());
        let mut deferred_kw = 0.0;
        let mut carbon_saved_g = 0.0;
        let mut cost_saved = 0.0;

        for load in loads {
            let advice = self.advise(load, context);
            if advice.defer {
                deferred_kw += load.rated_power_kw();
                carbon_saved_g += advice.carbon_savings_g;
                cost_saved += advice.cost_savings;
            }
            entries.push(PlannedLoad {
                load: load.name.clone(),
                class: classify(load),
                advice,
            });
        }

        SheddingPlan {
            entries,
            total_deferred_kw: deferred_kw,
            total_carbon_saved_g: carbon_saved_g,
            total_cost_saved: cost_saved,
        }
    }
}

/// One load's entry in a [`SheddingPlan`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedLoad {
    pub load: String,
    pub class: LoadClass,
    pub advice: DeferralAdvice,
}

/// Shedding verdicts for a set of loads under one context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheddingPlan {
    pub entries: Vec<PlannedLoad>,
    pub total_deferred_kw: f64,
    pub total_carbon_saved_g: f64,
    pub total_cost_saved: f64,
}

impl SheddingPlan {
    /// Names of the loads to defer.
    pub fn deferred(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|e| e.advice.defer)
            .map(|e| e.load.as_str())
    }
}

impl fmt::Display for SheddingPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.total_deferred_kw > 0.0 {
            write!(
                f,
                "Defer {:.1} kW to save {:.0}g CO2",
                self.total_deferred_kw, self.total_carbon_saved_g
            )
        } else {
            f.write_str("All loads can proceed")
        }
    }
}
