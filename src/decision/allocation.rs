//! Cost/carbon weighted power split across solar, battery and grid.

use serde::{Deserialize, Serialize};

use crate::config::AllocationConfig;
use crate::context::Context;

use super::types::{LoadDescriptor, SourceCandidate};

/// Operator trade-off between cost and emissions.
///
/// Passed into every allocation explicitly rather than read from shared state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Preferences {
    pub cost_weight: f64,
    pub carbon_weight: f64,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            cost_weight: 0.5,
            carbon_weight: 0.5,
        }
    }
}

/// Power split for one load at one instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub solar_kw: f64,
    pub battery_kw: f64,
    pub grid_kw: f64,
    /// Power nothing could supply (grid offline and other sources short).
    pub unserved_kw: f64,
    /// Estimated running cost per hour.
    pub cost: f64,
    /// Estimated emissions per hour (g CO2eq).
    pub carbon_g: f64,
    /// State-of-charge fraction the battery was not allowed to go below.
    pub discharge_floor: f64,
}

impl Allocation {
    /// Source supplying the largest share, if any power was allocated.
    pub fn primary(&self) -> Option<SourceCandidate> {
        [
            (SourceCandidate::Solar, self.solar_kw),
            (SourceCandidate::Battery, self.battery_kw),
            (SourceCandidate::Grid, self.grid_kw),
        ]
        .into_iter()
        .filter(|(_, kw)| *kw > 0.0)
        .fold(None, |best: Option<(SourceCandidate, f64)>, cur| match best {
            Some(b) if b.1 >= cur.1 => Some(b),
            _ => Some(cur),
        })
        .map(|(source, _)| source)
    }
}

/// Per-kWh price and emission factors of one source.
#[derive(Debug, Clone, Copy)]
struct Rates {
    cost_per_kwh: f64,
    carbon_per_kwh: f64,
}

/// Greedy dispatch: solar first, battery when it beats grid, grid for the rest.
///
/// Pure; the battery state of charge in the context is read, never changed.
#[derive(Debug, Clone, Default)]
pub struct Allocator {
    config: AllocationConfig,
}

impl Allocator {
    pub fn new(config: AllocationConfig) -> Self {
        Self { config }
    }

    /// Fraction of capacity kept in reserve for a given potential profit.
    pub fn discharge_floor(&self, potential_profit: f64) -> f64 {
        let degradation = self.config.degradation_cost_per_cycle;
        if potential_profit > degradation * 2.0 {
            0.10
        } else if potential_profit > degradation {
            0.25
        } else {
            0.40
        }
    }

    fn rates(&self, source: SourceCandidate, price: f64, carbon: f64) -> Rates {
        let c = &self.config;
        match source {
            SourceCandidate::Solar => Rates {
                cost_per_kwh: c.solar_maintenance_cost,
                carbon_per_kwh: c.solar_carbon_g_per_kwh,
            },
            SourceCandidate::Battery => Rates {
                cost_per_kwh: c.battery_cycle_cost,
                carbon_per_kwh: carbon * c.battery_carbon_factor,
            },
            // Generator is never dispatched; price it like grid.
            SourceCandidate::Grid | SourceCandidate::Generator => Rates {
                cost_per_kwh: price,
                carbon_per_kwh: carbon,
            },
        }
    }

    /// Weighted score of supplying `kw` from a source; lower is better.
    fn combined(prefs: &Preferences, rates: Rates, kw: f64) -> f64 {
        let cost = kw * rates.cost_per_kwh;
        let carbon = kw * rates.carbon_per_kwh;
        prefs.cost_weight * cost + prefs.carbon_weight * (carbon / 1000.0 * 10.0)
    }

    /// Splits `load`'s rated power across the available sources.
    pub fn allocate(&self, context: &Context, load: &LoadDescriptor, prefs: &Preferences) -> Allocation {
        let c = &self.config;
        let needed = load.rated_power_kw();
        let price = context.grid_price_per_kwh().unwrap_or(0.0);
        let carbon = context.carbon_intensity().unwrap_or(0.0);

        let solar = self.rates(SourceCandidate::Solar, price, carbon);
        let battery = self.rates(SourceCandidate::Battery, price, carbon);
        let grid = self.rates(SourceCandidate::Grid, price, carbon);

        let potential_profit = needed * (price - c.battery_cycle_cost);
        let floor = self.discharge_floor(potential_profit);

        let mut remaining = needed;

        let solar_kw = if context.source(SourceCandidate::Solar).available {
            let supply = context.solar_available_kw().unwrap_or(0.0).max(0.0);
            supply.min(remaining)
        } else {
            0.0
        };
        remaining -= solar_kw;

        let battery_kw = if remaining > 0.0 && context.source(SourceCandidate::Battery).available {
            let soc = context.battery_soc_pct().unwrap_or(0.0).clamp(0.0, 100.0);
            let stored = c.battery_capacity_kwh * soc / 100.0;
            let headroom = c
                .battery_max_discharge_kw
                .min((stored - c.battery_capacity_kwh * floor).max(0.0));
            let cheaper = Self::combined(prefs, battery, needed) < Self::combined(prefs, grid, needed);
            if headroom > 0.0 && cheaper {
                headroom.min(remaining)
            } else {
                0.0
            }
        } else {
            0.0
        };
        remaining -= battery_kw;

        let (grid_kw, unserved_kw) = if context.grid_available() {
            (remaining.max(0.0), 0.0)
        } else {
            (0.0, remaining.max(0.0))
        };

        let cost = solar_kw * solar.cost_per_kwh
            + battery_kw * battery.cost_per_kwh
            + grid_kw * grid.cost_per_kwh;
        let carbon_g = solar_kw * solar.carbon_per_kwh
            + battery_kw * battery.carbon_per_kwh
            + grid_kw * grid.carbon_per_kwh;

        Allocation {
            solar_kw,
            battery_kw,
            grid_kw,
            unserved_kw,
            cost,
            carbon_g,
            discharge_floor: floor,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::decision::types::LoadPriority;

    fn load(watts: f64) -> LoadDescriptor {
        LoadDescriptor::new("ev_charger", LoadPriority::Medium, watts, true)
    }

    #[test]
    fn solar_is_used_first() {
        let ctx = Context::builder(Utc::now())
            .solar_available_kw(2.5)
            .battery_soc_pct(80.0)
            .carbon_intensity(450.0)
            .grid_price_per_kwh(6.0)
            .build();
        let a = Allocator::default().allocate(&ctx, &load(2000.0), &Preferences::default());
        assert!((a.solar_kw - 2.0).abs() < 1e-9);
        assert_eq!(a.battery_kw, 0.0);
        assert_eq!(a.grid_kw, 0.0);
        assert_eq!(a.primary(), Some(SourceCandidate::Solar));
    }

    #[test]
    fn battery_covers_gap_when_cheaper_than_grid() {
        let ctx = Context::builder(Utc::now())
            .solar_available_kw(1.0)
            .battery_soc_pct(80.0)
            .carbon_intensity(450.0)
            .grid_price_per_kwh(8.0)
            .build();
        let a = Allocator::default().allocate(&ctx, &load(4000.0), &Preferences::default());
        assert!((a.solar_kw - 1.0).abs() < 1e-9);
        // max discharge caps the battery at 2 kW
        assert!((a.battery_kw - 2.0).abs() < 1e-9);
        assert!((a.grid_kw - 1.0).abs() < 1e-9);
        // profit 4 * (8 - 0.1) = 31.6 > 2 * 5.0
        assert_eq!(a.discharge_floor, 0.10);
    }

    #[test]
    fn discharge_floor_tracks_profit() {
        let alloc = Allocator::default();
        assert_eq!(alloc.discharge_floor(2.0), 0.40);
        assert_eq!(alloc.discharge_floor(6.0), 0.25);
        assert_eq!(alloc.discharge_floor(12.0), 0.10);
    }

    #[test]
    fn low_soc_keeps_battery_in_reserve() {
        let ctx = Context::builder(Utc::now())
            .battery_soc_pct(35.0)
            .carbon_intensity(450.0)
            .grid_price_per_kwh(1.0)
            .build();
        // profit 1 * 0.9 is under the degradation cost, floor 40% > 35% SoC
        let a = Allocator::default().allocate(&ctx, &load(1000.0), &Preferences::default());
        assert_eq!(a.discharge_floor, 0.40);
        assert_eq!(a.battery_kw, 0.0);
        assert!((a.grid_kw - 1.0).abs() < 1e-9);
    }

    #[test]
    fn offline_grid_leaves_power_unserved() {
        let ctx = Context::builder(Utc::now())
            .available(SourceCandidate::Grid, false)
            .solar_available_kw(0.5)
            .build();
        let a = Allocator::default().allocate(&ctx, &load(1500.0), &Preferences::default());
        assert!((a.solar_kw - 0.5).abs() < 1e-9);
        assert_eq!(a.grid_kw, 0.0);
        assert!((a.unserved_kw - 1.0).abs() < 1e-9);
    }

    #[test]
    fn offline_solar_is_skipped() {
        let ctx = Context::builder(Utc::now())
            .available(SourceCandidate::Solar, false)
            .solar_available_kw(5.0)
            .grid_price_per_kwh(5.0)
            .carbon_intensity(300.0)
            .build();
        let a = Allocator::default().allocate(&ctx, &load(1000.0), &Preferences::default());
        assert_eq!(a.solar_kw, 0.0);
        assert!((a.grid_kw - 1.0).abs() < 1e-9);
        assert!((a.cost - 5.0).abs() < 1e-9);
        assert!((a.carbon_g - 300.0).abs() < 1e-9);
    }

    #[test]
    fn empty_context_falls_back_to_grid() {
        let ctx = Context::builder(Utc::now()).build();
        let a = Allocator::default().allocate(&ctx, &load(800.0), &Preferences::default());
        assert!((a.grid_kw - 0.8).abs() < 1e-9);
        assert_eq!(a.cost, 0.0);
        assert_eq!(a.primary(), Some(SourceCandidate::Grid));
    }
}
