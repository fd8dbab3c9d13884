//! Seeded synthetic household conditions for running without sensors.

use chrono::{DateTime, Duration, Timelike, Utc};
use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::trace;

use super::provider::{ContextProvider, ProviderError};
use super::types::Context;

/// Upper bound of the 12-bit light sensor ADC.
pub const LDR_MAX: f64 = 4095.0;

/// Fraction of full sun available at `hour` (0 at night, 1 near 12:00).
pub fn solar_factor(hour: u32) -> f64 {
    match hour {
        0..=5 | 19.. => 0.0,
        6..=7 => f64::from(hour - 6) / 2.0 * 0.5,
        8..=15 => 0.6 + 0.4 * (f64::from(hour - 8) * std::f64::consts::PI / 8.0).sin(),
        _ => f64::from(19 - hour) / 3.0 * 0.6,
    }
}

/// Household occupancy level at `hour`, used for indoor lighting at night.
pub fn occupancy_factor(hour: u32) -> f64 {
    match hour {
        0..=5 => 0.2,
        6..=8 => 0.8,
        9..=16 => 0.4,
        17..=21 => 1.0,
        _ => 0.3,
    }
}

/// Produces one diurnal context per [`gather`] call, advancing the clock.
///
/// Identical seeds and start times yield identical sequences.
///
/// [`gather`]: ContextProvider::gather
#[derive(Debug, Clone)]
pub struct SimulatedContextProvider {
    rng: StdRng,
    now: DateTime<Utc>,
    step: Duration,
    /// Installed PV capacity (kW).
    pub solar_peak_kw: f64,
    cloud_cover_pct: f64,
    battery_soc_pct: f64,
}

impl SimulatedContextProvider {
    /// Starts at `start` with one-hour steps.
    pub fn new(seed: u64, start: DateTime<Utc>) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            now: start,
            step: Duration::hours(1),
            solar_peak_kw: 3.0,
            cloud_cover_pct: 30.0,
            battery_soc_pct: 80.0,
        }
    }

    pub fn with_step(mut self, step: Duration) -> Self {
        self.step = step;
        self
    }

    /// Timestamp of the next context to be produced.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn carbon_intensity(&mut self, hour: u32) -> f64 {
        let base = 450.0;
        match hour {
            10..=14 => base - 100.0 + self.rng.random_range(-20.0..=20.0),
            18..=21 => base + 150.0 + self.rng.random_range(-20.0..=20.0),
            _ => base + self.rng.random_range(-30.0..=30.0),
        }
    }

    fn grid_price(&mut self, hour: u32) -> f64 {
        let base = match hour {
            22.. | 0..=5 => 4.0,
            9..=11 | 18..=21 => 8.0,
            _ => 6.0,
        };
        base + self.rng.random_range(-0.5..=0.5)
    }

    fn ambient_light(&mut self, hour: u32, sun: f64) -> f64 {
        let raw = if sun > 0.0 {
            2000.0 + sun * 2000.0 + self.rng.random_range(-300.0..=300.0)
        } else {
            500.0 + occupancy_factor(hour) * 800.0 + self.rng.random_range(-100.0..=100.0)
        };
        raw.clamp(0.0, LDR_MAX)
    }
}

impl ContextProvider for SimulatedContextProvider {
    fn gather(&mut self) -> Result<Context, ProviderError> {
        let hour = self.now.hour();
        let sun = solar_factor(hour);

        self.cloud_cover_pct =
            (self.cloud_cover_pct + self.rng.random_range(-10.0..=10.0)).clamp(0.0, 100.0);
        let solar_kw = self.solar_peak_kw * sun * (1.0 - self.cloud_cover_pct / 100.0 * 0.1);

        // Charge while the sun is up, drain in the evening.
        let soc_delta = (sun - 0.4) * 5.0;
        self.battery_soc_pct = (self.battery_soc_pct + soc_delta).clamp(20.0, 95.0);

        let temperature = 25.0 + sun * 5.0 + self.rng.random_range(-1.0..=1.0);
        let carbon = self.carbon_intensity(hour);
        let price = self.grid_price(hour);
        let light = self.ambient_light(hour, sun);

        let context = Context::builder(self.now)
            .weather(self.cloud_cover_pct, Some(temperature))
            .carbon_intensity(carbon)
            .ambient_light(light)
            .battery_soc_pct(self.battery_soc_pct)
            .solar_available_kw(solar_kw)
            .grid_price_per_kwh(price)
            .build();

        trace!(hour, carbon, price, light, "simulated context");
        self.now += self.step;
        Ok(context)
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}
