//! Immutable snapshot of the conditions a decision is made under.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decision::types::SourceCandidate;

/// Latest weather observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    /// Cloud cover (0–100 %).
    pub cloud_cover_pct: f64,
    /// Air temperature (°C), if reported.
    #[serde(default)]
    pub temperature_c: Option<f64>,
}

/// Availability and headroom of one power source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceStatus {
    /// Operator/hardware availability flag.
    pub available: bool,
    /// Capacity (W). `None` means unbounded (e.g., a utility connection).
    #[serde(default)]
    pub capacity_w: Option<f64>,
    /// Power already being delivered (W).
    #[serde(default)]
    pub output_w: f64,
}

impl SourceStatus {
    /// Available with unbounded capacity.
    pub fn online() -> Self {
        Self {
            available: true,
            capacity_w: None,
            output_w: 0.0,
        }
    }

    /// Not available.
    pub fn offline() -> Self {
        Self {
            available: false,
            capacity_w: None,
            output_w: 0.0,
        }
    }

    /// Available with a finite capacity and current output.
    pub fn with_capacity(capacity_w: f64, output_w: f64) -> Self {
        Self {
            available: true,
            capacity_w: Some(capacity_w),
            output_w,
        }
    }

    /// Whether this source can take on `load_w` more watts.
    ///
    /// Non-finite capacity is read as unbounded; non-finite output as zero.
    pub fn can_supply(&self, load_w: f64) -> bool {
        if !self.available {
            return false;
        }
        let Some(capacity) = self.capacity_w.filter(|c| c.is_finite()) else {
            return true;
        };
        let output = if self.output_w.is_finite() { self.output_w } else { 0.0 };
        let load = if load_w.is_finite() { load_w.max(0.0) } else { 0.0 };
        output + load <= capacity
    }
}

/// Status of every candidate source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceStatuses {
    pub solar: SourceStatus,
    pub battery: SourceStatus,
    pub grid: SourceStatus,
    pub generator: SourceStatus,
}

impl Default for SourceStatuses {
    /// Solar, battery, and grid online; no generator installed.
    fn default() -> Self {
        Self {
            solar: SourceStatus::online(),
            battery: SourceStatus::online(),
            grid: SourceStatus::online(),
            generator: SourceStatus::offline(),
        }
    }
}

impl SourceStatuses {
    pub fn get(&self, source: SourceCandidate) -> &SourceStatus {
        match source {
            SourceCandidate::Solar => &self.solar,
            SourceCandidate::Battery => &self.battery,
            SourceCandidate::Grid => &self.grid,
            SourceCandidate::Generator => &self.generator,
        }
    }

    fn get_mut(&mut self, source: SourceCandidate) -> &mut SourceStatus {
        match source {
            SourceCandidate::Solar => &mut self.solar,
            SourceCandidate::Battery => &mut self.battery,
            SourceCandidate::Grid => &mut self.grid,
            SourceCandidate::Generator => &mut self.generator,
        }
    }
}

/// Snapshot of grid, weather, sensor, and storage conditions.
///
/// Built fresh for each decision with [`Context::builder`] and never mutated
/// afterwards. Every optional reading may be absent; accessors also treat
/// non-finite values as absent so the scorer sees them as neutral.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    observed_at: DateTime<Utc>,
    #[serde(default)]
    sources: SourceStatuses,
    #[serde(default)]
    weather: Option<Weather>,
    #[serde(default)]
    carbon_intensity: Option<f64>,
    #[serde(default)]
    ambient_light: Option<f64>,
    #[serde(default)]
    battery_soc_pct: Option<f64>,
    #[serde(default)]
    solar_available_kw: Option<f64>,
    #[serde(default)]
    grid_price_per_kwh: Option<f64>,
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

impl Context {
    /// Starts a context observed at `observed_at` with default source statuses
    /// and every reading absent.
    pub fn builder(observed_at: DateTime<Utc>) -> ContextBuilder {
        ContextBuilder {
            inner: Context {
                observed_at,
                sources: SourceStatuses::default(),
                weather: None,
                carbon_intensity: None,
                ambient_light: None,
                battery_soc_pct: None,
                solar_available_kw: None,
                grid_price_per_kwh: None,
            },
        }
    }

    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }

    pub fn sources(&self) -> &SourceStatuses {
        &self.sources
    }

    pub fn source(&self, source: SourceCandidate) -> &SourceStatus {
        self.sources.get(source)
    }

    pub fn grid_available(&self) -> bool {
        self.sources.grid.available
    }

    pub fn weather(&self) -> Option<&Weather> {
        self.weather.as_ref()
    }

    /// Cloud cover (%), absent when there is no weather or it is not finite.
    pub fn cloud_cover_pct(&self) -> Option<f64> {
        finite(self.weather.map(|w| w.cloud_cover_pct))
    }

    pub fn temperature_c(&self) -> Option<f64> {
        finite(self.weather.and_then(|w| w.temperature_c))
    }

    /// Grid carbon intensity (gCO2eq/kWh).
    pub fn carbon_intensity(&self) -> Option<f64> {
        finite(self.carbon_intensity)
    }

    /// Raw ambient light sensor reading.
    pub fn ambient_light(&self) -> Option<f64> {
        finite(self.ambient_light)
    }

    pub fn battery_soc_pct(&self) -> Option<f64> {
        finite(self.battery_soc_pct)
    }

    pub fn solar_available_kw(&self) -> Option<f64> {
        finite(self.solar_available_kw)
    }

    pub fn grid_price_per_kwh(&self) -> Option<f64> {
        finite(self.grid_price_per_kwh)
    }
}

/// Builder for [`Context`].
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    inner: Context,
}

impl ContextBuilder {
    pub fn weather(mut self, cloud_cover_pct: f64, temperature_c: Option<f64>) -> Self {
        self.inner.weather = Some(Weather {
            cloud_cover_pct,
            temperature_c,
        });
        self
    }

    pub fn carbon_intensity(mut self, value: f64) -> Self {
        self.inner.carbon_intensity = Some(value);
        self
    }

    pub fn ambient_light(mut self, value: f64) -> Self {
        self.inner.ambient_light = Some(value);
        self
    }

    pub fn battery_soc_pct(mut self, value: f64) -> Self {
        self.inner.battery_soc_pct = Some(value);
        self
    }

    pub fn solar_available_kw(mut self, value: f64) -> Self {
        self.inner.solar_available_kw = Some(value);
        self
    }

    pub fn grid_price_per_kwh(mut self, value: f64) -> Self {
        self.inner.grid_price_per_kwh = Some(value);
        self
    }

    /// Replaces the status of one source.
    pub fn source(mut self, source: SourceCandidate, status: SourceStatus) -> Self {
        *self.inner.sources.get_mut(source) = status;
        self
    }

    /// Sets only the availability flag of one source.
    pub fn available(mut self, source: SourceCandidate, available: bool) -> Self {
        self.inner.sources.get_mut(source).available = available;
        self
    }

    pub fn build(self) -> Context {
        self.inner
    }
}
