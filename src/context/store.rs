//! In-memory reading store and the provider that assembles contexts from it.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::decision::types::SourceCandidate;

use super::provider::{ContextProvider, ProviderError};
use super::types::{Context, SourceStatus, SourceStatuses};

/// Kind of on-premises sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    /// Light dependent resistor, raw 12-bit ADC units.
    Ldr,
    Current,
    Temperature,
    Humidity,
    Voltage,
}

impl SensorKind {
    const COUNT: usize = 5;

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub kind: SensorKind,
    pub sensor_id: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

/// Kind of external grid/weather datum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridDataKind {
    CarbonIntensity,
    /// `value` is air temperature; cloud cover travels alongside.
    Weather,
    ElectricityPrice,
}

impl GridDataKind {
    const COUNT: usize = 3;

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridReading {
    pub kind: GridDataKind,
    pub value: f64,
    #[serde(default)]
    pub cloud_cover_pct: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// Newest reading per sensor and grid kind, plus source status.
///
/// Older readings are dropped on arrival; a reading stamped earlier than
/// the one held for its kind is ignored.
#[derive(Debug, Clone, Default)]
pub struct ReadingStore {
    sensors: [Option<SensorReading>; SensorKind::COUNT],
    grid: [Option<GridReading>; GridDataKind::COUNT],
    sources: SourceStatuses,
    battery_soc_pct: Option<f64>,
    solar_available_kw: Option<f64>,
    updated_at: Option<DateTime<Utc>>,
}

impl ReadingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps the store for sharing between writers and a provider.
    pub fn shared(self) -> Arc<RwLock<ReadingStore>> {
        Arc::new(RwLock::new(self))
    }

    pub fn record_sensor(&mut self, reading: SensorReading) {
        let slot = &mut self.sensors[reading.kind.index()];
        if slot.as_ref().is_none_or(|held| reading.timestamp >= held.timestamp) {
            *slot = Some(reading);
        }
    }

    pub fn record_grid(&mut self, reading: GridReading) {
        let slot = &mut self.grid[reading.kind.index()];
        if slot.as_ref().is_none_or(|held| reading.timestamp >= held.timestamp) {
            *slot = Some(reading);
        }
    }

    pub fn set_source_status(&mut self, source: SourceCandidate, status: SourceStatus, at: DateTime<Utc>) {
        match source {
            SourceCandidate::Solar => self.sources.solar = status,
            SourceCandidate::Battery => self.sources.battery = status,
            SourceCandidate::Grid => self.sources.grid = status,
            SourceCandidate::Generator => self.sources.generator = status,
        }
        self.touch(at);
    }

    pub fn set_battery_soc(&mut self, soc_pct: f64, at: DateTime<Utc>) {
        self.battery_soc_pct = Some(soc_pct);
        self.touch(at);
    }

    pub fn set_solar_available_kw(&mut self, kw: f64, at: DateTime<Utc>) {
        self.solar_available_kw = Some(kw);
        self.touch(at);
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = Some(self.updated_at.map_or(at, |t| t.max(at)));
    }

    /// Newest reading of a sensor kind.
    pub fn latest_sensor(&self, kind: SensorKind) -> Option<&SensorReading> {
        self.sensors[kind.index()].as_ref()
    }

    /// Newest grid datum of a kind.
    pub fn latest_grid(&self, kind: GridDataKind) -> Option<&GridReading> {
        self.grid[kind.index()].as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.iter().all(Option::is_none)
            && self.grid.iter().all(Option::is_none)
            && self.updated_at.is_none()
    }

    /// Builds a context from the newest value of every reading.
    ///
    /// The context is stamped with the newest timestamp that went into it.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::EmptyStore`] if nothing was ever recorded.
    pub fn snapshot(&self) -> Result<Context, ProviderError> {
        let ldr = self.latest_sensor(SensorKind::Ldr);
        let temp_sensor = self.latest_sensor(SensorKind::Temperature);
        let weather = self.latest_grid(GridDataKind::Weather);
        let carbon = self.latest_grid(GridDataKind::CarbonIntensity);
        let price = self.latest_grid(GridDataKind::ElectricityPrice);

        let observed_at = [
            ldr.map(|r| r.timestamp),
            temp_sensor.map(|r| r.timestamp),
            weather.map(|r| r.timestamp),
            carbon.map(|r| r.timestamp),
            price.map(|r| r.timestamp),
            self.updated_at,
        ]
        .into_iter()
        .flatten()
        .max()
        .ok_or(ProviderError::EmptyStore)?;

        let mut builder = Context::builder(observed_at);
        for source in SourceCandidate::ALL {
            builder = builder.source(source, *self.sources.get(source));
        }
        if let Some(w) = weather {
            // A dedicated temperature sensor beats the forecast value.
            let temperature = temp_sensor.map(|r| r.value).or(Some(w.value));
            if let Some(cloud) = w.cloud_cover_pct {
                builder = builder.weather(cloud, temperature);
            }
        }
        if let Some(r) = ldr {
            builder = builder.ambient_light(r.value);
        }
        if let Some(r) = carbon {
            builder = builder.carbon_intensity(r.value);
        }
        if let Some(r) = price {
            builder = builder.grid_price_per_kwh(r.value);
        }
        if let Some(soc) = self.battery_soc_pct {
            builder = builder.battery_soc_pct(soc);
        }
        if let Some(kw) = self.solar_available_kw {
            builder = builder.solar_available_kw(kw);
        }
        Ok(builder.build())
    }
}

/// Reads the newest stored readings on every call.
#[derive(Debug, Clone)]
pub struct StoreContextProvider {
    store: Arc<RwLock<ReadingStore>>,
}

impl StoreContextProvider {
    pub fn new(store: Arc<RwLock<ReadingStore>>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<RwLock<ReadingStore>> {
        &self.store
    }
}

impl ContextProvider for StoreContextProvider {
    fn gather(&mut self) -> Result<Context, ProviderError> {
        let store = self.store.read().unwrap_or_else(PoisonError::into_inner);
        let context = store.snapshot()?;
        debug!(observed_at = %context.observed_at(), "assembled context from store");
        Ok(context)
    }

    fn name(&self) -> &'static str {
        "store"
    }
}
