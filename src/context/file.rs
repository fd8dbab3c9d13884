//! CSV replay of recorded or simulated context snapshots.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use crate::decision::types::SourceCandidate;

use super::provider::{ContextProvider, ProviderError};
use super::types::Context;

/// Column header expected by [`FileContextProvider`].
pub const CONTEXT_CSV_HEADER: &str = "timestamp,cloud_cover_pct,temperature_c,carbon_intensity,\
                                      ambient_light,battery_soc_pct,solar_available_kw,\
                                      grid_price_per_kwh,grid_available,solar_available,\
                                      battery_available,generator_available";

/// One CSV row. Empty cells and missing columns are absent readings.
#[derive(Debug, Deserialize)]
struct ContextRow {
    timestamp: DateTime<Utc>,
    cloud_cover_pct: Option<f64>,
    temperature_c: Option<f64>,
    carbon_intensity: Option<f64>,
    ambient_light: Option<f64>,
    battery_soc_pct: Option<f64>,
    solar_available_kw: Option<f64>,
    grid_price_per_kwh: Option<f64>,
    grid_available: Option<bool>,
    solar_available: Option<bool>,
    battery_available: Option<bool>,
    generator_available: Option<bool>,
}

impl ContextRow {
    fn into_context(self) -> Context {
        let mut builder = Context::builder(self.timestamp);
        if let Some(cloud) = self.cloud_cover_pct {
            builder = builder.weather(cloud, self.temperature_c);
        }
        if let Some(v) = self.carbon_intensity {
            builder = builder.carbon_intensity(v);
        }
        if let Some(v) = self.ambient_light {
            builder = builder.ambient_light(v);
        }
        if let Some(v) = self.battery_soc_pct {
            builder = builder.battery_soc_pct(v);
        }
        if let Some(v) = self.solar_available_kw {
            builder = builder.solar_available_kw(v);
        }
        if let Some(v) = self.grid_price_per_kwh {
            builder = builder.grid_price_per_kwh(v);
        }
        let flags = [
            (SourceCandidate::Grid, self.grid_available),
            (SourceCandidate::Solar, self.solar_available),
            (SourceCandidate::Battery, self.battery_available),
            (SourceCandidate::Generator, self.generator_available),
        ];
        for (source, flag) in flags {
            if let Some(available) = flag {
                builder = builder.available(source, available);
            }
        }
        builder.build()
    }
}

/// Replays context rows from a CSV file, one row per [`gather`] call.
///
/// All rows are parsed up front so a malformed file fails at open time.
///
/// [`gather`]: ContextProvider::gather
#[derive(Debug, Clone)]
pub struct FileContextProvider {
    contexts: Vec<Context>,
    cursor: usize,
    looping: bool,
}

impl FileContextProvider {
    /// Opens and parses a context CSV.
    ///
    /// # Errors
    ///
    /// Returns a `ProviderError` if the file cannot be read or a row is malformed.
    pub fn open(path: &Path) -> Result<Self, ProviderError> {
        let file = File::open(path)?;
        let provider = Self::from_reader(file)?;
        info!(
            path = %path.display(),
            rows = provider.len(),
            "loaded context replay"
        );
        Ok(provider)
    }

    /// Parses context rows from any reader.
    ///
    /// # Errors
    ///
    /// Returns a `ProviderError` if a row is malformed.
    pub fn from_reader(reader: impl Read) -> Result<Self, ProviderError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut contexts = Vec::new();
        for row in rdr.deserialize::<ContextRow>() {
            contexts.push(row?.into_context());
        }
        Ok(Self {
            contexts,
            cursor: 0,
            looping: false,
        })
    }

    /// Restart from the first row instead of failing when exhausted.
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Rows not yet replayed.
    pub fn remaining(&self) -> usize {
        self.contexts.len().saturating_sub(self.cursor)
    }
}

impl ContextProvider for FileContextProvider {
    fn gather(&mut self) -> Result<Context, ProviderError> {
        if self.cursor >= self.contexts.len() {
            if !self.looping || self.contexts.is_empty() {
                return Err(ProviderError::Exhausted);
            }
            debug!("context replay wrapped around");
            self.cursor = 0;
        }
        let context = self.contexts[self.cursor].clone();
        self.cursor += 1;
        debug!(row = self.cursor, observed_at = %context.observed_at(), "replayed context");
        Ok(context)
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
