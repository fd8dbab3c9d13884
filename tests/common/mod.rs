//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};

use energy_orchestrator::context::Context;
use energy_orchestrator::decision::types::{LoadDescriptor, LoadPriority, SourceCandidate};

/// Fixed observation time (2026-06-01 12:00 UTC).
pub fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
}

/// Clear sky (20 % cloud), bright (750 LDR), all of solar/battery/grid up.
pub fn sunny_context(carbon_intensity: f64) -> Context {
    Context::builder(noon())
        .weather(20.0, Some(28.0))
        .carbon_intensity(carbon_intensity)
        .ambient_light(750.0)
        .build()
}

/// Solar, battery and grid all down.
pub fn blackout_context() -> Context {
    Context::builder(noon())
        .available(SourceCandidate::Solar, false)
        .available(SourceCandidate::Battery, false)
        .available(SourceCandidate::Grid, false)
        .build()
}

/// 2 kW high-priority load that must not be deferred.
pub fn hvac() -> LoadDescriptor {
    LoadDescriptor::new("HVAC", LoadPriority::High, 2000.0, false)
}

/// 7.2 kW deferrable EV charger.
pub fn ev_charger() -> LoadDescriptor {
    LoadDescriptor::new("ev_charger", LoadPriority::Medium, 7200.0, true)
}

/// Six hourly rows: a dirty morning, a clean sunny midday, a pricey evening
/// and a grid outage with solar gone.
pub const DAY_CSV: &str = "\
timestamp,cloud_cover_pct,temperature_c,carbon_intensity,ambient_light,battery_soc_pct,solar_available_kw,grid_price_per_kwh,grid_available,solar_available,battery_available,generator_available
2026-06-01T06:00:00Z,80,18,720,120,60,0.2,4.5,true,true,true,false
2026-06-01T09:00:00Z,40,22,520,480,65,1.8,5.0,true,true,true,false
2026-06-01T12:00:00Z,10,28,250,900,80,3.0,4.0,true,true,true,false
2026-06-01T15:00:00Z,25,27,350,700,85,2.2,6.0,true,true,true,false
2026-06-01T18:00:00Z,70,23,610,200,70,0.1,9.5,true,true,true,false
2026-06-01T21:00:00Z,,,,,,,,false,false,false,false
";
