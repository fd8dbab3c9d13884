//! TOML-based engine configuration and preset definitions.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::decision::allocation::Preferences;
use crate::decision::types::LoadPriority;

/// Top-level engine configuration parsed from TOML.
///
/// All fields have defaults matching the stock tuning. Load from TOML with
/// [`EngineConfig::from_toml_file`] or use [`EngineConfig::default`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Source scoring weights and thresholds.
    #[serde(default)]
    pub scoring: ScoringConfig,
    /// Switch hysteresis.
    #[serde(default)]
    pub switching: SwitchingConfig,
    /// Load shedding thresholds.
    #[serde(default)]
    pub shedding: SheddingConfig,
    /// Dispatch allocation cost model.
    #[serde(default)]
    pub allocation: AllocationConfig,
    /// Default cost/carbon preference weights.
    #[serde(default)]
    pub preferences: Preferences,
}

/// Base preference weights per source (higher is better).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BaseWeights {
    pub solar: i32,
    pub battery: i32,
    pub grid: i32,
    pub generator: i32,
}

impl Default for BaseWeights {
    fn default() -> Self {
        Self {
            solar: 100,
            battery: 75,
            grid: 50,
            generator: 25,
        }
    }
}

impl BaseWeights {
    /// Weights in solar, battery, grid, generator order.
    pub fn as_array(&self) -> [i32; 4] {
        [self.solar, self.battery, self.grid, self.generator]
    }
}

/// Source scoring thresholds and adjustments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScoringConfig {
    pub base: BaseWeights,
    /// Cloud cover (%) below which the sky counts as clear.
    pub clear_sky_cloud_pct: f64,
    /// Cloud cover (%) below which the sky counts as partly cloudy.
    pub partly_cloudy_cloud_pct: f64,
    pub clear_sky_solar_bonus: i32,
    pub partly_cloudy_solar_bonus: i32,
    /// Raw light sensor level above which solar gets a bonus.
    pub high_light_threshold: f64,
    pub high_light_solar_bonus: i32,
    /// Carbon intensity (gCO2eq/kWh) above which grid is penalized.
    pub high_carbon_threshold: f64,
    pub high_carbon_grid_penalty: i32,
    /// Carbon intensity (gCO2eq/kWh) below which grid gets a bonus.
    pub low_carbon_threshold: f64,
    pub low_carbon_grid_bonus: i32,
    /// Minimum load priority that favors battery backup.
    pub battery_priority_threshold: LoadPriority,
    pub priority_battery_bonus: i32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base: BaseWeights::default(),
            clear_sky_cloud_pct: 30.0,
            partly_cloudy_cloud_pct: 60.0,
            clear_sky_solar_bonus: 20,
            partly_cloudy_solar_bonus: 10,
            high_light_threshold: 500.0,
            high_light_solar_bonus: 15,
            high_carbon_threshold: 500.0,
            high_carbon_grid_penalty: 30,
            low_carbon_threshold: 300.0,
            low_carbon_grid_bonus: 20,
            battery_priority_threshold: LoadPriority::High,
            priority_battery_bonus: 15,
        }
    }
}

/// Switch hysteresis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SwitchingConfig {
    /// Score improvement that must be exceeded before switching.
    pub hysteresis_margin: i32,
}

impl Default for SwitchingConfig {
    fn default() -> Self {
        Self {
            hysteresis_margin: 10,
        }
    }
}

/// Load shedding thresholds and savings baselines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SheddingConfig {
    /// Carbon intensity (gCO2eq/kWh) above which deferrable loads wait.
    pub carbon_threshold: f64,
    /// Grid price per kWh above which deferrable loads wait.
    pub price_threshold: f64,
    /// Carbon intensity a deferred load is expected to run at later.
    pub clean_carbon_baseline: f64,
    /// Grid price a deferred load is expected to pay later.
    pub normal_grid_price: f64,
}

impl Default for SheddingConfig {
    fn default() -> Self {
        Self {
            carbon_threshold: 700.0,
            price_threshold: 8.0,
            clean_carbon_baseline: 400.0,
            normal_grid_price: 5.0,
        }
    }
}

/// Cost and emission model for dispatch allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AllocationConfig {
    /// Solar maintenance cost per kWh.
    pub solar_maintenance_cost: f64,
    /// Battery cycling cost per kWh.
    pub battery_cycle_cost: f64,
    /// Lifecycle emissions of solar (gCO2eq/kWh).
    pub solar_carbon_g_per_kwh: f64,
    /// Battery emissions as a fraction of grid intensity (stored grid energy).
    pub battery_carbon_factor: f64,
    /// Usable battery capacity (kWh).
    pub battery_capacity_kwh: f64,
    /// Maximum battery discharge (kW).
    pub battery_max_discharge_kw: f64,
    /// Degradation cost of one full battery cycle.
    pub degradation_cost_per_cycle: f64,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            solar_maintenance_cost: 0.05,
            battery_cycle_cost: 0.10,
            solar_carbon_g_per_kwh: 50.0,
            battery_carbon_factor: 0.8,
            battery_capacity_kwh: 10.0,
            battery_max_discharge_kw: 2.0,
            degradation_cost_per_cycle: 5.0,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"scoring.clear_sky_cloud_pct"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl EngineConfig {
    /// Available preset names.
    pub const PRESETS: &[&str] = &["default", "carbon_sensitive", "cost_saver"];

    /// Favors clean sources: grid is penalized earlier and deferrable loads
    /// wait out dirtier grid hours.
    pub fn carbon_sensitive() -> Self {
        Self {
            scoring: ScoringConfig {
                high_carbon_threshold: 450.0,
                high_carbon_grid_penalty: 40,
                low_carbon_threshold: 250.0,
                ..ScoringConfig::default()
            },
            shedding: SheddingConfig {
                carbon_threshold: 550.0,
                ..SheddingConfig::default()
            },
            preferences: Preferences {
                cost_weight: 0.2,
                carbon_weight: 0.8,
            },
            ..Self::default()
        }
    }

    /// Favors cheap energy: tighter price trigger and cost-weighted dispatch.
    pub fn cost_saver() -> Self {
        Self {
            shedding: SheddingConfig {
                price_threshold: 6.5,
                ..SheddingConfig::default()
            },
            preferences: Preferences {
                cost_weight: 0.8,
                carbon_weight: 0.2,
            },
            ..Self::default()
        }
    }

    /// Loads a configuration from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "default" => Ok(Self::default()),
            "carbon_sensitive" => Ok(Self::carbon_sensitive()),
            "cost_saver" => Ok(Self::cost_saver()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("config", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let sc = &self.scoring;

        if !(0.0..=100.0).contains(&sc.clear_sky_cloud_pct) {
            errors.push(ConfigError::new(
                "scoring.clear_sky_cloud_pct",
                "must be in [0, 100]",
            ));
        }
        if !(0.0..=100.0).contains(&sc.partly_cloudy_cloud_pct) {
            errors.push(ConfigError::new(
                "scoring.partly_cloudy_cloud_pct",
                "must be in [0, 100]",
            ));
        }
        if sc.clear_sky_cloud_pct > sc.partly_cloudy_cloud_pct {
            errors.push(ConfigError::new(
                "scoring.clear_sky_cloud_pct",
                "must be <= scoring.partly_cloudy_cloud_pct",
            ));
        }
        if !sc.high_light_threshold.is_finite() {
            errors.push(ConfigError::new(
                "scoring.high_light_threshold",
                "must be finite",
            ));
        }
        if !(sc.low_carbon_threshold.is_finite() && sc.high_carbon_threshold.is_finite()) {
            errors.push(ConfigError::new(
                "scoring.high_carbon_threshold",
                "carbon thresholds must be finite",
            ));
        } else if sc.low_carbon_threshold > sc.high_carbon_threshold {
            errors.push(ConfigError::new(
                "scoring.low_carbon_threshold",
                "must be <= scoring.high_carbon_threshold",
            ));
        }
        // Direction is fixed by the scorer; these are magnitudes.
        let adjustments = [
            ("scoring.clear_sky_solar_bonus", sc.clear_sky_solar_bonus),
            ("scoring.partly_cloudy_solar_bonus", sc.partly_cloudy_solar_bonus),
            ("scoring.high_light_solar_bonus", sc.high_light_solar_bonus),
            ("scoring.high_carbon_grid_penalty", sc.high_carbon_grid_penalty),
            ("scoring.low_carbon_grid_bonus", sc.low_carbon_grid_bonus),
            ("scoring.priority_battery_bonus", sc.priority_battery_bonus),
        ];
        for (field, value) in adjustments {
            if value < 0 {
                errors.push(ConfigError::new(field, "must be >= 0"));
            }
        }

        if self.switching.hysteresis_margin < 0 {
            errors.push(ConfigError::new(
                "switching.hysteresis_margin",
                "must be >= 0",
            ));
        }

        let sh = &self.shedding;
        if !(sh.carbon_threshold.is_finite() && sh.carbon_threshold >= 0.0) {
            errors.push(ConfigError::new(
                "shedding.carbon_threshold",
                "must be a finite value >= 0",
            ));
        }
        if !(sh.price_threshold.is_finite() && sh.price_threshold >= 0.0) {
            errors.push(ConfigError::new(
                "shedding.price_threshold",
                "must be a finite value >= 0",
            ));
        }

        let al = &self.allocation;
        if !(al.battery_capacity_kwh.is_finite() && al.battery_capacity_kwh > 0.0) {
            errors.push(ConfigError::new(
                "allocation.battery_capacity_kwh",
                "must be > 0",
            ));
        }
        if !(al.battery_max_discharge_kw.is_finite() && al.battery_max_discharge_kw >= 0.0) {
            errors.push(ConfigError::new(
                "allocation.battery_max_discharge_kw",
                "must be >= 0",
            ));
        }
        if !(0.0..=1.0).contains(&al.battery_carbon_factor) {
            errors.push(ConfigError::new(
                "allocation.battery_carbon_factor",
                "must be in [0.0, 1.0]",
            ));
        }

        errors.extend(self.preferences.validate("preferences"));
        errors
    }
}

impl Preferences {
    /// Checks both weights lie in `[0, 1]` and are not both zero.
    pub fn validate(&self, prefix: &str) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        if !(0.0..=1.0).contains(&self.cost_weight) {
            errors.push(ConfigError::new(
                &format!("{prefix}.cost_weight"),
                "must be in [0.0, 1.0]",
            ));
        }
        if !(0.0..=1.0).contains(&self.carbon_weight) {
            errors.push(ConfigError::new(
                &format!("{prefix}.carbon_weight"),
                "must be in [0.0, 1.0]",
            ));
        }
        if self.cost_weight + self.carbon_weight <= 0.0 {
            errors.push(ConfigError::new(
                &format!("{prefix}.cost_weight"),
                "cost_weight and carbon_weight cannot both be 0",
            ));
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_valid() {
        let cfg = EngineConfig::default();
        let errors = cfg.validate();
        assert!(errors.is_empty(), "default should be valid: {errors:?}");
    }

    #[test]
    fn default_thresholds_match_stock_tuning() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.scoring.base.as_array(), [100, 75, 50, 25]);
        assert_eq!(cfg.scoring.clear_sky_cloud_pct, 30.0);
        assert_eq!(cfg.scoring.partly_cloudy_cloud_pct, 60.0);
        assert_eq!(cfg.scoring.high_light_threshold, 500.0);
        assert_eq!(cfg.switching.hysteresis_margin, 10);
        assert_eq!(cfg.shedding.carbon_threshold, 700.0);
        assert_eq!(cfg.shedding.price_threshold, 8.0);
    }

    #[test]
    fn negative_adjustments_rejected() {
        let cfg = EngineConfig {
            scoring: ScoringConfig {
                high_carbon_grid_penalty: -40,
                clear_sky_solar_bonus: -50,
                ..ScoringConfig::default()
            },
            ..EngineConfig::default()
        };
        let errors = cfg.validate();
        assert_eq!(errors.len(), 2, "{errors:?}");
        assert!(errors.iter().any(|e| e.field == "scoring.high_carbon_grid_penalty"));
        assert!(errors.iter().any(|e| e.field == "scoring.clear_sky_solar_bonus"));
    }

    #[test]
    fn zero_adjustments_accepted() {
        let toml = r#"
[scoring]
priority_battery_bonus = 0
low_carbon_grid_bonus = 0
"#;
        let cfg = EngineConfig::from_toml_str(toml).expect("valid TOML");
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn from_preset_unknown() {
        let err = EngineConfig::from_preset("nonexistent");
        assert!(err.is_err());
        let e = err.unwrap_err();
        assert!(e.message.contains("unknown preset"));
    }

    #[test]
    fn all_presets_are_valid() {
        for name in EngineConfig::PRESETS {
            let cfg = EngineConfig::from_preset(name);
            assert!(cfg.is_ok(), "preset \"{name}\" should load");
            let errors = cfg.as_ref().map(|c| c.validate()).unwrap_or_default();
            assert!(
                errors.is_empty(),
                "preset \"{name}\" should be valid: {errors:?}"
            );
        }
    }

    #[test]
    fn carbon_sensitive_sheds_earlier() {
        let base = EngineConfig::default();
        let green = EngineConfig::carbon_sensitive();
        assert!(green.shedding.carbon_threshold < base.shedding.carbon_threshold);
        assert!(green.preferences.carbon_weight > base.preferences.carbon_weight);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let toml = r#"
[switching]
hysteresis_margin = 25

[scoring.base]
generator = 5
"#;
        let cfg = EngineConfig::from_toml_str(toml);
        assert!(cfg.is_ok(), "partial TOML should parse: {:?}", cfg.err());
        let cfg = cfg.ok();
        assert_eq!(cfg.as_ref().map(|c| c.switching.hysteresis_margin), Some(25));
        assert_eq!(cfg.as_ref().map(|c| c.scoring.base.generator), Some(5));
        assert_eq!(cfg.as_ref().map(|c| c.scoring.base.solar), Some(100));
        assert_eq!(cfg.as_ref().map(|c| c.shedding.price_threshold), Some(8.0));
    }

    #[test]
    fn priority_threshold_parses_from_name() {
        let toml = r#"
[scoring]
battery_priority_threshold = "critical"
"#;
        let cfg = EngineConfig::from_toml_str(toml).ok();
        assert_eq!(
            cfg.map(|c| c.scoring.battery_priority_threshold),
            Some(LoadPriority::Critical)
        );
    }

    #[test]
    fn invalid_toml_unknown_field() {
        let toml = r#"
[shedding]
carbon_threshold = 650.0
bogus_field = true
"#;
        assert!(EngineConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn validation_catches_inverted_cloud_bands() {
        let mut cfg = EngineConfig::default();
        cfg.scoring.clear_sky_cloud_pct = 70.0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "scoring.clear_sky_cloud_pct"));
    }

    #[test]
    fn validation_catches_inverted_carbon_bands() {
        let mut cfg = EngineConfig::default();
        cfg.scoring.low_carbon_threshold = 600.0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "scoring.low_carbon_threshold"));
    }

    #[test]
    fn validation_catches_negative_margin() {
        let mut cfg = EngineConfig::default();
        cfg.switching.hysteresis_margin = -1;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "switching.hysteresis_margin"));
    }

    #[test]
    fn validation_catches_bad_weights() {
        let mut cfg = EngineConfig::default();
        cfg.preferences.cost_weight = 0.0;
        cfg.preferences.carbon_weight = 0.0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "preferences.cost_weight"));

        cfg.preferences.carbon_weight = 1.5;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "preferences.carbon_weight"));
    }

    #[test]
    fn config_error_display_names_field() {
        let e = ConfigError::new("shedding.price_threshold", "must be >= 0");
        assert_eq!(
            e.to_string(),
            "config error: shedding.price_threshold: must be >= 0"
        );
    }
}
