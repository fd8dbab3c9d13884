//! Registry of controllable household loads.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::decision::types::{LoadDescriptor, LoadPriority};

/// Errors raised while building a [`LoadRegistry`].
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("cannot read load file \"{path}\": {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid load file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("duplicate load name \"{0}\"")]
    Duplicate(String),
    #[error("load \"{name}\": rated_power_w must be finite and >= 0")]
    InvalidPower { name: String },
}

fn default_current_source() -> String {
    "grid".to_string()
}

/// A load plus the source it is currently drawing from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredLoad {
    pub descriptor: LoadDescriptor,
    /// Free-form source name; unrecognized names are scored as 0 when advising.
    pub current_source: String,
}

/// TOML row of a `[[loads]]` table.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LoadEntry {
    name: String,
    priority: LoadPriority,
    rated_power_w: f64,
    #[serde(default)]
    can_defer: bool,
    #[serde(default = "default_current_source")]
    current_source: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LoadFile {
    #[serde(default)]
    loads: Vec<LoadEntry>,
}

/// Ordered set of loads with unique names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadRegistry {
    loads: Vec<RegisteredLoad>,
}

impl LoadRegistry {
    /// Builds a registry, rejecting duplicate names and invalid ratings.
    ///
    /// # Errors
    ///
    /// Returns a `RegistryError` on the first invalid load.
    pub fn new(loads: Vec<RegisteredLoad>) -> Result<Self, RegistryError> {
        let mut seen = HashSet::new();
        for load in &loads {
            let d = &load.descriptor;
            if !(d.rated_power_w.is_finite() && d.rated_power_w >= 0.0) {
                return Err(RegistryError::InvalidPower {
                    name: d.name.clone(),
                });
            }
            if !seen.insert(d.name.as_str()) {
                return Err(RegistryError::Duplicate(d.name.clone()));
            }
        }
        Ok(Self { loads })
    }

    /// Typical household: three critical loads and four deferrable ones.
    pub fn household_defaults() -> Self {
        let load = |name: &str, priority, watts, can_defer| RegisteredLoad {
            descriptor: LoadDescriptor::new(name, priority, watts, can_defer),
            current_source: default_current_source(),
        };
        Self {
            loads: vec![
                load("lights", LoadPriority::Critical, 200.0, false),
                load("router", LoadPriority::Critical, 50.0, false),
                load("refrigerator", LoadPriority::Critical, 150.0, false),
                load("washing_machine", LoadPriority::Low, 1500.0, true),
                load("ev_charger", LoadPriority::Medium, 3000.0, true),
                load("air_conditioner", LoadPriority::High, 2000.0, true),
                load("dishwasher", LoadPriority::Low, 1200.0, true),
            ],
        }
    }

    /// Parses `[[loads]]` tables from TOML.
    ///
    /// # Errors
    ///
    /// Returns a `RegistryError` for malformed TOML, duplicates, or invalid ratings.
    pub fn from_toml_str(s: &str) -> Result<Self, RegistryError> {
        let file: LoadFile = toml::from_str(s)?;
        let loads = file
            .loads
            .into_iter()
            .map(|e| RegisteredLoad {
                descriptor: LoadDescriptor::new(e.name, e.priority, e.rated_power_w, e.can_defer),
                current_source: e.current_source,
            })
            .collect();
        Self::new(loads)
    }

    /// Reads and parses a load file.
    ///
    /// # Errors
    ///
    /// Returns a `RegistryError` if the file cannot be read or is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, RegistryError> {
        let content = fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn len(&self) -> usize {
        self.loads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loads.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredLoad> {
        self.loads.iter()
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredLoad> {
        self.loads.iter().find(|l| l.descriptor.name == name)
    }

    /// Load descriptors in registry order.
    pub fn descriptors(&self) -> Vec<LoadDescriptor> {
        self.loads.iter().map(|l| l.descriptor.clone()).collect()
    }

    /// Records that `name` now draws from `source`. Returns `false` for unknown loads.
    pub fn set_current_source(&mut self, name: &str, source: &str) -> bool {
        match self.loads.iter_mut().find(|l| l.descriptor.name == name) {
            Some(load) => {
                load.current_source = source.to_string();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::shedding::is_deferrable;

    #[test]
    fn household_defaults_split_critical_and_deferrable() {
        let registry = LoadRegistry::household_defaults();
        assert_eq!(registry.len(), 7);
        let deferrable: Vec<&str> = registry
            .iter()
            .filter(|l| is_deferrable(&l.descriptor))
            .map(|l| l.descriptor.name.as_str())
            .collect();
        assert_eq!(
            deferrable,
            ["washing_machine", "ev_charger", "air_conditioner", "dishwasher"]
        );
        assert!(registry.iter().all(|l| l.current_source == "grid"));
    }

    #[test]
    fn parses_toml_with_defaults() {
        let toml = r#"
[[loads]]
name = "HVAC"
priority = "high"
rated_power_w = 2000.0

[[loads]]
name = "pool_pump"
priority = "low"
rated_power_w = 900.0
can_defer = true
current_source = "solar"
"#;
        let registry = LoadRegistry::from_toml_str(toml).expect("valid load file");
        assert_eq!(registry.len(), 2);
        let hvac = registry.get("HVAC").expect("HVAC registered");
        assert!(!hvac.descriptor.can_defer);
        assert_eq!(hvac.current_source, "grid");
        assert_eq!(
            registry.get("pool_pump").map(|l| l.current_source.as_str()),
            Some("solar")
        );
    }

    #[test]
    fn rejects_duplicates() {
        let toml = r#"
[[loads]]
name = "kettle"
priority = "medium"
rated_power_w = 2200.0

[[loads]]
name = "kettle"
priority = "low"
rated_power_w = 2200.0
"#;
        assert!(matches!(
            LoadRegistry::from_toml_str(toml),
            Err(RegistryError::Duplicate(name)) if name == "kettle"
        ));
    }

    #[test]
    fn rejects_unknown_fields_and_bad_power() {
        let toml = r#"
[[loads]]
name = "kettle"
priority = "medium"
rated_power_w = 2200.0
colour = "red"
"#;
        assert!(matches!(
            LoadRegistry::from_toml_str(toml),
            Err(RegistryError::Toml(_))
        ));

        let toml = r#"
[[loads]]
name = "kettle"
priority = "medium"
rated_power_w = -5.0
"#;
        assert!(matches!(
            LoadRegistry::from_toml_str(toml),
            Err(RegistryError::InvalidPower { .. })
        ));
    }

    #[test]
    fn tracks_current_source() {
        let mut registry = LoadRegistry::household_defaults();
        assert!(registry.set_current_source("dishwasher", "solar"));
        assert!(!registry.set_current_source("sauna", "solar"));
        assert_eq!(
            registry.get("dishwasher").map(|l| l.current_source.as_str()),
            Some("solar")
        );
    }
}
