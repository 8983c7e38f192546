use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// A business unit tracked by the digest, with the keyword lists used for
/// relevance matching and trend derivation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessUnitConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub monitoring_keywords: Vec<String>,
    #[serde(default)]
    pub key_products: Vec<String>,
    #[serde(default)]
    pub core_industries: Vec<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl BusinessUnitConfig {
    /// All keyword lists concatenated, for relevance matching.
    #[must_use]
    pub fn all_keywords(&self) -> Vec<&str> {
        self.monitoring_keywords
            .iter()
            .chain(&self.key_products)
            .chain(&self.core_industries)
            .map(String::as_str)
            .collect()
    }
}

/// Root of `business-units.yaml`: the BU registry plus the competitor names
/// and watch keywords used for `competitor` / `keyword` trend keys.
#[derive(Debug, Clone, Deserialize)]
pub struct UnitsFile {
    pub business_units: Vec<BusinessUnitConfig>,
    #[serde(default)]
    pub competitors: Vec<String>,
    #[serde(default)]
    pub watch_keywords: Vec<String>,
}

impl UnitsFile {
    /// Active business units only.
    #[must_use]
    pub fn active_units(&self) -> Vec<&BusinessUnitConfig> {
        self.business_units.iter().filter(|u| u.active).collect()
    }

    /// Look up a unit name by id, falling back to the id itself.
    #[must_use]
    pub fn unit_name<'a>(&'a self, bu_id: &'a str) -> &'a str {
        self.business_units
            .iter()
            .find(|u| u.id == bu_id)
            .map_or(bu_id, |u| u.name.as_str())
    }
}

/// Load and validate the business-unit configuration from a YAML file.
///
/// Re-read at the start of each pipeline run, so edits take effect between
/// runs without a restart.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_units(path: &Path) -> Result<UnitsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let units_file: UnitsFile = serde_yaml::from_str(&content)?;

    validate_units(&units_file)?;

    Ok(units_file)
}

fn validate_units(units_file: &UnitsFile) -> Result<(), ConfigError> {
    if units_file.business_units.is_empty() {
        return Err(ConfigError::Validation(
            "at least one business unit must be configured".to_string(),
        ));
    }

    let mut seen_ids = HashSet::new();
    for unit in &units_file.business_units {
        if unit.id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "business unit id must be non-empty".to_string(),
            ));
        }
        if unit.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "business unit '{}' has an empty name",
                unit.id
            )));
        }
        if !seen_ids.insert(unit.id.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate business unit id: '{}'",
                unit.id
            )));
        }
    }

    let mut seen_competitors = HashSet::new();
    for comp in &units_file.competitors {
        if !seen_competitors.insert(comp.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate competitor name: '{comp}'"
            )));
        }
    }

    Ok(())
}
