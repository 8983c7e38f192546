//! Engine tuning parameters, loaded from `thresholds.yaml`.
//!
//! Every knob the validation and trend engines consult lives here so it can
//! be changed between pipeline runs without a code change. Missing fields
//! fall back to the documented defaults via serde.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Weights applied to the four scoring dimensions. Not required to sum to 1,
/// but each must be non-negative; the default set sums to 1 so the composite
/// stays within [1, 10].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoringWeights {
    #[serde(default = "d_revenue_impact")]
    pub revenue_impact: f64,
    #[serde(default = "d_time_sensitivity")]
    pub time_sensitivity: f64,
    #[serde(default = "d_strategic_alignment")]
    pub strategic_alignment: f64,
    #[serde(default = "d_competitive_pressure")]
    pub competitive_pressure: f64,
}

fn d_revenue_impact() -> f64 {
    0.35
}
fn d_time_sensitivity() -> f64 {
    0.25
}
fn d_strategic_alignment() -> f64 {
    0.25
}
fn d_competitive_pressure() -> f64 {
    0.15
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            revenue_impact: d_revenue_impact(),
            time_sensitivity: d_time_sensitivity(),
            strategic_alignment: d_strategic_alignment(),
            competitive_pressure: d_competitive_pressure(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ValidationThresholds {
    /// Unverified signals are excluded from the digest unless their composite
    /// exceeds this score (they then carry a prominent warning).
    #[serde(default = "d_unverified_minimum")]
    pub unverified_minimum: f64,
}

fn d_unverified_minimum() -> f64 {
    8.0
}

impl Default for ValidationThresholds {
    fn default() -> Self {
        Self {
            unverified_minimum: d_unverified_minimum(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CorroborationThresholds {
    /// Minimum similarity in [0, 1] for two signals to corroborate.
    #[serde(default = "d_similarity_threshold")]
    pub similarity_threshold: f64,
    /// Pool signals collected more than this many days before the candidate
    /// are ignored.
    #[serde(default = "d_lookback_days")]
    pub lookback_days: i64,
    /// Maximum publish-date distance between corroborating signals.
    #[serde(default = "d_published_tolerance_days")]
    pub published_tolerance_days: i64,
    /// High-similarity pairs whose title direction diverges by at least this
    /// much are flagged for manual review (best-effort conflict heuristic).
    #[serde(default = "d_disagreement_threshold")]
    pub disagreement_threshold: f64,
}

fn d_similarity_threshold() -> f64 {
    0.55
}
fn d_lookback_days() -> i64 {
    14
}
fn d_published_tolerance_days() -> i64 {
    5
}
fn d_disagreement_threshold() -> f64 {
    0.6
}

impl Default for CorroborationThresholds {
    fn default() -> Self {
        Self {
            similarity_threshold: d_similarity_threshold(),
            lookback_days: d_lookback_days(),
            published_tolerance_days: d_published_tolerance_days(),
            disagreement_threshold: d_disagreement_threshold(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MomentumThresholds {
    /// Minimum week-over-week percentage change for a spike.
    #[serde(default = "d_spike_pct")]
    pub spike_pct: i64,
    /// Minimum current-week count for a spike (guards small denominators).
    #[serde(default = "d_spike_min_count")]
    pub spike_min_count: i64,
    /// Minimum change for rising.
    #[serde(default = "d_rising_pct")]
    pub rising_pct: i64,
    /// Maximum (negative) change for declining.
    #[serde(default = "d_declining_pct")]
    pub declining_pct: i64,
    /// Number of trailing weekly snapshots consulted for history.
    #[serde(default = "d_history_weeks")]
    pub history_weeks: i64,
}

fn d_spike_pct() -> i64 {
    100
}
fn d_spike_min_count() -> i64 {
    3
}
fn d_rising_pct() -> i64 {
    25
}
fn d_declining_pct() -> i64 {
    -25
}
fn d_history_weeks() -> i64 {
    12
}

impl Default for MomentumThresholds {
    fn default() -> Self {
        Self {
            spike_pct: d_spike_pct(),
            spike_min_count: d_spike_min_count(),
            rising_pct: d_rising_pct(),
            declining_pct: d_declining_pct(),
            history_weeks: d_history_weeks(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PersistenceThresholds {
    #[serde(default = "d_window_weeks")]
    pub window_weeks: usize,
    #[serde(default = "d_min_occurrences")]
    pub min_occurrences: usize,
    /// Tighter variant applied to competitor trend keys.
    #[serde(default = "d_competitor_window_weeks")]
    pub competitor_window_weeks: usize,
    #[serde(default = "d_competitor_min_occurrences")]
    pub competitor_min_occurrences: usize,
}

fn d_window_weeks() -> usize {
    4
}
fn d_min_occurrences() -> usize {
    3
}
fn d_competitor_window_weeks() -> usize {
    4
}
fn d_competitor_min_occurrences() -> usize {
    2
}

impl Default for PersistenceThresholds {
    fn default() -> Self {
        Self {
            window_weeks: d_window_weeks(),
            min_occurrences: d_min_occurrences(),
            competitor_window_weeks: d_competitor_window_weeks(),
            competitor_min_occurrences: d_competitor_min_occurrences(),
        }
    }
}

/// Root of `thresholds.yaml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineThresholds {
    #[serde(default)]
    pub weights: ScoringWeights,
    #[serde(default)]
    pub validation: ValidationThresholds,
    #[serde(default)]
    pub corroboration: CorroborationThresholds,
    #[serde(default)]
    pub momentum: MomentumThresholds,
    #[serde(default)]
    pub persistence: PersistenceThresholds,
}

/// Load and validate engine thresholds from a YAML file.
///
/// Like the unit registry, this is re-read at the start of each run.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails
/// structural validation (e.g. a negative weight).
pub fn load_thresholds(path: &Path) -> Result<EngineThresholds, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let thresholds: EngineThresholds = serde_yaml::from_str(&content)?;

    validate_thresholds(&thresholds)?;

    Ok(thresholds)
}

fn validate_thresholds(t: &EngineThresholds) -> Result<(), ConfigError> {
    let w = &t.weights;
    for (name, value) in [
        ("revenue_impact", w.revenue_impact),
        ("time_sensitivity", w.time_sensitivity),
        ("strategic_alignment", w.strategic_alignment),
        ("competitive_pressure", w.competitive_pressure),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(ConfigError::Validation(format!(
                "scoring weight '{name}' must be a non-negative number, got {value}"
            )));
        }
    }

    if !(0.0..=1.0).contains(&t.corroboration.similarity_threshold) {
        return Err(ConfigError::Validation(format!(
            "similarity_threshold must be within [0, 1], got {}",
            t.corroboration.similarity_threshold
        )));
    }
    if t.corroboration.lookback_days <= 0 || t.corroboration.published_tolerance_days <= 0 {
        return Err(ConfigError::Validation(
            "corroboration windows must be positive day counts".to_string(),
        ));
    }

    if t.persistence.window_weeks == 0 || t.persistence.min_occurrences == 0 {
        return Err(ConfigError::Validation(
            "persistence window and occurrence threshold must be positive".to_string(),
        ));
    }
    if t.momentum.history_weeks <= 0 {
        return Err(ConfigError::Validation(
            "momentum history_weeks must be positive".to_string(),
        ));
    }

    Ok(())
}
