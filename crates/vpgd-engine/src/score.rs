//! Composite priority scoring over four weighted dimensions.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use vpgd_core::ScoringWeights;

#[derive(Debug, Error)]
pub enum ScoreInputError {
    #[error("dimension '{dimension}' is {value}, outside [1, 10]")]
    OutOfRange { dimension: &'static str, value: f64 },
    #[error("weight '{dimension}' is {value}; weights must be non-negative and finite")]
    InvalidWeight { dimension: &'static str, value: f64 },
}

/// The four 1-10 dimension scores supplied by the external analysis step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionScores {
    pub revenue_impact: f64,
    pub time_sensitivity: f64,
    pub strategic_alignment: f64,
    pub competitive_pressure: f64,
}

impl DimensionScores {
    fn entries(self) -> [(&'static str, f64); 4] {
        [
            ("revenue_impact", self.revenue_impact),
            ("time_sensitivity", self.time_sensitivity),
            ("strategic_alignment", self.strategic_alignment),
            ("competitive_pressure", self.competitive_pressure),
        ]
    }
}

/// Validate the weight configuration up front.
///
/// Called once per run before any signal is scored: a structurally invalid
/// weight set refuses the entire run rather than producing silently wrong
/// composites.
///
/// # Errors
///
/// Returns [`ScoreInputError::InvalidWeight`] for a negative or non-finite weight.
pub fn validate_weights(weights: &ScoringWeights) -> Result<(), ScoreInputError> {
    for (dimension, value) in [
        ("revenue_impact", weights.revenue_impact),
        ("time_sensitivity", weights.time_sensitivity),
        ("strategic_alignment", weights.strategic_alignment),
        ("competitive_pressure", weights.competitive_pressure),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(ScoreInputError::InvalidWeight { dimension, value });
        }
    }
    Ok(())
}

/// Compute the weighted composite score, rounded to two decimals.
///
/// Deterministic: identical inputs always yield the identical composite.
/// Under the default weights (summing to 1) the result stays within [1, 10].
///
/// # Errors
///
/// Returns [`ScoreInputError::OutOfRange`] if any dimension is outside [1, 10].
pub fn composite_score(
    dims: DimensionScores,
    weights: &ScoringWeights,
) -> Result<f64, ScoreInputError> {
    for (dimension, value) in dims.entries() {
        if !value.is_finite() || !(1.0..=10.0).contains(&value) {
            return Err(ScoreInputError::OutOfRange { dimension, value });
        }
    }

    let composite = dims.revenue_impact * weights.revenue_impact
        + dims.time_sensitivity * weights.time_sensitivity
        + dims.strategic_alignment * weights.strategic_alignment
        + dims.competitive_pressure * weights.competitive_pressure;

    Ok((composite * 100.0).round() / 100.0)
}
