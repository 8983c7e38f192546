//! Keyword heuristics used when no external analysis is available.
//!
//! The external LLM collaborator normally supplies signal type, business-unit
//! matches, and dimension scores. When it has not run (or failed), these
//! heuristics produce moderate defaults so a signal can still move through
//! the pipeline and be reviewed, rather than being silently dropped.

use serde::Serialize;
use vpgd_core::{BusinessUnitConfig, SignalType};

/// A business unit matched to a signal, with relevance in [0, 1].
#[derive(Debug, Clone, Serialize)]
pub struct BuMatch {
    pub bu_id: String,
    pub relevance: f64,
    pub matched_keywords: Vec<String>,
}

/// Classify a signal's type from keyword cues in its title and summary.
/// Falls through to `MarketShift` when nothing more specific matches.
#[must_use]
pub fn classify_signal_type(text: &str) -> SignalType {
    let text = text.to_lowercase();
    let any = |words: &[&str]| words.iter().any(|w| text.contains(w));

    if any(&["competitor", "competes", "launch", "threat", "rival"]) {
        SignalType::CompetitiveThreat
    } else if any(&["rfi", "rfp", "order", "revenue", "opportunity", "seeking"]) {
        SignalType::RevenueOpportunity
    } else if any(&["tariff", "trade", "duty", "import", "export"]) {
        SignalType::TradeTariff
    } else if any(&["acqui", "partner", "alliance", "joint venture"]) {
        SignalType::PartnershipSignal
    } else if any(&["patent", "innovation", "breakthrough", "technology"]) {
        SignalType::TechnologyTrend
    } else {
        SignalType::MarketShift
    }
}

/// Match a signal's text against each active business unit's keyword lists.
///
/// A unit scores by the fraction of its keywords found in the text,
/// normalized so that even one or two hits give a meaningful relevance,
/// capped at 1.0. Units with no hits are omitted; results are sorted by
/// descending relevance.
#[must_use]
pub fn match_business_units(text: &str, units: &[&BusinessUnitConfig]) -> Vec<BuMatch> {
    let text = text.to_lowercase();

    let mut matches: Vec<BuMatch> = units
        .iter()
        .filter(|u| u.active)
        .filter_map(|unit| {
            let keywords = unit.all_keywords();
            let matched: Vec<String> = keywords
                .iter()
                .filter(|k| text.contains(&k.to_lowercase()))
                .map(|k| (*k).to_string())
                .collect();

            if matched.is_empty() || keywords.is_empty() {
                return None;
            }

            #[allow(clippy::cast_precision_loss)]
            let hits = matched.len() as f64;
            #[allow(clippy::cast_precision_loss)]
            let denom = (keywords.len() as f64 * 0.25).max(1.0);
            let relevance = (0.4 + (hits / denom) * 0.6).min(1.0);

            Some(BuMatch {
                bu_id: unit.id.clone(),
                relevance: (relevance * 1000.0).round() / 1000.0,
                matched_keywords: matched,
            })
        })
        .collect();

    matches.sort_by(|a, b| {
        b.relevance
            .partial_cmp(&a.relevance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    matches
}

/// Moderate default dimension scores for a signal, boosted by type and by
/// the strength of the best business-unit match. Signals must earn their
/// way into the digest through keyword relevance; unmatched signals score
/// low on strategic alignment.
#[must_use]
pub fn default_dimensions(
    signal_type: SignalType,
    top_relevance: Option<f64>,
) -> crate::score::DimensionScores {
    let (mut revenue, mut time, mut competitive) = (5.0, 5.0, 4.0);

    match signal_type {
        SignalType::CompetitiveThreat => {
            competitive = 7.0;
            time = 7.0;
        }
        SignalType::RevenueOpportunity => {
            revenue = 7.0;
            time = 7.0;
        }
        SignalType::TradeTariff => {
            revenue = 7.0;
            competitive = 6.0;
        }
        SignalType::PartnershipSignal => {
            revenue = 6.0;
        }
        SignalType::TechnologyTrend
        | SignalType::CustomerIntelligence
        | SignalType::MarketShift => {}
    }

    let alignment = top_relevance.map_or(3.0, |r| (r * 10.0).round().clamp(4.0, 10.0));

    crate::score::DimensionScores {
        revenue_impact: revenue,
        time_sensitivity: time,
        strategic_alignment: alignment,
        competitive_pressure: competitive,
    }
}
