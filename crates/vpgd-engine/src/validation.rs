//! Validation-level classification and the digest inclusion gate.

use std::collections::HashSet;

use vpgd_core::{CorroborationThresholds, ValidationLevel};

use crate::corroborate::Corroboration;

/// Count distinct publishers backing a signal: the primary source plus at
/// most one corroboration per distinct publisher. Corroborations from the
/// primary's own publisher, or from a publisher already counted, do not
/// increase the count.
#[must_use]
pub fn distinct_source_count(primary_source: &str, corroborations: &[Corroboration]) -> usize {
    let primary = primary_source.to_lowercase();
    let mut seen: HashSet<String> = HashSet::new();

    for corr in corroborations {
        let publisher = corr.source_name.to_lowercase();
        if publisher != primary {
            seen.insert(publisher);
        }
    }

    1 + seen.len()
}

/// Map a distinct-source count to a validation level.
#[must_use]
pub fn classify(distinct_sources: usize) -> ValidationLevel {
    match distinct_sources {
        n if n >= 3 => ValidationLevel::Verified,
        2 => ValidationLevel::Likely,
        _ => ValidationLevel::Unverified,
    }
}

/// Digest inclusion decision for a validated, scored signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inclusion {
    Include,
    /// Unverified but scoring above the configured minimum; rendered with a
    /// prominent warning.
    IncludeWithWarning,
    Exclude,
}

/// Apply the inclusion gate. Verified and likely signals are never excluded
/// on validation grounds; unverified signals must beat `unverified_minimum`.
#[must_use]
pub fn inclusion(level: ValidationLevel, composite: f64, unverified_minimum: f64) -> Inclusion {
    match level {
        ValidationLevel::Verified | ValidationLevel::Likely => Inclusion::Include,
        ValidationLevel::Unverified => {
            if composite > unverified_minimum {
                Inclusion::IncludeWithWarning
            } else {
                Inclusion::Exclude
            }
        }
    }
}

/// Directional word weights for the conflict heuristic. Positive weights mark
/// favorable business developments, negative ones unfavorable; the sum is
/// clamped to [-1, 1].
const DIRECTION_LEXICON: &[(&str, f64)] = &[
    ("wins", 0.5),
    ("win", 0.4),
    ("growth", 0.4),
    ("expands", 0.4),
    ("expansion", 0.4),
    ("record", 0.3),
    ("surges", 0.5),
    ("approved", 0.4),
    ("partnership", 0.3),
    ("acquires", 0.3),
    ("profit", 0.4),
    ("beats", 0.4),
    ("launches", 0.2),
    ("denies", -0.4),
    ("cancels", -0.5),
    ("cancelled", -0.5),
    ("recall", -0.6),
    ("lawsuit", -0.5),
    ("loss", -0.4),
    ("losses", -0.4),
    ("decline", -0.4),
    ("declines", -0.4),
    ("layoffs", -0.5),
    ("bankruptcy", -0.7),
    ("halts", -0.5),
    ("misses", -0.4),
    ("falls", -0.4),
    ("shutdown", -0.6),
    ("tariff", -0.2),
];

/// Score the direction of a title using the lexicon, clamped to [-1, 1].
fn direction_score(text: &str) -> f64 {
    let mut score = 0.0_f64;
    for word in text.split_whitespace() {
        let w = word
            .trim_matches(|c: char| !c.is_alphabetic())
            .to_lowercase();
        if let Some(&(_, weight)) = DIRECTION_LEXICON.iter().find(|(lex, _)| *lex == w) {
            score += weight;
        }
    }
    score.clamp(-1.0, 1.0)
}

/// Best-effort conflict detection: two sources that report the same event
/// (high similarity) but whose titles point in opposite directions are
/// flagged for manual review. This never blocks corroboration; it only
/// raises a flag. Treat it as a heuristic, not a guarantee.
#[must_use]
pub fn flags_manual_review(
    candidate_title: &str,
    corroborating_title: &str,
    similarity: f64,
    cfg: &CorroborationThresholds,
) -> bool {
    if similarity < cfg.similarity_threshold {
        return false;
    }
    let a = direction_score(candidate_title);
    let b = direction_score(corroborating_title);
    (a - b).abs() >= cfg.disagreement_threshold && a * b < 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn corr(source: &str) -> Corroboration {
        Corroboration {
            url: format!("https://{source}.example.com/a"),
            source_name: source.to_string(),
            title: "same event".to_string(),
            similarity: 0.8,
            published_at: Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn count_maps_to_level_exactly() {
        assert_eq!(classify(1), ValidationLevel::Unverified);
        assert_eq!(classify(2), ValidationLevel::Likely);
        assert_eq!(classify(3), ValidationLevel::Verified);
        assert_eq!(classify(7), ValidationLevel::Verified);
        assert_eq!(classify(0), ValidationLevel::Unverified);
    }

    #[test]
    fn primary_counts_as_one_source() {
        assert_eq!(distinct_source_count("reuters", &[]), 1);
    }

    #[test]
    fn duplicate_publisher_counted_once() {
        let corrs = vec![corr("bloomberg"), corr("bloomberg"), corr("wsj")];
        assert_eq!(distinct_source_count("reuters", &corrs), 3);
    }

    #[test]
    fn corroboration_from_primary_publisher_does_not_count() {
        let corrs = vec![corr("reuters"), corr("Reuters")];
        assert_eq!(distinct_source_count("reuters", &corrs), 1);
    }

    #[test]
    fn two_independent_corroborations_verify() {
        let corrs = vec![corr("bloomberg"), corr("wsj")];
        let count = distinct_source_count("reuters", &corrs);
        assert_eq!(count, 3);
        assert_eq!(classify(count), ValidationLevel::Verified);
    }

    #[test]
    fn inclusion_gate_never_excludes_verified_or_likely() {
        assert_eq!(
            inclusion(ValidationLevel::Verified, 1.0, 8.0),
            Inclusion::Include
        );
        assert_eq!(
            inclusion(ValidationLevel::Likely, 1.0, 8.0),
            Inclusion::Include
        );
    }

    #[test]
    fn inclusion_gate_excludes_low_scoring_unverified() {
        assert_eq!(
            inclusion(ValidationLevel::Unverified, 7.9, 8.0),
            Inclusion::Exclude
        );
        // Exactly at the minimum is still excluded; the gate requires "exceeds".
        assert_eq!(
            inclusion(ValidationLevel::Unverified, 8.0, 8.0),
            Inclusion::Exclude
        );
    }

    #[test]
    fn inclusion_gate_warns_on_high_scoring_unverified() {
        assert_eq!(
            inclusion(ValidationLevel::Unverified, 8.5, 8.0),
            Inclusion::IncludeWithWarning
        );
    }

    #[test]
    fn opposing_directions_at_high_similarity_flag_review() {
        let cfg = CorroborationThresholds::default();
        assert!(flags_manual_review(
            "Regulator approves sensor merger as profit surges",
            "Sensor merger cancelled amid lawsuit and losses",
            0.9,
            &cfg,
        ));
    }

    #[test]
    fn aligned_directions_do_not_flag() {
        let cfg = CorroborationThresholds::default();
        assert!(!flags_manual_review(
            "Sensor maker wins record contract",
            "Record growth as sensor maker expands",
            0.9,
            &cfg,
        ));
    }

    #[test]
    fn low_similarity_never_flags() {
        let cfg = CorroborationThresholds::default();
        assert!(!flags_manual_review(
            "Regulator approves sensor merger",
            "Sensor merger cancelled amid lawsuit",
            0.3,
            &cfg,
        ));
    }
}
