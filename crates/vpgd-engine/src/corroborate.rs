//! Corroboration matching: find independent reports of the same event.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use vpgd_core::CorroborationThresholds;

use crate::similarity::{Similarity, SimilarityError};

/// The slice of a signal the matcher needs. Built by the caller from
/// persisted rows; the matcher itself never touches storage.
#[derive(Debug, Clone)]
pub struct SignalDoc {
    pub external_id: String,
    pub title: String,
    pub summary: Option<String>,
    pub source_name: String,
    pub url: String,
    pub published_at: DateTime<Utc>,
    pub collected_at: DateTime<Utc>,
}

impl SignalDoc {
    /// Title plus summary, the text the similarity measure sees.
    #[must_use]
    pub fn text(&self) -> String {
        match &self.summary {
            Some(summary) => format!("{} {summary}", self.title),
            None => self.title.clone(),
        }
    }
}

/// An independent confirming reference to the same event.
#[derive(Debug, Clone, Serialize)]
pub struct Corroboration {
    pub url: String,
    pub source_name: String,
    pub title: String,
    pub similarity: f64,
    pub published_at: DateTime<Utc>,
}

/// Find corroborating signals for `candidate` within `pool`.
///
/// Pure over the provided pool. A pool signal corroborates when all hold:
///
/// - different `external_id` (self-duplicates are never corroboration),
/// - collected within the configured lookback window of the candidate,
/// - a different publisher (`source_name`) than the candidate,
/// - published within the configured tolerance of the candidate,
/// - similarity of the (title, summary) texts at or above the threshold.
///
/// Results are sorted by descending similarity; ties break toward the
/// earlier `published_at`, so the earliest independent confirmation ranks
/// first. An empty pool yields an empty result.
///
/// # Errors
///
/// Returns [`SimilarityError`] if the similarity backend fails for any pair.
/// The batch caller treats the candidate as having zero corroborations for
/// this run and retries next run; the error never aborts the batch.
pub fn find_corroboration(
    candidate: &SignalDoc,
    pool: &[SignalDoc],
    matcher: &dyn Similarity,
    cfg: &CorroborationThresholds,
) -> Result<Vec<Corroboration>, SimilarityError> {
    let lookback = Duration::days(cfg.lookback_days);
    let tolerance = Duration::days(cfg.published_tolerance_days);
    let candidate_text = candidate.text();
    let candidate_source = candidate.source_name.to_lowercase();

    let mut matches = Vec::new();

    for other in pool {
        if other.external_id == candidate.external_id {
            continue;
        }
        if (candidate.collected_at - other.collected_at) > lookback {
            continue;
        }
        if other.source_name.to_lowercase() == candidate_source {
            continue;
        }
        let published_gap = (candidate.published_at - other.published_at).abs();
        if published_gap > tolerance {
            continue;
        }

        let similarity = matcher.score(&candidate_text, &other.text())?;
        if similarity >= cfg.similarity_threshold {
            matches.push(Corroboration {
                url: other.url.clone(),
                source_name: other.source_name.clone(),
                title: other.title.clone(),
                similarity,
                published_at: other.published_at,
            });
        }
    }

    matches.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.published_at.cmp(&b.published_at))
    });

    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::KeywordOverlap;
    use chrono::TimeZone;

    fn doc(
        external_id: &str,
        title: &str,
        source: &str,
        published_day: u32,
        collected_day: u32,
    ) -> SignalDoc {
        SignalDoc {
            external_id: external_id.to_string(),
            title: title.to_string(),
            summary: None,
            source_name: source.to_string(),
            url: format!("https://{source}.example.com/{external_id}"),
            published_at: Utc.with_ymd_and_hms(2025, 3, published_day, 12, 0, 0).unwrap(),
            collected_at: Utc.with_ymd_and_hms(2025, 3, collected_day, 18, 0, 0).unwrap(),
        }
    }

    fn cfg() -> CorroborationThresholds {
        CorroborationThresholds::default()
    }

    #[test]
    fn empty_pool_yields_empty_result() {
        let candidate = doc("x1", "Kistler launches torque sensor line", "reuters", 10, 10);
        let result =
            find_corroboration(&candidate, &[], &KeywordOverlap, &cfg()).expect("match");
        assert!(result.is_empty());
    }

    #[test]
    fn independent_publisher_same_event_matches() {
        let candidate = doc("x1", "Kistler launches torque sensor line", "reuters", 10, 10);
        let pool = vec![doc(
            "y1",
            "Kistler launches torque sensor line for robotics",
            "bloomberg",
            11,
            11,
        )];
        let result =
            find_corroboration(&candidate, &pool, &KeywordOverlap, &cfg()).expect("match");
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].source_name, "bloomberg");
        assert!(result[0].similarity >= 0.55);
    }

    #[test]
    fn same_publisher_never_links_regardless_of_similarity() {
        let candidate = doc("x1", "Kistler launches torque sensor line", "reuters", 10, 10);
        let pool = vec![doc(
            "y1",
            "Kistler launches torque sensor line",
            "reuters",
            10,
            10,
        )];
        let result =
            find_corroboration(&candidate, &pool, &KeywordOverlap, &cfg()).expect("match");
        assert!(result.is_empty(), "same-publisher pair must never link");
    }

    #[test]
    fn publisher_comparison_is_case_insensitive() {
        let candidate = doc("x1", "Kistler launches torque sensor line", "Reuters", 10, 10);
        let pool = vec![doc(
            "y1",
            "Kistler launches torque sensor line",
            "reuters",
            10,
            10,
        )];
        let result =
            find_corroboration(&candidate, &pool, &KeywordOverlap, &cfg()).expect("match");
        assert!(result.is_empty());
    }

    #[test]
    fn same_external_id_filtered_before_matching() {
        let candidate = doc("x1", "Kistler launches torque sensor line", "reuters", 10, 10);
        let pool = vec![doc(
            "x1",
            "Kistler launches torque sensor line",
            "bloomberg",
            10,
            10,
        )];
        let result =
            find_corroboration(&candidate, &pool, &KeywordOverlap, &cfg()).expect("match");
        assert!(result.is_empty(), "self-referential duplicates never count");
    }

    #[test]
    fn stale_pool_signal_outside_lookback_is_skipped() {
        let candidate = doc("x1", "Kistler launches torque sensor line", "reuters", 28, 28);
        // Collected 27 days before the candidate, outside the 14-day window.
        let pool = vec![doc(
            "y1",
            "Kistler launches torque sensor line",
            "bloomberg",
            28,
            1,
        )];
        let result =
            find_corroboration(&candidate, &pool, &KeywordOverlap, &cfg()).expect("match");
        assert!(result.is_empty());
    }

    #[test]
    fn published_outside_tolerance_is_skipped() {
        let candidate = doc("x1", "Kistler launches torque sensor line", "reuters", 20, 20);
        // Published 12 days before the candidate, outside the 5-day tolerance.
        let pool = vec![doc(
            "y1",
            "Kistler launches torque sensor line",
            "bloomberg",
            8,
            20,
        )];
        let result =
            find_corroboration(&candidate, &pool, &KeywordOverlap, &cfg()).expect("match");
        assert!(result.is_empty());
    }

    #[test]
    fn results_sorted_by_similarity_then_earlier_publish() {
        let candidate = doc("x1", "Kistler acquires robotics force sensing startup", "reuters", 10, 10);
        let pool = vec![
            doc(
                "weak",
                "Kistler robotics expansion continues with sensing deal",
                "ft",
                12,
                12,
            ),
            doc(
                "late-exact",
                "Kistler acquires robotics force sensing startup",
                "bloomberg",
                12,
                12,
            ),
            doc(
                "early-exact",
                "Kistler acquires robotics force sensing startup",
                "wsj",
                9,
                9,
            ),
        ];
        let result =
            find_corroboration(&candidate, &pool, &KeywordOverlap, &cfg()).expect("match");
        assert!(result.len() >= 2, "expected at least the two exact matches");
        // Exact matches tie on similarity; the earlier publish wins.
        assert_eq!(result[0].source_name, "wsj");
        assert_eq!(result[1].source_name, "bloomberg");
    }

    struct FailingSimilarity;

    impl Similarity for FailingSimilarity {
        fn score(&self, _: &str, _: &str) -> Result<f64, SimilarityError> {
            Err(SimilarityError::Unavailable("backend down".to_string()))
        }
    }

    #[test]
    fn similarity_failure_surfaces_as_error() {
        let candidate = doc("x1", "Kistler launches torque sensor line", "reuters", 10, 10);
        let pool = vec![doc(
            "y1",
            "Kistler launches torque sensor line",
            "bloomberg",
            10,
            10,
        )];
        let result = find_corroboration(&candidate, &pool, &FailingSimilarity, &cfg());
        assert!(matches!(result, Err(SimilarityError::Unavailable(_))));
    }
}
