//! Pluggable text similarity.
//!
//! The corroboration matcher only requires a score in [0, 1] and the ability
//! to fail; the implementation behind the trait can be a cheap lexical
//! measure, an embedding service, or anything else.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimilarityError {
    #[error("similarity backend unavailable: {0}")]
    Unavailable(String),
    #[error("similarity backend returned {0}, outside [0, 1]")]
    OutOfRange(f64),
}

/// A capability that scores how closely two text blobs describe the same event.
///
/// Implementations must return values in `[0.0, 1.0]`. Failures are surfaced
/// per call; the caller decides whether to degrade or retry.
pub trait Similarity: Send + Sync {
    /// Score the topical similarity of two texts.
    ///
    /// # Errors
    ///
    /// Returns [`SimilarityError`] if the backend cannot produce a score.
    fn score(&self, a: &str, b: &str) -> Result<f64, SimilarityError>;
}

/// Common English words carrying no topical signal.
const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "from", "that", "this", "its", "has", "have", "are", "was",
    "were", "will", "into", "over", "after", "amid", "new", "more", "than", "says", "said",
    "announces", "announced", "report", "reports",
];

/// Lexical bag-of-keywords similarity.
///
/// Tokenizes both texts into lowercase alphanumeric words of three or more
/// characters, drops stopwords, and returns the overlap coefficient:
/// `|A ∩ B| / min(|A|, |B|)`. The coefficient reaches 1.0 when the shorter
/// text's keywords are fully contained in the longer one, which makes a
/// headline match its own expanded summary, the behavior we want for
/// same-event detection.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordOverlap;

impl KeywordOverlap {
    fn keywords(text: &str) -> std::collections::HashSet<String> {
        text.split_whitespace()
            .map(|w| {
                w.trim_matches(|c: char| !c.is_alphanumeric())
                    .to_lowercase()
            })
            .filter(|w| w.len() >= 3 && !STOPWORDS.contains(&w.as_str()))
            .collect()
    }
}

impl Similarity for KeywordOverlap {
    fn score(&self, a: &str, b: &str) -> Result<f64, SimilarityError> {
        let ka = Self::keywords(a);
        let kb = Self::keywords(b);
        if ka.is_empty() || kb.is_empty() {
            return Ok(0.0);
        }

        let intersection = ka.intersection(&kb).count();
        let min_len = ka.len().min(kb.len());

        #[allow(clippy::cast_precision_loss)]
        Ok(intersection as f64 / min_len as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_texts_score_one() {
        let sim = KeywordOverlap;
        let score = sim
            .score(
                "Kistler launches torque sensor line",
                "Kistler launches torque sensor line",
            )
            .expect("score");
        assert!((score - 1.0).abs() < f64::EPSILON, "got {score}");
    }

    #[test]
    fn unrelated_texts_score_low() {
        let sim = KeywordOverlap;
        let score = sim
            .score(
                "Kistler launches torque sensor line",
                "Grain harvest beats expectations across midwest",
            )
            .expect("score");
        assert!(score < 0.2, "got {score}");
    }

    #[test]
    fn same_event_different_phrasing_clears_default_threshold() {
        let sim = KeywordOverlap;
        let score = sim
            .score(
                "Kistler acquires robotics startup for force sensing",
                "Robotics force sensing startup acquired by Kistler in expansion move",
            )
            .expect("score");
        assert!(score >= 0.55, "expected >= 0.55, got {score}");
    }

    #[test]
    fn empty_text_scores_zero() {
        let sim = KeywordOverlap;
        assert_eq!(sim.score("", "anything at all here").expect("score"), 0.0);
        assert_eq!(sim.score("the and for", "words").expect("score"), 0.0);
    }

    #[test]
    fn punctuation_and_case_are_ignored() {
        let sim = KeywordOverlap;
        let score = sim
            .score("Tariff hike hits sensors!", "tariff hike hits sensors")
            .expect("score");
        assert!((score - 1.0).abs() < f64::EPSILON);
    }
}
