//! Signal validation and scoring engine.
//!
//! Pure logic over caller-supplied data: corroboration matching against a
//! pool of recent signals, validation-level classification, composite
//! scoring, and the keyword heuristics used when no external analysis is
//! available. Persistence is the caller's concern throughout.

pub mod analyze;
pub mod corroborate;
pub mod score;
pub mod similarity;
pub mod validation;

pub use analyze::{classify_signal_type, default_dimensions, match_business_units, BuMatch};
pub use corroborate::{find_corroboration, Corroboration, SignalDoc};
pub use score::{composite_score, validate_weights, DimensionScores, ScoreInputError};
pub use similarity::{KeywordOverlap, Similarity, SimilarityError};
pub use validation::{
    classify, distinct_source_count, flags_manual_review, inclusion, Inclusion,
};
