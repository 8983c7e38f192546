//! Weekly trend aggregation.
//!
//! Counts and average scores are recomputed from the full contributing set
//! each run rather than incrementally accumulated, so re-running a week with
//! the same input yields byte-identical snapshots and per-key updates cannot
//! race on a partial increment.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use vpgd_core::{SignalType, UnitsFile};

use crate::key::{derive_keys, TrendKey};

/// The slice of a scored signal the aggregator needs.
#[derive(Debug, Clone)]
pub struct ScoredSignalFact {
    pub signal_id: i64,
    pub title: String,
    pub summary: Option<String>,
    pub signal_type: SignalType,
    pub composite: f64,
    /// Business units this signal is associated with. Empty means orphan:
    /// the signal still contributes signal-type/competitor/keyword keys but
    /// is excluded from BU-derived trends.
    pub bu_ids: Vec<String>,
}

impl ScoredSignalFact {
    #[must_use]
    pub fn text(&self) -> String {
        match &self.summary {
            Some(summary) => format!("{} {summary}", self.title),
            None => self.title.clone(),
        }
    }
}

/// An (ISO week, year) pair identifying one aggregation window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WeekOf {
    pub iso_week: u32,
    pub year: i32,
}

impl WeekOf {
    /// The week containing `date`.
    #[must_use]
    pub fn from_date(date: chrono::NaiveDate) -> Self {
        use chrono::Datelike;
        let iso = date.iso_week();
        Self {
            iso_week: iso.week(),
            year: iso.year(),
        }
    }

    /// Whether `self` is the ISO week immediately before `other`, including
    /// across a year boundary (week 52/53 -> week 1).
    #[must_use]
    pub fn immediately_precedes(self, other: Self) -> bool {
        self.weeks_until(other) == Some(1)
    }

    /// Whole ISO weeks from `self` to `other`; negative when `other` is
    /// earlier. `None` if either pair is not a valid ISO week.
    #[must_use]
    pub fn weeks_until(self, other: Self) -> Option<i64> {
        let this_start = self.start_date()?;
        let other_start = other.start_date()?;
        Some((other_start - this_start).num_days() / 7)
    }

    fn start_date(self) -> Option<chrono::NaiveDate> {
        chrono::NaiveDate::from_isoywd_opt(self.year, self.iso_week, chrono::Weekday::Mon)
    }
}

/// One finalized (trend key, week) aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklySnapshot {
    pub key: TrendKey,
    pub week: WeekOf,
    pub signal_count: i64,
    pub avg_score: f64,
}

/// Aggregate a run's scored signals into weekly snapshots.
///
/// For each trend key touched, the count and the arithmetic mean composite
/// are computed from scratch over all contributing signals. Output is sorted
/// by key, so two invocations over the same input produce identical vectors
/// (idempotent aggregation; the caller upserts keyed by `(key, week)`).
#[must_use]
pub fn aggregate(facts: &[ScoredSignalFact], units: &UnitsFile, week: WeekOf) -> Vec<WeeklySnapshot> {
    let mut buckets: BTreeMap<TrendKey, Vec<f64>> = BTreeMap::new();

    for fact in facts {
        for key in derive_keys(fact, units) {
            buckets.entry(key).or_default().push(fact.composite);
        }
    }

    buckets
        .into_iter()
        .map(|(key, scores)| {
            #[allow(clippy::cast_precision_loss)]
            let avg = scores.iter().sum::<f64>() / scores.len() as f64;
            WeeklySnapshot {
                key,
                week,
                signal_count: i64::try_from(scores.len()).unwrap_or(i64::MAX),
                avg_score: (avg * 100.0).round() / 100.0,
            }
        })
        .collect()
}
