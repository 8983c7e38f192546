//! Persistent-pattern detection over a trailing window of weekly snapshots.

use vpgd_core::PersistenceThresholds;

use crate::aggregate::{WeekOf, WeeklySnapshot};
use crate::key::TrendKind;

/// Whether a trend key shows sustained activity: at least `min_occurrences`
/// weeks with a non-zero signal count inside the most recent `window_weeks`
/// weeks ending at `current_week` inclusive.
///
/// `snapshots` are the key's stored weekly rows in any order. Weeks with no
/// row count as zero, so a key absent for a week inside the window simply
/// contributes nothing.
#[must_use]
pub fn detect_persistent(
    snapshots: &[WeeklySnapshot],
    current_week: WeekOf,
    window_weeks: usize,
    min_occurrences: usize,
) -> bool {
    let window = i64::try_from(window_weeks).unwrap_or(i64::MAX);
    let active_weeks = snapshots
        .iter()
        .filter(|s| s.signal_count > 0)
        .filter(|s| {
            matches!(s.week.weeks_until(current_week), Some(d) if d >= 0 && d < window)
        })
        .count();
    active_weeks >= min_occurrences
}

/// [`detect_persistent`] with the window and occurrence floor chosen for the
/// key's kind. Competitor keys use the tighter competitor-movement variant;
/// every other kind uses the general thresholds.
#[must_use]
pub fn is_persistent_for_kind(
    kind: TrendKind,
    snapshots: &[WeeklySnapshot],
    current_week: WeekOf,
    thresholds: &PersistenceThresholds,
) -> bool {
    let (window, min) = match kind {
        TrendKind::Competitor => (
            thresholds.competitor_window_weeks,
            thresholds.competitor_min_occurrences,
        ),
        _ => (thresholds.window_weeks, thresholds.min_occurrences),
    };
    detect_persistent(snapshots, current_week, window, min)
}
