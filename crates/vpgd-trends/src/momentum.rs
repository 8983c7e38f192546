//! Week-over-week momentum classification.

use serde::Serialize;
use vpgd_core::{Momentum, MomentumThresholds};

use crate::aggregate::WeeklySnapshot;

/// Momentum label plus the week-over-week change that produced it.
/// `change_pct` is `None` only for brand-new keys with no history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MomentumResult {
    pub momentum: Momentum,
    pub change_pct: Option<i64>,
}

/// Classify a trend key's momentum from its current week and trailing history.
///
/// `history` is the ordered sequence of prior weekly snapshots for the same
/// key, oldest first, current week excluded. The baseline `prev` is the last
/// history entry's count when that entry is the ISO week immediately before
/// the current one; a key reappearing after a gap week gets `prev = 0`, so
/// the reappearance registers as growth rather than an undefined ratio.
/// Division uses `max(prev, 1)`, so no input can divide by zero.
#[must_use]
pub fn classify_momentum(
    current: &WeeklySnapshot,
    history: &[WeeklySnapshot],
    thresholds: &MomentumThresholds,
) -> MomentumResult {
    let Some(last) = history.last() else {
        return MomentumResult {
            momentum: Momentum::New,
            change_pct: None,
        };
    };

    let prev = if last.week.immediately_precedes(current.week) {
        last.signal_count
    } else {
        0
    };

    #[allow(clippy::cast_precision_loss)]
    let change = (current.signal_count - prev) as f64 / prev.max(1) as f64 * 100.0;
    #[allow(clippy::cast_possible_truncation)]
    let change_pct = change.round() as i64;

    let momentum = if change_pct >= thresholds.spike_pct
        && current.signal_count >= thresholds.spike_min_count
    {
        Momentum::Spike
    } else if change_pct >= thresholds.rising_pct {
        Momentum::Rising
    } else if change_pct <= thresholds.declining_pct {
        Momentum::Declining
    } else {
        Momentum::Stable
    };

    MomentumResult {
        momentum,
        change_pct: Some(change_pct),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::WeekOf;
    use crate::key::{TrendKey, TrendKind};

    fn key() -> TrendKey {
        TrendKey {
            kind: TrendKind::SignalType,
            key: "signal_type:market-shift".to_string(),
            label: "Market Shift".to_string(),
        }
    }

    fn snap(iso_week: u32, count: i64) -> WeeklySnapshot {
        WeeklySnapshot {
            key: key(),
            week: WeekOf {
                iso_week,
                year: 2025,
            },
            signal_count: count,
            avg_score: 6.0,
        }
    }

    fn thresholds() -> MomentumThresholds {
        MomentumThresholds::default()
    }

    #[test]
    fn no_history_is_new_with_null_change() {
        let result = classify_momentum(&snap(12, 5), &[], &thresholds());
        assert_eq!(result.momentum, Momentum::New);
        assert_eq!(result.change_pct, None);
    }

    #[test]
    fn quadrupling_with_enough_volume_is_spike() {
        // week11=1, week12=4 -> (4-1)/1*100 = 300% and count >= 3
        let result = classify_momentum(&snap(12, 4), &[snap(10, 1), snap(11, 1)], &thresholds());
        assert_eq!(result.momentum, Momentum::Spike);
        assert_eq!(result.change_pct, Some(300));
    }

    #[test]
    fn large_change_with_low_volume_is_rising_not_spike() {
        // 1 -> 2 is +100%, but count 2 < spike_min_count 3.
        let result = classify_momentum(&snap(12, 2), &[snap(11, 1)], &thresholds());
        assert_eq!(result.momentum, Momentum::Rising);
        assert_eq!(result.change_pct, Some(100));
    }

    #[test]
    fn moderate_growth_is_rising() {
        // 4 -> 5 = +25%
        let result = classify_momentum(&snap(12, 5), &[snap(11, 4)], &thresholds());
        assert_eq!(result.momentum, Momentum::Rising);
        assert_eq!(result.change_pct, Some(25));
    }

    #[test]
    fn moderate_drop_is_declining() {
        // 4 -> 3 = -25%
        let result = classify_momentum(&snap(12, 3), &[snap(11, 4)], &thresholds());
        assert_eq!(result.momentum, Momentum::Declining);
        assert_eq!(result.change_pct, Some(-25));
    }

    #[test]
    fn small_change_is_stable() {
        // 5 -> 6 = +20%
        let result = classify_momentum(&snap(12, 6), &[snap(11, 5)], &thresholds());
        assert_eq!(result.momentum, Momentum::Stable);
        assert_eq!(result.change_pct, Some(20));
    }

    #[test]
    fn reappearance_after_gap_treats_prev_as_zero() {
        // History ends at week 9 and current is week 12, so prev = 0 and
        // max(prev, 1) keeps the ratio defined: (5-0)/1*100 = 500%.
        let result = classify_momentum(&snap(12, 5), &[snap(8, 7), snap(9, 2)], &thresholds());
        assert_eq!(result.momentum, Momentum::Spike);
        assert_eq!(result.change_pct, Some(500));
    }

    #[test]
    fn reappearance_with_low_count_is_rising() {
        let result = classify_momentum(&snap(12, 2), &[snap(9, 2)], &thresholds());
        assert_eq!(result.momentum, Momentum::Rising);
        assert_eq!(result.change_pct, Some(200));
    }

    #[test]
    fn flat_week_is_stable_with_zero_change() {
        let result = classify_momentum(&snap(12, 3), &[snap(11, 3)], &thresholds());
        assert_eq!(result.momentum, Momentum::Stable);
        assert_eq!(result.change_pct, Some(0));
    }

    #[test]
    fn drop_to_zero_is_fully_declining() {
        let result = classify_momentum(&snap(12, 0), &[snap(11, 4)], &thresholds());
        assert_eq!(result.momentum, Momentum::Declining);
        assert_eq!(result.change_pct, Some(-100));
    }

    #[test]
    fn custom_thresholds_are_honored() {
        let custom = MomentumThresholds {
            spike_pct: 50,
            spike_min_count: 2,
            rising_pct: 10,
            declining_pct: -10,
            history_weeks: 12,
        };
        // 4 -> 6 = +50%: spike under the custom thresholds, rising under defaults.
        let result = classify_momentum(&snap(12, 6), &[snap(11, 4)], &custom);
        assert_eq!(result.momentum, Momentum::Spike);
    }

}
