//! Domain enums shared across the pipeline: signal lifecycle, taxonomy,
//! validation levels, and trend momentum labels.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a signal. Advances strictly forward; a signal never
/// regresses to an earlier status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalStatus {
    New,
    Validated,
    Scored,
    Published,
    Archived,
}

impl SignalStatus {
    /// The status that follows this one, or `None` for `Archived`.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        match self {
            Self::New => Some(Self::Validated),
            Self::Validated => Some(Self::Scored),
            Self::Scored => Some(Self::Published),
            Self::Published => Some(Self::Archived),
            Self::Archived => None,
        }
    }

    /// Whether a transition to `target` is a legal forward step.
    #[must_use]
    pub fn can_advance_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Validated => "validated",
            Self::Scored => "scored",
            Self::Published => "published",
            Self::Archived => "archived",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(Self::New),
            "validated" => Some(Self::Validated),
            "scored" => Some(Self::Scored),
            "published" => Some(Self::Published),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

impl std::fmt::Display for SignalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed signal-type taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalType {
    CompetitiveThreat,
    RevenueOpportunity,
    TradeTariff,
    PartnershipSignal,
    TechnologyTrend,
    CustomerIntelligence,
    MarketShift,
}

impl SignalType {
    pub const ALL: [Self; 7] = [
        Self::CompetitiveThreat,
        Self::RevenueOpportunity,
        Self::TradeTariff,
        Self::PartnershipSignal,
        Self::TechnologyTrend,
        Self::CustomerIntelligence,
        Self::MarketShift,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CompetitiveThreat => "competitive-threat",
            Self::RevenueOpportunity => "revenue-opportunity",
            Self::TradeTariff => "trade-tariff",
            Self::PartnershipSignal => "partnership-signal",
            Self::TechnologyTrend => "technology-trend",
            Self::CustomerIntelligence => "customer-intelligence",
            Self::MarketShift => "market-shift",
        }
    }

    /// Parse a taxonomy string. Unknown types map to `None`; callers decide
    /// whether to default (the analyzer defaults to `MarketShift`).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }

    /// Human-readable label, e.g. `market-shift` -> `Market Shift`.
    #[must_use]
    pub fn label(self) -> String {
        self.as_str()
            .split('-')
            .map(|w| {
                let mut chars = w.chars();
                chars.next().map_or_else(String::new, |c| {
                    c.to_uppercase().collect::<String>() + chars.as_str()
                })
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl std::fmt::Display for SignalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation level derived from the distinct-source count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationLevel {
    Verified,
    Likely,
    Unverified,
}

impl ValidationLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Verified => "verified",
            Self::Likely => "likely",
            Self::Unverified => "unverified",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "verified" => Some(Self::Verified),
            "likely" => Some(Self::Likely),
            "unverified" => Some(Self::Unverified),
            _ => None,
        }
    }
}

impl std::fmt::Display for ValidationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Week-over-week trajectory of a trend key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Momentum {
    Spike,
    Rising,
    New,
    Stable,
    Declining,
}

impl Momentum {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Spike => "spike",
            Self::Rising => "rising",
            Self::New => "new",
            Self::Stable => "stable",
            Self::Declining => "declining",
        }
    }

    /// Sort rank for digest ordering: spikes first, declining last.
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            Self::Spike => 1,
            Self::Rising => 2,
            Self::New => 3,
            Self::Stable => 4,
            Self::Declining => 5,
        }
    }
}

impl std::fmt::Display for Momentum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_advances_strictly_forward() {
        assert!(SignalStatus::New.can_advance_to(SignalStatus::Validated));
        assert!(SignalStatus::Validated.can_advance_to(SignalStatus::Scored));
        assert!(SignalStatus::Scored.can_advance_to(SignalStatus::Published));
        assert!(SignalStatus::Published.can_advance_to(SignalStatus::Archived));
    }

    #[test]
    fn status_never_regresses_or_skips() {
        assert!(!SignalStatus::Scored.can_advance_to(SignalStatus::New));
        assert!(!SignalStatus::Scored.can_advance_to(SignalStatus::Validated));
        assert!(!SignalStatus::New.can_advance_to(SignalStatus::Scored));
        assert!(!SignalStatus::Archived.can_advance_to(SignalStatus::New));
        assert_eq!(SignalStatus::Archived.next(), None);
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            SignalStatus::New,
            SignalStatus::Validated,
            SignalStatus::Scored,
            SignalStatus::Published,
            SignalStatus::Archived,
        ] {
            assert_eq!(SignalStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(SignalStatus::parse("bogus"), None);
    }

    #[test]
    fn signal_type_round_trips_through_strings() {
        for t in SignalType::ALL {
            assert_eq!(SignalType::parse(t.as_str()), Some(t));
        }
        assert_eq!(SignalType::parse("unknown-type"), None);
    }

    #[test]
    fn signal_type_label_is_title_case() {
        assert_eq!(SignalType::MarketShift.label(), "Market Shift");
        assert_eq!(
            SignalType::CompetitiveThreat.label(),
            "Competitive Threat"
        );
    }

    #[test]
    fn momentum_rank_orders_spike_first() {
        assert!(Momentum::Spike.rank() < Momentum::Rising.rank());
        assert!(Momentum::Rising.rank() < Momentum::New.rank());
        assert!(Momentum::Stable.rank() < Momentum::Declining.rank());
    }

    #[test]
    fn validation_level_serde_uses_lowercase() {
        let json = serde_json::to_string(&ValidationLevel::Verified).expect("serialize");
        assert_eq!(json, "\"verified\"");
    }
}
