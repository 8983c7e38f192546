//! Trend keys: the closed set of aggregation dimensions, plus the explicit
//! derivation function for each variant. Adding a dimension means adding a
//! variant and a derivation arm here, never ad hoc string handling.

use serde::{Deserialize, Serialize};
use vpgd_core::{SignalType, UnitsFile};

use crate::aggregate::ScoredSignalFact;

/// The aggregation dimension a trend key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendKind {
    BuSignalType,
    SignalType,
    BusinessUnit,
    Competitor,
    Keyword,
}

impl TrendKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BuSignalType => "bu_signal_type",
            Self::SignalType => "signal_type",
            Self::BusinessUnit => "business_unit",
            Self::Competitor => "competitor",
            Self::Keyword => "keyword",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "bu_signal_type" => Some(Self::BuSignalType),
            "signal_type" => Some(Self::SignalType),
            "business_unit" => Some(Self::BusinessUnit),
            "competitor" => Some(Self::Competitor),
            "keyword" => Some(Self::Keyword),
            _ => None,
        }
    }
}

impl std::fmt::Display for TrendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tracked trend dimension instance. Identity is `(kind, key)` where
/// `key` is the normalized (lowercased) form; `label` is for display.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrendKey {
    pub kind: TrendKind,
    pub key: String,
    pub label: String,
}

impl TrendKey {
    fn new(kind: TrendKind, raw_key: impl AsRef<str>, label: impl Into<String>) -> Self {
        Self {
            kind,
            key: format!("{}:{}", kind.as_str(), raw_key.as_ref().to_lowercase()),
            label: label.into(),
        }
    }

    fn bu_signal_type(units: &UnitsFile, bu_id: &str, signal_type: SignalType) -> Self {
        Self::new(
            TrendKind::BuSignalType,
            format!("{bu_id}:{signal_type}"),
            format!("{} - {}", units.unit_name(bu_id), signal_type.label()),
        )
    }

    fn signal_type(signal_type: SignalType) -> Self {
        Self::new(
            TrendKind::SignalType,
            signal_type.as_str(),
            signal_type.label(),
        )
    }

    fn business_unit(units: &UnitsFile, bu_id: &str) -> Self {
        Self::new(TrendKind::BusinessUnit, bu_id, units.unit_name(bu_id))
    }

    fn competitor(name: &str) -> Self {
        Self::new(TrendKind::Competitor, name, name)
    }

    fn keyword(word: &str) -> Self {
        Self::new(TrendKind::Keyword, word, word)
    }
}

/// Derive every trend key a scored signal contributes to.
///
/// A signal with k business-unit associations yields k `bu_signal_type` keys
/// and k `business_unit` keys, one `signal_type` key, plus one `competitor`
/// key per configured competitor named in its text and one `keyword` key per
/// watch keyword found.
#[must_use]
pub fn derive_keys(fact: &ScoredSignalFact, units: &UnitsFile) -> Vec<TrendKey> {
    let mut keys = Vec::new();
    let text = fact.text().to_lowercase();

    for bu_id in &fact.bu_ids {
        keys.push(TrendKey::bu_signal_type(units, bu_id, fact.signal_type));
    }

    keys.push(TrendKey::signal_type(fact.signal_type));

    for bu_id in &fact.bu_ids {
        keys.push(TrendKey::business_unit(units, bu_id));
    }

    for competitor in &units.competitors {
        if text.contains(&competitor.to_lowercase()) {
            keys.push(TrendKey::competitor(competitor));
        }
    }

    for word in &units.watch_keywords {
        if text.contains(&word.to_lowercase()) {
            keys.push(TrendKey::keyword(word));
        }
    }

    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use vpgd_core::BusinessUnitConfig;

    fn units() -> UnitsFile {
        UnitsFile {
            business_units: vec![
                BusinessUnitConfig {
                    id: "sensors".to_string(),
                    name: "Precision Sensors".to_string(),
                    monitoring_keywords: vec![],
                    key_products: vec![],
                    core_industries: vec![],
                    active: true,
                },
                BusinessUnitConfig {
                    id: "weighing".to_string(),
                    name: "Weighing Solutions".to_string(),
                    monitoring_keywords: vec![],
                    key_products: vec![],
                    core_industries: vec![],
                    active: true,
                },
            ],
            competitors: vec!["Kistler".to_string(), "HBK".to_string()],
            watch_keywords: vec!["tariff".to_string()],
        }
    }

    fn fact(bu_ids: &[&str], title: &str) -> ScoredSignalFact {
        ScoredSignalFact {
            signal_id: 1,
            title: title.to_string(),
            summary: None,
            signal_type: SignalType::MarketShift,
            composite: 6.0,
            bu_ids: bu_ids.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    #[test]
    fn two_bu_associations_yield_two_bu_signal_type_keys() {
        let keys = derive_keys(&fact(&["sensors", "weighing"], "industry update"), &units());
        let bu_st: Vec<_> = keys
            .iter()
            .filter(|k| k.kind == TrendKind::BuSignalType)
            .collect();
        assert_eq!(bu_st.len(), 2);
        assert!(bu_st
            .iter()
            .any(|k| k.key == "bu_signal_type:sensors:market-shift"));
        assert_eq!(bu_st[0].label, "Precision Sensors - Market Shift");
    }

    #[test]
    fn every_signal_yields_one_signal_type_key() {
        let keys = derive_keys(&fact(&[], "industry update"), &units());
        let st: Vec<_> = keys
            .iter()
            .filter(|k| k.kind == TrendKind::SignalType)
            .collect();
        assert_eq!(st.len(), 1);
        assert_eq!(st[0].key, "signal_type:market-shift");
        assert_eq!(st[0].label, "Market Shift");
    }

    #[test]
    fn competitor_mention_yields_competitor_key() {
        let keys = derive_keys(
            &fact(&["sensors"], "Kistler expands force sensing line"),
            &units(),
        );
        let comp: Vec<_> = keys
            .iter()
            .filter(|k| k.kind == TrendKind::Competitor)
            .collect();
        assert_eq!(comp.len(), 1);
        assert_eq!(comp[0].key, "competitor:kistler");
        assert_eq!(comp[0].label, "Kistler");
    }

    #[test]
    fn competitor_match_is_case_insensitive() {
        let keys = derive_keys(&fact(&[], "HBK announces results"), &units());
        assert!(keys.iter().any(|k| k.key == "competitor:hbk"));
    }

    #[test]
    fn watch_keyword_yields_keyword_key() {
        let keys = derive_keys(&fact(&[], "new tariff schedule published"), &units());
        assert!(keys.iter().any(|k| k.key == "keyword:tariff"));
    }

    #[test]
    fn no_mentions_yield_no_competitor_or_keyword_keys() {
        let keys = derive_keys(&fact(&["sensors"], "quiet week in sensors"), &units());
        assert!(!keys.iter().any(|k| k.kind == TrendKind::Competitor));
        assert!(!keys.iter().any(|k| k.kind == TrendKind::Keyword));
    }

    #[test]
    fn kind_round_trips_through_strings() {
        for kind in [
            TrendKind::BuSignalType,
            TrendKind::SignalType,
            TrendKind::BusinessUnit,
            TrendKind::Competitor,
            TrendKind::Keyword,
        ] {
            assert_eq!(TrendKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(TrendKind::parse("bogus"), None);
    }
}
