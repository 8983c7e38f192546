//! Trend tracking: weekly aggregation of scored signals into trend keys,
//! momentum classification, and persistent-pattern detection.
//!
//! Everything here is a pure function of the new batch plus persisted weekly
//! snapshots; no derived trend state is ever the source of truth.

pub mod aggregate;
pub mod key;
pub mod momentum;
pub mod persistence;

pub use aggregate::{aggregate, ScoredSignalFact, WeekOf, WeeklySnapshot};
pub use key::{derive_keys, TrendKey, TrendKind};
pub use momentum::{classify_momentum, MomentumResult};
pub use persistence::{detect_persistent, is_persistent_for_kind};
