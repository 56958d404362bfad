//! Aggregation rules: how an event folds into a key's aggregate.
//!
//! The accumulation rule is injectable so demos can project the same
//! script differently. The default [`SumCount`] rule mirrors the
//! continuous query `SELECT user, SUM(amount), COUNT(*) GROUP BY user`.
//! All arithmetic is saturating [`Decimal`] -- an aggregator can never
//! overflow or panic.
//!
//! [`Decimal`]: rust_decimal::Decimal

use duality_types::{Aggregate, OrderEvent};

/// A rule for folding one event into a key's aggregate.
///
/// Implementations receive the key's previous aggregate (`None` on the
/// key's first event) and the firing event, and return the aggregate the
/// projection should hold afterwards. Aggregators are pure: they must not
/// observe or mutate anything beyond their arguments.
pub trait Aggregator: Send + Sync {
    /// Fold `event` into `previous`, producing the next aggregate.
    fn accumulate(&self, previous: Option<&Aggregate>, event: &OrderEvent) -> Aggregate;
}

/// The default accumulation rule: sum amounts, count events.
#[derive(Debug, Clone, Copy, Default)]
pub struct SumCount;

impl SumCount {
    /// Create the default aggregator.
    pub const fn new() -> Self {
        Self
    }
}

impl Aggregator for SumCount {
    fn accumulate(&self, previous: Option<&Aggregate>, event: &OrderEvent) -> Aggregate {
        previous.map_or_else(
            || Aggregate::first(event.amount),
            |prev| Aggregate {
                total: prev.total.saturating_add(event.amount),
                count: prev.count.saturating_add(1),
            },
        )
    }
}

/// An accumulation rule that keeps only the latest amount per key.
///
/// Used by demos whose scripts carry pre-aggregated totals rather than
/// per-order deltas: each event replaces the key's aggregate wholesale.
#[derive(Debug, Clone, Copy, Default)]
pub struct LatestValue;

impl LatestValue {
    /// Create the latest-value aggregator.
    pub const fn new() -> Self {
        Self
    }
}

impl Aggregator for LatestValue {
    fn accumulate(&self, previous: Option<&Aggregate>, event: &OrderEvent) -> Aggregate {
        Aggregate {
            total: event.amount,
            count: previous.map_or(1, |prev| prev.count.saturating_add(1)),
        }
    }
}
