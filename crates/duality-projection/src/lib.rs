//! Projection state and changelog log for the Duality playback engine.
//!
//! A playback maintains two views of its replayed script: the
//! **projection** (the current keyed aggregate, what a continuous query's
//! result table holds right now) and the **changelog** (the append-only
//! record of how that result changed over time). This crate owns both,
//! plus the update rules that connect them.
//!
//! # Architecture
//!
//! - [`table`] -- The [`ProjectionTable`]: keyed aggregates with
//!   insert/commit/remove.
//! - [`aggregate`] -- The [`Aggregator`] trait and the default sum/count
//!   accumulation rule.
//! - [`record`] -- The [`RecordBuilder`] for validated changelog record
//!   construction.
//! - [`changelog`] -- The [`ChangelogLog`]: append-only, capacity-bounded,
//!   FIFO-evicting.
//! - [`updater`] -- The [`Updater`]: applies one event under
//!   insert-or-update rules and emits the matching records.
//! - [`consistency`] -- Verification that the changelog and projection
//!   agree.
//!
//! # Changelog encodings
//!
//! Operations emitted per state transition, by [`ChangelogMode`]:
//!
//! | Transition | `AppendOnly` | `Retract` | `Upsert` |
//! |------------|--------------|-----------|----------|
//! | New key | `+I` | `+I` | `+I` |
//! | Existing key | (cannot occur) | `-U` then `+U` | `+U` |
//! | Removal | (cannot occur) | `-D` | `-D` |
//!
//! In retract mode the `-U`/`+U` pair is not atomic: the retract record is
//! appended first and the new aggregate is committed with the `+U` record
//! after a configured delay. Between the two, the projection still holds
//! the pre-update aggregate.
//!
//! [`ChangelogMode`]: duality_types::ChangelogMode

pub mod aggregate;
pub mod changelog;
pub mod consistency;
pub mod record;
pub mod table;
pub mod updater;

// Re-export primary types at crate root.
pub use aggregate::{Aggregator, LatestValue, SumCount};
pub use changelog::ChangelogLog;
pub use consistency::ConsistencyResult;
pub use record::RecordBuilder;
pub use table::ProjectionTable;
pub use updater::{Applied, Updater};

use duality_types::{Aggregate, ChangeOp};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when constructing projection or changelog state.
#[derive(Debug, thiserror::Error)]
pub enum ProjectionError {
    /// The changelog retention capacity must be at least 1.
    #[error("changelog capacity must be at least 1")]
    ZeroCapacity,

    /// The grouping key must be non-empty.
    #[error("grouping key must be non-empty")]
    EmptyKey,

    /// A snapshot-carrying operation was built without a snapshot.
    #[error("record for {op:?} requires an aggregate snapshot")]
    MissingSnapshot {
        /// The operation being built.
        op: ChangeOp,
    },

    /// A delete record was built with a snapshot.
    #[error("delete records must not carry a snapshot")]
    UnexpectedSnapshot,
}

// ---------------------------------------------------------------------------
// Anomaly type
// ---------------------------------------------------------------------------

/// A disagreement between the projection and the changelog.
///
/// Produced by the consistency check when the most recent changelog record
/// for a key does not match the aggregate the projection currently holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionAnomaly {
    /// The grouping key where the disagreement was found.
    pub key: String,
    /// The aggregate the projection holds for the key.
    pub projected: Option<Aggregate>,
    /// The snapshot carried by the key's most recent changelog record.
    pub recorded: Option<Aggregate>,
    /// Human-readable description of the anomaly.
    pub message: String,
}

impl core::fmt::Display for ProjectionAnomaly {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.message)
    }
}
