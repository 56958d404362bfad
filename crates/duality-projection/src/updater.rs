//! The projection updater: applies one event under insert-or-update rules.
//!
//! For each fired event the updater decides, from key presence, whether
//! the event inserts a new key, updates an existing one, or removes one,
//! then mutates the [`ProjectionTable`] and appends the matching
//! [`ChangelogRecord`]s under the configured [`ChangelogMode`].
//!
//! Retract-mode updates are two-phase: [`Updater::apply_primary`] emits
//! the `-U` record and stages the new aggregate WITHOUT committing it;
//! the sequencer calls [`Updater::apply_staged`] after the intra-update
//! delay to commit and emit `+U`. Between the two calls the projection
//! still holds the pre-update aggregate.
//!
//! [`ChangelogRecord`]: duality_types::ChangelogRecord

use duality_types::{Aggregate, ChangeOp, ChangelogMode, EventKind, OrderEvent};
use tracing::debug;

use crate::aggregate::Aggregator;
use crate::changelog::ChangelogLog;
use crate::table::ProjectionTable;
use crate::ProjectionError;

/// The outcome of applying an event's primary phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// A new key was inserted and `+I` emitted.
    Inserted(Aggregate),
    /// Retract mode: `-U` was emitted and the new aggregate staged; the
    /// commit and `+U` happen in [`Updater::apply_staged`].
    RetractStaged {
        /// The staged aggregate awaiting commit.
        after: Aggregate,
    },
    /// Upsert mode: the new aggregate was committed and `+U` emitted.
    Updated(Aggregate),
    /// The key was removed and `-D` emitted.
    Deleted,
    /// Nothing happened (delete of an absent key).
    Noop,
}

/// Applies events to a projection and changelog under one encoding.
///
/// The updater owns the accumulation rule and the changelog mode; the
/// projection and changelog are borrowed per call because the sequencer
/// keeps them behind its own state lock.
pub struct Updater {
    aggregator: Box<dyn Aggregator>,
    mode: ChangelogMode,
}

impl core::fmt::Debug for Updater {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Updater").field("mode", &self.mode).finish()
    }
}

impl Updater {
    /// Create an updater with the given accumulation rule and encoding.
    pub fn new(aggregator: Box<dyn Aggregator>, mode: ChangelogMode) -> Self {
        Self { aggregator, mode }
    }

    /// Return the changelog encoding this updater emits.
    pub const fn mode(&self) -> ChangelogMode {
        self.mode
    }

    /// Apply the primary phase of one event.
    ///
    /// `key` is the grouping key the sequencer derived for the event
    /// (the payload's user, or the stream offset in append-only mode).
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError`] if record construction fails, which
    /// only happens for an empty grouping key.
    pub fn apply_primary(
        &self,
        table: &mut ProjectionTable,
        log: &mut ChangelogLog,
        key: &str,
        kind: EventKind,
        event: &OrderEvent,
    ) -> Result<Applied, ProjectionError> {
        match kind {
            EventKind::Delete => self.apply_delete(table, log, key),
            EventKind::Upsert => match table.get(key).copied() {
                None => {
                    let aggregate = self.aggregator.accumulate(None, event);
                    let _ = table.commit(key.to_owned(), aggregate);
                    let _ = log.emit(ChangeOp::Insert, key.to_owned(), Some(aggregate))?;
                    Ok(Applied::Inserted(aggregate))
                }
                Some(previous) => {
                    let after = self.aggregator.accumulate(Some(&previous), event);
                    if self.mode == ChangelogMode::Retract {
                        // Retract the old aggregate now; the commit and
                        // +U wait for the intra-update delay.
                        let _ =
                            log.emit(ChangeOp::UpdateBefore, key.to_owned(), Some(previous))?;
                        Ok(Applied::RetractStaged { after })
                    } else {
                        let _ = table.commit(key.to_owned(), after);
                        let _ = log.emit(ChangeOp::UpdateAfter, key.to_owned(), Some(after))?;
                        Ok(Applied::Updated(after))
                    }
                }
            },
        }
    }

    /// Commit a staged update's apply half and emit `+U`.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError`] if record construction fails.
    pub fn apply_staged(
        &self,
        table: &mut ProjectionTable,
        log: &mut ChangelogLog,
        key: &str,
        after: Aggregate,
    ) -> Result<(), ProjectionError> {
        let _ = table.commit(key.to_owned(), after);
        let _ = log.emit(ChangeOp::UpdateAfter, key.to_owned(), Some(after))?;
        Ok(())
    }

    fn apply_delete(
        &self,
        table: &mut ProjectionTable,
        log: &mut ChangelogLog,
        key: &str,
    ) -> Result<Applied, ProjectionError> {
        if table.remove(key).is_none() {
            debug!(key, "delete of absent key ignored");
            return Ok(Applied::Noop);
        }
        let _ = log.emit(ChangeOp::Delete, key.to_owned(), None)?;
        Ok(Applied::Deleted)
    }
}
