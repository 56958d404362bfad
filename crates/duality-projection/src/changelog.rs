//! The changelog log: an append-only, capacity-bounded record list.
//!
//! Long-running demos would otherwise grow the visual changelog without
//! bound, so the log retains at most `capacity` records. Eviction is
//! strict FIFO and happens as a post-append trim: a record is always
//! appended first, then the oldest records are dropped, so no record is
//! ever evicted before a newer one is appended.
//!
//! Sequence numbers are assigned by the log and keep increasing across
//! evictions, so consumers can tell trimmed history from a fresh log.

use duality_types::{Aggregate, ChangeOp, ChangelogRecord};
use tracing::trace;

use crate::record::RecordBuilder;
use crate::ProjectionError;

/// Default number of retained records.
pub const DEFAULT_CAPACITY: usize = 25;

/// The append-only changelog of one playback, bounded to a retention cap.
#[derive(Debug, Clone)]
pub struct ChangelogLog {
    /// Retained records, oldest first.
    records: Vec<ChangelogRecord>,
    /// Maximum number of retained records.
    capacity: usize,
    /// Total records ever appended (also the next sequence number).
    total_appended: u64,
}

impl Default for ChangelogLog {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            capacity: DEFAULT_CAPACITY,
            total_appended: 0,
        }
    }
}

impl ChangelogLog {
    /// Create a new empty log retaining at most `capacity` records.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::ZeroCapacity`] if `capacity` is 0.
    pub const fn new(capacity: usize) -> Result<Self, ProjectionError> {
        if capacity == 0 {
            return Err(ProjectionError::ZeroCapacity);
        }
        Ok(Self {
            records: Vec::new(),
            capacity,
            total_appended: 0,
        })
    }

    /// Return the number of currently retained records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Return whether the log retains no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Return the retention capacity.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Return the total number of records ever appended, including
    /// evicted ones.
    pub const fn total_appended(&self) -> u64 {
        self.total_appended
    }

    /// Return the retained records, oldest first.
    pub fn records(&self) -> &[ChangelogRecord] {
        &self.records
    }

    /// Return the most recent record for a key, if retained.
    pub fn last_for_key(&self, key: &str) -> Option<&ChangelogRecord> {
        self.records.iter().rev().find(|record| record.key == key)
    }

    /// Build, validate, and append one record for the given operation.
    ///
    /// The sequence number is assigned by the log. After the append, the
    /// oldest records are trimmed until the retained length is within
    /// capacity.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError`] if the record fails validation.
    pub fn emit(
        &mut self,
        op: ChangeOp,
        key: String,
        snapshot: Option<Aggregate>,
    ) -> Result<ChangelogRecord, ProjectionError> {
        let mut builder = RecordBuilder::new(self.total_appended, op, key);
        if let Some(aggregate) = snapshot {
            builder = builder.snapshot(aggregate);
        }
        let record = builder.build()?;

        trace!(seq = record.seq, op = %record.op, key = %record.key, "changelog append");

        self.records.push(record.clone());
        self.total_appended = self.total_appended.saturating_add(1);

        if self.records.len() > self.capacity {
            let drain_count = self.records.len().saturating_sub(self.capacity);
            self.records.drain(..drain_count);
        }

        Ok(record)
    }

    /// Clear all retained records and reset the sequence counter.
    pub fn clear(&mut self) {
        self.records.clear();
        self.total_appended = 0;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn emit_insert(log: &mut ChangelogLog, key: &str, amount: i64) {
        let _ = log
            .emit(
                ChangeOp::Insert,
                key.to_owned(),
                Some(Aggregate::first(Decimal::new(amount, 0))),
            )
            .unwrap();
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(
            ChangelogLog::new(0),
            Err(ProjectionError::ZeroCapacity)
        ));
    }

    #[test]
    fn sequence_numbers_are_assigned_in_order() {
        let mut log = ChangelogLog::default();
        emit_insert(&mut log, "Alice", 100);
        emit_insert(&mut log, "Bob", 50);

        let seqs: Vec<u64> = log.records().iter().map(|r| r.seq).collect();
        assert_eq!(seqs, vec![0, 1]);
        assert_eq!(log.total_appended(), 2);
    }

    #[test]
    fn eviction_is_fifo_and_post_append() {
        let mut log = ChangelogLog::new(3).unwrap();
        for index in 0..5 {
            emit_insert(&mut log, &format!("user-{index}"), 10);
        }

        // The log never exceeds its capacity and retains the most
        // recent records in original order.
        assert_eq!(log.len(), 3);
        let keys: Vec<&str> = log.records().iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["user-2", "user-3", "user-4"]);
        let seqs: Vec<u64> = log.records().iter().map(|r| r.seq).collect();
        assert_eq!(seqs, vec![2, 3, 4]);
        assert_eq!(log.total_appended(), 5);
    }

    #[test]
    fn last_for_key_finds_most_recent() {
        let mut log = ChangelogLog::default();
        emit_insert(&mut log, "Alice", 100);
        emit_insert(&mut log, "Bob", 50);
        let _ = log
            .emit(
                ChangeOp::UpdateBefore,
                "Alice".to_owned(),
                Some(Aggregate::new(Decimal::new(100, 0), 1)),
            )
            .unwrap();

        let record = log.last_for_key("Alice").unwrap();
        assert_eq!(record.op, ChangeOp::UpdateBefore);
        assert!(log.last_for_key("Charlie").is_none());
    }

    #[test]
    fn clear_resets_sequence_numbers() {
        let mut log = ChangelogLog::default();
        emit_insert(&mut log, "Alice", 100);
        log.clear();

        assert!(log.is_empty());
        assert_eq!(log.total_appended(), 0);

        emit_insert(&mut log, "Bob", 50);
        assert_eq!(log.records().first().map(|r| r.seq), Some(0));
    }
}
