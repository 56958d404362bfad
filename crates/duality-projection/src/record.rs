//! Record builder and validation for the changelog.
//!
//! Provides a [`RecordBuilder`] that enforces the snapshot invariant:
//! insert, update-before, and update-after records must carry the
//! aggregate they inserted or retracted, and delete records must not.
//! Builders validate inputs before producing a [`ChangelogRecord`].

use chrono::Utc;

use duality_types::{Aggregate, ChangeOp, ChangelogRecord, RecordId};

use crate::ProjectionError;

/// Builder for constructing validated [`ChangelogRecord`] values.
///
/// # Examples
///
/// ```
/// use duality_projection::RecordBuilder;
/// use duality_types::{Aggregate, ChangeOp};
/// use rust_decimal::Decimal;
///
/// let record = RecordBuilder::new(0, ChangeOp::Insert, "Alice".to_owned())
///     .snapshot(Aggregate::first(Decimal::new(100, 0)))
///     .build();
///
/// assert!(record.is_ok());
/// ```
#[derive(Debug)]
pub struct RecordBuilder {
    seq: u64,
    op: ChangeOp,
    key: String,
    snapshot: Option<Aggregate>,
}

impl RecordBuilder {
    /// Start building a record with the given sequence number, operation,
    /// and grouping key.
    pub const fn new(seq: u64, op: ChangeOp, key: String) -> Self {
        Self {
            seq,
            op,
            key,
            snapshot: None,
        }
    }

    /// Set the aggregate snapshot this record carries.
    #[must_use]
    pub const fn snapshot(mut self, aggregate: Aggregate) -> Self {
        self.snapshot = Some(aggregate);
        self
    }

    /// Validate inputs and produce a [`ChangelogRecord`].
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::EmptyKey`] if the key is empty.
    /// Returns [`ProjectionError::MissingSnapshot`] if a snapshot-carrying
    /// operation was built without one.
    /// Returns [`ProjectionError::UnexpectedSnapshot`] if a delete record
    /// was given a snapshot.
    pub fn build(self) -> Result<ChangelogRecord, ProjectionError> {
        if self.key.is_empty() {
            return Err(ProjectionError::EmptyKey);
        }

        if self.op.carries_snapshot() && self.snapshot.is_none() {
            return Err(ProjectionError::MissingSnapshot { op: self.op });
        }

        if !self.op.carries_snapshot() && self.snapshot.is_some() {
            return Err(ProjectionError::UnexpectedSnapshot);
        }

        Ok(ChangelogRecord {
            id: RecordId::new(),
            seq: self.seq,
            op: self.op,
            key: self.key,
            snapshot: self.snapshot,
            recorded_at: Utc::now(),
        })
    }
}
