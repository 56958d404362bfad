//! Consistency verification between the projection and the changelog.
//!
//! The invariant: for any key the projection holds, the most recent
//! retained changelog record for that key snapshots the same aggregate.
//! This covers both quiescent state (the last record is `+I` or `+U`
//! carrying the committed aggregate) and the retract window of an
//! in-flight update (the last record is `-U`, which snapshots the OLD
//! aggregate -- exactly what the projection still holds until the apply
//! half commits).
//!
//! Keys whose records have all been evicted are skipped: the log is a
//! bounded window, not a complete history. The check exists as
//! defense-in-depth against updater bugs; for valid updater sequences
//! it passes by construction.

use duality_types::ChangeOp;

use crate::changelog::ChangelogLog;
use crate::table::ProjectionTable;
use crate::ProjectionAnomaly;

/// The result of a projection/changelog consistency check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsistencyResult {
    /// The projection and changelog agree.
    Consistent,
    /// At least one key disagrees; the first disagreement found.
    Inconsistency(ProjectionAnomaly),
}

/// Verify that the changelog's view of every projected key matches the
/// projection, and that no retained delete record contradicts a key
/// still being projected.
pub fn verify_consistency(
    table: &ProjectionTable,
    log: &ChangelogLog,
) -> ConsistencyResult {
    for (key, aggregate) in table {
        let Some(record) = log.last_for_key(key) else {
            // All records for this key were evicted; nothing to compare.
            continue;
        };

        if record.op == ChangeOp::Delete {
            return ConsistencyResult::Inconsistency(ProjectionAnomaly {
                key: key.clone(),
                projected: Some(*aggregate),
                recorded: None,
                message: format!(
                    "key {key} is projected but its most recent record is a delete"
                ),
            });
        }

        if record.snapshot != Some(*aggregate) {
            return ConsistencyResult::Inconsistency(ProjectionAnomaly {
                key: key.clone(),
                projected: Some(*aggregate),
                recorded: record.snapshot,
                message: format!(
                    "key {key}: projection holds {aggregate:?} but record {} snapshots {:?}",
                    record.seq, record.snapshot
                ),
            });
        }
    }

    // A retained non-delete record for a key the projection no longer
    // holds means a removal went unrecorded.
    for record in log.records() {
        if record.op == ChangeOp::Delete || table.contains_key(&record.key) {
            continue;
        }
        let Some(last) = log.last_for_key(&record.key) else {
            continue;
        };
        if last.op != ChangeOp::Delete {
            return ConsistencyResult::Inconsistency(ProjectionAnomaly {
                key: record.key.clone(),
                projected: None,
                recorded: last.snapshot,
                message: format!(
                    "key {} has record {} but is not projected and was never deleted",
                    record.key, last.seq
                ),
            });
        }
    }

    ConsistencyResult::Consistent
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use duality_types::{Aggregate, ChangelogMode, EventKind, OrderEvent};

    use crate::aggregate::SumCount;
    use crate::updater::Updater;

    use super::*;

    fn order(user: &str, amount: i64) -> OrderEvent {
        OrderEvent::new(user.to_owned(), Decimal::new(amount, 0))
    }

    fn play(events: &[(&str, i64)]) -> (ProjectionTable, ChangelogLog) {
        let updater = Updater::new(Box::new(SumCount::new()), ChangelogMode::Upsert);
        let mut table = ProjectionTable::new();
        let mut log = ChangelogLog::default();
        for (user, amount) in events {
            let _ = updater
                .apply_primary(&mut table, &mut log, user, EventKind::Upsert, &order(user, *amount))
                .unwrap();
        }
        (table, log)
    }

    #[test]
    fn quiescent_state_is_consistent() {
        let (table, log) = play(&[("Alice", 100), ("Bob", 50), ("Alice", 200)]);
        assert_eq!(verify_consistency(&table, &log), ConsistencyResult::Consistent);
    }

    #[test]
    fn retract_window_is_consistent() {
        let updater = Updater::new(Box::new(SumCount::new()), ChangelogMode::Retract);
        let mut table = ProjectionTable::new();
        let mut log = ChangelogLog::default();

        let _ = updater
            .apply_primary(&mut table, &mut log, "Alice", EventKind::Upsert, &order("Alice", 100))
            .unwrap();
        // Fire the retract half but not the apply half.
        let _ = updater
            .apply_primary(&mut table, &mut log, "Alice", EventKind::Upsert, &order("Alice", 200))
            .unwrap();

        // -U snapshots the old aggregate, which the projection still holds.
        assert_eq!(verify_consistency(&table, &log), ConsistencyResult::Consistent);
    }

    #[test]
    fn corrupted_projection_is_detected() {
        let (mut table, log) = play(&[("Alice", 100)]);
        let _ = table.commit("Alice".to_owned(), Aggregate::new(Decimal::new(999, 0), 9));

        let result = verify_consistency(&table, &log);
        assert!(matches!(
            &result,
            ConsistencyResult::Inconsistency(anomaly) if anomaly.key == "Alice"
        ));
    }

    #[test]
    fn unrecorded_removal_is_detected() {
        let (mut table, log) = play(&[("Alice", 100)]);
        let _ = table.remove("Alice");

        assert!(matches!(
            verify_consistency(&table, &log),
            ConsistencyResult::Inconsistency(_)
        ));
    }

    #[test]
    fn evicted_history_is_skipped() {
        let updater = Updater::new(Box::new(SumCount::new()), ChangelogMode::Upsert);
        let mut table = ProjectionTable::new();
        let mut log = ChangelogLog::new(1).unwrap();

        let _ = updater
            .apply_primary(&mut table, &mut log, "Alice", EventKind::Upsert, &order("Alice", 100))
            .unwrap();
        let _ = updater
            .apply_primary(&mut table, &mut log, "Bob", EventKind::Upsert, &order("Bob", 50))
            .unwrap();

        // Alice's record was evicted; only Bob's remains, and both keys
        // are still projected. The check skips Alice.
        assert_eq!(verify_consistency(&table, &log), ConsistencyResult::Consistent);
    }
}
