//! Core entity structs for the Duality playback engine.
//!
//! The domain payloads a script carries, the scripted event wrapper, the
//! projection aggregate, the changelog record, the serializable playback
//! status, and the terminal transcript line.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{ChangeOp, EventKind, PlaybackPhase, TerminalLineKind};
use crate::ids::RecordId;

// ---------------------------------------------------------------------------
// Order events
// ---------------------------------------------------------------------------

/// The domain payload of one scripted event: an order placed by a user.
///
/// The `user` field is the grouping key for keyed changelog encodings.
/// `product` and `placed_at` are display-only context carried through to
/// the renderer; aggregation reads only `user` and `amount`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct OrderEvent {
    /// The user who placed the order (the grouping key).
    pub user: String,
    /// The product ordered, if the demo displays one.
    pub product: Option<String>,
    /// The order amount.
    #[ts(as = "String")]
    pub amount: Decimal,
    /// Display timestamp of the order (e.g. "10:01:15"), if any.
    pub placed_at: Option<String>,
}

impl OrderEvent {
    /// Create an order event with only the aggregation-relevant fields.
    pub const fn new(user: String, amount: Decimal) -> Self {
        Self {
            user,
            product: None,
            amount,
            placed_at: None,
        }
    }
}

/// One entry of an event script: a payload, the delay before it fires,
/// and the kind of state transition it requests.
///
/// Events are immutable after script construction and are consumed once
/// per playback in script order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ScriptedEvent {
    /// The kind of state transition this event requests.
    pub kind: EventKind,
    /// Delay in milliseconds before this event fires, relative to the
    /// previous event's fire time (or the start/resume instant).
    pub delay_ms: u64,
    /// The domain payload.
    pub payload: OrderEvent,
}

impl ScriptedEvent {
    /// Create an upsert event.
    pub const fn upsert(delay_ms: u64, payload: OrderEvent) -> Self {
        Self {
            kind: EventKind::Upsert,
            delay_ms,
            payload,
        }
    }

    /// Create a delete event for the payload's grouping key.
    pub const fn delete(delay_ms: u64, payload: OrderEvent) -> Self {
        Self {
            kind: EventKind::Delete,
            delay_ms,
            payload,
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

/// The materialized aggregate maintained per grouping key.
///
/// Mirrors the continuous query `SELECT user, SUM(amount), COUNT(*)`:
/// a running total and an event count. All arithmetic is [`Decimal`];
/// there is no floating point anywhere in the projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Aggregate {
    /// Running total of order amounts for this key.
    #[ts(as = "String")]
    pub total: Decimal,
    /// Number of events accumulated into this key.
    pub count: u64,
}

impl Aggregate {
    /// Create an aggregate from explicit parts.
    pub const fn new(total: Decimal, count: u64) -> Self {
        Self { total, count }
    }

    /// The aggregate produced by a key's first event.
    pub const fn first(amount: Decimal) -> Self {
        Self {
            total: amount,
            count: 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Changelog records
// ---------------------------------------------------------------------------

/// One record of the append-only changelog.
///
/// Insert, update-before, and update-after records snapshot the aggregate
/// they inserted or retracted; delete records carry the key alone. The
/// `seq` number increases monotonically across a playback and survives
/// log eviction, so consumers can detect trimmed history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ChangelogRecord {
    /// Unique record identifier.
    pub id: RecordId,
    /// Monotonic sequence number within the playback (0-based).
    pub seq: u64,
    /// The changelog operation.
    pub op: ChangeOp,
    /// The grouping key this record describes.
    pub key: String,
    /// The aggregate snapshot; `None` exactly for delete records.
    pub snapshot: Option<Aggregate>,
    /// Real-world timestamp when the record was emitted.
    pub recorded_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Playback status
// ---------------------------------------------------------------------------

/// JSON-serializable status of one playback domain for the host UI.
///
/// Drives control enablement (start/pause/reset buttons) and progress
/// display without exposing the playback internals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PlaybackStatus {
    /// The current lifecycle phase.
    pub phase: PlaybackPhase,
    /// Index of the next unprocessed script entry.
    pub cursor: u64,
    /// Total number of entries in the script.
    pub script_len: u64,
    /// Total changelog records emitted so far (including evicted ones).
    pub records_emitted: u64,
    /// Number of keys currently in the projection.
    pub projection_size: u64,
    /// Whether an update's apply half is staged awaiting its delay.
    pub pending_update: bool,
}

// ---------------------------------------------------------------------------
// Terminal transcript lines
// ---------------------------------------------------------------------------

/// One line of a scripted terminal session.
///
/// The `prompt` is present only for [`TerminalLineKind::Command`] lines;
/// [`TerminalLineKind::Cursor`] lines have empty text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TerminalLine {
    /// The display category of this line.
    pub kind: TerminalLineKind,
    /// The prompt preceding a command line, if any (e.g. `Flink SQL>`).
    pub prompt: Option<String>,
    /// The line text.
    pub text: String,
    /// Delay in milliseconds before this line appears, relative to the
    /// previous line.
    pub delay_ms: u64,
}

impl TerminalLine {
    /// A prompt-and-command line.
    pub const fn command(prompt: String, text: String, delay_ms: u64) -> Self {
        Self {
            kind: TerminalLineKind::Command,
            prompt: Some(prompt),
            text,
            delay_ms,
        }
    }

    /// A line of the given non-command kind.
    pub const fn plain(kind: TerminalLineKind, text: String, delay_ms: u64) -> Self {
        Self {
            kind,
            prompt: None,
            text,
            delay_ms,
        }
    }

    /// The trailing cursor marker.
    pub const fn cursor(delay_ms: u64) -> Self {
        Self {
            kind: TerminalLineKind::Cursor,
            prompt: None,
            text: String::new(),
            delay_ms,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_first_counts_one() {
        let agg = Aggregate::first(Decimal::new(100, 0));
        assert_eq!(agg.total, Decimal::new(100, 0));
        assert_eq!(agg.count, 1);
    }

    #[test]
    fn order_event_defaults_to_no_context() {
        let event = OrderEvent::new("Alice".to_owned(), Decimal::new(100, 0));
        assert!(event.product.is_none());
        assert!(event.placed_at.is_none());
    }

    #[test]
    fn changelog_record_roundtrip_serde() {
        let record = ChangelogRecord {
            id: RecordId::new(),
            seq: 3,
            op: ChangeOp::UpdateAfter,
            key: "Alice".to_owned(),
            snapshot: Some(Aggregate::new(Decimal::new(300, 0), 2)),
            recorded_at: Utc::now(),
        };
        let json = serde_json::to_string(&record).unwrap();
        let restored: ChangelogRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, record);
    }

    #[test]
    fn terminal_command_line_has_prompt() {
        let line = TerminalLine::command("Flink SQL>".to_owned(), " SHOW TABLES;".to_owned(), 800);
        assert_eq!(line.kind, TerminalLineKind::Command);
        assert_eq!(line.prompt.as_deref(), Some("Flink SQL>"));
    }

    #[test]
    fn cursor_line_is_empty() {
        let line = TerminalLine::cursor(300);
        assert_eq!(line.kind, TerminalLineKind::Cursor);
        assert!(line.text.is_empty());
        assert!(line.prompt.is_none());
    }
}
