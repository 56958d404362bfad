//! Enumeration types for the Duality playback engine.
//!
//! The closed set of changelog operations, the event kinds a script may
//! contain, the changelog encodings a demo can be configured with, the
//! playback phase machine, and the terminal transcript line kinds.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Changelog operations
// ---------------------------------------------------------------------------

/// A changelog operation describing one state transition of the projection.
///
/// An update in retract mode is represented as two records: the removal of
/// the old value (`UpdateBefore`) followed by the insertion of the new value
/// (`UpdateAfter`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum ChangeOp {
    /// A new key entered the projection (`+I`).
    Insert,
    /// Retraction of a key's previous aggregate (`-U`).
    UpdateBefore,
    /// The key's new aggregate after an update (`+U`).
    UpdateAfter,
    /// The key left the projection (`-D`).
    Delete,
}

impl ChangeOp {
    /// The short wire label used throughout changelog displays.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Insert => "+I",
            Self::UpdateBefore => "-U",
            Self::UpdateAfter => "+U",
            Self::Delete => "-D",
        }
    }

    /// Returns `true` if this operation carries an aggregate snapshot.
    ///
    /// Every operation except `Delete` records the aggregate it inserted
    /// or retracted.
    pub const fn carries_snapshot(self) -> bool {
        !matches!(self, Self::Delete)
    }
}

impl core::fmt::Display for ChangeOp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ---------------------------------------------------------------------------
// Event kinds
// ---------------------------------------------------------------------------

/// The kind of a scripted event.
///
/// Whether an `Upsert` produces an insert or an update record is decided at
/// replay time by key presence in the projection, not by the script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum EventKind {
    /// Insert-or-update the grouping key with the event payload.
    Upsert,
    /// Remove the grouping key from the projection.
    Delete,
}

// ---------------------------------------------------------------------------
// Changelog encodings
// ---------------------------------------------------------------------------

/// The changelog encoding a demo replays its script under.
///
/// These are the three stream flavors the original material teaches:
/// append-only streams carry inserts only, retract streams represent an
/// update as a `-U`/`+U` pair, and upsert streams collapse updates into a
/// single `+U` keyed record (with `-D` for deletions).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum ChangelogMode {
    /// Every event is a new row keyed by its stream offset; `+I` only.
    AppendOnly,
    /// Updates emit a retraction of the old aggregate, then the new one.
    #[default]
    Retract,
    /// Updates emit a single keyed `+U`; deletions emit `-D`.
    Upsert,
}

// ---------------------------------------------------------------------------
// Playback phases
// ---------------------------------------------------------------------------

/// The lifecycle phase of one playback domain.
///
/// Transitions: `Idle -> Running -> (Paused <-> Running) -> Complete`,
/// with reset returning to `Idle` from any phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum PlaybackPhase {
    /// No playback has started, or the playback was reset.
    #[default]
    Idle,
    /// Events are being replayed on schedule.
    Running,
    /// Playback is frozen; the cursor and all state are preserved.
    Paused,
    /// Every scripted event has been replayed.
    Complete,
}

// ---------------------------------------------------------------------------
// Terminal transcript lines
// ---------------------------------------------------------------------------

/// The display category of one line in a scripted terminal session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum TerminalLineKind {
    /// A prompt followed by an echoed command.
    Command,
    /// Plain output text.
    Output,
    /// A result row.
    Data,
    /// An informational status line.
    Info,
    /// A success confirmation line.
    Success,
    /// The trailing blinking cursor.
    Cursor,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_op_labels() {
        assert_eq!(ChangeOp::Insert.label(), "+I");
        assert_eq!(ChangeOp::UpdateBefore.label(), "-U");
        assert_eq!(ChangeOp::UpdateAfter.label(), "+U");
        assert_eq!(ChangeOp::Delete.label(), "-D");
    }

    #[test]
    fn only_delete_lacks_a_snapshot() {
        assert!(ChangeOp::Insert.carries_snapshot());
        assert!(ChangeOp::UpdateBefore.carries_snapshot());
        assert!(ChangeOp::UpdateAfter.carries_snapshot());
        assert!(!ChangeOp::Delete.carries_snapshot());
    }

    #[test]
    fn default_mode_is_retract() {
        assert_eq!(ChangelogMode::default(), ChangelogMode::Retract);
    }

    #[test]
    fn phase_starts_idle() {
        assert_eq!(PlaybackPhase::default(), PlaybackPhase::Idle);
    }

    #[test]
    fn change_op_display_matches_label() {
        assert_eq!(ChangeOp::UpdateBefore.to_string(), "-U");
    }
}
