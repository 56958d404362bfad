//! Console rendering of changelog notifications and projection tables.
//!
//! The [`ConsoleRenderer`] is the engine's [`ChangeListener`]: it prints
//! one line per changelog notification in the `+I[key, total, cnt]`
//! format the demos display. Formatting is separated from printing so
//! tests can assert the exact output.

use duality_core::listener::ChangeListener;
use duality_types::{Aggregate, ChangeOp};

/// Format one changelog notification line.
pub fn format_change(op: ChangeOp, key: &str, snapshot: Option<&Aggregate>) -> String {
    snapshot.map_or_else(
        || format!("{}[{key}]", op.label()),
        |aggregate| {
            format!(
                "{}[{key}, {}, {}]",
                op.label(),
                aggregate.total,
                aggregate.count
            )
        },
    )
}

/// Format one projection row for the result table.
pub fn format_row(key: &str, aggregate: &Aggregate) -> String {
    format!(
        "{:<10} | {:>8} | {:>3}",
        key, aggregate.total, aggregate.count
    )
}

/// Prints changelog notifications to stdout as they fire.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleRenderer;

impl ConsoleRenderer {
    /// Create a console renderer.
    pub const fn new() -> Self {
        Self
    }
}

impl ChangeListener for ConsoleRenderer {
    fn on_insert(&self, key: &str, snapshot: &Aggregate) {
        println!("  {}", format_change(ChangeOp::Insert, key, Some(snapshot)));
    }

    fn on_update_before(&self, key: &str, snapshot: &Aggregate) {
        println!(
            "  {}",
            format_change(ChangeOp::UpdateBefore, key, Some(snapshot))
        );
    }

    fn on_update_after(&self, key: &str, snapshot: &Aggregate) {
        println!(
            "  {}",
            format_change(ChangeOp::UpdateAfter, key, Some(snapshot))
        );
    }

    fn on_delete(&self, key: &str) {
        println!("  {}", format_change(ChangeOp::Delete, key, None));
    }
}
