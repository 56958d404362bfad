//! The canonical demo event scripts.
//!
//! Each demo replays a fixed order feed against a continuous aggregation
//! query under one changelog encoding:
//!
//! - `order-stream` -- raw orders appended to a table, one row per event
//!   keyed by stream offset (append-only encoding).
//! - `aggregation-changelog` -- a per-user sum/count aggregate whose
//!   updates are emitted as retract/apply pairs.
//! - `live-aggregation` -- the same aggregate updating in place (upsert
//!   encoding), with a longer feed.
//! - `upsert-stream` -- an upsert feed that also exercises the delete
//!   path.
//!
//! Delays are the original demo timings in milliseconds.

use rust_decimal::Decimal;

use duality_core::script::{EventScript, ScriptError};
use duality_types::{ChangelogMode, OrderEvent, ScriptedEvent};

/// A named demo: an event script plus the display context around it.
#[derive(Debug, Clone)]
pub struct Demo {
    /// Stable demo name used in configuration.
    pub name: &'static str,
    /// Human-readable title.
    pub title: &'static str,
    /// The SQL text the demo visualizes.
    pub query: &'static str,
    /// The event script to replay.
    pub script: EventScript,
}

/// An order with full display context.
fn order(user: &str, product: &str, amount: i64, placed_at: &str) -> OrderEvent {
    OrderEvent {
        user: user.to_owned(),
        product: Some(product.to_owned()),
        amount: Decimal::new(amount, 0),
        placed_at: Some(placed_at.to_owned()),
    }
}

/// An order carrying only the aggregation-relevant fields.
fn bare_order(user: &str, amount: i64) -> OrderEvent {
    OrderEvent::new(user.to_owned(), Decimal::new(amount, 0))
}

/// Raw orders appended to a table, one row per event.
///
/// # Errors
///
/// Returns [`ScriptError`] if the script fails validation.
pub fn order_stream() -> Result<Demo, ScriptError> {
    let events = vec![
        ScriptedEvent::upsert(1000, order("Alice", "Laptop", 1000, "10:01:15")),
        ScriptedEvent::upsert(1000, order("Bob", "Mouse", 50, "10:01:18")),
        ScriptedEvent::upsert(1000, order("Alice", "Keyboard", 100, "10:01:22")),
        ScriptedEvent::upsert(1000, order("Charlie", "Monitor", 300, "10:01:25")),
    ];
    Ok(Demo {
        name: "order-stream",
        title: "Stream to Table",
        query: "SELECT * FROM orders;",
        script: EventScript::new(events, ChangelogMode::AppendOnly)?,
    })
}

/// A per-user aggregate whose updates emit retract/apply pairs.
///
/// # Errors
///
/// Returns [`ScriptError`] if the script fails validation.
pub fn aggregation_changelog() -> Result<Demo, ScriptError> {
    let events = vec![
        ScriptedEvent::upsert(2000, bare_order("Alice", 100)),
        ScriptedEvent::upsert(2000, bare_order("Bob", 50)),
        ScriptedEvent::upsert(2000, bare_order("Alice", 200)),
        ScriptedEvent::upsert(2000, bare_order("Charlie", 200)),
    ];
    Ok(Demo {
        name: "aggregation-changelog",
        title: "Aggregations & Changelog Output",
        query: "SELECT user_id, SUM(amount) AS total, COUNT(*) AS cnt\n\
                FROM orders\n\
                GROUP BY user_id;",
        script: EventScript::new(events, ChangelogMode::Retract)?,
    })
}

/// The live aggregation feed: the same aggregate updating in place.
///
/// # Errors
///
/// Returns [`ScriptError`] if the script fails validation.
pub fn live_aggregation() -> Result<Demo, ScriptError> {
    let events = vec![
        ScriptedEvent::upsert(1200, bare_order("Alice", 100)),
        ScriptedEvent::upsert(1200, bare_order("Bob", 50)),
        ScriptedEvent::upsert(1200, bare_order("Alice", 200)),
        ScriptedEvent::upsert(1200, bare_order("Charlie", 150)),
        ScriptedEvent::upsert(1200, bare_order("Bob", 100)),
        ScriptedEvent::upsert(1200, bare_order("Alice", 50)),
    ];
    Ok(Demo {
        name: "live-aggregation",
        title: "Live SQL Aggregation",
        query: "SELECT user_id, SUM(amount) AS total, COUNT(*) AS cnt\n\
                FROM orders\n\
                GROUP BY user_id;",
        script: EventScript::new(events, ChangelogMode::Upsert)?,
    })
}

/// An upsert feed that also removes a key.
///
/// # Errors
///
/// Returns [`ScriptError`] if the script fails validation.
pub fn upsert_stream() -> Result<Demo, ScriptError> {
    let events = vec![
        ScriptedEvent::upsert(900, bare_order("Alice", 100)),
        ScriptedEvent::upsert(900, bare_order("Bob", 50)),
        ScriptedEvent::upsert(900, bare_order("Alice", 200)),
        ScriptedEvent::delete(900, bare_order("Bob", 0)),
    ];
    Ok(Demo {
        name: "upsert-stream",
        title: "Upsert Changelog",
        query: "INSERT INTO user_totals\n\
                SELECT user_id, SUM(amount) FROM orders GROUP BY user_id;",
        script: EventScript::new(events, ChangelogMode::Upsert)?,
    })
}

/// All demos in presentation order.
///
/// # Errors
///
/// Returns [`ScriptError`] if any script fails validation.
pub fn all() -> Result<Vec<Demo>, ScriptError> {
    Ok(vec![
        order_stream()?,
        aggregation_changelog()?,
        live_aggregation()?,
        upsert_stream()?,
    ])
}

/// Look up a demo by its configuration name.
///
/// # Errors
///
/// Returns [`ScriptError`] if the demo's script fails validation.
pub fn by_name(name: &str) -> Result<Option<Demo>, ScriptError> {
    let demo = match name {
        "order-stream" => Some(order_stream()?),
        "aggregation-changelog" => Some(aggregation_changelog()?),
        "live-aggregation" => Some(live_aggregation()?),
        "upsert-stream" => Some(upsert_stream()?),
        _ => None,
    };
    Ok(demo)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use duality_types::EventKind;

    use super::*;

    #[test]
    fn all_demo_scripts_validate() {
        let demos = all().unwrap();
        assert_eq!(demos.len(), 4);
        for demo in &demos {
            assert!(!demo.script.is_empty());
        }
    }

    #[test]
    fn order_stream_is_append_only() {
        let demo = order_stream().unwrap();
        assert_eq!(demo.script.mode(), ChangelogMode::AppendOnly);
        assert_eq!(demo.script.len(), 4);
        // Alice appears twice and still produces two distinct rows.
        assert_eq!(demo.script.key_for(0).as_deref(), Some("0"));
        assert_eq!(demo.script.key_for(2).as_deref(), Some("2"));
    }

    #[test]
    fn aggregation_changelog_uses_retract_encoding() {
        let demo = aggregation_changelog().unwrap();
        assert_eq!(demo.script.mode(), ChangelogMode::Retract);
        // Alice's second order is the event that becomes an update.
        let users: Vec<&str> = demo
            .script
            .events()
            .iter()
            .map(|event| event.payload.user.as_str())
            .collect();
        assert_eq!(users, vec!["Alice", "Bob", "Alice", "Charlie"]);
    }

    #[test]
    fn upsert_stream_exercises_delete() {
        let demo = upsert_stream().unwrap();
        let kinds: Vec<EventKind> = demo
            .script
            .events()
            .iter()
            .map(|event| event.kind)
            .collect();
        assert!(kinds.contains(&EventKind::Delete));
    }

    #[test]
    fn by_name_resolves_known_demos() {
        assert!(by_name("live-aggregation").unwrap().is_some());
        assert!(by_name("no-such-demo").unwrap().is_none());
    }
}
