//! Event scripts: the fixed, ordered list of events a demo replays.
//!
//! A script is validated once at construction and immutable thereafter.
//! Grouping keys are derived here: keyed encodings group by the payload's
//! user, while append-only streams key every event by its stream offset
//! (so a user appearing twice produces two rows, as in a raw order feed).

use std::sync::Arc;

use duality_types::{ChangelogMode, EventKind, ScriptedEvent};

/// Errors that can occur during script construction.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// A script must contain at least one event.
    #[error("event script must contain at least one event")]
    Empty,

    /// A keyed script contained an event with an empty grouping key.
    #[error("event at index {index} has an empty grouping key")]
    EmptyKey {
        /// The offending event's position in the script.
        index: usize,
    },

    /// An append-only script contained a delete event.
    #[error("append-only script may not contain a delete event (index {index})")]
    AppendOnlyDelete {
        /// The offending event's position in the script.
        index: usize,
    },
}

/// A validated, immutable event script bound to a changelog encoding.
///
/// Cloning a script is cheap: the event list is shared.
#[derive(Debug, Clone)]
pub struct EventScript {
    mode: ChangelogMode,
    events: Arc<[ScriptedEvent]>,
}

impl EventScript {
    /// Validate and construct a script for the given encoding.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::Empty`] for an empty event list,
    /// [`ScriptError::EmptyKey`] if a keyed encoding has an event without
    /// a grouping key, and [`ScriptError::AppendOnlyDelete`] if an
    /// append-only script tries to delete.
    pub fn new(events: Vec<ScriptedEvent>, mode: ChangelogMode) -> Result<Self, ScriptError> {
        if events.is_empty() {
            return Err(ScriptError::Empty);
        }

        for (index, event) in events.iter().enumerate() {
            match mode {
                ChangelogMode::AppendOnly => {
                    if event.kind == EventKind::Delete {
                        return Err(ScriptError::AppendOnlyDelete { index });
                    }
                }
                ChangelogMode::Retract | ChangelogMode::Upsert => {
                    if event.payload.user.is_empty() {
                        return Err(ScriptError::EmptyKey { index });
                    }
                }
            }
        }

        Ok(Self {
            mode,
            events: events.into(),
        })
    }

    /// Return the changelog encoding this script replays under.
    pub const fn mode(&self) -> ChangelogMode {
        self.mode
    }

    /// Return the number of events in the script.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Return whether the script has no events. Always `false` for a
    /// constructed script; present for API completeness.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Return the event at the given position.
    pub fn get(&self, index: usize) -> Option<&ScriptedEvent> {
        self.events.get(index)
    }

    /// Return all events in script order.
    pub fn events(&self) -> &[ScriptedEvent] {
        &self.events
    }

    /// Derive the grouping key for the event at the given position.
    ///
    /// Append-only streams key by stream offset; keyed encodings group by
    /// the payload's user.
    pub fn key_for(&self, index: usize) -> Option<String> {
        let event = self.events.get(index)?;
        let key = match self.mode {
            ChangelogMode::AppendOnly => index.to_string(),
            ChangelogMode::Retract | ChangelogMode::Upsert => event.payload.user.clone(),
        };
        Some(key)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use duality_types::OrderEvent;

    use super::*;

    fn upsert(user: &str, amount: i64) -> ScriptedEvent {
        ScriptedEvent::upsert(1000, OrderEvent::new(user.to_owned(), Decimal::new(amount, 0)))
    }

    #[test]
    fn empty_script_is_rejected() {
        assert!(matches!(
            EventScript::new(Vec::new(), ChangelogMode::Retract),
            Err(ScriptError::Empty)
        ));
    }

    #[test]
    fn keyed_script_rejects_empty_user() {
        let events = vec![upsert("Alice", 100), upsert("", 50)];
        assert!(matches!(
            EventScript::new(events, ChangelogMode::Retract),
            Err(ScriptError::EmptyKey { index: 1 })
        ));
    }

    #[test]
    fn append_only_rejects_deletes() {
        let events = vec![
            upsert("Alice", 100),
            ScriptedEvent::delete(1000, OrderEvent::new("Alice".to_owned(), Decimal::ZERO)),
        ];
        assert!(matches!(
            EventScript::new(events, ChangelogMode::AppendOnly),
            Err(ScriptError::AppendOnlyDelete { index: 1 })
        ));
    }

    #[test]
    fn append_only_keys_by_offset() {
        let events = vec![upsert("Alice", 100), upsert("Alice", 200)];
        let script = EventScript::new(events, ChangelogMode::AppendOnly).unwrap();
        assert_eq!(script.key_for(0).as_deref(), Some("0"));
        assert_eq!(script.key_for(1).as_deref(), Some("1"));
    }

    #[test]
    fn keyed_script_keys_by_user() {
        let events = vec![upsert("Alice", 100), upsert("Bob", 50)];
        let script = EventScript::new(events, ChangelogMode::Retract).unwrap();
        assert_eq!(script.key_for(0).as_deref(), Some("Alice"));
        assert_eq!(script.key_for(1).as_deref(), Some("Bob"));
        assert!(script.key_for(2).is_none());
    }

    #[test]
    fn allows_empty_user_in_append_only() {
        // Raw feeds may omit the user entirely; the offset is the key.
        let events = vec![upsert("", 100)];
        let script = EventScript::new(events, ChangelogMode::AppendOnly).unwrap();
        assert_eq!(script.len(), 1);
    }
}
