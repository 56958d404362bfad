//! The push-based output contract of a playback.
//!
//! On each fired step the sequencer reports exactly one change to its
//! [`ChangeListener`]. The listener owns all rendering concerns; the
//! sequencer never touches a view. Listener methods are called outside
//! the playback's state lock, so implementations may freely read the
//! playback's status or snapshots.

use duality_types::Aggregate;

/// Receives change notifications from a playback.
///
/// Implementations must be cheap and non-blocking: they run on the
/// playback's timer task between scheduled delays.
pub trait ChangeListener: Send + Sync {
    /// A new key entered the projection with the given aggregate.
    fn on_insert(&self, key: &str, snapshot: &Aggregate);

    /// The key's previous aggregate was retracted.
    fn on_update_before(&self, key: &str, snapshot: &Aggregate);

    /// The key's new aggregate was committed.
    fn on_update_after(&self, key: &str, snapshot: &Aggregate);

    /// The key was removed from the projection.
    fn on_delete(&self, key: &str);
}

/// A no-op listener for tests and headless runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpListener;

impl ChangeListener for NoOpListener {
    fn on_insert(&self, _key: &str, _snapshot: &Aggregate) {}
    fn on_update_before(&self, _key: &str, _snapshot: &Aggregate) {}
    fn on_update_after(&self, _key: &str, _snapshot: &Aggregate) {}
    fn on_delete(&self, _key: &str) {}
}
