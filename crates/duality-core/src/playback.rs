//! The playback state machine: timed replay with pause/resume/reset.
//!
//! A [`Playback`] replays one [`EventScript`] as a time-spaced sequence
//! of projection mutations and changelog appends, reporting each change
//! to its [`ChangeListener`]. The lifecycle follows the phase machine
//! `Idle -> Running -> (Paused <-> Running) -> Complete`, with `reset`
//! returning to `Idle` from any phase.
//!
//! # Scheduling
//!
//! One driver task per playback sleeps each event's delay in turn, so
//! event *i* fires at the cumulative sum of the delays for indices
//! `[cursor..i]` relative to the last start or resume. A retract-mode
//! update's apply half is a nested delay relative to the retract fire
//! time. Pausing aborts the driver; resuming spawns a fresh driver that
//! replays a staged apply half first, then the script suffix, each with
//! its full delay.
//!
//! # Cancellation
//!
//! The driver holds only a [`Weak`] reference to the playback state.
//! Dropping the `Playback` (view teardown) aborts all timers exactly
//! once, and a timer that still fires can no longer reach any state:
//! the upgrade fails and the task returns. A timer racing a `pause`
//! re-checks the phase under the state lock before mutating, so a
//! cancelled timer never changes state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info};

use duality_projection::aggregate::{Aggregator, SumCount};
use duality_projection::{Applied, ChangelogLog, ProjectionError, ProjectionTable, Updater};
use duality_types::{Aggregate, ChangelogRecord, PlaybackPhase, PlaybackStatus};

use crate::config::PlaybackConfig;
use crate::listener::ChangeListener;
use crate::script::EventScript;

/// Errors that can occur when constructing a playback.
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    /// Projection or changelog construction failed.
    #[error("projection error: {source}")]
    Projection {
        /// The underlying projection error.
        #[from]
        source: ProjectionError,
    },
}

/// An update's apply half, staged while its intra-update delay elapses.
#[derive(Debug, Clone)]
struct PendingApply {
    /// The grouping key being updated.
    key: String,
    /// The aggregate to commit when the delay elapses.
    after: Aggregate,
}

/// The mutable replay state, guarded by one lock.
#[derive(Debug)]
struct ReplayState {
    phase: PlaybackPhase,
    cursor: usize,
    pending: Option<PendingApply>,
    table: ProjectionTable,
    log: ChangelogLog,
}

/// What the driver should do next.
enum NextStep {
    /// Sleep the delay, then commit the staged apply half.
    ApplyHalf(Duration),
    /// Sleep the delay, then fire the event at the cursor.
    Event(Duration),
    /// Nothing left to schedule; the driver exits.
    Finished,
}

/// A change notification, computed under the state lock and dispatched
/// outside it.
enum Note {
    Insert(String, Aggregate),
    Before(String, Aggregate),
    After(String, Aggregate),
    Deleted(String),
}

struct Shared {
    script: EventScript,
    intra_update_delay: Duration,
    updater: Updater,
    listener: Arc<dyn ChangeListener>,
    state: Mutex<ReplayState>,
    timers: Mutex<Vec<JoinHandle<()>>>,
    complete: Notify,
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, ReplayState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_timers(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Abort and forget every outstanding timer.
    fn cancel_timers(&self) {
        let mut timers = self.lock_timers();
        for handle in timers.drain(..) {
            handle.abort();
        }
    }

    /// Decide the driver's next action. Marks the playback complete when
    /// the cursor has passed the last event and nothing is staged.
    fn next_step(&self) -> NextStep {
        let mut state = self.lock_state();
        if state.phase != PlaybackPhase::Running {
            return NextStep::Finished;
        }
        if state.pending.is_some() {
            return NextStep::ApplyHalf(self.intra_update_delay);
        }
        match self.script.get(state.cursor) {
            Some(event) => NextStep::Event(Duration::from_millis(event.delay_ms)),
            None => {
                state.phase = PlaybackPhase::Complete;
                drop(state);
                info!(events = self.script.len(), "playback complete");
                self.complete.notify_waiters();
                NextStep::Finished
            }
        }
    }

    /// Fire the primary phase of the event at the cursor.
    fn fire_primary(&self) {
        let mut state = self.lock_state();
        if state.phase != PlaybackPhase::Running {
            return;
        }
        let cursor = state.cursor;
        let Some(event) = self.script.get(cursor).cloned() else {
            return;
        };
        let Some(key) = self.script.key_for(cursor) else {
            return;
        };
        state.cursor = cursor.saturating_add(1);

        debug!(index = cursor, key = %key, kind = ?event.kind, "event fired");

        let st = &mut *state;
        let note = match self.updater.apply_primary(
            &mut st.table,
            &mut st.log,
            &key,
            event.kind,
            &event.payload,
        ) {
            Ok(Applied::Inserted(aggregate)) => Some(Note::Insert(key, aggregate)),
            Ok(Applied::RetractStaged { after }) => {
                let before = st.table.get(&key).copied();
                st.pending = Some(PendingApply {
                    key: key.clone(),
                    after,
                });
                before.map(|aggregate| Note::Before(key, aggregate))
            }
            Ok(Applied::Updated(aggregate)) => Some(Note::After(key, aggregate)),
            Ok(Applied::Deleted) => Some(Note::Deleted(key)),
            Ok(Applied::Noop) => None,
            Err(err) => {
                error!(index = cursor, error = %err, "event application failed");
                None
            }
        };
        drop(state);
        self.dispatch(note);
    }

    /// Commit the staged apply half of a retract-mode update.
    fn fire_apply(&self) {
        let mut state = self.lock_state();
        if state.phase != PlaybackPhase::Running {
            return;
        }
        let Some(pending) = state.pending.take() else {
            return;
        };
        let st = &mut *state;
        let note = match self.updater.apply_staged(
            &mut st.table,
            &mut st.log,
            &pending.key,
            pending.after,
        ) {
            Ok(()) => Some(Note::After(pending.key, pending.after)),
            Err(err) => {
                error!(key = %pending.key, error = %err, "update commit failed");
                None
            }
        };
        drop(state);
        self.dispatch(note);
    }

    fn dispatch(&self, note: Option<Note>) {
        match note {
            Some(Note::Insert(key, aggregate)) => self.listener.on_insert(&key, &aggregate),
            Some(Note::Before(key, aggregate)) => {
                self.listener.on_update_before(&key, &aggregate);
            }
            Some(Note::After(key, aggregate)) => self.listener.on_update_after(&key, &aggregate),
            Some(Note::Deleted(key)) => self.listener.on_delete(&key),
            None => {}
        }
    }
}

/// Spawn a driver task for the playback's current cursor position.
fn spawn_driver(shared: &Arc<Shared>) {
    let weak = Arc::downgrade(shared);
    let handle = tokio::spawn(async move {
        drive(weak).await;
    });
    shared.lock_timers().push(handle);
}

/// The driver loop: sleep each delay, fire each step.
///
/// Upgrading the [`Weak`] fails once the owning [`Playback`] is dropped,
/// which makes every late timer a guaranteed no-op.
async fn drive(weak: Weak<Shared>) {
    loop {
        let step = match weak.upgrade() {
            Some(shared) => shared.next_step(),
            None => return,
        };
        match step {
            NextStep::Finished => return,
            NextStep::ApplyHalf(delay) => {
                sleep(delay).await;
                match weak.upgrade() {
                    Some(shared) => shared.fire_apply(),
                    None => return,
                }
            }
            NextStep::Event(delay) => {
                sleep(delay).await;
                match weak.upgrade() {
                    Some(shared) => shared.fire_primary(),
                    None => return,
                }
            }
        }
    }
}

/// One playback domain: a script, its derived state, and the timers
/// replaying it.
///
/// Must be created and driven inside a tokio runtime. Dropping the
/// playback cancels all outstanding timers (teardown is an implicit
/// reset).
#[derive(Debug)]
pub struct Playback {
    shared: Arc<Shared>,
}

impl core::fmt::Debug for Shared {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Shared")
            .field("script_len", &self.script.len())
            .field("intra_update_delay", &self.intra_update_delay)
            .finish_non_exhaustive()
    }
}

impl Playback {
    /// Create a playback with the default sum/count aggregation rule.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError`] if the changelog capacity is invalid.
    pub fn new(
        script: EventScript,
        listener: Arc<dyn ChangeListener>,
        config: &PlaybackConfig,
    ) -> Result<Self, PlaybackError> {
        Self::with_aggregator(script, listener, config, Box::new(SumCount::new()))
    }

    /// Create a playback with an explicit aggregation rule.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError`] if the changelog capacity is invalid.
    pub fn with_aggregator(
        script: EventScript,
        listener: Arc<dyn ChangeListener>,
        config: &PlaybackConfig,
        aggregator: Box<dyn Aggregator>,
    ) -> Result<Self, PlaybackError> {
        let log = ChangelogLog::new(config.changelog_capacity)?;
        let mode = script.mode();
        Ok(Self {
            shared: Arc::new(Shared {
                script,
                intra_update_delay: Duration::from_millis(config.intra_update_delay_ms),
                updater: Updater::new(aggregator, mode),
                listener,
                state: Mutex::new(ReplayState {
                    phase: PlaybackPhase::Idle,
                    cursor: 0,
                    pending: None,
                    table: ProjectionTable::new(),
                    log,
                }),
                timers: Mutex::new(Vec::new()),
                complete: Notify::new(),
            }),
        })
    }

    /// Start or resume playback.
    ///
    /// No-op while running. While paused, resumes the remaining script
    /// suffix. Otherwise clears all derived state and schedules from
    /// position 0.
    pub fn start(&self) {
        {
            let mut state = self.shared.lock_state();
            match state.phase {
                PlaybackPhase::Running => {
                    debug!("start ignored: already running");
                    return;
                }
                PlaybackPhase::Paused => {
                    info!(cursor = state.cursor, "playback resumed");
                    state.phase = PlaybackPhase::Running;
                }
                PlaybackPhase::Idle | PlaybackPhase::Complete => {
                    state.table.clear();
                    state.log.clear();
                    state.cursor = 0;
                    state.pending = None;
                    state.phase = PlaybackPhase::Running;
                    info!(events = self.shared.script.len(), "playback started");
                }
            }
        }
        self.shared.cancel_timers();
        spawn_driver(&self.shared);
    }

    /// Pause playback, cancelling every outstanding timer.
    ///
    /// No-op unless running. The cursor, projection, changelog, and any
    /// staged apply half are all preserved for resume.
    pub fn pause(&self) {
        {
            let mut state = self.shared.lock_state();
            if state.phase != PlaybackPhase::Running {
                debug!(phase = ?state.phase, "pause ignored");
                return;
            }
            state.phase = PlaybackPhase::Paused;
            info!(cursor = state.cursor, "playback paused");
        }
        self.shared.cancel_timers();
    }

    /// Reset playback to its initial state from any phase.
    pub fn reset(&self) {
        self.shared.cancel_timers();
        let mut state = self.shared.lock_state();
        state.phase = PlaybackPhase::Idle;
        state.cursor = 0;
        state.pending = None;
        state.table.clear();
        state.log.clear();
        drop(state);
        debug!("playback reset");
    }

    /// Return the current lifecycle phase.
    pub fn phase(&self) -> PlaybackPhase {
        self.shared.lock_state().phase
    }

    /// Return whether playback is currently running.
    pub fn is_running(&self) -> bool {
        self.phase() == PlaybackPhase::Running
    }

    /// Return whether playback is currently paused.
    pub fn is_paused(&self) -> bool {
        self.phase() == PlaybackPhase::Paused
    }

    /// Return a serializable status snapshot for the host UI.
    pub fn status(&self) -> PlaybackStatus {
        let state = self.shared.lock_state();
        PlaybackStatus {
            phase: state.phase,
            cursor: u64::try_from(state.cursor).unwrap_or(u64::MAX),
            script_len: u64::try_from(self.shared.script.len()).unwrap_or(u64::MAX),
            records_emitted: state.log.total_appended(),
            projection_size: u64::try_from(state.table.len()).unwrap_or(u64::MAX),
            pending_update: state.pending.is_some(),
        }
    }

    /// Return a copy of the current projection.
    pub fn projection(&self) -> ProjectionTable {
        self.shared.lock_state().table.clone()
    }

    /// Return a copy of the retained changelog records, oldest first.
    pub fn records(&self) -> Vec<ChangelogRecord> {
        self.shared.lock_state().log.records().to_vec()
    }

    /// Return a copy of the full changelog, including its counters.
    pub fn changelog(&self) -> ChangelogLog {
        self.shared.lock_state().log.clone()
    }

    /// Return the number of timer handles currently held.
    pub fn pending_timers(&self) -> usize {
        self.shared.lock_timers().len()
    }

    /// Wait until the playback reaches [`PlaybackPhase::Complete`].
    ///
    /// Returns immediately if already complete. Intended for hosts that
    /// run demos back to back; a paused playback waits here until it is
    /// resumed and finishes.
    pub async fn wait_until_complete(&self) {
        loop {
            let notified = self.shared.complete.notified();
            if self.phase() == PlaybackPhase::Complete {
                return;
            }
            notified.await;
        }
    }
}

impl Drop for Playback {
    fn drop(&mut self) {
        self.shared.cancel_timers();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use rust_decimal::Decimal;

    use duality_types::{ChangeOp, ChangelogMode, OrderEvent, ScriptedEvent};

    use super::*;

    /// Records every notification as a compact string, in order.
    #[derive(Debug, Default)]
    struct Recording {
        lines: StdMutex<Vec<String>>,
    }

    impl Recording {
        fn lines(&self) -> Vec<String> {
            self.lines
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        fn push(&self, line: String) {
            self.lines
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(line);
        }
    }

    impl ChangeListener for Recording {
        fn on_insert(&self, key: &str, snapshot: &Aggregate) {
            self.push(format!("+I[{key}, {}, {}]", snapshot.total, snapshot.count));
        }

        fn on_update_before(&self, key: &str, snapshot: &Aggregate) {
            self.push(format!("-U[{key}, {}, {}]", snapshot.total, snapshot.count));
        }

        fn on_update_after(&self, key: &str, snapshot: &Aggregate) {
            self.push(format!("+U[{key}, {}, {}]", snapshot.total, snapshot.count));
        }

        fn on_delete(&self, key: &str) {
            self.push(format!("-D[{key}]"));
        }
    }

    fn upsert(user: &str, amount: i64) -> ScriptedEvent {
        ScriptedEvent::upsert(1000, OrderEvent::new(user.to_owned(), Decimal::new(amount, 0)))
    }

    /// The script behind the reference scenario: Alice and Bob insert,
    /// then Alice's second order turns into an update.
    fn reference_script() -> EventScript {
        EventScript::new(
            vec![upsert("Alice", 100), upsert("Bob", 50), upsert("Alice", 200)],
            ChangelogMode::Retract,
        )
        .unwrap()
    }

    fn test_config() -> PlaybackConfig {
        PlaybackConfig {
            intra_update_delay_ms: 300,
            changelog_capacity: 25,
        }
    }

    fn make_playback(script: EventScript) -> (Playback, Arc<Recording>) {
        let listener = Arc::new(Recording::default());
        let playback =
            Playback::new(script, Arc::clone(&listener) as Arc<dyn ChangeListener>, &test_config())
                .unwrap();
        (playback, listener)
    }

    async fn advance(ms: u64) {
        sleep(Duration::from_millis(ms)).await;
    }

    fn expected_full_run() -> Vec<String> {
        vec![
            "+I[Alice, 100, 1]".to_owned(),
            "+I[Bob, 50, 1]".to_owned(),
            "-U[Alice, 100, 1]".to_owned(),
            "+U[Alice, 300, 2]".to_owned(),
        ]
    }

    #[tokio::test(start_paused = true)]
    async fn full_playback_matches_reference_scenario() {
        let (playback, listener) = make_playback(reference_script());
        playback.start();
        advance(4000).await;

        assert_eq!(playback.phase(), PlaybackPhase::Complete);
        assert_eq!(listener.lines(), expected_full_run());

        let projection = playback.projection();
        assert_eq!(
            projection.get("Alice"),
            Some(&Aggregate::new(Decimal::new(300, 0), 2))
        );
        assert_eq!(
            projection.get("Bob"),
            Some(&Aggregate::new(Decimal::new(50, 0), 1))
        );

        let ops: Vec<ChangeOp> = playback.records().iter().map(|r| r.op).collect();
        assert_eq!(
            ops,
            vec![
                ChangeOp::Insert,
                ChangeOp::Insert,
                ChangeOp::UpdateBefore,
                ChangeOp::UpdateAfter,
            ]
        );
        assert_eq!(playback.status().records_emitted, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_freezes_state_and_resume_continues() {
        let (playback, listener) = make_playback(reference_script());
        playback.start();

        // Events 0 and 1 fire at 1000 and 2000; pause before event 2.
        advance(2100).await;
        playback.pause();

        assert!(playback.is_paused());
        assert_eq!(playback.pending_timers(), 0);
        let projection = playback.projection();
        assert_eq!(
            projection.get("Alice"),
            Some(&Aggregate::new(Decimal::new(100, 0), 1))
        );
        assert_eq!(
            projection.get("Bob"),
            Some(&Aggregate::new(Decimal::new(50, 0), 1))
        );
        let frozen = listener.lines();
        assert_eq!(frozen.len(), 2);

        // Wait well past when event 2 would have fired.
        advance(2000).await;
        assert_eq!(listener.lines(), frozen);
        assert_eq!(playback.status().records_emitted, 2);

        // Resume completes the run identically to a non-paused playback.
        playback.start();
        advance(1500).await;
        assert_eq!(playback.phase(), PlaybackPhase::Complete);
        assert_eq!(listener.lines(), expected_full_run());
        assert_eq!(playback.status().records_emitted, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_suppresses_the_apply_half() {
        let (playback, listener) = make_playback(reference_script());
        playback.start();

        // Event 2 fires its retract half at 3000; pause inside the
        // 300ms retract/apply gap.
        advance(3100).await;
        playback.pause();

        assert_eq!(listener.lines().len(), 3);
        assert!(playback.status().pending_update);
        assert_eq!(
            playback.projection().get("Alice"),
            Some(&Aggregate::new(Decimal::new(100, 0), 1))
        );

        // The apply half must not fire while paused.
        advance(1000).await;
        assert_eq!(listener.lines().len(), 3);

        // Resume replays the apply half with its full delay, then the
        // playback completes.
        playback.start();
        advance(400).await;
        assert_eq!(playback.phase(), PlaybackPhase::Complete);
        assert_eq!(listener.lines(), expected_full_run());
        assert_eq!(
            playback.projection().get("Alice"),
            Some(&Aggregate::new(Decimal::new(300, 0), 2))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn reset_is_idempotent() {
        let (playback, listener) = make_playback(reference_script());
        playback.start();
        advance(1500).await;
        assert_eq!(listener.lines().len(), 1);

        for _ in 0..3 {
            playback.reset();
            assert_eq!(playback.phase(), PlaybackPhase::Idle);
            assert_eq!(playback.pending_timers(), 0);
            let status = playback.status();
            assert_eq!(status.cursor, 0);
            assert_eq!(status.records_emitted, 0);
            assert_eq!(status.projection_size, 0);
            assert!(!status.pending_update);
        }

        // Nothing fires after a reset.
        advance(5000).await;
        assert_eq!(listener.lines().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn double_start_is_a_noop() {
        let (playback, listener) = make_playback(reference_script());
        playback.start();
        advance(1500).await;

        // A second start while running must not restart the script.
        playback.start();
        advance(3000).await;

        assert_eq!(playback.phase(), PlaybackPhase::Complete);
        assert_eq!(listener.lines(), expected_full_run());
    }

    #[tokio::test(start_paused = true)]
    async fn start_after_complete_replays_from_scratch() {
        let (playback, listener) = make_playback(reference_script());
        playback.start();
        playback.wait_until_complete().await;
        assert_eq!(listener.lines().len(), 4);

        playback.start();
        playback.wait_until_complete().await;

        let lines = listener.lines();
        assert_eq!(lines.len(), 8);
        assert_eq!(playback.status().records_emitted, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_cancels_all_timers() {
        let (playback, listener) = make_playback(reference_script());
        playback.start();
        advance(1500).await;
        assert_eq!(listener.lines().len(), 1);

        drop(playback);

        // Late timers are a guaranteed no-op after teardown.
        advance(10_000).await;
        assert_eq!(listener.lines().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn delete_events_remove_keys() {
        let script = EventScript::new(
            vec![
                upsert("Alice", 100),
                ScriptedEvent::delete(
                    1000,
                    OrderEvent::new("Alice".to_owned(), Decimal::ZERO),
                ),
            ],
            ChangelogMode::Retract,
        )
        .unwrap();
        let (playback, listener) = make_playback(script);
        playback.start();
        playback.wait_until_complete().await;

        assert!(playback.projection().is_empty());
        assert_eq!(
            listener.lines(),
            vec!["+I[Alice, 100, 1]".to_owned(), "-D[Alice]".to_owned()]
        );
        let ops: Vec<ChangeOp> = playback.records().iter().map(|r| r.op).collect();
        assert_eq!(ops, vec![ChangeOp::Insert, ChangeOp::Delete]);
    }

    #[tokio::test(start_paused = true)]
    async fn upsert_mode_has_no_retract_phase() {
        let script = EventScript::new(
            vec![upsert("Alice", 100), upsert("Alice", 200)],
            ChangelogMode::Upsert,
        )
        .unwrap();
        let (playback, listener) = make_playback(script);
        playback.start();
        playback.wait_until_complete().await;

        assert_eq!(
            listener.lines(),
            vec!["+I[Alice, 100, 1]".to_owned(), "+U[Alice, 300, 2]".to_owned()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn append_only_mode_keys_by_offset() {
        let script = EventScript::new(
            vec![upsert("Alice", 1000), upsert("Alice", 100)],
            ChangelogMode::AppendOnly,
        )
        .unwrap();
        let (playback, listener) = make_playback(script);
        playback.start();
        playback.wait_until_complete().await;

        // Two rows, never an update: the raw feed appends.
        assert_eq!(
            listener.lines(),
            vec!["+I[0, 1000, 1]".to_owned(), "+I[1, 100, 1]".to_owned()]
        );
        assert_eq!(playback.projection().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_when_not_running_is_a_noop() {
        let (playback, _listener) = make_playback(reference_script());
        playback.pause();
        assert_eq!(playback.phase(), PlaybackPhase::Idle);

        playback.start();
        playback.pause();
        playback.pause();
        assert!(playback.is_paused());
    }

    #[tokio::test(start_paused = true)]
    async fn consistency_holds_at_quiescence() {
        let (playback, _listener) = make_playback(reference_script());
        playback.start();
        playback.wait_until_complete().await;

        let projection = playback.projection();
        let log = playback.changelog();
        assert_eq!(
            duality_projection::consistency::verify_consistency(&projection, &log),
            duality_projection::ConsistencyResult::Consistent
        );
    }
}
