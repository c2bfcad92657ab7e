//! Trigger evaluation engine.
//!
//! Consumes a serial stream of context events (position fixes, clock
//! ticks), matches them against the active condition set, filters through
//! the dedup ledger, and hands fire decisions to the dispatch sink.
//!
//! ## State transitions per condition
//!
//! ```text
//! Active -> Firing -> Fired            (dispatch acknowledged)
//! Active -> Firing -> Active           (dispatch failed; retried on the
//!                                       next matching context event)
//! Active -> Removed                    (note deleted; resync, no dispatch)
//! ```
//!
//! ## Concurrency
//!
//! There is no internal thread. Every handler takes `&mut self`, so the
//! single-writer evaluation path is enforced by the type system: a host
//! that receives fixes and ticks on concurrent channels must serialize
//! them through one owner (queue or mutex) before calling in. Each call
//! runs to completion, dispatch included, before the next event -- a
//! `record_fire` is only committed after the sink acknowledged.
//!
//! ## Failure semantics
//!
//! Errors never escape a handler. A failed dispatch leaves the condition
//! `Active` (at most one attempt per condition per pass, so there is no
//! tight retry loop); ledger and mark-fired errors are reported and the
//! pass continues. The cool-down prevents runaway re-fires across
//! episodes.

use chrono::{DateTime, Duration, Utc};

use crate::config::Config;
use crate::deadline;
use crate::events::{ContextEvent, EvalReport, FireDecision, PositionFix, TriggerKind};
use crate::error::{EngineError, Modality};
use crate::geo;
use crate::ledger::DedupLedger;
use crate::note::{ConditionId, Mood, Note};
use crate::store::{ActiveEntry, ActiveSet, ConditionState};
use crate::traits::{DispatchSink, ErrorReporter, NoteStore};

pub struct TriggerEngine {
    set: ActiveSet,
    ledger: DedupLedger,
    sink: Box<dyn DispatchSink>,
    notes: Box<dyn NoteStore>,
    reporter: Box<dyn ErrorReporter>,
    config: Config,
    cool_down: Duration,
    user_id: String,
    location_denied: bool,
    time_denied: bool,
}

impl TriggerEngine {
    /// Build an engine with an empty active set.
    ///
    /// Configuration values are read-only from here on; call
    /// [`sync_from_store`](Self::sync_from_store) or
    /// [`on_condition_set_changed`](Self::on_condition_set_changed) to
    /// load conditions.
    pub fn new(
        config: Config,
        ledger: DedupLedger,
        sink: Box<dyn DispatchSink>,
        notes: Box<dyn NoteStore>,
        reporter: Box<dyn ErrorReporter>,
        user_id: impl Into<String>,
    ) -> Self {
        let cool_down = config.cool_down();
        Self {
            set: ActiveSet::default(),
            ledger,
            sink,
            notes,
            reporter,
            config,
            cool_down,
            user_id: user_id.into(),
            location_denied: false,
            time_denied: false,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn active_len(&self) -> usize {
        self.set.len()
    }

    pub fn active_set(&self) -> &ActiveSet {
        &self.set
    }

    pub fn ledger(&self) -> &DedupLedger {
        &self.ledger
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Explicit mood query. Mood conditions have no ambient sensor and
    /// are never matched by the streaming handlers.
    pub fn query_by_mood(&self, mood: Mood) -> Vec<&ActiveEntry> {
        self.set.query_by_mood(mood)
    }

    /// Location conditions whose geofence contains the given point.
    pub fn nearby(&self, latitude: f64, longitude: f64) -> Vec<(&ActiveEntry, f64)> {
        self.set.nearby(latitude, longitude)
    }

    /// Record that the host denied a capability.
    ///
    /// Fatal to that modality only: the engine stops evaluating its
    /// conditions but keeps operating on the other (time-only triggering
    /// when location is denied, and vice versa).
    pub fn on_permission_denied(&mut self, modality: Modality) {
        match modality {
            Modality::Location => self.location_denied = true,
            Modality::Time => self.time_denied = true,
            Modality::Notification => {}
        }
        self.reporter
            .report(&EngineError::PermissionDenied { modality });
    }

    // ── Condition set sync ───────────────────────────────────────────

    /// Full resync from the note store collaborator.
    ///
    /// On failure the engine keeps operating on its last known snapshot
    /// until the next successful sync.
    pub fn sync_from_store(&mut self) -> bool {
        match self.notes.list_active_conditions(&self.user_id) {
            Ok(notes) => {
                self.on_condition_set_changed(notes);
                true
            }
            Err(e) => {
                let err = EngineError::StoreSyncFailure(e.to_string());
                tracing::warn!("{err}; keeping last snapshot of {} conditions", self.set.len());
                self.reporter.report(&err);
                false
            }
        }
    }

    /// Atomically replace the active set.
    ///
    /// Conditions absent from the new snapshot move to the terminal
    /// `Removed` state with no dispatch. Consecutive-failure counters and
    /// episode markers survive for conditions that persist, so retry
    /// idempotency keys stay stable across a resync.
    pub fn on_condition_set_changed(&mut self, notes: Vec<Note>) {
        let mut fresh = ActiveSet::rebuild(&notes, &self.config.geofence);
        for (id, reason) in fresh.malformed() {
            self.reporter.report(&EngineError::MalformedCondition {
                condition_id: id.0.clone(),
                message: reason.clone(),
            });
        }

        let mut removed = 0usize;
        for id in self.set.condition_ids() {
            match fresh.get_mut(&id) {
                Some(new_entry) => {
                    if let Some(old) = self.set.get(&id) {
                        new_entry.consecutive_failures = old.consecutive_failures;
                        new_entry.episode_started_at = old.episode_started_at;
                    }
                }
                None => {
                    if let Some(old) = self.set.get_mut(&id) {
                        old.state = ConditionState::Removed;
                        removed += 1;
                    }
                }
            }
        }
        if removed > 0 {
            tracing::debug!("resync removed {removed} condition(s) without dispatch");
        }
        tracing::debug!(
            active = fresh.len(),
            skipped = fresh.skipped_malformed(),
            "condition set replaced"
        );
        self.set = fresh;
    }

    // ── Context event handlers ───────────────────────────────────────

    /// Dispatch a context event to the matching handler.
    pub fn handle_event(&mut self, event: &ContextEvent) -> EvalReport {
        match event {
            ContextEvent::PositionFix(fix) => self.on_position_fix(fix),
            ContextEvent::ClockTick { now } => self.on_clock_tick(*now),
        }
    }

    /// Evaluate a position fix against the active location conditions.
    ///
    /// Errors are caught at this boundary; the report is always returned.
    pub fn on_position_fix(&mut self, fix: &PositionFix) -> EvalReport {
        if self.location_denied {
            return EvalReport::default();
        }
        let mut report = EvalReport {
            evaluated: self.set.location_targets().len(),
            skipped_malformed: self.set.skipped_malformed(),
            ..EvalReport::default()
        };

        let matched = geo::match_fix(fix, self.set.location_targets());
        report.matched = matched.clone();
        for id in matched {
            self.try_fire(
                &id,
                fix.observed_at,
                TriggerKind::LocationReminder,
                &mut report,
            );
        }
        report
    }

    /// Evaluate a clock tick against the active time conditions.
    pub fn on_clock_tick(&mut self, now: DateTime<Utc>) -> EvalReport {
        if self.time_denied {
            return EvalReport::default();
        }
        let mut report = EvalReport {
            evaluated: self.set.deadline_targets().len(),
            skipped_malformed: self.set.skipped_malformed(),
            ..EvalReport::default()
        };

        let matched = deadline::match_tick(now, self.set.deadline_targets());
        report.matched = matched.clone();
        for id in matched {
            self.try_fire(&id, now, TriggerKind::TimeReminder, &mut report);
        }
        report
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Run one matched condition through the dedup filter and, if it
    /// clears, one dispatch attempt. At most one attempt per condition
    /// per pass.
    fn try_fire(
        &mut self,
        id: &ConditionId,
        now: DateTime<Utc>,
        kind: TriggerKind,
        report: &mut EvalReport,
    ) {
        // Dedup filter first; read errors are reported and the condition
        // is skipped this pass rather than fired blind.
        match self.ledger.should_fire(id, now, self.cool_down) {
            Ok(true) => {}
            Ok(false) => {
                report.suppressed.push(id.clone());
                return;
            }
            Err(e) => {
                self.reporter.report(&EngineError::Ledger(e));
                return;
            }
        }

        let decision = {
            let entry = match self.set.get_mut(id) {
                Some(e) if e.state == ConditionState::Active => e,
                _ => return,
            };
            entry.state = ConditionState::Firing;
            let episode = *entry.episode_started_at.get_or_insert(now);
            FireDecision {
                note_id: entry.note_id.clone(),
                condition_id: id.clone(),
                kind,
                title: entry
                    .title
                    .clone()
                    .unwrap_or_else(|| FireDecision::DEFAULT_TITLE.to_string()),
                audio_ref: entry.audio_ref.clone(),
                idempotency_key: format!("{}:{}", id, episode.timestamp()),
                at: now,
            }
        };

        match self.sink.dispatch(&decision) {
            Ok(()) => {
                if let Err(e) = self.ledger.record_fire(id, now) {
                    self.reporter.report(&EngineError::Ledger(e));
                }
                // The note may have been deleted while dispatch was in
                // flight; marking fired-state is then a no-op.
                if let Err(e) = self.notes.mark_fired(&decision.note_id, now) {
                    self.reporter.report(&EngineError::MarkFiredFailure {
                        note_id: decision.note_id.0.clone(),
                        message: e.to_string(),
                    });
                }
                if let Some(entry) = self.set.get_mut(id) {
                    entry.state = ConditionState::Fired;
                }
                self.set.remove(id);
                report.fired.push(id.clone());
                tracing::info!(condition_id = %id, kind = ?kind, "reminder fired");
            }
            Err(e) => {
                let attempts = match self.set.get_mut(id) {
                    Some(entry) => {
                        entry.state = ConditionState::Active;
                        entry.consecutive_failures += 1;
                        entry.consecutive_failures
                    }
                    None => 0,
                };
                self.reporter.report(&EngineError::DispatchFailure {
                    condition_id: id.0.clone(),
                    message: e.to_string(),
                });
                let max = self.config.engine.max_consecutive_dispatch_failures;
                if max > 0 && attempts >= max {
                    self.reporter.report(&EngineError::DispatchExhausted {
                        condition_id: id.0.clone(),
                        attempts,
                    });
                }
                report.failed.push(id.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::{Condition, NoteId};
    use crate::traits::CollaboratorError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    // ── Fakes ────────────────────────────────────────────────────────

    #[derive(Default)]
    struct RecordingSink {
        dispatched: Arc<Mutex<Vec<FireDecision>>>,
        /// Number of initial dispatch calls that fail.
        fail_first: AtomicUsize,
    }

    impl RecordingSink {
        fn shared(&self) -> Arc<Mutex<Vec<FireDecision>>> {
            Arc::clone(&self.dispatched)
        }
    }

    impl DispatchSink for Arc<RecordingSink> {
        fn dispatch(&self, decision: &FireDecision) -> Result<(), CollaboratorError> {
            let remaining = self.fail_first.load(Ordering::SeqCst);
            if remaining > 0 {
                self.fail_first.store(remaining - 1, Ordering::SeqCst);
                return Err("notification subsystem unavailable".into());
            }
            self.dispatched.lock().unwrap().push(decision.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeNoteStore {
        notes: Arc<Mutex<Vec<Note>>>,
    }

    impl NoteStore for Arc<FakeNoteStore> {
        fn list_active_conditions(&self, user_id: &str) -> Result<Vec<Note>, CollaboratorError> {
            Ok(self
                .notes
                .lock()
                .unwrap()
                .iter()
                .filter(|n| n.user_id == user_id && !n.fired)
                .cloned()
                .collect())
        }

        fn mark_fired(&self, note_id: &NoteId, at: DateTime<Utc>) -> Result<(), CollaboratorError> {
            let mut notes = self.notes.lock().unwrap();
            if let Some(n) = notes.iter_mut().find(|n| &n.id == note_id) {
                n.fired = true;
                n.last_fired_at = Some(at);
            }
            Ok(())
        }
    }

    struct FailingStore;

    impl NoteStore for FailingStore {
        fn list_active_conditions(&self, _: &str) -> Result<Vec<Note>, CollaboratorError> {
            Err("api unreachable".into())
        }

        fn mark_fired(&self, _: &NoteId, _: DateTime<Utc>) -> Result<(), CollaboratorError> {
            Err("api unreachable".into())
        }
    }

    #[derive(Default)]
    struct CountingReporter {
        count: Arc<Mutex<Vec<String>>>,
    }

    impl ErrorReporter for Arc<CountingReporter> {
        fn report(&self, err: &EngineError) {
            self.count.lock().unwrap().push(err.to_string());
        }
    }

    // ── Helpers ──────────────────────────────────────────────────────

    fn location_note(id: &str, lat: f64, lon: f64, radius_m: f64) -> Note {
        Note {
            id: NoteId(id.into()),
            title: Some(format!("note {id}")),
            audio_ref: format!("audio/{id}.m4a"),
            duration_ms: 3000,
            condition: Condition::Location {
                latitude: lat,
                longitude: lon,
                radius_m: Some(radius_m),
            },
            fired: false,
            last_fired_at: None,
            user_id: "u1".into(),
            created_at: Utc::now(),
        }
    }

    fn time_note(id: &str, deadline: DateTime<Utc>) -> Note {
        Note {
            id: NoteId(id.into()),
            title: None,
            audio_ref: format!("audio/{id}.m4a"),
            duration_ms: 3000,
            condition: Condition::Time { deadline },
            fired: false,
            last_fired_at: None,
            user_id: "u1".into(),
            created_at: Utc::now(),
        }
    }

    fn fix_at(lat: f64, lon: f64, at: DateTime<Utc>) -> PositionFix {
        PositionFix {
            latitude: lat,
            longitude: lon,
            accuracy_m: 10.0,
            observed_at: at,
        }
    }

    struct Harness {
        engine: TriggerEngine,
        sink: Arc<RecordingSink>,
        store: Arc<FakeNoteStore>,
        reports: Arc<Mutex<Vec<String>>>,
    }

    fn harness(notes: Vec<Note>) -> Harness {
        let sink = Arc::new(RecordingSink::default());
        let store = Arc::new(FakeNoteStore {
            notes: Arc::new(Mutex::new(notes)),
        });
        let reporter = Arc::new(CountingReporter::default());
        let reports = Arc::clone(&reporter.count);
        let mut engine = TriggerEngine::new(
            Config::default(),
            DedupLedger::open_memory().unwrap(),
            Box::new(Arc::clone(&sink)),
            Box::new(Arc::clone(&store)),
            Box::new(reporter),
            "u1",
        );
        engine.sync_from_store();
        Harness {
            engine,
            sink,
            store,
            reports,
        }
    }

    // ── Scenarios ────────────────────────────────────────────────────

    #[test]
    fn fix_at_center_fires_exactly_once() {
        // Condition at Bangalore center, 150 m radius; fix at identical
        // coordinates matches, dispatches once, condition becomes FIRED.
        let mut h = harness(vec![location_note("c1", 12.9716, 77.5946, 150.0)]);
        let now = Utc::now();

        let report = h.engine.on_position_fix(&fix_at(12.9716, 77.5946, now));
        assert_eq!(report.matched.len(), 1);
        assert_eq!(report.fired, vec![ConditionId("c1".into())]);
        assert_eq!(h.sink.shared().lock().unwrap().len(), 1);

        // Condition left the active set.
        assert_eq!(h.engine.active_len(), 0);
        // Fired-state written back to the store.
        assert!(h.store.notes.lock().unwrap()[0].fired);
        // Ledger has the episode.
        assert!(h
            .engine
            .ledger()
            .last_fired_at(&ConditionId("c1".into()))
            .unwrap()
            .is_some());
    }

    #[test]
    fn same_fix_twice_is_idempotent() {
        let mut h = harness(vec![location_note("c1", 12.9716, 77.5946, 150.0)]);
        let now = Utc::now();
        let fix = fix_at(12.9716, 77.5946, now);

        h.engine.on_position_fix(&fix);
        let second = h.engine.on_position_fix(&fix);
        assert!(second.fired.is_empty());
        assert_eq!(h.sink.shared().lock().unwrap().len(), 1);
    }

    #[test]
    fn deadline_boundary_tick_semantics() {
        // Tick at T-1s: no match. Tick at T: match and dispatch.
        let deadline = Utc::now();
        let mut h = harness(vec![time_note("t1", deadline)]);

        let early = h.engine.on_clock_tick(deadline - Duration::seconds(1));
        assert!(early.matched.is_empty());
        assert!(h.sink.shared().lock().unwrap().is_empty());

        let due = h.engine.on_clock_tick(deadline);
        assert_eq!(due.fired, vec![ConditionId("t1".into())]);
        assert_eq!(h.sink.shared().lock().unwrap().len(), 1);
    }

    #[test]
    fn dispatch_failure_retries_on_next_fix_same_episode() {
        // First dispatch fails; the condition stays ACTIVE with no ledger
        // entry, so a matching fix 10s later retries and succeeds.
        // Exactly one successful dispatch is recorded.
        let mut h = harness(vec![location_note("c1", 0.0, 0.0, 150.0)]);
        h.sink.fail_first.store(1, Ordering::SeqCst);
        let t0 = Utc::now();

        let first = h.engine.on_position_fix(&fix_at(0.0, 0.0, t0));
        assert_eq!(first.failed, vec![ConditionId("c1".into())]);
        assert!(first.fired.is_empty());
        assert_eq!(h.engine.active_len(), 1);
        assert!(h
            .engine
            .ledger()
            .last_fired_at(&ConditionId("c1".into()))
            .unwrap()
            .is_none());

        let second = h
            .engine
            .on_position_fix(&fix_at(0.0, 0.0, t0 + Duration::seconds(10)));
        assert_eq!(second.fired, vec![ConditionId("c1".into())]);

        let dispatched = h.sink.shared();
        let dispatched = dispatched.lock().unwrap();
        assert_eq!(dispatched.len(), 1);
        // Retry reused the episode key from the first attempt.
        assert_eq!(
            dispatched[0].idempotency_key,
            format!("c1:{}", t0.timestamp())
        );
        assert!(h.store.notes.lock().unwrap()[0].fired);
    }

    #[test]
    fn cool_down_suppresses_matched_refire() {
        // Two notes share a fence. One fires at t0; re-arm it behind the
        // engine's back and match again inside the window -> suppressed.
        let mut h = harness(vec![location_note("c1", 0.0, 0.0, 150.0)]);
        let t0 = Utc::now();
        h.engine.on_position_fix(&fix_at(0.0, 0.0, t0));

        // Re-arm: user resets the note, store change notification follows.
        {
            let mut notes = h.store.notes.lock().unwrap();
            notes[0].fired = false;
        }
        h.engine.sync_from_store();
        assert_eq!(h.engine.active_len(), 1);

        let inside = h
            .engine
            .on_position_fix(&fix_at(0.0, 0.0, t0 + Duration::minutes(30)));
        assert_eq!(inside.suppressed, vec![ConditionId("c1".into())]);
        assert!(inside.fired.is_empty());
        assert_eq!(h.sink.shared().lock().unwrap().len(), 1);

        let after = h
            .engine
            .on_position_fix(&fix_at(0.0, 0.0, t0 + Duration::minutes(61)));
        assert_eq!(after.fired, vec![ConditionId("c1".into())]);
        assert_eq!(h.sink.shared().lock().unwrap().len(), 2);
    }

    #[test]
    fn resync_removes_conditions_without_dispatch() {
        let mut h = harness(vec![
            location_note("keep", 0.0, 0.0, 150.0),
            location_note("gone", 50.0, 50.0, 150.0),
        ]);
        assert_eq!(h.engine.active_len(), 2);

        {
            let mut notes = h.store.notes.lock().unwrap();
            notes.retain(|n| n.id.as_str() == "keep");
        }
        h.engine.sync_from_store();
        assert_eq!(h.engine.active_len(), 1);

        // The removed condition no longer matches anything.
        let report = h.engine.on_position_fix(&fix_at(50.0, 50.0, Utc::now()));
        assert!(report.matched.is_empty());
        assert!(h.sink.shared().lock().unwrap().is_empty());
    }

    #[test]
    fn mark_fired_on_deleted_note_is_tolerated() {
        // Note deleted from the store after sync but before the fix:
        // dispatch completes, mark_fired is a no-op, nothing crashes.
        let mut h = harness(vec![location_note("c1", 0.0, 0.0, 150.0)]);
        h.store.notes.lock().unwrap().clear();

        let report = h.engine.on_position_fix(&fix_at(0.0, 0.0, Utc::now()));
        assert_eq!(report.fired, vec![ConditionId("c1".into())]);
        assert_eq!(h.sink.shared().lock().unwrap().len(), 1);
        assert!(h.reports.lock().unwrap().is_empty());
    }

    #[test]
    fn store_sync_failure_keeps_last_snapshot() {
        let mut h = harness(vec![location_note("c1", 0.0, 0.0, 150.0)]);
        assert_eq!(h.engine.active_len(), 1);

        // Swap in a failing store; the snapshot must survive.
        h.engine.notes = Box::new(FailingStore);
        assert!(!h.engine.sync_from_store());
        assert_eq!(h.engine.active_len(), 1);
        assert!(h
            .reports
            .lock()
            .unwrap()
            .iter()
            .any(|r| r.contains("sync failed")));

        // And the snapshot still fires. mark_fired fails too, which is
        // reported but does not stop the fire.
        let report = h.engine.on_position_fix(&fix_at(0.0, 0.0, Utc::now()));
        assert_eq!(report.fired.len(), 1);
    }

    #[test]
    fn ticks_do_not_touch_location_conditions_and_vice_versa() {
        let deadline = Utc::now() + Duration::hours(1);
        let mut h = harness(vec![
            location_note("loc", 0.0, 0.0, 150.0),
            time_note("time", deadline),
        ]);

        let tick = h.engine.on_clock_tick(Utc::now());
        assert_eq!(tick.evaluated, 1);
        assert!(tick.matched.is_empty());

        let fix = h.engine.on_position_fix(&fix_at(0.0, 0.0, Utc::now()));
        assert_eq!(fix.evaluated, 1);
        assert_eq!(fix.fired, vec![ConditionId("loc".into())]);
    }

    #[test]
    fn dispatch_exhaustion_is_escalated() {
        let sink = Arc::new(RecordingSink::default());
        sink.fail_first.store(10, Ordering::SeqCst);
        let store = Arc::new(FakeNoteStore {
            notes: Arc::new(Mutex::new(vec![location_note("c1", 0.0, 0.0, 150.0)])),
        });
        let reporter = Arc::new(CountingReporter::default());
        let reports = Arc::clone(&reporter.count);

        let mut config = Config::default();
        config.engine.max_consecutive_dispatch_failures = 2;
        let mut engine = TriggerEngine::new(
            config,
            DedupLedger::open_memory().unwrap(),
            Box::new(Arc::clone(&sink)),
            Box::new(store),
            Box::new(reporter),
            "u1",
        );
        engine.sync_from_store();

        let now = Utc::now();
        engine.on_position_fix(&fix_at(0.0, 0.0, now));
        engine.on_position_fix(&fix_at(0.0, 0.0, now + Duration::seconds(10)));

        // Still ACTIVE; exhaustion is surfaced, never a removal.
        assert_eq!(engine.active_len(), 1);
        assert!(reports
            .lock()
            .unwrap()
            .iter()
            .any(|r| r.contains("2 consecutive times")));
    }

    #[test]
    fn mood_conditions_never_stream_fire() {
        let mut notes = vec![location_note("loc", 0.0, 0.0, 150.0)];
        notes.push(Note {
            id: NoteId("mood".into()),
            title: None,
            audio_ref: "audio/mood.m4a".into(),
            duration_ms: 1000,
            condition: Condition::Mood { mood: Mood::Happy },
            fired: false,
            last_fired_at: None,
            user_id: "u1".into(),
            created_at: Utc::now(),
        });
        let mut h = harness(notes);

        h.engine.on_clock_tick(Utc::now());
        h.engine.on_position_fix(&fix_at(0.0, 0.0, Utc::now()));
        // Only the location condition fired; the mood note waits for an
        // explicit query.
        assert_eq!(h.sink.shared().lock().unwrap().len(), 1);
        assert_eq!(h.engine.query_by_mood(Mood::Happy).len(), 1);
    }

    #[test]
    fn malformed_condition_is_reported_and_skipped() {
        let mut h = harness(vec![
            location_note("good", 0.0, 0.0, 150.0),
            location_note("bad", 400.0, 0.0, 150.0),
        ]);
        assert_eq!(h.engine.active_len(), 1);
        assert!(h
            .reports
            .lock()
            .unwrap()
            .iter()
            .any(|r| r.contains("Malformed condition 'bad'")));

        // The good condition still fires; the bad one never matches.
        let report = h.engine.on_position_fix(&fix_at(0.0, 0.0, Utc::now()));
        assert_eq!(report.skipped_malformed, 1);
        assert_eq!(report.fired, vec![ConditionId("good".into())]);
    }

    #[test]
    fn location_denial_leaves_time_triggering_alive() {
        let deadline = Utc::now() - Duration::minutes(1);
        let mut h = harness(vec![
            location_note("loc", 0.0, 0.0, 150.0),
            time_note("due", deadline),
        ]);
        h.engine.on_permission_denied(Modality::Location);
        assert!(h
            .reports
            .lock()
            .unwrap()
            .iter()
            .any(|r| r.contains("Permission denied")));

        // Fixes are ignored now, but the clock path still fires.
        let fix = h.engine.on_position_fix(&fix_at(0.0, 0.0, Utc::now()));
        assert!(fix.matched.is_empty());
        let tick = h.engine.on_clock_tick(Utc::now());
        assert_eq!(tick.fired, vec![ConditionId("due".into())]);
        assert_eq!(h.sink.shared().lock().unwrap().len(), 1);
    }

    #[test]
    fn untitled_note_gets_fallback_title() {
        let mut note = location_note("c1", 0.0, 0.0, 150.0);
        note.title = None;
        let mut h = harness(vec![note]);
        h.engine.on_position_fix(&fix_at(0.0, 0.0, Utc::now()));
        let dispatched = h.sink.shared();
        let dispatched = dispatched.lock().unwrap();
        assert_eq!(dispatched[0].title, FireDecision::DEFAULT_TITLE);
    }
}
