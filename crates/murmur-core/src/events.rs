use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::note::{ConditionId, NoteId};

/// A single observed position reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Reported accuracy in meters. Recorded for diagnostics; not inflated
    /// into the geofence comparison.
    pub accuracy_m: f64,
    pub observed_at: DateTime<Utc>,
}

/// Ephemeral context input consumed by the trigger engine.
///
/// Events arrive serially and are processed to completion before the next
/// is accepted; the engine never reorders or batches them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContextEvent {
    PositionFix(PositionFix),
    /// Periodic heartbeat, independent of position.
    ClockTick { now: DateTime<Utc> },
}

/// Which rule kind produced a fire decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    LocationReminder,
    TimeReminder,
}

/// The payload handed to the dispatch sink when a condition fires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FireDecision {
    pub note_id: NoteId,
    pub condition_id: ConditionId,
    pub kind: TriggerKind,
    /// Notification body; falls back to a stock line when the note is
    /// untitled.
    pub title: String,
    pub audio_ref: String,
    /// Stable across retries within one episode so the sink can dedup
    /// duplicate delivery attempts.
    pub idempotency_key: String,
    pub at: DateTime<Utc>,
}

impl FireDecision {
    pub const DEFAULT_TITLE: &'static str = "You have a voice note waiting for you";
}

/// Summary of one evaluation pass (one fix or one tick).
///
/// The handlers always return a report -- errors are surfaced through the
/// error reporter, never propagated out of the evaluation loop.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvalReport {
    /// Conditions considered by the matcher in this pass.
    pub evaluated: usize,
    /// Conditions the matcher found satisfied.
    pub matched: Vec<ConditionId>,
    /// Matched but inside the cool-down window.
    pub suppressed: Vec<ConditionId>,
    /// Dispatched and acknowledged this pass.
    pub fired: Vec<ConditionId>,
    /// Dispatch attempted and failed; will retry on the next event.
    pub failed: Vec<ConditionId>,
    /// Conditions skipped because they could not be evaluated.
    pub skipped_malformed: usize,
}

impl EvalReport {
    pub fn is_quiet(&self) -> bool {
        self.matched.is_empty() && self.fired.is_empty() && self.failed.is_empty()
    }
}
