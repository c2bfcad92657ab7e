//! Collaborator interfaces injected into the trigger engine.
//!
//! The engine never talks to a platform notification system, a REST API,
//! or a crash reporter directly -- each is a trait object supplied at
//! construction, substitutable with fakes in tests.

use chrono::{DateTime, Utc};

use crate::error::EngineError;
use crate::events::FireDecision;
use crate::note::{Note, NoteId};

pub type CollaboratorError = Box<dyn std::error::Error + Send + Sync>;

/// Notification/persistence sink the engine hands fire decisions to.
///
/// Must be idempotent per fire episode: the decision's `idempotency_key`
/// is stable across retries of the same episode, so duplicate delivery
/// attempts must not produce duplicate user-visible notifications.
pub trait DispatchSink: Send + Sync {
    fn dispatch(&self, decision: &FireDecision) -> Result<(), CollaboratorError>;
}

/// Read/write access to the external note collection.
pub trait NoteStore: Send + Sync {
    /// Notes for this user whose condition is still armed (`fired == false`).
    fn list_active_conditions(&self, user_id: &str) -> Result<Vec<Note>, CollaboratorError>;

    /// Mark a note fired after a successful dispatch.
    ///
    /// Must tolerate ids that were deleted since the last sync: marking a
    /// no-longer-active note is a no-op, not an error.
    fn mark_fired(&self, note_id: &NoteId, at: DateTime<Utc>) -> Result<(), CollaboratorError>;
}

/// External error-reporting collaborator.
///
/// The evaluation loop never crashes on an error; everything recoverable
/// is funneled here.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, err: &EngineError);
}

/// Sink that logs each decision instead of delivering anywhere.
pub struct LogSink;

impl DispatchSink for LogSink {
    fn dispatch(&self, decision: &FireDecision) -> Result<(), CollaboratorError> {
        tracing::info!(
            note_id = %decision.note_id,
            kind = ?decision.kind,
            key = %decision.idempotency_key,
            "dispatching reminder: {}",
            decision.title
        );
        Ok(())
    }
}

/// Reporter that logs through tracing.
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, err: &EngineError) {
        tracing::warn!("engine error: {err}");
    }
}
