//! # Murmur Core Library
//!
//! Core business logic for Murmur, a voice-note reminder app: record a
//! short note, attach a trigger condition (a place, a time, or a mood),
//! and get the note back as a notification when the condition is met.
//!
//! ## Architecture
//!
//! - **Trigger Engine**: a single-writer state machine fed a serial
//!   stream of context events (position fixes, clock ticks); the caller
//!   is responsible for delivering events
//! - **Matchers**: pure geofence (Haversine) and deadline (polling)
//!   matching with no side effects
//! - **Dedup Ledger**: SQLite-backed cool-down state that survives
//!   process restarts
//! - **Collaborators**: dispatch sink, note store, and error reporter are
//!   trait objects injected at construction
//!
//! ## Key Components
//!
//! - [`TriggerEngine`]: event-driven evaluation engine
//! - [`DedupLedger`]: exactly-once-per-episode fire suppression
//! - [`ActiveSet`]: armed conditions indexed by kind
//! - [`Config`]: externally tunable engine constants

pub mod config;
pub mod deadline;
pub mod engine;
pub mod error;
pub mod events;
pub mod geo;
pub mod ledger;
pub mod note;
pub mod storage;
pub mod store;
pub mod traits;

pub use config::{Config, EngineConfig, GeofenceConfig, NotificationsConfig};
pub use engine::TriggerEngine;
pub use error::{ConfigError, CoreError, DatabaseError, EngineError, Modality};
pub use events::{ContextEvent, EvalReport, FireDecision, PositionFix, TriggerKind};
pub use ledger::DedupLedger;
pub use note::{Condition, ConditionId, Mood, Note, NoteId};
pub use storage::{Database, LedgerEntry};
pub use store::{ActiveEntry, ActiveSet, ConditionState, JsonNoteStore};
pub use traits::{DispatchSink, ErrorReporter, LogReporter, LogSink, NoteStore};
