//! Dedup ledger: suppresses re-fires inside the cool-down window.
//!
//! Records, per condition, the last time it fired. Backed by SQLite so
//! the cool-down survives process restarts -- relaunching the app must
//! not immediately re-fire a condition. Entries are never proactively
//! expired; bounded growth is fine since conditions are few per user,
//! and callers may prune on note deletion.
//!
//! Owned exclusively by the engine; never shared mutably with anything
//! else.

use chrono::{DateTime, Duration, Utc};

use crate::error::DatabaseError;
use crate::note::ConditionId;
use crate::storage::{Database, LedgerEntry};

pub struct DedupLedger {
    db: Database,
}

impl DedupLedger {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Open over the default on-disk database.
    pub fn open() -> Result<Self, DatabaseError> {
        Ok(Self::new(Database::open()?))
    }

    /// Open over an in-memory database (for tests and dry runs).
    pub fn open_memory() -> Result<Self, DatabaseError> {
        Ok(Self::new(Database::open_memory()?))
    }

    /// True if the condition has never fired, or its last fire is at
    /// least `cool_down` in the past.
    pub fn should_fire(
        &self,
        id: &ConditionId,
        now: DateTime<Utc>,
        cool_down: Duration,
    ) -> Result<bool, DatabaseError> {
        match self.db.ledger_get(id)? {
            None => Ok(true),
            Some(last) => Ok(now - last >= cool_down),
        }
    }

    /// Record a successful fire. Upserts the entry.
    pub fn record_fire(&self, id: &ConditionId, now: DateTime<Utc>) -> Result<(), DatabaseError> {
        self.db.ledger_upsert(id, now)
    }

    pub fn last_fired_at(&self, id: &ConditionId) -> Result<Option<DateTime<Utc>>, DatabaseError> {
        self.db.ledger_get(id)
    }

    pub fn entries(&self) -> Result<Vec<LedgerEntry>, DatabaseError> {
        self.db.ledger_entries()
    }

    /// Drop entries for conditions no longer known to the store.
    pub fn prune(&self, known: &[ConditionId]) -> Result<usize, DatabaseError> {
        self.db.ledger_prune(known)
    }

    pub fn clear(&self) -> Result<usize, DatabaseError> {
        self.db.ledger_clear()
    }
}
