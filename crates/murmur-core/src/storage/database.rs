//! SQLite-backed durable state for the dedup ledger.
//!
//! The ledger must survive process restarts so a relaunch cannot re-fire
//! a condition that is still inside its cool-down window.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::DatabaseError;
use crate::note::ConditionId;

use super::data_dir;

/// One row of the dedup ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub condition_id: ConditionId,
    pub last_fired_at: DateTime<Utc>,
}

/// SQLite database for engine-owned durable state.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/murmur/murmur.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, DatabaseError> {
        let path = data_dir()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?
            .join("murmur.db");
        Self::open_at(&path)
    }

    /// Open the database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory().map_err(DatabaseError::from)?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS ledger (
                    condition_id  TEXT PRIMARY KEY,
                    last_fired_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_ledger_last_fired_at
                    ON ledger(last_fired_at);",
            )
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))
    }

    /// Last fire time recorded for a condition, if any.
    pub fn ledger_get(&self, id: &ConditionId) -> Result<Option<DateTime<Utc>>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare("SELECT last_fired_at FROM ledger WHERE condition_id = ?1")?;
        let result = stmt.query_row(params![id.as_str()], |row| row.get::<_, String>(0));
        match result {
            Ok(raw) => {
                let parsed = DateTime::parse_from_rfc3339(&raw)
                    .map_err(|e| DatabaseError::QueryFailed(format!("bad timestamp: {e}")))?;
                Ok(Some(parsed.with_timezone(&Utc)))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Upsert the fire time for a condition.
    pub fn ledger_upsert(&self, id: &ConditionId, at: DateTime<Utc>) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO ledger (condition_id, last_fired_at) VALUES (?1, ?2)",
            params![id.as_str(), at.to_rfc3339()],
        )?;
        Ok(())
    }

    /// All ledger entries, most recent fire first.
    pub fn ledger_entries(&self) -> Result<Vec<LedgerEntry>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare("SELECT condition_id, last_fired_at FROM ledger ORDER BY last_fired_at DESC")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (id, raw) = row?;
            let at = DateTime::parse_from_rfc3339(&raw)
                .map_err(|e| DatabaseError::QueryFailed(format!("bad timestamp: {e}")))?
                .with_timezone(&Utc);
            entries.push(LedgerEntry {
                condition_id: ConditionId(id),
                last_fired_at: at,
            });
        }
        Ok(entries)
    }

    /// Delete ledger rows whose condition id is not in `known`.
    ///
    /// Pruning on note deletion is an optimization, not required for
    /// correctness; conditions are few per user.
    pub fn ledger_prune(&self, known: &[ConditionId]) -> Result<usize, DatabaseError> {
        let entries = self.ledger_entries()?;
        let mut removed = 0;
        for entry in entries {
            if !known.contains(&entry.condition_id) {
                removed += self.conn.execute(
                    "DELETE FROM ledger WHERE condition_id = ?1",
                    params![entry.condition_id.as_str()],
                )?;
            }
        }
        Ok(removed)
    }

    /// Remove every ledger entry.
    pub fn ledger_clear(&self) -> Result<usize, DatabaseError> {
        Ok(self.conn.execute("DELETE FROM ledger", [])?)
    }
}
