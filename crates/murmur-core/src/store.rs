//! Active condition set and the file-backed note store.
//!
//! The [`ActiveSet`] is the engine's working snapshot: unfired, validated
//! conditions indexed by kind so each context event only touches the
//! matcher it concerns. It is rebuilt wholesale whenever the note
//! collection reports a change.
//!
//! [`JsonNoteStore`] is a local JSON-file implementation of the
//! [`NoteStore`](crate::traits::NoteStore) collaborator, used by the CLI
//! and tests in place of a remote notes API.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::GeofenceConfig;
use crate::deadline::DeadlineTarget;
use crate::geo::{self, GeofenceTarget};
use crate::note::{Condition, ConditionId, Mood, Note, NoteId};
use crate::traits::{CollaboratorError, NoteStore};

/// Per-condition lifecycle.
///
/// `Active -> Firing -> Fired` on a successful dispatch; `Removed` is the
/// forced terminal state when a resync drops the underlying note (no
/// dispatch happens for it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionState {
    Active,
    Firing,
    Fired,
    Removed,
}

/// One armed condition plus the note fields dispatch needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveEntry {
    pub condition_id: ConditionId,
    pub note_id: NoteId,
    pub title: Option<String>,
    pub audio_ref: String,
    pub condition: Condition,
    pub state: ConditionState,
    /// Consecutive dispatch failures for the current episode.
    pub consecutive_failures: u32,
    /// Set on the first dispatch attempt of an episode; retries reuse it
    /// so the sink's idempotency key stays stable.
    pub episode_started_at: Option<DateTime<Utc>>,
}

/// The engine's snapshot of armed conditions, indexed by kind.
#[derive(Debug, Default)]
pub struct ActiveSet {
    entries: HashMap<ConditionId, ActiveEntry>,
    location_targets: Vec<GeofenceTarget>,
    deadline_targets: Vec<DeadlineTarget>,
    /// Conditions dropped during the last rebuild because they failed
    /// validation, with the reason.
    malformed: Vec<(ConditionId, String)>,
}

impl ActiveSet {
    /// Build a snapshot from unfired notes, skipping malformed conditions.
    ///
    /// Effective geofence radii are resolved here (default + clamp) so
    /// matching stays a pure comparison.
    pub fn rebuild(notes: &[Note], cfg: &GeofenceConfig) -> Self {
        let mut set = ActiveSet::default();
        for note in notes {
            if note.fired {
                continue;
            }
            let id = note.condition_id();
            if let Err(reason) = note.condition.validate() {
                tracing::warn!(condition_id = %id, "skipping malformed condition: {reason}");
                set.malformed.push((id, reason));
                continue;
            }
            match &note.condition {
                Condition::Location {
                    latitude,
                    longitude,
                    ..
                } => {
                    let radius_m = note
                        .condition
                        .effective_radius_m(cfg)
                        .unwrap_or(cfg.default_radius_m);
                    set.location_targets.push(GeofenceTarget {
                        condition_id: id.clone(),
                        latitude: *latitude,
                        longitude: *longitude,
                        radius_m,
                    });
                }
                Condition::Time { deadline } => {
                    set.deadline_targets.push(DeadlineTarget {
                        condition_id: id.clone(),
                        deadline: *deadline,
                    });
                }
                Condition::Mood { .. } => {}
            }
            set.entries.insert(
                id.clone(),
                ActiveEntry {
                    condition_id: id,
                    note_id: note.id.clone(),
                    title: note.title.clone(),
                    audio_ref: note.audio_ref.clone(),
                    condition: note.condition.clone(),
                    state: ConditionState::Active,
                    consecutive_failures: 0,
                    episode_started_at: None,
                },
            );
        }
        set
    }

    pub fn get(&self, id: &ConditionId) -> Option<&ActiveEntry> {
        self.entries.get(id)
    }

    pub fn get_mut(&mut self, id: &ConditionId) -> Option<&mut ActiveEntry> {
        self.entries.get_mut(id)
    }

    /// Drop a condition and its matcher index entries.
    pub fn remove(&mut self, id: &ConditionId) -> Option<ActiveEntry> {
        self.location_targets.retain(|t| &t.condition_id != id);
        self.deadline_targets.retain(|t| &t.condition_id != id);
        self.entries.remove(id)
    }

    pub fn location_targets(&self) -> &[GeofenceTarget] {
        &self.location_targets
    }

    pub fn deadline_targets(&self) -> &[DeadlineTarget] {
        &self.deadline_targets
    }

    pub fn condition_ids(&self) -> Vec<ConditionId> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn skipped_malformed(&self) -> usize {
        self.malformed.len()
    }

    /// Conditions the last rebuild rejected, with the validation reason.
    pub fn malformed(&self) -> &[(ConditionId, String)] {
        &self.malformed
    }

    /// Mood conditions matching an explicit user query.
    ///
    /// There is no ambient mood sensor; this is the only path that
    /// evaluates mood conditions.
    pub fn query_by_mood(&self, mood: Mood) -> Vec<&ActiveEntry> {
        let mut hits: Vec<&ActiveEntry> = self
            .entries
            .values()
            .filter(|e| matches!(e.condition, Condition::Mood { mood: m } if m == mood))
            .collect();
        hits.sort_by(|a, b| a.condition_id.as_str().cmp(b.condition_id.as_str()));
        hits
    }

    /// Location conditions whose own geofence contains the given point,
    /// with their distance in meters. The condition's radius is the sole
    /// threshold; there is no secondary fixed query radius.
    pub fn nearby(&self, latitude: f64, longitude: f64) -> Vec<(&ActiveEntry, f64)> {
        let mut hits = Vec::new();
        for target in &self.location_targets {
            let d = geo::haversine_distance_m(latitude, longitude, target.latitude, target.longitude);
            if d <= target.radius_m {
                if let Some(entry) = self.entries.get(&target.condition_id) {
                    hits.push((entry, d));
                }
            }
        }
        hits.sort_by(|a, b| a.1.total_cmp(&b.1));
        hits
    }
}

/// JSON-file note store for local use.
///
/// Notes live in a single JSON array at
/// `~/.config/murmur/notes.json` (or any explicit path).
pub struct JsonNoteStore {
    path: PathBuf,
}

impl JsonNoteStore {
    /// Open at the default path inside the data directory.
    pub fn open() -> Result<Self, std::io::Error> {
        let path = crate::storage::data_dir()?.join("notes.json");
        Ok(Self::with_path(path))
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all notes. A missing file is an empty collection.
    pub fn load_all(&self) -> Result<Vec<Note>, CollaboratorError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save_all(&self, notes: &[Note]) -> Result<(), CollaboratorError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(notes)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }

    pub fn add(&self, note: Note) -> Result<(), CollaboratorError> {
        let mut notes = self.load_all()?;
        notes.push(note);
        self.save_all(&notes)
    }

    pub fn remove(&self, id: &NoteId) -> Result<bool, CollaboratorError> {
        let mut notes = self.load_all()?;
        let before = notes.len();
        notes.retain(|n| &n.id != id);
        let removed = notes.len() != before;
        if removed {
            self.save_all(&notes)?;
        }
        Ok(removed)
    }
}

impl NoteStore for JsonNoteStore {
    fn list_active_conditions(&self, user_id: &str) -> Result<Vec<Note>, CollaboratorError> {
        let notes = self.load_all()?;
        Ok(notes
            .into_iter()
            .filter(|n| n.user_id == user_id && !n.fired)
            .collect())
    }

    fn mark_fired(&self, note_id: &NoteId, at: DateTime<Utc>) -> Result<(), CollaboratorError> {
        let mut notes = self.load_all()?;
        match notes.iter_mut().find(|n| &n.id == note_id) {
            Some(note) => {
                note.fired = true;
                note.last_fired_at = Some(at);
                self.save_all(&notes)
            }
            None => {
                // Deleted since the last sync; tolerated.
                tracing::debug!(note_id = %note_id, "mark_fired on unknown note (no-op)");
                Ok(())
            }
        }
    }
}
