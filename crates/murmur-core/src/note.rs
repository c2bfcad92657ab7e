//! Voice-note data model.
//!
//! Notes are owned by the external note store; the engine only reads them.
//! Each note carries exactly one trigger [`Condition`]. The `fired` flag is
//! monotonic from the engine's perspective -- false to true, never back
//! (re-arming is an explicit user action outside the engine).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::GeofenceConfig;

/// Opaque note identifier (uuid-formatted in practice).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NoteId(pub String);

impl NoteId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for NoteId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the trigger condition attached to a note.
///
/// A note has exactly one condition, so the condition id is derived from
/// the note id; keeping a distinct type stops the two from being mixed up
/// in the ledger and dispatch paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConditionId(pub String);

impl ConditionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConditionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&NoteId> for ConditionId {
    fn from(id: &NoteId) -> Self {
        ConditionId(id.0.clone())
    }
}

/// The eight moods a note can be tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Sad,
    Excited,
    Anxious,
    Calm,
    Energetic,
    Tired,
    Focused,
}

impl Mood {
    pub const ALL: [Mood; 8] = [
        Mood::Happy,
        Mood::Sad,
        Mood::Excited,
        Mood::Anxious,
        Mood::Calm,
        Mood::Energetic,
        Mood::Tired,
        Mood::Focused,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Mood::Happy => "Happy",
            Mood::Sad => "Sad",
            Mood::Excited => "Excited",
            Mood::Anxious => "Anxious",
            Mood::Calm => "Calm",
            Mood::Energetic => "Energetic",
            Mood::Tired => "Tired",
            Mood::Focused => "Focused",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Mood::Happy => "\u{1F60A}",
            Mood::Sad => "\u{1F622}",
            Mood::Excited => "\u{1F929}",
            Mood::Anxious => "\u{1F630}",
            Mood::Calm => "\u{1F60C}",
            Mood::Energetic => "\u{26A1}",
            Mood::Tired => "\u{1F634}",
            Mood::Focused => "\u{1F3AF}",
        }
    }
}

/// The trigger rule attached to a note.
///
/// Mood conditions are only matched on explicit user query; there is no
/// ambient mood sensor, so the streaming engine never evaluates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Condition {
    Location {
        latitude: f64,
        longitude: f64,
        /// Geofence radius in meters. Defaults to the configured radius
        /// (150 m) when unset; always clamped to the configured bounds.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        radius_m: Option<f64>,
    },
    Time {
        deadline: DateTime<Utc>,
    },
    Mood {
        mood: Mood,
    },
}

impl Condition {
    /// Geofence radius after applying the default and the [min, max] clamp.
    ///
    /// Only meaningful for location conditions; returns `None` otherwise.
    pub fn effective_radius_m(&self, cfg: &GeofenceConfig) -> Option<f64> {
        match self {
            Condition::Location { radius_m, .. } => {
                let r = radius_m.unwrap_or(cfg.default_radius_m);
                Some(r.clamp(cfg.min_radius_m, cfg.max_radius_m))
            }
            _ => None,
        }
    }

    /// Reject conditions the matchers cannot evaluate.
    ///
    /// A malformed condition is skipped and logged, never matched; it must
    /// not crash the engine.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Condition::Location {
                latitude,
                longitude,
                radius_m,
            } => {
                if !latitude.is_finite() || !(-90.0..=90.0).contains(latitude) {
                    return Err(format!("latitude {latitude} out of range"));
                }
                if !longitude.is_finite() || !(-180.0..=180.0).contains(longitude) {
                    return Err(format!("longitude {longitude} out of range"));
                }
                if let Some(r) = radius_m {
                    if !r.is_finite() || *r <= 0.0 {
                        return Err(format!("radius {r} is not a positive distance"));
                    }
                }
                Ok(())
            }
            Condition::Time { .. } | Condition::Mood { .. } => Ok(()),
        }
    }

}

/// A voice note with its trigger condition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    /// Optional display title, trimmed, at most 100 characters.
    #[serde(default)]
    pub title: Option<String>,
    /// Opaque reference to the recording. Never interpreted by the engine.
    pub audio_ref: String,
    /// Recording length in milliseconds.
    #[serde(default)]
    pub duration_ms: u64,
    pub condition: Condition,
    #[serde(default)]
    pub fired: bool,
    #[serde(default)]
    pub last_fired_at: Option<DateTime<Utc>>,
    pub user_id: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Note {
    pub fn condition_id(&self) -> ConditionId {
        ConditionId::from(&self.id)
    }
}
