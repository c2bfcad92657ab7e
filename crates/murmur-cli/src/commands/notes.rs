use chrono::{DateTime, Utc};
use clap::Subcommand;
use murmur_core::geo::format_distance;
use murmur_core::{Condition, Config, ActiveSet, JsonNoteStore, Mood, Note, NoteId};

#[derive(Subcommand)]
pub enum NotesAction {
    /// List all notes as JSON
    List,
    /// Add a location-triggered note
    AddLocation {
        #[arg(long)]
        lat: f64,
        #[arg(long)]
        lon: f64,
        /// Geofence radius in meters (defaults to the configured radius)
        #[arg(long)]
        radius: Option<f64>,
        #[arg(long)]
        audio: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, default_value = "local")]
        user: String,
    },
    /// Add a time-triggered note
    AddTime {
        /// RFC 3339 deadline, e.g. 2026-09-01T09:00:00Z
        #[arg(long)]
        deadline: DateTime<Utc>,
        #[arg(long)]
        audio: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, default_value = "local")]
        user: String,
    },
    /// Add a mood-tagged note (matched only on explicit query)
    AddMood {
        #[arg(long, value_enum)]
        mood: MoodArg,
        #[arg(long)]
        audio: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, default_value = "local")]
        user: String,
    },
    /// Delete a note
    Remove {
        id: String,
    },
    /// Validate every stored condition
    Validate,
    /// Armed location notes whose geofence contains a point
    Nearby {
        #[arg(long)]
        lat: f64,
        #[arg(long)]
        lon: f64,
        #[arg(long, default_value = "local")]
        user: String,
    },
    /// Armed notes tagged with a mood
    Mood {
        #[arg(value_enum)]
        mood: MoodArg,
        #[arg(long, default_value = "local")]
        user: String,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
pub enum MoodArg {
    Happy,
    Sad,
    Excited,
    Anxious,
    Calm,
    Energetic,
    Tired,
    Focused,
}

impl From<MoodArg> for Mood {
    fn from(m: MoodArg) -> Self {
        match m {
            MoodArg::Happy => Mood::Happy,
            MoodArg::Sad => Mood::Sad,
            MoodArg::Excited => Mood::Excited,
            MoodArg::Anxious => Mood::Anxious,
            MoodArg::Calm => Mood::Calm,
            MoodArg::Energetic => Mood::Energetic,
            MoodArg::Tired => Mood::Tired,
            MoodArg::Focused => Mood::Focused,
        }
    }
}

fn new_note(
    condition: Condition,
    audio: String,
    title: Option<String>,
    user: String,
) -> Note {
    Note {
        id: NoteId::new(),
        title,
        audio_ref: audio,
        duration_ms: 0,
        condition,
        fired: false,
        last_fired_at: None,
        user_id: user,
        created_at: Utc::now(),
    }
}

fn active_set(store: &JsonNoteStore, user: &str) -> Result<ActiveSet, Box<dyn std::error::Error + Send + Sync>> {
    let config = Config::load()?;
    let notes: Vec<Note> = store
        .load_all()?
        .into_iter()
        .filter(|n| n.user_id == user && !n.fired)
        .collect();
    Ok(ActiveSet::rebuild(&notes, &config.geofence))
}

pub fn run(action: NotesAction) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let store = JsonNoteStore::open()?;

    match action {
        NotesAction::List => {
            let notes = store.load_all()?;
            println!("{}", serde_json::to_string_pretty(&notes)?);
        }
        NotesAction::AddLocation {
            lat,
            lon,
            radius,
            audio,
            title,
            user,
        } => {
            let condition = Condition::Location {
                latitude: lat,
                longitude: lon,
                radius_m: radius,
            };
            condition.validate().map_err(std::io::Error::other)?;
            let note = new_note(condition, audio, title, user);
            println!("{}", note.id);
            store.add(note)?;
        }
        NotesAction::AddTime {
            deadline,
            audio,
            title,
            user,
        } => {
            let note = new_note(Condition::Time { deadline }, audio, title, user);
            println!("{}", note.id);
            store.add(note)?;
        }
        NotesAction::AddMood {
            mood,
            audio,
            title,
            user,
        } => {
            let note = new_note(
                Condition::Mood { mood: mood.into() },
                audio,
                title,
                user,
            );
            println!("{}", note.id);
            store.add(note)?;
        }
        NotesAction::Remove { id } => {
            if store.remove(&NoteId(id))? {
                println!("removed");
            } else {
                eprintln!("note not found");
                std::process::exit(1);
            }
        }
        NotesAction::Validate => {
            let notes = store.load_all()?;
            let mut bad = 0;
            for note in &notes {
                if let Err(reason) = note.condition.validate() {
                    bad += 1;
                    println!("{}: {reason}", note.id);
                }
            }
            println!("{} notes, {bad} malformed", notes.len());
        }
        NotesAction::Nearby { lat, lon, user } => {
            let set = active_set(&store, &user)?;
            for (entry, distance) in set.nearby(lat, lon) {
                println!(
                    "{}  {}  {}",
                    entry.note_id,
                    format_distance(distance),
                    entry.title.as_deref().unwrap_or("(untitled)")
                );
            }
        }
        NotesAction::Mood { mood, user } => {
            let set = active_set(&store, &user)?;
            let mood: Mood = mood.into();
            for entry in set.query_by_mood(mood) {
                println!(
                    "{} {}  {}",
                    mood.emoji(),
                    entry.note_id,
                    entry.title.as_deref().unwrap_or("(untitled)")
                );
            }
        }
    }
    Ok(())
}
