//! Feed context events into an engine built over the local stores.
//!
//! The engine itself has no event source; this command plays the role of
//! the host location/clock collaborators for development and testing.

use chrono::{DateTime, Utc};
use clap::Subcommand;
use murmur_core::{
    Config, ContextEvent, DedupLedger, DispatchSink, FireDecision, JsonNoteStore, LogReporter,
    PositionFix, TriggerEngine,
};

#[derive(Subcommand)]
pub enum SimulateAction {
    /// Deliver one position fix
    Fix {
        #[arg(long)]
        lat: f64,
        #[arg(long)]
        lon: f64,
        /// Reported fix accuracy in meters
        #[arg(long, default_value = "10.0")]
        accuracy: f64,
        /// Event time (defaults to now)
        #[arg(long)]
        at: Option<DateTime<Utc>>,
        #[arg(long, default_value = "local")]
        user: String,
    },
    /// Deliver one clock tick
    Tick {
        /// Tick time (defaults to now)
        #[arg(long)]
        at: Option<DateTime<Utc>>,
        #[arg(long, default_value = "local")]
        user: String,
    },
    /// Show the engine's active condition set after a sync
    Status {
        #[arg(long, default_value = "local")]
        user: String,
    },
}

/// Prints each fired reminder to stdout, the way the app's notification
/// channel would surface it.
struct ConsoleSink {
    headline: String,
    enabled: bool,
}

impl DispatchSink for ConsoleSink {
    fn dispatch(
        &self,
        decision: &FireDecision,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.enabled {
            println!(
                "\u{1F399} {} -- {} [{}]",
                self.headline, decision.title, decision.idempotency_key
            );
        }
        Ok(())
    }
}

fn build_engine(user: &str) -> Result<TriggerEngine, Box<dyn std::error::Error + Send + Sync>> {
    let config = Config::load()?;
    let sink = ConsoleSink {
        headline: config.notifications.title.clone(),
        enabled: config.notifications.enabled,
    };
    let mut engine = TriggerEngine::new(
        config,
        DedupLedger::open()?,
        Box::new(sink),
        Box::new(JsonNoteStore::open()?),
        Box::new(LogReporter),
        user,
    );
    if !engine.sync_from_store() {
        eprintln!("warning: condition sync failed, using empty snapshot");
    }
    Ok(engine)
}

pub fn run(action: SimulateAction) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    match action {
        SimulateAction::Fix {
            lat,
            lon,
            accuracy,
            at,
            user,
        } => {
            let mut engine = build_engine(&user)?;
            let report = engine.handle_event(&ContextEvent::PositionFix(PositionFix {
                latitude: lat,
                longitude: lon,
                accuracy_m: accuracy,
                observed_at: at.unwrap_or_else(Utc::now),
            }));
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        SimulateAction::Tick { at, user } => {
            let mut engine = build_engine(&user)?;
            let report = engine.handle_event(&ContextEvent::ClockTick {
                now: at.unwrap_or_else(Utc::now),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        SimulateAction::Status { user } => {
            let engine = build_engine(&user)?;
            let set = engine.active_set();
            println!(
                "{} active condition(s): {} geofence, {} deadline, {} malformed skipped",
                set.len(),
                set.location_targets().len(),
                set.deadline_targets().len(),
                set.skipped_malformed()
            );
        }
    }
    Ok(())
}
