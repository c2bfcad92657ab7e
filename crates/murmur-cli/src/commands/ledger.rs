use chrono::Utc;
use clap::Subcommand;
use murmur_core::{Config, ConditionId, DedupLedger, JsonNoteStore};

#[derive(Subcommand)]
pub enum LedgerAction {
    /// List ledger entries (most recent fire first)
    List,
    /// Check whether a condition would clear the cool-down right now
    Check {
        /// Condition id
        condition_id: String,
    },
    /// Drop entries whose note no longer exists
    Prune,
    /// Remove every entry
    Clear,
}

pub fn run(action: LedgerAction) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ledger = DedupLedger::open()?;

    match action {
        LedgerAction::List => {
            let entries = ledger.entries()?;
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        LedgerAction::Check { condition_id } => {
            let config = Config::load()?;
            let id = ConditionId(condition_id);
            let clear = ledger.should_fire(&id, Utc::now(), config.cool_down())?;
            match ledger.last_fired_at(&id)? {
                Some(at) => println!("last fired {at}; would fire now: {clear}"),
                None => println!("never fired; would fire now: {clear}"),
            }
        }
        LedgerAction::Prune => {
            let store = JsonNoteStore::open()?;
            let known: Vec<ConditionId> = store
                .load_all()?
                .iter()
                .map(|n| n.condition_id())
                .collect();
            let removed = ledger.prune(&known)?;
            println!("pruned {removed} entries");
        }
        LedgerAction::Clear => {
            let removed = ledger.clear()?;
            println!("removed {removed} entries");
        }
    }
    Ok(())
}
