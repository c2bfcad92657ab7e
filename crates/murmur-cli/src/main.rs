use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "murmur-cli", version, about = "Murmur CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Feed context events into the trigger engine
    Simulate {
        #[command(subcommand)]
        action: commands::simulate::SimulateAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Dedup ledger inspection
    Ledger {
        #[command(subcommand)]
        action: commands::ledger::LedgerAction,
    },
    /// Note management
    Notes {
        #[command(subcommand)]
        action: commands::notes::NotesAction,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Simulate { action } => commands::simulate::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Ledger { action } => commands::ledger::run(action),
        Commands::Notes { action } => commands::notes::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
