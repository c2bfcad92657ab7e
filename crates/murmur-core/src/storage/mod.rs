pub mod database;

pub use database::{Database, LedgerEntry};

use std::path::PathBuf;

/// Returns `~/.config/murmur[-dev]/` based on MURMUR_ENV.
///
/// Set MURMUR_ENV=dev to use a development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("MURMUR_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("murmur-dev")
    } else {
        base_dir.join("murmur")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
