pub mod config;
pub mod ledger;
pub mod notes;
pub mod simulate;
