//! Domain types for the ledger and job orchestration.

pub mod config;
pub mod context;
pub mod ledger;
pub mod outcome;
pub mod record;
