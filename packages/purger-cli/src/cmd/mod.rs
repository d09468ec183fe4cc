//! Command implementations

pub mod ledger;
pub mod purge;
