//! Core trait abstractions.
//!
//! These traits define the seams where applications plug in ledger storage,
//! the record-source session, page extraction, and operator prompts.

pub mod extractor;
pub mod prompt;
pub mod store;
