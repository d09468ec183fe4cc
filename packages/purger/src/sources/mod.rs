//! Record-source implementations.
//!
//! Available sources:
//! - `StagedExportSource` - Replays page exports staged on local disk

pub mod staged;

pub use staged::{StagedExportSource, StagedSession};
