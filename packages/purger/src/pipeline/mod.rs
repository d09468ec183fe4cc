//! Job and batch orchestration.
//!
//! - `job` - Single-client lifecycle from duplicate check to ledger record
//! - `batch` - Sequential runs over a manifest queue
//! - `manifest` - Manifest parsing and package selection

pub mod batch;
pub mod job;
pub mod manifest;

pub use batch::run_batch;
pub use job::{ExtractionReport, JobRequest, JobRunner};
pub use manifest::{
    build_batch_queue, load_manifest, parse_manifest, parse_package_args, select_by_packages,
    ManifestEntry,
};
