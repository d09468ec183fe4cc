//! Ledger storage implementations.
//!
//! Available backends:
//! - `JsonFileStore` - Pretty-printed JSON document, atomically replaced
//! - `MemoryStore` - In-memory storage for tests and embedding

pub mod json_file;
pub mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
