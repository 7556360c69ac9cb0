//! In-memory reference backend for reposearch.
//!
//! Executes compiled predicates over roaring-bitmap inverted indexes. It is
//! meant for tests, tooling and small repositories; joins are rejected.

pub mod full_text;
pub mod inverted_index;
pub mod memory_index;
pub mod snapshot;

pub use inverted_index::FieldIndex;
pub use memory_index::{MemorySearchIndex, UpdateProcessor};
pub use snapshot::IndexSnapshot;
