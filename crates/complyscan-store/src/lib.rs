//! ComplyScan Store
//!
//! Result stores keyed by normalized input text.
//!
//! Provides:
//! - The [`ResultStore`] trait used by the analyzer
//! - [`MemoryStore`], a bounded in-process LRU cache
//! - [`SqliteStore`], the durable `assessments` table

pub mod cache;
pub mod sqlite;
pub mod store;

pub use cache::LruCache;
pub use sqlite::{parse_database_url, Assessment, SqliteStore};
pub use store::{MemoryStore, ResultStore};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::sqlite::{Assessment, SqliteStore};
    pub use crate::store::{MemoryStore, ResultStore};
}
