//! StudyAI Storage Layer
//!
//! Key-value persistence backing the client session.
//! Two implementations of the same port: a durable SQLite store that
//! survives restarts, and an in-memory store scoped to the process.

mod database;
mod error;
mod memory;
mod migrations;

pub use database::Database;
pub use error::StorageError;
pub use memory::MemoryStore;

pub type Result<T> = std::result::Result<T, StorageError>;

/// A flat string key-value region.
///
/// Implementations must be safe to share between tasks; every call is a
/// single overwrite with no transactional grouping across keys.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}
