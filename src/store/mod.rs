//! Persistent key-value storage used by the booking cache
//!
//! The cache orchestrator only needs a handful of string and integer slots, so
//! storage is expressed as the small [`PersistentStore`] trait. Two backends are
//! provided: [`FileStore`] keeps one file per key under the XDG cache directory,
//! and [`MemoryStore`] keeps everything in process for tests and embedding.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use thiserror::Error;

/// Errors that can occur when reading or writing the store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O failed
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored value could not be interpreted
    #[error("Corrupt value for key '{key}': {reason}")]
    Corrupt { key: String, reason: String },
}

/// String-keyed storage for strings and 64-bit integers
///
/// Writes are expected to be durable once they return. No atomicity across
/// multiple keys is assumed.
pub trait PersistentStore: Send + Sync {
    /// Returns the string stored under `key`, or `None` if absent
    fn get_string(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value` under `key`, replacing any previous value
    fn put_string(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Returns the integer stored under `key`, or `default` if absent
    fn get_i64(&self, key: &str, default: i64) -> Result<i64, StoreError>;

    /// Stores `value` under `key`, replacing any previous value
    fn put_i64(&self, key: &str, value: i64) -> Result<(), StoreError>;

    /// Deletes `key`. Removing an absent key succeeds.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Parses an integer slot, mapping garbage to [`StoreError::Corrupt`]
pub(crate) fn parse_i64(key: &str, raw: &str) -> Result<i64, StoreError> {
    raw.trim().parse::<i64>().map_err(|e| StoreError::Corrupt {
        key: key.to_string(),
        reason: e.to_string(),
    })
}
