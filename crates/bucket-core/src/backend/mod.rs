//! Key-value storage backends
//!
//! The persistence adapter stores the whole collection as one blob under a
//! single key, so a backend only needs `get` and `set`. Backends are
//! blocking; async callers go through [`crate::persistence::PersistenceAdapter`],
//! which runs them on the blocking pool.

mod file;
mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use file::FileBackend;
pub use memory::MemoryBackend;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteBackend;

use crate::error::Result;

/// The trait that all storage backends implement.
pub trait KeyValueBackend: Send + Sync {
    /// Read the value stored under `key`, or `None` if nothing was ever written.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Replace the value stored under `key`.
    fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Remove the value stored under `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}
