//! Error types for bucket-core

use thiserror::Error;

use crate::item::ItemId;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors from the item store, the persistence adapter and its backends.
///
/// None of these are fatal: the in-memory collection stays usable after
/// every variant.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Caller input violates a precondition (e.g. an empty title)
    #[error("Validation error: {0}")]
    Validation(String),

    /// No item with this id exists
    #[error("Item not found: {0}")]
    NotFound(ItemId),

    /// Stored bytes could not be decoded into a collection
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// The storage backend failed to read or write
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Configuration could not be loaded or is invalid
    #[error("Config error: {0}")]
    Config(String),
}

impl StoreError {
    /// Whether the store remains usable after this error. Always true.
    pub fn is_recoverable(&self) -> bool {
        true
    }

    /// Whether the error came from the storage layer rather than the caller.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            StoreError::Persistence(_) | StoreError::Deserialization(_)
        )
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Deserialization(err.to_string())
    }
}

impl From<toml::de::Error> for StoreError {
    fn from(err: toml::de::Error) -> Self {
        StoreError::Config(err.to_string())
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Persistence(format!("sqlite: {}", err))
    }
}
