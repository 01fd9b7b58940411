use std::collections::HashMap;
use std::sync::Mutex;

use super::KeyValueBackend;
use crate::error::{Result, StoreError};

/// In-memory backend (for testing and throwaway sessions).
#[derive(Debug, Default)]
pub struct MemoryBackend {
    slots: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend that already holds `value` under `key`.
    pub fn with_value(key: &str, value: impl Into<Vec<u8>>) -> Self {
        let backend = Self::new();
        if let Ok(mut slots) = backend.slots.lock() {
            slots.insert(key.to_string(), value.into());
        }
        backend
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.slots
            .lock()
            .map_err(|e| StoreError::Persistence(format!("Mutex poisoned: {}", e)))
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
