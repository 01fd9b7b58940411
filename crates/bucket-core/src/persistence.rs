//! Persistence adapter and save ordering
//!
//! The whole collection is written as one JSON array under a single key.
//! [`SaveQueue`] serializes writes per store and drops snapshots that are
//! older than what is already durable.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::backend::KeyValueBackend;
use crate::error::{Result, StoreError};
use crate::item::Item;

/// Reads and writes the collection blob through a key-value backend.
#[derive(Clone)]
pub struct PersistenceAdapter {
    backend: Arc<dyn KeyValueBackend>,
    key: String,
}

impl PersistenceAdapter {
    pub fn new(backend: Arc<dyn KeyValueBackend>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Load the last saved collection.
    ///
    /// `Ok(None)` means nothing has been saved yet. Undecodable bytes yield
    /// [`StoreError::Deserialization`]; the caller picks the fallback.
    pub async fn load(&self) -> Result<Option<Vec<Item>>> {
        let backend = Arc::clone(&self.backend);
        let key = self.key.clone();
        let bytes = run_blocking(move || backend.get(&key)).await?;

        match bytes {
            Some(bytes) if !is_blank(&bytes) => {
                let items = decode_collection(&bytes)?;
                tracing::debug!(
                    "Loaded {} item(s) from {} key {:?}",
                    items.len(),
                    self.backend.name(),
                    self.key
                );
                Ok(Some(items))
            }
            _ => {
                tracing::debug!("No saved collection under {:?}", self.key);
                Ok(None)
            }
        }
    }

    /// Serialize the full collection and replace the stored blob.
    pub async fn save(&self, items: &[Item]) -> Result<()> {
        let bytes = encode_collection(items)?;
        let backend = Arc::clone(&self.backend);
        let key = self.key.clone();
        run_blocking(move || backend.set(&key, &bytes)).await?;
        tracing::debug!(
            "Saved {} item(s) to {} key {:?}",
            items.len(),
            self.backend.name(),
            self.key
        );
        Ok(())
    }
}

impl std::fmt::Debug for PersistenceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceAdapter")
            .field("backend", &self.backend.name())
            .field("key", &self.key)
            .finish()
    }
}

/// Run a blocking backend call off the async executor.
async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::Persistence(format!("storage task failed: {}", e)))?
}

fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(u8::is_ascii_whitespace)
}

/// Encode a collection as a JSON array, preserving order.
pub fn encode_collection(items: &[Item]) -> Result<Vec<u8>> {
    serde_json::to_vec(items).map_err(|e| StoreError::Persistence(format!("encode: {}", e)))
}

/// Decode a JSON array into a collection, rejecting data that breaks the
/// per-item invariants or repeats an id.
pub fn decode_collection(bytes: &[u8]) -> Result<Vec<Item>> {
    let items: Vec<Item> = serde_json::from_slice(bytes)?;

    let mut seen = HashSet::with_capacity(items.len());
    for item in &items {
        item.check_invariants().map_err(|e| match e {
            StoreError::Validation(msg) => StoreError::Deserialization(msg),
            other => other,
        })?;
        if !seen.insert(item.id) {
            return Err(StoreError::Deserialization(format!(
                "duplicate item id {}",
                item.id
            )));
        }
    }
    Ok(items)
}

/// Result of submitting a snapshot to the save queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The snapshot was written.
    Written,
    /// A newer snapshot was already durable; nothing was written.
    Superseded,
}

struct SaveSlot {
    adapter: PersistenceAdapter,
    /// Sequence number of the newest snapshot known to be durable.
    durable_seq: u64,
}

/// Single-slot writer that keeps durable state monotonic.
///
/// Callers tag each snapshot with the sequence number of the in-memory state
/// it was taken from. Writes run one at a time behind a FIFO lock, and a
/// snapshot no newer than the durable one is skipped.
pub struct SaveQueue {
    slot: Mutex<SaveSlot>,
}

impl SaveQueue {
    pub fn new(adapter: PersistenceAdapter) -> Self {
        Self {
            slot: Mutex::new(SaveSlot {
                adapter,
                durable_seq: 0,
            }),
        }
    }

    /// Load through the queue so a read never overlaps a write.
    pub async fn load(&self) -> Result<Option<Vec<Item>>> {
        let slot = self.slot.lock().await;
        slot.adapter.load().await
    }

    /// Write `snapshot` unless something at least as new is already durable.
    pub async fn submit(&self, seq: u64, snapshot: &[Item]) -> Result<SaveOutcome> {
        let mut slot = self.slot.lock().await;
        if seq <= slot.durable_seq {
            tracing::debug!(
                "Skipping save of snapshot {} (snapshot {} already durable)",
                seq,
                slot.durable_seq
            );
            return Ok(SaveOutcome::Superseded);
        }
        slot.adapter.save(snapshot).await?;
        slot.durable_seq = seq;
        Ok(SaveOutcome::Written)
    }

    /// Sequence number of the newest durable snapshot.
    pub async fn durable_seq(&self) -> u64 {
        self.slot.lock().await.durable_seq
    }

    pub async fn key(&self) -> String {
        self.slot.lock().await.adapter.key().to_string()
    }
}
