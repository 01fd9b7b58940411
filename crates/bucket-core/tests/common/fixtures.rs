//! Test backends and store setup helpers

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bucket_core::{
    BucketStore, Hydration, KeyValueBackend, MemoryBackend, NewItem, PersistenceAdapter, Result,
    StoreError,
};

pub const KEY: &str = "bucket_list_items";

/// Memory backend whose reads and writes can be made to fail on demand.
#[derive(Default)]
pub struct FlakyBackend {
    inner: MemoryBackend,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

#[allow(dead_code)]
impl FlakyBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_value(value: &str) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryBackend::with_value(KEY, value),
            ..Default::default()
        })
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn raw(&self) -> Option<String> {
        self.inner
            .get(KEY)
            .unwrap()
            .map(|bytes| String::from_utf8(bytes).unwrap())
    }
}

impl KeyValueBackend for FlakyBackend {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Persistence("simulated read failure".into()));
        }
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Persistence("simulated quota exceeded".into()));
        }
        self.inner.set(key, value)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.inner.remove(key)
    }

    fn name(&self) -> &'static str {
        "flaky"
    }
}

/// Backend whose writes get faster over time, so later saves would overtake
/// earlier ones if nothing kept them in order. Records each write's length.
pub struct SlowBackend {
    inner: MemoryBackend,
    delay_ms: AtomicUsize,
    written: Mutex<Vec<usize>>,
}

impl SlowBackend {
    pub fn new(initial_delay_ms: usize) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryBackend::new(),
            delay_ms: AtomicUsize::new(initial_delay_ms),
            written: Mutex::new(Vec::new()),
        })
    }

    /// Item counts of every snapshot written, in write order.
    pub fn written_lengths(&self) -> Vec<usize> {
        self.written.lock().unwrap().clone()
    }

    pub fn stored(&self) -> Vec<u8> {
        self.inner.get(KEY).unwrap().unwrap_or_default()
    }
}

impl KeyValueBackend for SlowBackend {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let delay = self
            .delay_ms
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |d| Some(d.saturating_sub(5)))
            .unwrap_or(0);
        std::thread::sleep(Duration::from_millis(delay as u64));

        let items = bucket_core::decode_collection(value)?;
        self.written.lock().unwrap().push(items.len());
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.inner.remove(key)
    }

    fn name(&self) -> &'static str {
        "slow"
    }
}

/// Initialize a store over any backend under the standard key.
pub async fn open_store(backend: Arc<dyn KeyValueBackend>) -> (BucketStore, Hydration) {
    open_seeded(backend, None).await
}

pub async fn open_seeded(
    backend: Arc<dyn KeyValueBackend>,
    seed: Option<Vec<NewItem>>,
) -> (BucketStore, Hydration) {
    BucketStore::initialize(PersistenceAdapter::new(backend, KEY), seed).await
}

/// Titles of a list of items, for compact assertions.
pub fn titles(items: &[bucket_core::Item]) -> Vec<String> {
    items.iter().map(|item| item.title.clone()).collect()
}
