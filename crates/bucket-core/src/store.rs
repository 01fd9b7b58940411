//! The bucket-list item store: in-memory collection, mutations and saves.

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};

use crate::error::{Result, StoreError};
use crate::event::StoreEvent;
use crate::item::{normalize_description, normalize_title, Item, ItemId, NewItem};
use crate::persistence::{PersistenceAdapter, SaveOutcome, SaveQueue};

const EVENT_CAPACITY: usize = 64;

/// Mutation to apply to an item's fields.
///
/// Ids are immutable; there is no variant for them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldMutation {
    SetTitle(String),
    SetDescription(Option<String>),
    SetCompleted(bool),
}

impl FieldMutation {
    fn apply(&self, item: &mut Item) -> Result<()> {
        match self {
            FieldMutation::SetTitle(title) => item.title = normalize_title(title)?,
            FieldMutation::SetDescription(description) => {
                item.description = normalize_description(description.as_deref())
            }
            FieldMutation::SetCompleted(completed) => {
                item.set_completed(*completed);
            }
        }
        Ok(())
    }
}

/// Where the initial collection came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HydrationSource {
    /// Loaded from a previously saved copy.
    Stored,
    /// First run; populated from the caller's seed items.
    Seeded,
    /// First run with no seed.
    Empty,
    /// The saved copy could not be read; started empty.
    Recovered,
}

/// Report returned by [`BucketStore::initialize`].
#[derive(Debug)]
pub struct Hydration {
    pub source: HydrationSource,
    pub items: usize,
    /// Non-fatal problem hit while loading or seeding.
    pub warning: Option<StoreError>,
}

/// In-memory collection plus the sequence number of its latest change.
struct Collection {
    items: Vec<Item>,
    seq: u64,
}

impl Collection {
    fn position(&self, id: ItemId) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    /// Mark a change and take the snapshot that must be saved for it.
    fn commit(&mut self) -> (u64, Vec<Item>) {
        self.seq += 1;
        (self.seq, self.items.clone())
    }
}

/// Owner of the authoritative bucket list.
///
/// The only constructor is [`BucketStore::initialize`], so no operation can
/// run before the saved collection has been loaded. Every mutation updates
/// memory first, then saves the whole collection through a [`SaveQueue`].
/// A failed save is reported to the caller but the in-memory change stays.
pub struct BucketStore {
    collection: RwLock<Collection>,
    saves: SaveQueue,
    events: broadcast::Sender<StoreEvent>,
}

impl BucketStore {
    /// Load the saved collection and build the store.
    ///
    /// `seed` is used only when nothing has been saved yet. Load failures do
    /// not abort: the store starts empty and the error is returned in
    /// [`Hydration::warning`].
    pub async fn initialize(
        adapter: PersistenceAdapter,
        seed: Option<Vec<NewItem>>,
    ) -> (Self, Hydration) {
        let backend = adapter.backend_name();
        let saves = SaveQueue::new(adapter);

        let (source, items, warning) = match saves.load().await {
            Ok(Some(items)) => (HydrationSource::Stored, items, None),
            Ok(None) => {
                let seeded = build_seed(seed.unwrap_or_default());
                if seeded.is_empty() {
                    (HydrationSource::Empty, Vec::new(), None)
                } else {
                    (HydrationSource::Seeded, seeded, None)
                }
            }
            Err(e) => {
                tracing::warn!("Failed to load saved items: {}, starting empty", e);
                (HydrationSource::Recovered, Vec::new(), Some(e))
            }
        };

        let count = items.len();
        // Seed items are not durable yet, so they start one change ahead.
        let seq = u64::from(source == HydrationSource::Seeded);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let store = Self {
            collection: RwLock::new(Collection { items, seq }),
            saves,
            events,
        };

        let mut hydration = Hydration {
            source,
            items: count,
            warning,
        };
        if source == HydrationSource::Seeded {
            if let Err(e) = store.flush().await {
                tracing::warn!("Failed to save seed items: {}", e);
                hydration.warning = Some(e);
            }
        }

        tracing::info!(
            "Bucket store ready: {} item(s), source {:?}, backend {}",
            count,
            source,
            backend
        );
        (store, hydration)
    }

    /// Create an item at the end of the list.
    pub async fn add(&self, title: &str, description: Option<&str>) -> Result<Item> {
        let item = Item::new(title, description)?;

        let (seq, snapshot) = {
            let mut collection = self.collection.write().await;
            collection.items.push(item.clone());
            collection.commit()
        };

        tracing::debug!("Added item {}", item.id);
        self.emit(StoreEvent::Added(Box::new(item.clone())));
        self.persist(seq, snapshot).await?;
        Ok(item)
    }

    /// Remove an item. Returns `false` if it is absent.
    ///
    /// Deleting an unknown id changes nothing and never fails, but it does
    /// retry a save left pending by an earlier failure.
    pub async fn delete(&self, id: ItemId) -> Result<bool> {
        let commit = {
            let mut collection = self.collection.write().await;
            collection.position(id).map(|index| {
                collection.items.remove(index);
                collection.commit()
            })
        };
        let Some((seq, snapshot)) = commit else {
            tracing::debug!("Delete of unknown item {} ignored", id);
            self.retry_pending().await;
            return Ok(false);
        };

        tracing::debug!("Deleted item {}", id);
        self.emit(StoreEvent::Deleted(id));
        self.persist(seq, snapshot).await?;
        Ok(true)
    }

    /// Flip an item's completion state and return the updated item.
    pub async fn toggle_complete(&self, id: ItemId) -> Result<Item> {
        let (item, seq, snapshot) = {
            let mut collection = self.collection.write().await;
            let index = collection.position(id).ok_or(StoreError::NotFound(id))?;
            let item = &mut collection.items[index];
            let completed = !item.completed;
            item.set_completed(completed);
            let item = item.clone();
            let (seq, snapshot) = collection.commit();
            (item, seq, snapshot)
        };

        tracing::debug!("Item {} completed={}", id, item.completed);
        self.emit(StoreEvent::Updated(Box::new(item.clone())));
        self.persist(seq, snapshot).await?;
        Ok(item)
    }

    /// Apply a batch of field changes to one item.
    ///
    /// The batch is all-or-nothing: if any mutation is invalid the item is
    /// left as it was. A batch that changes nothing is not saved itself, but
    /// retries a save left pending by an earlier failure.
    pub async fn update(&self, id: ItemId, mutations: Vec<FieldMutation>) -> Result<Item> {
        let (item, commit) = {
            let mut collection = self.collection.write().await;
            let index = collection.position(id).ok_or(StoreError::NotFound(id))?;

            let mut updated = collection.items[index].clone();
            for mutation in &mutations {
                mutation.apply(&mut updated)?;
            }
            if updated == collection.items[index] {
                (updated, None)
            } else {
                collection.items[index] = updated.clone();
                (updated, Some(collection.commit()))
            }
        };
        let Some((seq, snapshot)) = commit else {
            self.retry_pending().await;
            return Ok(item);
        };

        tracing::debug!("Updated item {} ({} mutation(s))", id, mutations.len());
        self.emit(StoreEvent::Updated(Box::new(item.clone())));
        self.persist(seq, snapshot).await?;
        Ok(item)
    }

    pub async fn get(&self, id: ItemId) -> Option<Item> {
        let collection = self.collection.read().await;
        collection.items.iter().find(|item| item.id == id).cloned()
    }

    /// Every item, in insertion order.
    pub async fn list_all(&self) -> Vec<Item> {
        self.collection.read().await.items.clone()
    }

    /// Items not yet completed, in insertion order.
    pub async fn list_active(&self) -> Vec<Item> {
        self.filtered(Item::is_active).await
    }

    /// Completed items, in insertion order.
    pub async fn list_completed(&self) -> Vec<Item> {
        self.filtered(|item| item.completed).await
    }

    pub async fn len(&self) -> usize {
        self.collection.read().await.items.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.collection.read().await.items.is_empty()
    }

    pub async fn active_count(&self) -> usize {
        let collection = self.collection.read().await;
        collection.items.iter().filter(|item| item.is_active()).count()
    }

    /// Whether the in-memory collection is ahead of the stored copy, e.g.
    /// after a failed save.
    pub async fn has_unsaved_changes(&self) -> bool {
        let seq = self.collection.read().await.seq;
        self.saves.durable_seq().await < seq
    }

    /// Save the current collection if it is ahead of the stored copy.
    ///
    /// This is the retry path after a [`StoreError::Persistence`].
    pub async fn flush(&self) -> Result<SaveOutcome> {
        let (seq, snapshot) = {
            let collection = self.collection.read().await;
            (collection.seq, collection.items.clone())
        };
        self.saves.submit(seq, &snapshot).await
    }

    /// Receive a [`StoreEvent`] for every change made after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Tear the store down, saving anything not yet durable.
    pub async fn close(self) -> Result<()> {
        self.flush().await?;
        tracing::debug!("Bucket store closed ({})", self.saves.key().await);
        Ok(())
    }

    async fn filtered(&self, keep: impl Fn(&Item) -> bool) -> Vec<Item> {
        let collection = self.collection.read().await;
        collection
            .items
            .iter()
            .filter(|&item| keep(item))
            .cloned()
            .collect()
    }

    async fn persist(&self, seq: u64, snapshot: Vec<Item>) -> Result<()> {
        match self.saves.submit(seq, &snapshot).await {
            Ok(_) => Ok(()),
            Err(e) => {
                tracing::warn!("Save of change {} failed: {}", seq, e);
                Err(e)
            }
        }
    }

    /// Best-effort flush for paths that made no change of their own.
    async fn retry_pending(&self) {
        if !self.has_unsaved_changes().await {
            return;
        }
        if let Err(e) = self.flush().await {
            tracing::warn!("Retry of pending save failed: {}", e);
        }
    }

    fn emit(&self, event: StoreEvent) {
        // Ignore send errors (no subscribers)
        let _ = self.events.send(event);
    }
}

fn build_seed(seed: Vec<NewItem>) -> Vec<Item> {
    seed.into_iter()
        .filter_map(|new| match Item::new(&new.title, new.description.as_deref()) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!("Skipping seed item {:?}: {}", new.title, e);
                None
            }
        })
        .collect()
}
