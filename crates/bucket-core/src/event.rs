use serde::{Deserialize, Serialize};

use crate::item::{Item, ItemId};

/// Events emitted by the item store when the collection changes.
///
/// Sent after the in-memory change, whether or not the save that follows
/// succeeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoreEvent {
    Added(Box<Item>),
    Updated(Box<Item>),
    Deleted(ItemId),
}

impl StoreEvent {
    /// Id of the item the event is about.
    pub fn item_id(&self) -> ItemId {
        match self {
            StoreEvent::Added(item) | StoreEvent::Updated(item) => item.id,
            StoreEvent::Deleted(id) => *id,
        }
    }
}
