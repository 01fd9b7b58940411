//! bucket-core: a persistent, ordered bucket-list store.
//!
//! [`BucketStore`] owns the collection and its add/delete/toggle/update
//! operations. Every change is mirrored to a single key of a
//! [`KeyValueBackend`] as one JSON array, with saves kept in change order by
//! a [`SaveQueue`].

pub mod backend;
pub mod config;
pub mod error;
pub mod event;
pub mod item;
pub mod persistence;
pub mod store;

pub use backend::*;
pub use config::*;
pub use error::*;
pub use event::*;
pub use item::*;
pub use persistence::*;
pub use store::*;
