//! Persistence collaborators for the cart and favorites containers.
//!
//! Two stores back a session:
//!
//! - [`LocalStore`] - per-device key/value storage used while nobody is
//!   signed in. No change notifications.
//! - [`RemoteDocumentStore`] - per-user JSON documents keyed by identity,
//!   with push subscriptions so changes made on another device flow back.
//!
//! Both hold serialized copies only; the containers own the collections.
//!
//! # Implementations
//!
//! - [`memory`] - in-process stores for tests and ephemeral sessions
//! - [`file`] - stores persisted under a data directory

pub mod file;
pub mod memory;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use figurine_core::IdentityKey;

use crate::error::{Result, StoreError};

pub use file::{FileDocumentStore, FileLocalStore};
pub use memory::{MemoryDocumentStore, MemoryLocalStore};

/// Remote collection a document lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionName {
    Carts,
    Favorites,
    /// Account profiles.
    Users,
}

impl CollectionName {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Carts => "carts",
            Self::Favorites => "favorites",
            Self::Users => "users",
        }
    }
}

impl fmt::Display for CollectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A per-user remote document: `{ "items": [...], "updatedAt": "..." }`.
///
/// `items` is kept as raw JSON so one store can hold both carts and
/// favorites; containers decode it into their own item type. Profile
/// documents carry their data in `fields` instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub items: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Any other top-level fields.
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl Document {
    /// Build a document from a collection, stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Serialization` if an item fails to serialize.
    pub fn from_items<T: Serialize>(items: &[T]) -> Result<Self> {
        let items = items
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self {
            items,
            updated_at: Some(Utc::now()),
            fields: serde_json::Map::new(),
        })
    }

    /// An empty collection document, as written on sign-up.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            updated_at: Some(Utc::now()),
            fields: serde_json::Map::new(),
        }
    }

    /// Decode `items` into a typed collection.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Serialization` if any item does not match `T`.
    pub fn decode_items<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        self.items
            .iter()
            .map(|item| T::deserialize(item).map_err(Into::into))
            .collect()
    }
}

/// Receiving end of a remote document subscription.
///
/// Yields the current value first (`None` when the document does not exist),
/// then every later write. Dropping the stream unsubscribes.
#[derive(Debug)]
pub struct DocumentStream {
    rx: mpsc::UnboundedReceiver<Option<Document>>,
}

impl DocumentStream {
    /// Wait for the next snapshot. Returns `None` once the store is gone.
    pub async fn next(&mut self) -> Option<Option<Document>> {
        self.rx.recv().await
    }

    /// Take a snapshot that is already queued, without waiting.
    pub fn try_next(&mut self) -> Option<Option<Document>> {
        self.rx.try_recv().ok()
    }
}

/// Per-user document storage with push updates.
pub trait RemoteDocumentStore: Send + Sync + 'static {
    /// Upsert `document` at `collection/key`, replacing any previous value.
    fn write(
        &self,
        collection: CollectionName,
        key: &IdentityKey,
        document: Document,
    ) -> BoxFuture<'static, Result<()>>;

    /// Subscribe to `collection/key`.
    fn subscribe(&self, collection: CollectionName, key: &IdentityKey) -> DocumentStream;

    /// Current value of `collection/key`, read through a one-shot
    /// subscription.
    fn read(
        &self,
        collection: CollectionName,
        key: &IdentityKey,
    ) -> BoxFuture<'static, Result<Option<Document>>> {
        let mut stream = self.subscribe(collection, key);
        let path = format!("{collection}/{key}");
        Box::pin(async move {
            stream
                .next()
                .await
                .ok_or_else(|| StoreError::Unavailable(format!("{path}: subscription closed")))
        })
    }
}

/// Device-local key/value storage.
pub trait LocalStore: Send + Sync + 'static {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete `key`. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn remove(&self, key: &str) -> Result<()>;
}

type DocumentPath = (CollectionName, IdentityKey);

/// Fan-out of document snapshots to live subscribers.
///
/// Shared by the remote store implementations. Senders whose stream has been
/// dropped are pruned on the next notification.
#[derive(Debug, Default)]
pub(crate) struct Subscribers {
    senders: Mutex<HashMap<DocumentPath, Vec<mpsc::UnboundedSender<Option<Document>>>>>,
}

impl Subscribers {
    /// Register a subscriber and queue `current` as its first snapshot.
    pub(crate) fn register(
        &self,
        collection: CollectionName,
        key: &IdentityKey,
        current: Option<Document>,
    ) -> DocumentStream {
        let (tx, rx) = mpsc::unbounded_channel();
        // Receiver is alive, so this cannot fail.
        let _ = tx.send(current);
        lock(&self.senders)
            .entry((collection, key.clone()))
            .or_default()
            .push(tx);
        DocumentStream { rx }
    }

    /// Deliver `document` to every live subscriber of `collection/key`.
    pub(crate) fn notify(&self, collection: CollectionName, key: &IdentityKey, document: &Document) {
        let mut senders = lock(&self.senders);
        let path = (collection, key.clone());
        if let Some(list) = senders.get_mut(&path) {
            list.retain(|tx| tx.send(Some(document.clone())).is_ok());
            if list.is_empty() {
                senders.remove(&path);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn count(&self, collection: CollectionName, key: &IdentityKey) -> usize {
        lock(&self.senders)
            .get(&(collection, key.clone()))
            .map_or(0, Vec::len)
    }
}

/// Lock a mutex, recovering the data if a panicking thread poisoned it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
