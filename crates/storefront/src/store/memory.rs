//! In-process stores.
//!
//! [`MemoryDocumentStore`] behaves like a hosted document database shared by
//! every session created from the same handle, which makes it the natural
//! stand-in for "another device" in tests. It can be switched offline to
//! exercise the write-failure path.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use futures::future::BoxFuture;
use tracing::debug;

use figurine_core::IdentityKey;

use super::{
    CollectionName, Document, DocumentStream, LocalStore, RemoteDocumentStore, Subscribers, lock,
};
use crate::error::{Result, StoreError};

/// Remote document store held in memory.
///
/// Cheap to clone; clones share the same documents and subscribers.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
    inner: Arc<MemoryDocumentsInner>,
}

#[derive(Debug, Default)]
struct MemoryDocumentsInner {
    documents: Mutex<HashMap<(CollectionName, IdentityKey), Document>>,
    subscribers: Subscribers,
    offline: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryDocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of `collection/key`.
    #[must_use]
    pub fn document(&self, collection: CollectionName, key: &IdentityKey) -> Option<Document> {
        lock(&self.inner.documents)
            .get(&(collection, key.clone()))
            .cloned()
    }

    /// Make subsequent writes fail with `StoreError::Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.inner.writes.load(Ordering::SeqCst)
    }
}

impl MemoryDocumentsInner {
    fn write(&self, collection: CollectionName, key: &IdentityKey, document: Document) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!(
                "{collection}/{key}: store is offline"
            )));
        }
        // Hold the document lock while notifying so subscribers observe
        // writes in the order they were applied.
        let mut documents = lock(&self.documents);
        documents.insert((collection, key.clone()), document.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.subscribers.notify(collection, key, &document);
        debug!(%collection, %key, items = document.items.len(), "memory document written");
        Ok(())
    }
}

impl RemoteDocumentStore for MemoryDocumentStore {
    fn write(
        &self,
        collection: CollectionName,
        key: &IdentityKey,
        document: Document,
    ) -> BoxFuture<'static, Result<()>> {
        let inner = Arc::clone(&self.inner);
        let key = key.clone();
        Box::pin(async move { inner.write(collection, &key, document) })
    }

    fn subscribe(&self, collection: CollectionName, key: &IdentityKey) -> DocumentStream {
        let documents = lock(&self.inner.documents);
        let current = documents.get(&(collection, key.clone())).cloned();
        self.inner.subscribers.register(collection, key, current)
    }
}

/// Local key/value store held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryLocalStore {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryLocalStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryLocalStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(lock(&self.values).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        lock(&self.values).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        lock(&self.values).remove(key);
        Ok(())
    }
}
