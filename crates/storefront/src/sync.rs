//! Synchronization engine shared by the cart and favorites containers.
//!
//! A [`SyncedCollection`] owns an ordered, duplicate-free collection and
//! keeps it in step with whichever store is the source of truth for the
//! current identity:
//!
//! | identity   | hydrate from                         | persist to            |
//! |------------|--------------------------------------|-----------------------|
//! | anonymous  | local store, once per transition     | local store (sync)    |
//! | signed in  | remote subscription, every snapshot  | remote store (spawned)|
//!
//! Mutations lock, catch up with the provider's current identity, apply,
//! unlock and then persist the full collection, so a mutation issued right
//! after signing in or out always reaches the new identity's store. Remote
//! writes are fire-and-forget: failures are logged and the in-memory state
//! stays as the caller left it. Remote snapshots replace the whole
//! collection; switching identity never merges the two stores.

use std::fmt::Debug;
use std::future;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use figurine_core::{IdentityKey, ProductId};

use crate::identity::Identity;
use crate::store::{CollectionName, Document, DocumentStream, LocalStore, RemoteDocumentStore, lock};

/// Static description of one kind of synchronized collection.
pub trait CollectionKind: Send + Sync + 'static {
    /// Entry type stored in the collection.
    type Item: Clone + Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static;

    /// Remote collection holding one document per identity.
    const REMOTE: CollectionName;

    /// Short name used in log events.
    const LABEL: &'static str;

    /// Product an entry refers to; unique within a collection.
    fn item_id(item: &Self::Item) -> ProductId;

    /// Restore collection invariants on data loaded from a store.
    ///
    /// The default keeps the first entry for each id.
    fn normalize(items: Vec<Self::Item>) -> Vec<Self::Item> {
        dedupe_by_id::<Self>(items)
    }
}

/// Keep the first entry per id, preserving order.
pub fn dedupe_by_id<K: CollectionKind + ?Sized>(items: Vec<K::Item>) -> Vec<K::Item> {
    let mut seen = std::collections::HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| seen.insert(K::item_id(item)))
        .collect()
}

/// Stores a session persists to.
#[derive(Clone)]
pub struct Stores {
    pub remote: Arc<dyn RemoteDocumentStore>,
    pub local: Arc<dyn LocalStore>,
}

impl Stores {
    #[must_use]
    pub fn new(remote: impl RemoteDocumentStore, local: impl LocalStore) -> Self {
        Self {
            remote: Arc::new(remote),
            local: Arc::new(local),
        }
    }
}

impl Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}

/// A collection kept in sync with the local or remote store.
///
/// Cheap to clone; clones share state.
pub struct SyncedCollection<K: CollectionKind> {
    shared: Arc<Shared<K>>,
}

impl<K: CollectionKind> Clone for SyncedCollection<K> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

struct Shared<K: CollectionKind> {
    state: Mutex<State<K::Item>>,
    stores: Stores,
    local_key: String,
    revision: watch::Sender<u64>,
    pending_writes: Mutex<Vec<JoinHandle<()>>>,
}

struct State<T> {
    items: Vec<T>,
    /// Identity the collection is currently sourced from.
    identity: Option<Identity>,
    /// Provider being followed, set once syncing starts.
    identities: Option<watch::Receiver<Option<Identity>>>,
    /// Subscription opened outside the sync task, waiting to be picked up.
    handoff: Option<Subscription>,
}

/// A remote subscription and the identity it belongs to.
struct Subscription {
    key: IdentityKey,
    stream: DocumentStream,
}

impl<K: CollectionKind> SyncedCollection<K> {
    /// Create an empty, anonymous collection persisted under `local_key`.
    #[must_use]
    pub fn new(stores: Stores, local_key: impl Into<String>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    items: Vec::new(),
                    identity: None,
                    identities: None,
                    handoff: None,
                }),
                stores,
                local_key: local_key.into(),
                revision,
                pending_writes: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Snapshot of the collection.
    #[must_use]
    pub fn items(&self) -> Vec<K::Item> {
        lock(&self.shared.state).items.clone()
    }

    /// Run `f` against the collection without copying it.
    pub fn read<R>(&self, f: impl FnOnce(&[K::Item]) -> R) -> R {
        f(&lock(&self.shared.state).items)
    }

    /// Whether an entry for `id` exists.
    #[must_use]
    pub fn contains(&self, id: ProductId) -> bool {
        self.read(|items| items.iter().any(|item| K::item_id(item) == id))
    }

    /// Identity the collection is currently sourced from.
    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        lock(&self.shared.state).identity.clone()
    }

    /// Receiver bumped after every in-memory change, local or remote.
    #[must_use]
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.shared.revision.subscribe()
    }

    /// Re-source the collection now if the followed identity has changed.
    ///
    /// The sync task does this on its own when it next runs; calling it
    /// right after signing in or out makes the switch visible immediately.
    pub fn follow_current_identity(&self) {
        self.shared.catch_up(&mut lock(&self.shared.state));
    }

    /// Apply a mutation, then persist the whole collection.
    ///
    /// A pending identity change is applied first, so the mutation lands on
    /// the collection and store of the identity that is current right now.
    pub fn mutate<R>(&self, f: impl FnOnce(&mut Vec<K::Item>) -> R) -> R {
        let (result, snapshot, identity) = {
            let mut state = lock(&self.shared.state);
            self.shared.catch_up(&mut state);
            let result = f(&mut state.items);
            (result, state.items.clone(), state.identity.clone())
        };
        self.shared.bump();
        self.shared.persist(&snapshot, identity.as_ref());
        result
    }

    /// Start following `identities`.
    ///
    /// The current identity is applied before this returns, so an anonymous
    /// collection is already hydrated from the local store and a signed-in one
    /// has applied any snapshot the remote store had queued. Later changes
    /// are handled by a background task that stops when the returned handle
    /// is dropped.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn spawn_sync(&self, mut identities: watch::Receiver<Option<Identity>>) -> SyncHandle {
        let subscription = {
            let mut state = lock(&self.shared.state);
            let initial = identities.borrow_and_update().clone();
            state.identities = Some(identities.clone());
            self.shared.switch_identity(&mut state, initial);
            state.handoff.take()
        };
        let shared = Arc::clone(&self.shared);
        let task = tokio::spawn(async move { shared.run(identities, subscription).await });
        SyncHandle { task: Some(task) }
    }

    /// Wait for every remote write issued so far to finish.
    pub async fn flush(&self) {
        let pending = std::mem::take(&mut *lock(&self.shared.pending_writes));
        for handle in pending {
            if let Err(e) = handle.await {
                error!(collection = K::LABEL, error = %e, "Remote write task failed");
            }
        }
    }
}

impl<K: CollectionKind> Shared<K> {
    fn bump(&self) {
        self.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
    }

    fn replace(&self, state: &mut State<K::Item>, items: Vec<K::Item>) {
        state.items = K::normalize(items);
        self.bump();
        debug!(collection = K::LABEL, items = state.items.len(), "Collection replaced");
    }

    /// Route a full-collection write to the store matching `identity`.
    fn persist(&self, items: &[K::Item], identity: Option<&Identity>) {
        match identity {
            Some(identity) => self.persist_remote(items, identity),
            None => self.persist_local(items),
        }
    }

    fn persist_local(&self, items: &[K::Item]) {
        let json = match serde_json::to_string(items) {
            Ok(json) => json,
            Err(e) => {
                error!(collection = K::LABEL, error = %e, "Failed to serialize collection");
                return;
            }
        };
        if let Err(e) = self.stores.local.set(&self.local_key, &json) {
            error!(collection = K::LABEL, key = %self.local_key, error = %e, "Failed to save to local store");
        }
    }

    fn persist_remote(&self, items: &[K::Item], identity: &Identity) {
        let document = match Document::from_items(items) {
            Ok(document) => document,
            Err(e) => {
                error!(collection = K::LABEL, error = %e, "Failed to serialize collection");
                return;
            }
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            error!(collection = K::LABEL, "No async runtime; remote write dropped");
            return;
        };

        let write = self.stores.remote.write(K::REMOTE, &identity.key, document);
        let key = identity.key.clone();
        let handle = runtime.spawn(async move {
            if let Err(e) = write.await {
                error!(collection = K::LABEL, %key, error = %e, "Failed to save to remote store");
            }
        });

        let mut pending = lock(&self.pending_writes);
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }

    /// Bring `state` in line with the provider's current identity.
    fn catch_up(&self, state: &mut State<K::Item>) {
        let Some(current) = state.identities.as_ref().map(|rx| rx.borrow().clone()) else {
            return;
        };
        let same_key = state.identity.as_ref().map(|i| &i.key) == current.as_ref().map(|i| &i.key);
        if same_key {
            // Profile edits keep the same source.
            state.identity = current;
        } else {
            self.switch_identity(state, current);
        }
    }

    /// Re-source the collection for `identity`.
    ///
    /// Anonymous: hydrate once from the local store. Signed in: subscribe to
    /// the remote document, apply anything already queued and leave the
    /// subscription in `state.handoff` for the sync task.
    fn switch_identity(&self, state: &mut State<K::Item>, identity: Option<Identity>) {
        state.identity.clone_from(&identity);
        state.handoff = None;
        match identity {
            Some(identity) => {
                info!(collection = K::LABEL, key = %identity.key, "Following remote document");
                let mut stream = self.stores.remote.subscribe(K::REMOTE, &identity.key);
                while let Some(snapshot) = stream.try_next() {
                    self.apply_snapshot(state, snapshot);
                }
                state.handoff = Some(Subscription {
                    key: identity.key,
                    stream,
                });
            }
            None => {
                info!(collection = K::LABEL, "Following local store");
                self.load_local(state);
            }
        }
    }

    fn load_local(&self, state: &mut State<K::Item>) {
        let raw = match self.stores.local.get(&self.local_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return,
            Err(e) => {
                error!(collection = K::LABEL, key = %self.local_key, error = %e, "Failed to read local store");
                return;
            }
        };
        match serde_json::from_str::<Vec<K::Item>>(&raw) {
            Ok(items) => self.replace(state, items),
            Err(e) => {
                error!(collection = K::LABEL, key = %self.local_key, error = %e, "Failed to parse local store entry");
            }
        }
    }

    fn apply_snapshot(&self, state: &mut State<K::Item>, snapshot: Option<Document>) {
        let Some(document) = snapshot else {
            debug!(collection = K::LABEL, "Remote document missing; keeping current items");
            return;
        };
        match document.decode_items::<K::Item>() {
            Ok(items) => self.replace(state, items),
            Err(e) => {
                warn!(collection = K::LABEL, error = %e, "Ignoring undecodable remote document");
            }
        }
    }

    /// Apply a snapshot delivered for `key`, unless the collection has
    /// already moved on to another identity.
    fn apply_remote(&self, key: &IdentityKey, snapshot: Option<Document>) {
        let mut state = lock(&self.state);
        self.catch_up(&mut state);
        if state.identity.as_ref().map(|i| &i.key) != Some(key) {
            debug!(collection = K::LABEL, %key, "Dropping snapshot for a previous identity");
            return;
        }
        self.apply_snapshot(&mut state, snapshot);
    }

    /// Subscription the sync task should listen on after an identity change.
    fn resubscribe(&self, current: Option<Subscription>) -> Option<Subscription> {
        let mut state = lock(&self.state);
        self.catch_up(&mut state);
        if let Some(fresh) = state.handoff.take() {
            return Some(fresh);
        }
        let following = state.identity.as_ref().map(|i| i.key.clone());
        match (following, current) {
            (Some(key), Some(subscription)) if subscription.key == key => Some(subscription),
            (Some(_), _) => {
                let identity = state.identity.clone();
                self.switch_identity(&mut state, identity);
                state.handoff.take()
            }
            (None, _) => None,
        }
    }

    async fn run(
        self: Arc<Self>,
        mut identities: watch::Receiver<Option<Identity>>,
        mut subscription: Option<Subscription>,
    ) {
        loop {
            tokio::select! {
                changed = identities.changed() => {
                    if changed.is_err() {
                        debug!(collection = K::LABEL, "Identity provider dropped; stopping sync");
                        return;
                    }
                    identities.mark_unchanged();
                    subscription = self.resubscribe(subscription.take());
                }
                snapshot = next_snapshot(&mut subscription) => {
                    let key = subscription.as_ref().map(|current| current.key.clone());
                    match (snapshot, key) {
                        (Some(snapshot), Some(key)) => self.apply_remote(&key, snapshot),
                        _ => {
                            warn!(collection = K::LABEL, "Remote subscription closed");
                            subscription = None;
                        }
                    }
                }
            }
        }
    }
}

/// Next snapshot from `stream`, or never when there is no subscription.
async fn next_snapshot(subscription: &mut Option<Subscription>) -> Option<Option<Document>> {
    match subscription {
        Some(subscription) => subscription.stream.next().await,
        None => future::pending().await,
    }
}

/// Keeps a collection's sync task alive. Dropping it unsubscribes.
#[derive(Debug)]
pub struct SyncHandle {
    task: Option<JoinHandle<()>>,
}

impl SyncHandle {
    /// Stop syncing and wait for the task to wind down.
    pub async fn shutdown(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}
