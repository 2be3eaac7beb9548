//! Stores persisted under a data directory.
//!
//! # Layout
//!
//! ```text
//! <data_dir>/local/<key>.json                  FileLocalStore
//! <data_dir>/remote/<collection>/<key>.json    FileDocumentStore
//! ```
//!
//! Writes go to a temporary sibling first and are renamed into place so a
//! crash never leaves a half-written document behind. Subscriptions only see
//! writes made through the same `FileDocumentStore` value (or its clones);
//! there is no filesystem watching.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::BoxFuture;
use tracing::{debug, error, instrument};

use figurine_core::IdentityKey;

use super::{CollectionName, Document, DocumentStream, LocalStore, RemoteDocumentStore, Subscribers};
use crate::error::{Result, StoreError};

/// Local key/value store with one file per key.
#[derive(Debug, Clone)]
pub struct FileLocalStore {
    dir: PathBuf,
}

impl FileLocalStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl LocalStore for FileLocalStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match std::fs::read_to_string(self.path(key)?) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path(key)?;
        std::fs::create_dir_all(&self.dir)?;
        let tmp = temp_path(&path);
        let written = std::fs::write(&tmp, value).and_then(|()| std::fs::rename(&tmp, &path));
        if let Err(e) = written {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match std::fs::remove_file(self.path(key)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Remote document store persisted as JSON files.
#[derive(Debug, Clone)]
pub struct FileDocumentStore {
    root: PathBuf,
    subscribers: Arc<Subscribers>,
}

impl FileDocumentStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            subscribers: Arc::default(),
        }
    }

    fn document_path(&self, collection: CollectionName, key: &IdentityKey) -> PathBuf {
        // IdentityKey only admits [A-Za-z0-9_-], so it is always a plain file name.
        self.root
            .join(collection.as_str())
            .join(format!("{key}.json"))
    }

    /// Read `collection/key` from disk. Unreadable documents are logged and
    /// treated as missing.
    fn read_document(&self, collection: CollectionName, key: &IdentityKey) -> Option<Document> {
        let path = self.document_path(collection, key);
        let raw = match std::fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to read remote document");
                return None;
            }
        };
        match serde_json::from_slice(&raw) {
            Ok(document) => Some(document),
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to parse remote document");
                None
            }
        }
    }
}

impl RemoteDocumentStore for FileDocumentStore {
    fn write(
        &self,
        collection: CollectionName,
        key: &IdentityKey,
        document: Document,
    ) -> BoxFuture<'static, Result<()>> {
        let path = self.document_path(collection, key);
        let subscribers = Arc::clone(&self.subscribers);
        let key = key.clone();
        Box::pin(async move {
            write_atomic(&path, &serde_json::to_vec_pretty(&document)?).await?;
            debug!(%collection, %key, items = document.items.len(), "file document written");
            subscribers.notify(collection, &key, &document);
            Ok(())
        })
    }

    #[instrument(skip(self))]
    fn subscribe(&self, collection: CollectionName, key: &IdentityKey) -> DocumentStream {
        let current = self.read_document(collection, key);
        self.subscribers.register(collection, key, current)
    }
}

/// Distinguishes temporary files of overlapping writes to the same file.
static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

fn temp_path(path: &Path) -> PathBuf {
    let seq = WRITE_SEQ.fetch_add(1, Ordering::Relaxed);
    path.with_extension(format!("json.{seq}.tmp"))
}

async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = temp_path(path);
    let written = match tokio::fs::write(&tmp, contents).await {
        Ok(()) => tokio::fs::rename(&tmp, path).await,
        Err(e) => Err(e),
    };
    if let Err(e) = written {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}
