//! Durable storage for interest records.
//!
//! The engine only needs three document operations per user, expressed by
//! the `InterestStore` trait. Two implementations ship with the crate:
//! - `InMemoryInterestStore`: process-local documents, used by tests and demos
//! - `JsonFileStore`: one JSON document per user under a directory

use crate::error::{StoreError, StoreResult};
use crate::types::{UserId, UserInterests};
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::sync::RwLock;
use tracing::debug;

/// Per-user document store for `UserInterests`.
///
/// `Send + Sync` so a single store handle can be shared by every request.
#[async_trait]
pub trait InterestStore: Send + Sync {
    /// Load a user's record, `Ok(None)` if the user has none yet.
    async fn get(&self, user_id: &str) -> StoreResult<Option<UserInterests>>;

    /// Create or replace a user's record.
    async fn put(&self, user_id: &str, interests: &UserInterests) -> StoreResult<()>;

    /// Remove a user's record. Deleting a missing record is not an error.
    async fn delete(&self, user_id: &str) -> StoreResult<()>;
}

fn encode(user_id: &str, interests: &UserInterests) -> StoreResult<serde_json::Value> {
    interests.to_document().map_err(|source| StoreError::Document {
        user_id: user_id.to_string(),
        source,
    })
}

fn decode(user_id: &str, document: serde_json::Value) -> StoreResult<UserInterests> {
    UserInterests::from_document(document).map_err(|source| StoreError::Document {
        user_id: user_id.to_string(),
        source,
    })
}

/// Keeps serialized documents in memory.
///
/// Records round-trip through their document form, so this behaves like a
/// remote document store with respect to what survives persistence.
#[derive(Default)]
pub struct InMemoryInterestStore {
    documents: RwLock<HashMap<UserId, serde_json::Value>>,
}

impl InMemoryInterestStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl InterestStore for InMemoryInterestStore {
    async fn get(&self, user_id: &str) -> StoreResult<Option<UserInterests>> {
        let document = self.documents.read().await.get(user_id).cloned();
        document.map(|doc| decode(user_id, doc)).transpose()
    }

    async fn put(&self, user_id: &str, interests: &UserInterests) -> StoreResult<()> {
        let document = encode(user_id, interests)?;
        self.documents
            .write()
            .await
            .insert(user_id.to_string(), document);
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> StoreResult<()> {
        self.documents.write().await.remove(user_id);
        Ok(())
    }
}

/// Stores each user's record as `<dir>/<user_id>.json`.
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub async fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// User ids become file names. Every byte outside `[A-Za-z0-9_-]` is
    /// written as a fixed-width `%xx` escape, so distinct ids never share a
    /// file and ids cannot traverse out of the root.
    fn document_path(&self, user_id: &str) -> PathBuf {
        let mut name = String::with_capacity(user_id.len() + 5);
        for byte in user_id.bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
                name.push(char::from(byte));
            } else {
                name.push_str(&format!("%{byte:02x}"));
            }
        }
        name.push_str(".json");
        self.root.join(name)
    }
}

#[async_trait]
impl InterestStore for JsonFileStore {
    async fn get(&self, user_id: &str) -> StoreResult<Option<UserInterests>> {
        let path = self.document_path(user_id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let document: serde_json::Value =
            serde_json::from_slice(&bytes).map_err(|source| StoreError::Document {
                user_id: user_id.to_string(),
                source,
            })?;
        decode(user_id, document).map(Some)
    }

    async fn put(&self, user_id: &str, interests: &UserInterests) -> StoreResult<()> {
        let path = self.document_path(user_id);
        let document = encode(user_id, interests)?;
        let bytes = serde_json::to_vec_pretty(&document).map_err(|source| StoreError::Document {
            user_id: user_id.to_string(),
            source,
        })?;

        // Each write gets its own temp file in the root, then is renamed
        // over the document; readers never observe a half-written file.
        let root = self.root.clone();
        let target = path.clone();
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut tmp = NamedTempFile::new_in(&root)?;
            tmp.write_all(&bytes)?;
            tmp.persist(&target)?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("document write task failed: {e}")))??;
        debug!(user_id, path = %path.display(), "Wrote interest document");
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> StoreResult<()> {
        match tokio::fs::remove_file(self.document_path(user_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
