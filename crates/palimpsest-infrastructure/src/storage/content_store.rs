//! Content blob stores.
//!
//! - [`InMemoryContentStore`]: process-local map, for tests and ephemeral hosts
//! - [`DirContentStore`]: one JSON file per blob under a directory

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use palimpsest_core::content::{ContentPayload, ContentStore};
use palimpsest_core::error::{HistoryError, Result};
use tokio::fs;
use tokio::sync::RwLock;

/// Process-local blob store.
#[derive(Default)]
pub struct InMemoryContentStore {
    blobs: RwLock<HashMap<String, ContentPayload>>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn get(&self, id: &str) -> Result<Option<ContentPayload>> {
        Ok(self.blobs.read().await.get(id).cloned())
    }

    async fn put(&self, id: &str, payload: &ContentPayload) -> Result<()> {
        self.blobs
            .write()
            .await
            .insert(id.to_string(), payload.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.blobs.write().await.remove(id);
        Ok(())
    }
}

/// Directory-backed blob store.
///
/// Directory structure:
/// ```text
/// base_dir/
/// ├── 3f0c...-....json
/// └── 9a1e...-....json
/// ```
pub struct DirContentStore {
    base_dir: PathBuf,
}

/// Whether `id` is usable as a blob id by every content store.
///
/// Only ASCII alphanumerics, `-` and `_`; never empty.
pub fn is_portable_blob_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl DirContentStore {
    /// Creates the store, making sure `base_dir` exists.
    pub async fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir)
            .await
            .map_err(|e| HistoryError::storage(format!("Failed to create blob directory: {}", e)))?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Maps a blob id onto a file, refusing anything that could escape `base_dir`.
    fn blob_path(&self, id: &str) -> Result<PathBuf> {
        if !is_portable_blob_id(id) {
            return Err(HistoryError::invalid_input(format!("Invalid blob id '{}'", id)));
        }
        Ok(self.base_dir.join(format!("{}.json", id)))
    }
}

#[async_trait]
impl ContentStore for DirContentStore {
    async fn get(&self, id: &str) -> Result<Option<ContentPayload>> {
        let path = self.blob_path(id)?;

        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(HistoryError::storage(format!(
                    "Failed to read blob '{}': {}",
                    id, e
                )));
            }
        };

        let payload = serde_json::from_slice(&bytes)?;
        Ok(Some(payload))
    }

    async fn put(&self, id: &str, payload: &ContentPayload) -> Result<()> {
        let path = self.blob_path(id)?;
        let tmp_path = self.base_dir.join(format!(".{}.json.tmp", id));
        let json = serde_json::to_vec(payload)?;

        let write = async {
            fs::write(&tmp_path, &json).await?;
            fs::rename(&tmp_path, &path).await
        };
        if let Err(e) = write.await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(HistoryError::storage(format!(
                "Failed to write blob '{}': {}",
                id, e
            )));
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let path = self.blob_path(id)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(HistoryError::storage(format!(
                "Failed to delete blob '{}': {}",
                id, e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palimpsest_core::content::NoteContent;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_in_memory_put_get_delete() {
        let store = InMemoryContentStore::new();
        let payload = ContentPayload::from(NoteContent::tiny("<p>a</p>"));

        store.put("b1", &payload).await.unwrap();
        assert_eq!(store.get("b1").await.unwrap(), Some(payload));

        store.delete("b1").await.unwrap();
        assert!(store.get("b1").await.unwrap().is_none());
        store.delete("b1").await.unwrap();
    }

    #[tokio::test]
    async fn test_dir_store_persists_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let payload = ContentPayload::from(NoteContent::markdown("# title"));

        {
            let store = DirContentStore::new(temp_dir.path()).await.unwrap();
            store.put("blob-1", &payload).await.unwrap();
        }

        let store = DirContentStore::new(temp_dir.path()).await.unwrap();
        assert_eq!(store.get("blob-1").await.unwrap(), Some(payload));
        assert!(!temp_dir.path().join(".blob-1.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_dir_store_missing_blob() {
        let temp_dir = TempDir::new().unwrap();
        let store = DirContentStore::new(temp_dir.path()).await.unwrap();

        assert!(store.get("nope").await.unwrap().is_none());
        store.delete("nope").await.unwrap();
    }

    #[tokio::test]
    async fn test_dir_store_rejects_path_escape() {
        let temp_dir = TempDir::new().unwrap();
        let store = DirContentStore::new(temp_dir.path()).await.unwrap();
        let payload = ContentPayload::from(NoteContent::tiny("x"));

        let err = store.put("../evil", &payload).await.unwrap_err();
        assert!(err.is_invalid_input());
    }
}
