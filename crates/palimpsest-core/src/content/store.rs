//! Content blob store trait.

use async_trait::async_trait;

use super::model::ContentPayload;
use crate::error::Result;

/// Opaque get/put of content payloads by identifier.
///
/// The session index only ever holds blob identifiers; the payload itself
/// (plaintext or envelope) lives here. Implementations report backend
/// failures as [`HistoryError::Storage`](crate::HistoryError::Storage).
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Loads a blob.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(payload))`: Blob found
    /// - `Ok(None)`: No blob with this identifier
    /// - `Err(_)`: Backend failure
    async fn get(&self, id: &str) -> Result<Option<ContentPayload>>;

    /// Writes (or overwrites) a blob. Must be all-or-nothing.
    async fn put(&self, id: &str, payload: &ContentPayload) -> Result<()>;

    /// Deletes a blob. Deleting a missing blob is not an error.
    async fn delete(&self, id: &str) -> Result<()>;
}
