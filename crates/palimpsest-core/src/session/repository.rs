//! Session repository trait.
//!
//! Defines the interface for session persistence and retention.

use async_trait::async_trait;

use super::model::{ImportOutcome, NewSession, Session};
use crate::content::ContentPayload;
use crate::error::Result;

/// An abstract repository owning the note → sessions mapping.
///
/// # Implementation Notes
///
/// Implementations must:
/// - Upsert on `(note_id, session_identity)`
/// - Write the content blob before committing session metadata
/// - Run retention pruning in the same critical section as the write that
///   triggered it, so no reader observes a half-pruned list
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Records a save.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Session))`: Session created or updated
    /// - `Ok(None)`: The draft lacked a required field; nothing was written
    /// - `Err(_)`: The blob store failed; the index is unchanged
    async fn add(&self, draft: NewSession) -> Result<Option<Session>>;

    /// Lists a note's sessions, most recently modified first.
    ///
    /// Unknown notes yield an empty list.
    async fn get(&self, note_id: &str) -> Result<Vec<Session>>;

    /// Finds a session by its ID.
    async fn find_by_id(&self, session_id: &str) -> Result<Option<Session>>;

    /// Loads the payload of a session.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(payload))`: Content found
    /// - `Ok(None)`: Unknown session
    /// - `Err(_)`: Blob store failure, or the session's blob is missing
    async fn content(&self, session_id: &str) -> Result<Option<ContentPayload>>;

    /// Deletes one session. Unknown ids are a no-op.
    async fn remove(&self, session_id: &str) -> Result<()>;

    /// Deletes every session of a note.
    async fn clear_sessions(&self, note_id: &str) -> Result<()>;

    /// Keeps the `limit` most recent sessions of a note and deletes the rest.
    ///
    /// Returns the number of pruned sessions.
    async fn cleanup(&self, note_id: &str, limit: usize) -> Result<usize>;

    /// Lists every note that has history, sorted ascending.
    async fn note_ids(&self) -> Result<Vec<String>>;

    /// Merges a session coming from another replica.
    ///
    /// Does not prune; callers run [`cleanup`](Self::cleanup) once per note
    /// after a batch import.
    async fn import(&self, session: Session, payload: ContentPayload) -> Result<ImportOutcome>;

    /// Persists the index if the repository is durable.
    async fn flush(&self) -> Result<()>;
}
