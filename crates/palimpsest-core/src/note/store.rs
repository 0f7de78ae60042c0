//! Note store trait.
//!
//! The host application owns notes; the history engine only reads metadata,
//! reads and replaces the live content, and flips the lock flag.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::Note;
use crate::content::ContentPayload;
use crate::error::Result;

#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Fetches note metadata. `Ok(None)` for an unknown note.
    async fn note(&self, note_id: &str) -> Result<Option<Note>>;

    /// Fetches the live content. `Ok(None)` for an unknown note.
    async fn content(&self, note_id: &str) -> Result<Option<ContentPayload>>;

    /// Replaces the live content and stamps `date_edited`.
    ///
    /// Fails with `NotFound` for an unknown note.
    async fn replace_content(
        &self,
        note_id: &str,
        payload: ContentPayload,
        date_edited: DateTime<Utc>,
    ) -> Result<()>;

    /// Sets the vault protection flag. Fails with `NotFound` for an unknown note.
    async fn set_locked(&self, note_id: &str, locked: bool) -> Result<()>;

    /// Records the editing session that produced the latest edit.
    async fn set_session_id(&self, note_id: &str, session_id: Option<String>) -> Result<()>;

    /// Deletes a note. Unknown ids are a no-op.
    async fn delete(&self, note_id: &str) -> Result<()>;
}
