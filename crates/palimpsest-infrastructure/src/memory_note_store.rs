//! In-memory NoteStore implementation.
//!
//! Stands in for the host's note database in tests and embedded hosts.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use palimpsest_core::content::ContentPayload;
use palimpsest_core::error::{HistoryError, Result};
use palimpsest_core::note::{Note, NoteStore};

struct StoredNote {
    note: Note,
    content: ContentPayload,
}

#[derive(Default)]
pub struct InMemoryNoteStore {
    notes: RwLock<HashMap<String, StoredNote>>,
}

impl InMemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a note together with its live content.
    pub async fn insert(&self, note: Note, content: impl Into<ContentPayload>) {
        let mut notes = self.notes.write().await;
        notes.insert(
            note.id.clone(),
            StoredNote {
                note,
                content: content.into(),
            },
        );
    }
}

#[async_trait]
impl NoteStore for InMemoryNoteStore {
    async fn note(&self, note_id: &str) -> Result<Option<Note>> {
        Ok(self
            .notes
            .read()
            .await
            .get(note_id)
            .map(|stored| stored.note.clone()))
    }

    async fn content(&self, note_id: &str) -> Result<Option<ContentPayload>> {
        Ok(self
            .notes
            .read()
            .await
            .get(note_id)
            .map(|stored| stored.content.clone()))
    }

    async fn replace_content(
        &self,
        note_id: &str,
        payload: ContentPayload,
        date_edited: DateTime<Utc>,
    ) -> Result<()> {
        let mut notes = self.notes.write().await;
        let stored = notes
            .get_mut(note_id)
            .ok_or_else(|| HistoryError::not_found("note", note_id))?;
        stored.content = payload;
        stored.note.date_edited = date_edited;
        Ok(())
    }

    async fn set_locked(&self, note_id: &str, locked: bool) -> Result<()> {
        let mut notes = self.notes.write().await;
        let stored = notes
            .get_mut(note_id)
            .ok_or_else(|| HistoryError::not_found("note", note_id))?;
        stored.note.locked = locked;
        Ok(())
    }

    async fn set_session_id(&self, note_id: &str, session_id: Option<String>) -> Result<()> {
        let mut notes = self.notes.write().await;
        let stored = notes
            .get_mut(note_id)
            .ok_or_else(|| HistoryError::not_found("note", note_id))?;
        stored.note.session_id = session_id;
        Ok(())
    }

    async fn delete(&self, note_id: &str) -> Result<()> {
        self.notes.write().await.remove(note_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palimpsest_core::content::NoteContent;

    #[tokio::test]
    async fn test_replace_content_updates_date_edited() {
        let store = InMemoryNoteStore::new();
        let created = Utc::now();
        store
            .insert(Note::new("n1", created), NoteContent::tiny("v1"))
            .await;

        let later = created + chrono::Duration::seconds(5);
        store
            .replace_content("n1", NoteContent::tiny("v2").into(), later)
            .await
            .unwrap();

        let note = store.note("n1").await.unwrap().unwrap();
        assert_eq!(note.date_edited, later);
        assert_eq!(
            store.content("n1").await.unwrap(),
            Some(NoteContent::tiny("v2").into())
        );
    }

    #[tokio::test]
    async fn test_unknown_note() {
        let store = InMemoryNoteStore::new();

        assert!(store.note("missing").await.unwrap().is_none());
        let err = store.set_locked("missing", true).await.unwrap_err();
        assert!(err.is_not_found());
        store.delete("missing").await.unwrap();
    }
}
