//! Save and delete flow for unlocked notes.

use std::sync::Arc;

use palimpsest_core::error::{HistoryError, Result};
use palimpsest_core::note::{EditPayload, NoteStore};
use palimpsest_core::session::Session;

use crate::history_service::HistoryService;

/// Writes live note content and keeps history in step with it.
pub struct NoteEditor {
    notes: Arc<dyn NoteStore>,
    history: Arc<HistoryService>,
}

impl NoteEditor {
    pub fn new(notes: Arc<dyn NoteStore>, history: Arc<HistoryService>) -> Self {
        Self { notes, history }
    }

    /// Saves an edit and records it in history.
    ///
    /// History is best effort: a failed recording is logged and the save
    /// still succeeds with `Ok(None)`. Locked notes go through
    /// [`Vault::save`](crate::vault::Vault::save).
    pub async fn save(&self, note_id: &str, edit: EditPayload) -> Result<Option<Session>> {
        let note = self
            .notes
            .note(note_id)
            .await?
            .ok_or_else(|| HistoryError::not_found("note", note_id))?;
        if note.locked {
            return Err(HistoryError::authentication(format!(
                "Note '{}' is locked; save it through the vault",
                note_id
            )));
        }

        self.notes
            .replace_content(note_id, edit.content.clone().into(), edit.edit_timestamp)
            .await?;
        self.notes
            .set_session_id(note_id, edit.session_identity.clone())
            .await?;

        match self.history.record_save(&note, edit, None).await {
            Ok(session) => Ok(session),
            Err(e) => {
                tracing::warn!("[Editor] Failed to record history for note {}: {}", note_id, e);
                Ok(None)
            }
        }
    }

    /// Deletes a note together with its history.
    pub async fn delete(&self, note_id: &str) -> Result<()> {
        self.notes.delete(note_id).await?;
        self.history.clear_sessions(note_id).await?;
        tracing::debug!("[Editor] Deleted note {}", note_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use palimpsest_core::config::HistoryConfig;
    use palimpsest_core::content::{ContentPayload, ContentStore, NoteContent};
    use palimpsest_core::note::Note;
    use palimpsest_infrastructure::{
        AesGcmVaultCrypto, IndexedSessionRepository, InMemoryContentStore, InMemoryNoteStore,
    };

    // Blob store that is always down
    struct BrokenContentStore;

    #[async_trait]
    impl ContentStore for BrokenContentStore {
        async fn get(&self, _id: &str) -> Result<Option<ContentPayload>> {
            Err(HistoryError::storage("offline"))
        }

        async fn put(&self, _id: &str, _payload: &ContentPayload) -> Result<()> {
            Err(HistoryError::storage("offline"))
        }

        async fn delete(&self, _id: &str) -> Result<()> {
            Err(HistoryError::storage("offline"))
        }
    }

    async fn editor(
        store: Arc<dyn ContentStore>,
    ) -> (NoteEditor, Arc<HistoryService>, Arc<InMemoryNoteStore>) {
        let notes = Arc::new(InMemoryNoteStore::new());
        notes
            .insert(Note::new("n1", Utc::now()), NoteContent::tiny(""))
            .await;
        let mut locked = Note::new("vaulted", Utc::now());
        locked.locked = true;
        notes.insert(locked, NoteContent::tiny("")).await;

        let crypto = Arc::new(AesGcmVaultCrypto::default());
        let repository = Arc::new(IndexedSessionRepository::in_memory(
            store,
            HistoryConfig::default(),
        ));
        let history = Arc::new(HistoryService::new(
            repository,
            notes.clone(),
            crypto.clone(),
            crypto,
        ));
        (NoteEditor::new(notes.clone(), history.clone()), history, notes)
    }

    #[tokio::test]
    async fn test_save_writes_content_and_history() {
        let (editor, history, notes) = editor(Arc::new(InMemoryContentStore::new())).await;

        let session = editor
            .save("n1", EditPayload::new(NoteContent::tiny("<p>hi</p>"), Utc::now(), "s1"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            notes.content("n1").await.unwrap(),
            Some(NoteContent::tiny("<p>hi</p>").into())
        );
        assert_eq!(
            notes.note("n1").await.unwrap().unwrap().session_id.as_deref(),
            Some("s1")
        );
        assert_eq!(history.get("n1").await.unwrap(), vec![session]);
    }

    #[tokio::test]
    async fn test_history_failure_does_not_fail_save() {
        let (editor, _, notes) = editor(Arc::new(BrokenContentStore)).await;

        let result = editor
            .save("n1", EditPayload::new(NoteContent::tiny("kept"), Utc::now(), "s1"))
            .await
            .unwrap();

        assert!(result.is_none());
        assert_eq!(
            notes.content("n1").await.unwrap(),
            Some(NoteContent::tiny("kept").into())
        );
    }

    #[tokio::test]
    async fn test_locked_note_is_rejected() {
        let (editor, _, _) = editor(Arc::new(InMemoryContentStore::new())).await;

        let err = editor
            .save("vaulted", EditPayload::new(NoteContent::tiny("x"), Utc::now(), "s1"))
            .await
            .unwrap_err();
        assert!(err.is_authentication());

        let err = editor
            .save("missing", EditPayload::new(NoteContent::tiny("x"), Utc::now(), "s1"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_clears_history() {
        let (editor, history, notes) = editor(Arc::new(InMemoryContentStore::new())).await;
        editor
            .save("n1", EditPayload::new(NoteContent::tiny("a"), Utc::now(), "s1"))
            .await
            .unwrap();

        editor.delete("n1").await.unwrap();

        assert!(notes.note("n1").await.unwrap().is_none());
        assert!(history.get("n1").await.unwrap().is_empty());
    }
}
