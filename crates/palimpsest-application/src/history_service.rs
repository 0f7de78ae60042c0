//! History service implementation.
//!
//! `HistoryService` is the entry point hosts use for note history. It layers
//! vault awareness over a [`SessionRepository`]: saves of locked notes are
//! encrypted before they reach the repository, and restores put a session's
//! content back into the [`NoteStore`].

use std::sync::Arc;

use chrono::Utc;

use palimpsest_core::content::{ContentPayload, EncryptedEnvelope, NoteContent};
use palimpsest_core::error::{HistoryError, Result};
use palimpsest_core::note::{EditPayload, Note, NoteStore};
use palimpsest_core::session::{NewSession, Session, SessionRepository};
use palimpsest_core::vault::{Decryptor, Encryptor, VaultSecret};

pub struct HistoryService {
    /// Owns the note → sessions mapping
    sessions: Arc<dyn SessionRepository>,
    /// Host note database, target of restores
    notes: Arc<dyn NoteStore>,
    encryptor: Arc<dyn Encryptor>,
    decryptor: Arc<dyn Decryptor>,
}

impl HistoryService {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        notes: Arc<dyn NoteStore>,
        encryptor: Arc<dyn Encryptor>,
        decryptor: Arc<dyn Decryptor>,
    ) -> Self {
        Self {
            sessions,
            notes,
            encryptor,
            decryptor,
        }
    }

    pub fn repository(&self) -> &Arc<dyn SessionRepository> {
        &self.sessions
    }

    /// Records a save of `note`.
    ///
    /// A locked note requires `secret`; its content is encrypted before the
    /// repository is touched, so the stored session is locked too.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Session))`: Session created or updated
    /// - `Ok(None)`: The edit lacked a session identity
    pub async fn record_save(
        &self,
        note: &Note,
        edit: EditPayload,
        secret: Option<&VaultSecret>,
    ) -> Result<Option<Session>> {
        let content: ContentPayload = if note.locked {
            let secret = secret.ok_or_else(|| {
                HistoryError::authentication(format!(
                    "Note '{}' is locked; a vault secret is required to record history",
                    note.id
                ))
            })?;
            self.encryptor.encrypt(&edit.content, secret).await?.into()
        } else {
            edit.content.into()
        };

        self.sessions
            .add(NewSession {
                note_id: Some(note.id.clone()),
                edit_timestamp: edit.edit_timestamp,
                content: Some(content),
                session_identity: edit.session_identity,
            })
            .await
    }

    pub async fn get(&self, note_id: &str) -> Result<Vec<Session>> {
        self.sessions.get(note_id).await
    }

    pub async fn find(&self, session_id: &str) -> Result<Option<Session>> {
        self.sessions.find_by_id(session_id).await
    }

    /// Loads a session's content. Locked sessions yield the envelope.
    pub async fn content(&self, session_id: &str) -> Result<ContentPayload> {
        self.sessions
            .content(session_id)
            .await?
            .ok_or_else(|| HistoryError::not_found("session", session_id))
    }

    pub async fn decrypt(
        &self,
        envelope: &EncryptedEnvelope,
        secret: &VaultSecret,
    ) -> Result<NoteContent> {
        self.decryptor.decrypt(envelope, secret).await
    }

    pub async fn remove(&self, session_id: &str) -> Result<()> {
        self.sessions.remove(session_id).await
    }

    pub async fn clear_sessions(&self, note_id: &str) -> Result<()> {
        self.sessions.clear_sessions(note_id).await
    }

    pub async fn cleanup(&self, note_id: &str, limit: usize) -> Result<usize> {
        self.sessions.cleanup(note_id, limit).await
    }

    /// Writes a session's content back as the note's live content.
    ///
    /// | session   | secret | note now | written                       |
    /// |-----------|--------|----------|-------------------------------|
    /// | plain     | any    | unlocked | plaintext                     |
    /// | plain     | yes    | locked   | encrypted with `secret`       |
    /// | plain     | no     | locked   | `Authentication` error        |
    /// | encrypted | yes    | unlocked | decrypted plaintext           |
    /// | encrypted | yes    | locked   | re-encrypted with `secret`    |
    /// | encrypted | no     | locked   | envelope as-is                |
    /// | encrypted | no     | unlocked | `Authentication` error        |
    ///
    /// Sessions are never modified.
    pub async fn restore(&self, session_id: &str, secret: Option<&VaultSecret>) -> Result<()> {
        let session = self
            .sessions
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| HistoryError::not_found("session", session_id))?;
        let note = self
            .notes
            .note(&session.note_id)
            .await?
            .ok_or_else(|| HistoryError::not_found("note", &session.note_id))?;
        let payload = self.content(session_id).await?;

        let restored: ContentPayload = match (payload, secret) {
            (ContentPayload::Plain(content), Some(secret)) if note.locked => {
                self.encryptor.encrypt(&content, secret).await?.into()
            }
            (ContentPayload::Plain(_), None) if note.locked => {
                return Err(HistoryError::authentication(format!(
                    "Note '{}' is locked; a vault secret is required to restore into it",
                    note.id
                )));
            }
            (ContentPayload::Plain(content), _) => content.into(),
            (ContentPayload::Encrypted(envelope), Some(secret)) => {
                let content = self.decryptor.decrypt(&envelope, secret).await?;
                if note.locked {
                    self.encryptor.encrypt(&content, secret).await?.into()
                } else {
                    content.into()
                }
            }
            (ContentPayload::Encrypted(envelope), None) if note.locked => envelope.into(),
            (ContentPayload::Encrypted(_), None) => {
                return Err(HistoryError::authentication(format!(
                    "Session '{}' is locked; a vault secret is required to restore it",
                    session_id
                )));
            }
        };

        self.notes
            .replace_content(&note.id, restored, Utc::now())
            .await?;
        tracing::debug!(
            "[History] Restored session {} into note {}",
            session_id,
            note.id
        );
        Ok(())
    }

    /// Wipes a note's history once it enters the vault.
    ///
    /// Plaintext sessions must not outlive the lock.
    pub async fn on_note_locked(&self, note_id: &str) -> Result<()> {
        self.sessions.clear_sessions(note_id).await?;
        tracing::info!("[History] Cleared history of note {} after lock", note_id);
        Ok(())
    }
}
