//! Vault: password-protected notes.
//!
//! The vault owns no key material. It keeps a verifier envelope (a known
//! plaintext sealed with the vault password) and checks every password
//! against it before touching a note.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::RwLock;

use palimpsest_core::content::{ContentPayload, EncryptedEnvelope, NoteContent};
use palimpsest_core::error::{HistoryError, Result};
use palimpsest_core::note::{EditPayload, Note, NoteStore};
use palimpsest_core::session::Session;
use palimpsest_core::vault::{Decryptor, Encryptor, VaultSecret};
use palimpsest_infrastructure::dto::VaultKeyV1_0_0;
use palimpsest_infrastructure::storage::AtomicTomlFile;

use crate::history_service::HistoryService;

const VERIFIER_TEXT: &str = "palimpsest-vault-verifier";

pub struct Vault {
    history: Arc<HistoryService>,
    notes: Arc<dyn NoteStore>,
    encryptor: Arc<dyn Encryptor>,
    decryptor: Arc<dyn Decryptor>,
    verifier: RwLock<Option<EncryptedEnvelope>>,
    /// Where the verifier is persisted; `None` keeps it in memory
    key_file: Option<PathBuf>,
}

impl Vault {
    /// Creates a vault whose verifier lives in memory only.
    pub fn new(
        history: Arc<HistoryService>,
        notes: Arc<dyn NoteStore>,
        encryptor: Arc<dyn Encryptor>,
        decryptor: Arc<dyn Decryptor>,
    ) -> Self {
        Self {
            history,
            notes,
            encryptor,
            decryptor,
            verifier: RwLock::new(None),
            key_file: None,
        }
    }

    /// Creates a vault backed by `key_file`, loading an existing verifier.
    pub async fn open(
        key_file: PathBuf,
        history: Arc<HistoryService>,
        notes: Arc<dyn NoteStore>,
        encryptor: Arc<dyn Encryptor>,
        decryptor: Arc<dyn Decryptor>,
    ) -> Result<Self> {
        let path = key_file.clone();
        let loaded = tokio::task::spawn_blocking(move || {
            AtomicTomlFile::<VaultKeyV1_0_0>::new(path).load()
        })
        .await
        .map_err(|e| HistoryError::internal(format!("Vault key load task failed: {}", e)))??;

        let verifier = loaded.map(VaultKeyV1_0_0::into_verifier).transpose()?;
        tracing::debug!(
            "[Vault] Opened key file {:?} (vault exists: {})",
            key_file,
            verifier.is_some()
        );

        Ok(Self {
            verifier: RwLock::new(verifier),
            key_file: Some(key_file),
            ..Self::new(history, notes, encryptor, decryptor)
        })
    }

    pub async fn exists(&self) -> bool {
        self.verifier.read().await.is_some()
    }

    /// Creates the vault with `password`.
    ///
    /// Fails with `Config` if a vault already exists.
    pub async fn create(&self, password: &VaultSecret) -> Result<()> {
        let mut verifier = self.verifier.write().await;
        if verifier.is_some() {
            return Err(HistoryError::config("A vault already exists"));
        }

        let envelope = self
            .encryptor
            .encrypt(&NoteContent::tiny(VERIFIER_TEXT), password)
            .await?;

        if let Some(path) = self.key_file.clone() {
            let key = VaultKeyV1_0_0::new(envelope.clone());
            tokio::task::spawn_blocking(move || AtomicTomlFile::new(path).save(&key))
                .await
                .map_err(|e| {
                    HistoryError::internal(format!("Vault key save task failed: {}", e))
                })??;
        }

        *verifier = Some(envelope);
        tracing::info!("[Vault] Created vault");
        Ok(())
    }

    /// Checks `password` against the verifier.
    pub async fn verify(&self, password: &VaultSecret) -> Result<()> {
        let envelope = self
            .verifier
            .read()
            .await
            .clone()
            .ok_or_else(|| HistoryError::config("No vault has been created"))?;

        let opened = self.decryptor.decrypt(&envelope, password).await?;
        if opened.data != VERIFIER_TEXT {
            return Err(HistoryError::authentication("Wrong vault password"));
        }
        Ok(())
    }

    /// Moves a note into the vault.
    ///
    /// The note's plaintext history is wiped first, then the live content is
    /// encrypted and the note locked. If the wipe fails the note stays
    /// unlocked. Adding a note that is already locked is a no-op.
    pub async fn add(&self, note_id: &str, password: &VaultSecret) -> Result<()> {
        self.verify(password).await?;

        let note = self.require_note(note_id).await?;
        if note.locked {
            return Ok(());
        }

        let content = self
            .notes
            .content(note_id)
            .await?
            .ok_or_else(|| HistoryError::not_found("note", note_id))?;
        let sealed: ContentPayload = match content {
            ContentPayload::Plain(content) => {
                self.encryptor.encrypt(&content, password).await?.into()
            }
            encrypted => encrypted,
        };

        self.history.on_note_locked(note_id).await?;
        self.notes
            .replace_content(note_id, sealed, note.date_edited)
            .await?;
        self.notes.set_locked(note_id, true).await?;

        tracing::info!("[Vault] Locked note {}", note_id);
        Ok(())
    }

    /// Takes a note out of the vault, writing its content back as plaintext.
    ///
    /// Locked history sessions stay encrypted.
    pub async fn remove(&self, note_id: &str, password: &VaultSecret) -> Result<()> {
        self.verify(password).await?;

        let note = self.require_note(note_id).await?;
        if !note.locked {
            return Ok(());
        }

        let content = self
            .notes
            .content(note_id)
            .await?
            .ok_or_else(|| HistoryError::not_found("note", note_id))?;
        let opened = match content {
            ContentPayload::Encrypted(envelope) => {
                self.decryptor.decrypt(&envelope, password).await?
            }
            ContentPayload::Plain(content) => content,
        };

        self.notes
            .replace_content(note_id, opened.into(), note.date_edited)
            .await?;
        self.notes.set_locked(note_id, false).await?;

        tracing::info!("[Vault] Unlocked note {}", note_id);
        Ok(())
    }

    /// Saves an edit of a locked note.
    ///
    /// The live content is written encrypted; the history session is
    /// recorded afterwards and its failure does not fail the save.
    pub async fn save(
        &self,
        note: &Note,
        edit: EditPayload,
        password: &VaultSecret,
    ) -> Result<Option<Session>> {
        if !note.locked {
            return Err(HistoryError::invalid_input(format!(
                "Note '{}' is not in the vault",
                note.id
            )));
        }
        self.verify(password).await?;

        let envelope = self.encryptor.encrypt(&edit.content, password).await?;
        self.notes
            .replace_content(&note.id, envelope.into(), edit.edit_timestamp)
            .await?;
        self.notes
            .set_session_id(&note.id, edit.session_identity.clone())
            .await?;

        match self.history.record_save(note, edit, Some(password)).await {
            Ok(session) => Ok(session),
            Err(e) => {
                tracing::warn!("[Vault] Failed to record history for note {}: {}", note.id, e);
                Ok(None)
            }
        }
    }

    /// Opens an envelope produced with the vault password.
    pub async fn decrypt_content(
        &self,
        envelope: &EncryptedEnvelope,
        password: &VaultSecret,
    ) -> Result<NoteContent> {
        self.decryptor.decrypt(envelope, password).await
    }

    async fn require_note(&self, note_id: &str) -> Result<Note> {
        self.notes
            .note(note_id)
            .await?
            .ok_or_else(|| HistoryError::not_found("note", note_id))
    }
}
