//! Composition root for a file-backed history engine.

use std::path::PathBuf;
use std::sync::Arc;

use palimpsest_core::config::PalimpsestConfig;
use palimpsest_core::content::ContentStore;
use palimpsest_core::error::{HistoryError, Result};
use palimpsest_core::note::NoteStore;
use palimpsest_core::session::SessionRepository;
use palimpsest_core::vault::{Decryptor, Encryptor};
use palimpsest_infrastructure::{
    AesGcmVaultCrypto, ConfigService, DirContentStore, IndexedSessionRepository, PalimpsestPaths,
};

use crate::history_service::HistoryService;
use crate::note_editor::NoteEditor;
use crate::serializer::HistorySerializer;
use crate::vault::Vault;

/// Every service of a running engine, wired to one data directory.
///
/// The host supplies its note database; everything else is built here.
pub struct HistoryRuntime {
    pub paths: PalimpsestPaths,
    pub repository: Arc<IndexedSessionRepository>,
    pub history: Arc<HistoryService>,
    pub serializer: Arc<HistorySerializer>,
    pub vault: Arc<Vault>,
    pub editor: Arc<NoteEditor>,
}

impl HistoryRuntime {
    /// Starts from a config file, or `~/.config/palimpsest/palimpsest.toml`
    /// when `config_file` is `None`. A missing file means defaults.
    pub async fn from_config_file(
        config_file: Option<PathBuf>,
        notes: Arc<dyn NoteStore>,
    ) -> Result<Self> {
        let service = match config_file {
            Some(path) => ConfigService::new(path),
            None => ConfigService::default_location()?,
        };
        tracing::info!("[Bootstrap] Loading config from {:?}", service.path());
        let config = service.load()?;
        Self::start(config, notes).await
    }

    /// Validates `config`, opens the stores under the data directory, and
    /// wires the services.
    pub async fn start(config: PalimpsestConfig, notes: Arc<dyn NoteStore>) -> Result<Self> {
        config.validate()?;

        let paths = PalimpsestPaths::resolve(config.storage.data_dir.as_deref())
            .map_err(|e| HistoryError::config(format!("Failed to resolve data directory: {}", e)))?;
        tracing::info!("[Bootstrap] Data directory: {:?}", paths.data_dir());

        let store: Arc<dyn ContentStore> = Arc::new(DirContentStore::new(paths.blob_dir()).await?);
        let repository = Arc::new(
            IndexedSessionRepository::open(paths.session_index(), store, config.history.clone())
                .await?,
        );
        let sessions: Arc<dyn SessionRepository> = repository.clone();
        tracing::info!(
            "[Bootstrap] Session repository ready (retention limit: {})",
            config.history.retention_limit
        );

        let crypto = Arc::new(AesGcmVaultCrypto::new(&config.vault));
        let encryptor: Arc<dyn Encryptor> = crypto.clone();
        let decryptor: Arc<dyn Decryptor> = crypto;

        let history = Arc::new(HistoryService::new(
            sessions.clone(),
            notes.clone(),
            encryptor.clone(),
            decryptor.clone(),
        ));
        let serializer = Arc::new(HistorySerializer::new(
            sessions,
            notes.clone(),
            config.history.clone(),
        ));
        let vault = Arc::new(
            Vault::open(
                paths.vault_key(),
                history.clone(),
                notes.clone(),
                encryptor,
                decryptor,
            )
            .await?,
        );
        let editor = Arc::new(NoteEditor::new(notes, history.clone()));

        tracing::info!("[Bootstrap] History runtime started");
        Ok(Self {
            paths,
            repository,
            history,
            serializer,
            vault,
            editor,
        })
    }

    /// Flushes the session index.
    pub async fn shutdown(&self) -> Result<()> {
        self.repository.flush().await?;
        tracing::info!("[Bootstrap] History runtime stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use palimpsest_core::config::HistoryConfig;
    use palimpsest_core::content::NoteContent;
    use palimpsest_core::note::{EditPayload, Note};
    use palimpsest_infrastructure::InMemoryNoteStore;
    use tempfile::TempDir;

    fn config(temp_dir: &TempDir) -> PalimpsestConfig {
        let mut config = PalimpsestConfig::default();
        config.storage.data_dir = Some(temp_dir.path().to_path_buf());
        config
    }

    #[tokio::test]
    async fn test_start_save_restart() {
        let temp_dir = TempDir::new().unwrap();
        let notes = Arc::new(InMemoryNoteStore::new());
        notes
            .insert(Note::new("n1", Utc::now()), NoteContent::tiny(""))
            .await;

        let runtime = HistoryRuntime::start(config(&temp_dir), notes.clone())
            .await
            .unwrap();
        let session = runtime
            .editor
            .save("n1", EditPayload::new(NoteContent::tiny("<p>v1</p>"), Utc::now(), "s1"))
            .await
            .unwrap()
            .unwrap();
        runtime.shutdown().await.unwrap();
        drop(runtime);

        let runtime = HistoryRuntime::start(config(&temp_dir), notes).await.unwrap();
        assert_eq!(runtime.history.get("n1").await.unwrap(), vec![session.clone()]);
        assert_eq!(
            runtime.history.content(&session.id).await.unwrap(),
            NoteContent::tiny("<p>v1</p>").into()
        );
        assert!(runtime.paths.session_index().exists());
    }

    #[tokio::test]
    async fn test_from_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("palimpsest.toml");
        std::fs::write(
            &config_file,
            format!(
                "[history]\nretention_limit = 1\n\n[storage]\ndata_dir = {:?}\n",
                temp_dir.path().join("data")
            ),
        )
        .unwrap();

        let notes = Arc::new(InMemoryNoteStore::new());
        notes
            .insert(Note::new("n1", Utc::now()), NoteContent::tiny(""))
            .await;
        let runtime = HistoryRuntime::from_config_file(Some(config_file), notes)
            .await
            .unwrap();

        let now = Utc::now();
        for (offset, identity) in [(0, "a"), (1, "b")] {
            runtime
                .editor
                .save(
                    "n1",
                    EditPayload::new(
                        NoteContent::tiny(identity),
                        now + chrono::Duration::seconds(offset),
                        identity,
                    ),
                )
                .await
                .unwrap();
        }

        let sessions = runtime.history.get("n1").await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].session_identity, "b");
        assert!(temp_dir.path().join("data").join("sessions.toml").exists());
    }

    #[tokio::test]
    async fn test_zero_retention_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = config(&temp_dir);
        config.history = HistoryConfig::with_limit(0);

        let notes = Arc::new(InMemoryNoteStore::new());
        let Err(err) = HistoryRuntime::start(config, notes).await else {
            panic!("runtime started with a zero retention limit");
        };
        assert!(err.is_config());
    }
}
