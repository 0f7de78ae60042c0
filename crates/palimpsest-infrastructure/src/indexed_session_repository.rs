//! Indexed SessionRepository implementation.
//!
//! Session metadata lives in an in-memory index; payloads live in a
//! [`ContentStore`]. The index is optionally written through to a TOML file.
//!
//! Write path:
//! 1. The payload is written to the session's blob (`content_ref`, normally
//!    the session id)
//! 2. The next index state is built and persisted
//! 3. The new state is swapped in, then blobs of pruned sessions are deleted
//!
//! A failure in 1 or 2 leaves the visible index exactly as it was. A failure
//! in 2 after an update leaves the blob one write ahead of its metadata.

use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use palimpsest_core::config::HistoryConfig;
use palimpsest_core::content::{ContentPayload, ContentStore};
use palimpsest_core::error::{HistoryError, Result};
use palimpsest_core::session::{ImportOutcome, NewSession, Session, SessionRepository};

use crate::dto::SessionIndexV1_0_0;
use crate::storage::{AtomicTomlFile, is_portable_blob_id};

/// Most recently modified first; ties by creation date, then id.
type OrderKey = (Reverse<DateTime<Utc>>, Reverse<DateTime<Utc>>, Reverse<String>);

fn order_key(session: &Session) -> OrderKey {
    (
        Reverse(session.date_modified),
        Reverse(session.date_created),
        Reverse(session.id.clone()),
    )
}

#[derive(Debug, Clone, Default)]
struct SessionIndex {
    sessions: HashMap<String, Session>,
    /// (note_id, session_identity) -> session id
    by_identity: HashMap<(String, String), String>,
    /// note_id -> ordered session keys
    by_note: HashMap<String, BTreeSet<OrderKey>>,
}

impl SessionIndex {
    fn from_sessions(sessions: Vec<Session>) -> Self {
        let mut index = Self::default();
        for session in sessions {
            index.upsert(session);
        }
        index
    }

    fn lookup(&self, note_id: &str, identity: &str) -> Option<&Session> {
        self.by_identity
            .get(&(note_id.to_string(), identity.to_string()))
            .and_then(|id| self.sessions.get(id))
    }

    fn upsert(&mut self, session: Session) {
        if let Some(previous) = self.sessions.get(&session.id) {
            let key = order_key(previous);
            if let Some(keys) = self.by_note.get_mut(&previous.note_id) {
                keys.remove(&key);
            }
        }
        self.by_identity.insert(
            (session.note_id.clone(), session.session_identity.clone()),
            session.id.clone(),
        );
        self.by_note
            .entry(session.note_id.clone())
            .or_default()
            .insert(order_key(&session));
        self.sessions.insert(session.id.clone(), session);
    }

    fn remove(&mut self, session_id: &str) -> Option<Session> {
        let session = self.sessions.remove(session_id)?;
        self.by_identity
            .remove(&(session.note_id.clone(), session.session_identity.clone()));
        if let Some(keys) = self.by_note.get_mut(&session.note_id) {
            keys.remove(&order_key(&session));
            if keys.is_empty() {
                self.by_note.remove(&session.note_id);
            }
        }
        Some(session)
    }

    fn ordered(&self, note_id: &str) -> Vec<Session> {
        self.by_note
            .get(note_id)
            .map(|keys| {
                keys.iter()
                    .filter_map(|(_, _, Reverse(id))| self.sessions.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Drops everything past the `limit` newest sessions; returns what was dropped.
    fn prune(&mut self, note_id: &str, limit: usize) -> Vec<Session> {
        let stale: Vec<String> = match self.by_note.get(note_id) {
            Some(keys) => keys
                .iter()
                .skip(limit)
                .map(|(_, _, Reverse(id))| id.clone())
                .collect(),
            None => return Vec::new(),
        };
        stale.iter().filter_map(|id| self.remove(id)).collect()
    }

    fn clear_note(&mut self, note_id: &str) -> Vec<Session> {
        let ids: Vec<String> = self
            .ordered(note_id)
            .into_iter()
            .map(|session| session.id)
            .collect();
        ids.iter().filter_map(|id| self.remove(id)).collect()
    }

    fn note_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.by_note.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// All sessions, grouped by note id and in `get` order within a note.
    fn records(&self) -> SessionIndexV1_0_0 {
        let sessions: Vec<Session> = self
            .note_ids()
            .iter()
            .flat_map(|note_id| self.ordered(note_id))
            .collect();
        SessionIndexV1_0_0::from_sessions(&sessions)
    }
}

/// Maps any content store failure onto `HistoryError::Storage`.
fn as_storage(err: HistoryError) -> HistoryError {
    match err {
        HistoryError::Storage(_) => err,
        other => HistoryError::storage(other.to_string()),
    }
}

/// Session repository over an in-memory index and a content store.
pub struct IndexedSessionRepository {
    index: RwLock<SessionIndex>,
    /// Serialises mutations; readers only ever take `index`
    writer: Mutex<()>,
    store: Arc<dyn ContentStore>,
    history: HistoryConfig,
    index_path: Option<PathBuf>,
}

impl IndexedSessionRepository {
    /// Creates a repository whose index lives in memory only.
    pub fn in_memory(store: Arc<dyn ContentStore>, history: HistoryConfig) -> Self {
        Self {
            index: RwLock::new(SessionIndex::default()),
            writer: Mutex::new(()),
            store,
            history,
            index_path: None,
        }
    }

    /// Opens a repository whose index is written through to `index_path`.
    ///
    /// A missing index file starts an empty history.
    pub async fn open(
        index_path: impl AsRef<Path>,
        store: Arc<dyn ContentStore>,
        history: HistoryConfig,
    ) -> Result<Self> {
        let index_path = index_path.as_ref().to_path_buf();
        let load_path = index_path.clone();

        let loaded = tokio::task::spawn_blocking(move || {
            AtomicTomlFile::<SessionIndexV1_0_0>::new(load_path).load()
        })
        .await
        .map_err(|e| HistoryError::internal(format!("Index load task failed: {}", e)))??;

        let sessions = match loaded {
            Some(index) => index.into_sessions()?,
            None => Vec::new(),
        };
        tracing::debug!(
            "[SessionRepository] Loaded {} sessions from {:?}",
            sessions.len(),
            index_path
        );

        Ok(Self {
            index: RwLock::new(SessionIndex::from_sessions(sessions)),
            writer: Mutex::new(()),
            store,
            history,
            index_path: Some(index_path),
        })
    }

    async fn persist(&self, records: SessionIndexV1_0_0) -> Result<()> {
        let Some(path) = self.index_path.clone() else {
            return Ok(());
        };
        tokio::task::spawn_blocking(move || AtomicTomlFile::new(path).save(&records))
            .await
            .map_err(|e| HistoryError::internal(format!("Index save task failed: {}", e)))?
            .map_err(|e| HistoryError::storage(format!("Failed to persist session index: {}", e)))
    }

    /// Applies `mutate` to the index as one unit.
    ///
    /// For a durable repository the next state is persisted before it becomes
    /// visible; on failure the visible state is unchanged. Callers must hold
    /// the writer gate.
    async fn commit<F, R>(&self, mutate: F) -> Result<R>
    where
        F: FnOnce(&mut SessionIndex) -> R,
    {
        if self.index_path.is_none() {
            let mut index = self.index.write().await;
            return Ok(mutate(&mut *index));
        }

        let mut next = self.index.read().await.clone();
        let out = mutate(&mut next);
        self.persist(next.records()).await?;
        *self.index.write().await = next;
        Ok(out)
    }

    /// Deletes blobs that are no longer referenced. Failures only leak storage.
    async fn discard_blobs(&self, refs: Vec<String>) {
        for blob_ref in refs {
            if let Err(e) = self.store.delete(&blob_ref).await {
                tracing::warn!(
                    "[SessionRepository] Failed to delete blob '{}': {}",
                    blob_ref,
                    e
                );
            }
        }
    }

    async fn write_blob(&self, session: &Session, payload: &ContentPayload) -> Result<()> {
        self.store
            .put(&session.content_ref, payload)
            .await
            .map_err(as_storage)
    }

    /// Commits `session` and, given a `limit`, prunes its note.
    ///
    /// On failure the blob of a new session is discarded.
    async fn commit_session(
        &self,
        session: Session,
        is_new: bool,
        limit: Option<usize>,
    ) -> Result<Vec<Session>> {
        let note_id = session.note_id.clone();
        let blob_ref = session.content_ref.clone();

        let result = self
            .commit(|index| {
                index.upsert(session);
                match limit {
                    Some(limit) => index.prune(&note_id, limit),
                    None => Vec::new(),
                }
            })
            .await;

        match result {
            Ok(pruned) => {
                let refs: Vec<String> = pruned.iter().map(|s| s.content_ref.clone()).collect();
                self.discard_blobs(refs).await;
                Ok(pruned)
            }
            Err(e) => {
                if is_new {
                    self.discard_blobs(vec![blob_ref]).await;
                }
                Err(e)
            }
        }
    }
}

#[async_trait]
impl SessionRepository for IndexedSessionRepository {
    async fn add(&self, draft: NewSession) -> Result<Option<Session>> {
        let Some((note_id, identity, content, timestamp)) = draft.into_parts() else {
            tracing::debug!(
                "[SessionRepository] Ignoring save with missing note, identity or content"
            );
            return Ok(None);
        };

        let _gate = self.writer.lock().await;
        let locked = content.is_encrypted();
        let existing = self.index.read().await.lookup(&note_id, &identity).cloned();

        let is_new = existing.is_none();
        let session = match existing {
            Some(mut session) => {
                session.touch(timestamp, locked);
                session
            }
            None => Session::start(note_id.clone(), identity, timestamp, locked),
        };
        self.write_blob(&session, &content).await?;

        let limit = self.history.limit_for(&note_id);
        let pruned = self
            .commit_session(session.clone(), is_new, Some(limit))
            .await?;

        tracing::debug!(
            "[SessionRepository] Recorded session {} for note {} (locked: {}, pruned: {})",
            session.id,
            note_id,
            locked,
            pruned.len()
        );

        // With a limit of at least one, the session just written is the newest
        // and always survives pruning
        Ok(Some(session))
    }

    async fn get(&self, note_id: &str) -> Result<Vec<Session>> {
        Ok(self.index.read().await.ordered(note_id))
    }

    async fn find_by_id(&self, session_id: &str) -> Result<Option<Session>> {
        Ok(self.index.read().await.sessions.get(session_id).cloned())
    }

    async fn content(&self, session_id: &str) -> Result<Option<ContentPayload>> {
        let Some(session) = self.find_by_id(session_id).await? else {
            return Ok(None);
        };

        match self.store.get(&session.content_ref).await.map_err(as_storage)? {
            Some(payload) => Ok(Some(payload)),
            None => Err(HistoryError::storage(format!(
                "Blob '{}' of session '{}' is missing",
                session.content_ref, session_id
            ))),
        }
    }

    async fn remove(&self, session_id: &str) -> Result<()> {
        let _gate = self.writer.lock().await;
        if !self.index.read().await.sessions.contains_key(session_id) {
            return Ok(());
        }

        let removed = self.commit(|index| index.remove(session_id)).await?;
        if let Some(session) = removed {
            tracing::debug!(
                "[SessionRepository] Removed session {} of note {}",
                session.id,
                session.note_id
            );
            self.discard_blobs(vec![session.content_ref]).await;
        }
        Ok(())
    }

    async fn clear_sessions(&self, note_id: &str) -> Result<()> {
        let _gate = self.writer.lock().await;
        if !self.index.read().await.by_note.contains_key(note_id) {
            return Ok(());
        }

        let removed = self.commit(|index| index.clear_note(note_id)).await?;
        tracing::debug!(
            "[SessionRepository] Cleared {} sessions of note {}",
            removed.len(),
            note_id
        );
        let refs: Vec<String> = removed.into_iter().map(|s| s.content_ref).collect();
        self.discard_blobs(refs).await;
        Ok(())
    }

    async fn cleanup(&self, note_id: &str, limit: usize) -> Result<usize> {
        let _gate = self.writer.lock().await;
        let over_limit = self
            .index
            .read()
            .await
            .by_note
            .get(note_id)
            .is_some_and(|keys| keys.len() > limit);
        if !over_limit {
            return Ok(0);
        }

        let pruned = self.commit(|index| index.prune(note_id, limit)).await?;
        let count = pruned.len();
        tracing::debug!(
            "[SessionRepository] Pruned {} sessions of note {} (limit {})",
            count,
            note_id,
            limit
        );
        let refs: Vec<String> = pruned.into_iter().map(|s| s.content_ref).collect();
        self.discard_blobs(refs).await;
        Ok(count)
    }

    async fn note_ids(&self) -> Result<Vec<String>> {
        Ok(self.index.read().await.note_ids())
    }

    async fn import(&self, incoming: Session, payload: ContentPayload) -> Result<ImportOutcome> {
        if incoming.note_id.is_empty() || incoming.session_identity.is_empty() {
            return Err(HistoryError::invalid_input(
                "Imported session lacks a note id or session identity",
            ));
        }

        let _gate = self.writer.lock().await;
        let (existing, id_taken) = {
            let index = self.index.read().await;
            (
                index
                    .lookup(&incoming.note_id, &incoming.session_identity)
                    .cloned(),
                index.sessions.contains_key(&incoming.id),
            )
        };
        let locked = payload.is_encrypted();

        match existing {
            None => {
                let mut session = incoming;
                if id_taken {
                    session.id = Uuid::new_v4().to_string();
                }
                // Foreign ids are opaque; the blob gets its own key when the id
                // is not one every store accepts
                session.content_ref = if is_portable_blob_id(&session.id) {
                    session.id.clone()
                } else {
                    Uuid::new_v4().to_string()
                };
                session.locked = locked;
                self.write_blob(&session, &payload).await?;
                self.commit_session(session, true, None).await?;
                Ok(ImportOutcome::Inserted)
            }
            Some(mut local) if incoming.date_modified > local.date_modified => {
                local.date_modified = incoming.date_modified;
                local.locked = locked;
                self.write_blob(&local, &payload).await?;
                self.commit_session(local, false, None).await?;
                Ok(ImportOutcome::Updated)
            }
            Some(_) => Ok(ImportOutcome::Skipped),
        }
    }

    async fn flush(&self) -> Result<()> {
        let _gate = self.writer.lock().await;
        let records = self.index.read().await.records();
        self.persist(records).await
    }
}
