//! History backup and cross-device merge.

use std::collections::BTreeSet;
use std::sync::Arc;

use palimpsest_core::config::HistoryConfig;
use palimpsest_core::error::{HistoryError, Result};
use palimpsest_core::note::NoteStore;
use palimpsest_core::session::{ImportOutcome, SessionRepository};
use palimpsest_core::snapshot::{HistorySnapshot, MergeReport, NoteHistory, SnapshotSession};
use palimpsest_infrastructure::dto::{decode_snapshot, encode_snapshot};

/// Converts the whole history to and from a versioned JSON snapshot.
pub struct HistorySerializer {
    sessions: Arc<dyn SessionRepository>,
    /// Consulted for lock state during merge
    notes: Arc<dyn NoteStore>,
    history: HistoryConfig,
}

impl HistorySerializer {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        notes: Arc<dyn NoteStore>,
        history: HistoryConfig,
    ) -> Self {
        Self {
            sessions,
            notes,
            history,
        }
    }

    /// Reads every session with its content into a snapshot.
    ///
    /// Locked sessions are exported as envelopes; nothing is decrypted.
    pub async fn snapshot(&self) -> Result<HistorySnapshot> {
        let mut notes = Vec::new();

        for note_id in self.sessions.note_ids().await? {
            let mut entries = Vec::new();
            for session in self.sessions.get(&note_id).await? {
                // Pruned between `get` and `content` by a concurrent writer
                let Some(content) = self.sessions.content(&session.id).await? else {
                    continue;
                };
                entries.push(SnapshotSession { session, content });
            }
            if !entries.is_empty() {
                notes.push(NoteHistory {
                    note_id,
                    sessions: entries,
                });
            }
        }

        Ok(HistorySnapshot { notes })
    }

    /// Serializes the whole history as a versioned JSON document.
    pub async fn serialize(&self) -> Result<String> {
        let snapshot = self.snapshot().await?;
        let count = snapshot.session_count();
        let json = encode_snapshot(snapshot)?;
        tracing::debug!("[Serializer] Serialized {} sessions", count);
        Ok(json)
    }

    /// Merges a serialized history into the repository.
    ///
    /// The document is fully decoded before anything is written, so a
    /// malformed or unsupported document leaves the repository untouched.
    pub async fn deserialize(&self, json: &str) -> Result<MergeReport> {
        let snapshot = decode_snapshot(json)?;
        self.merge(snapshot).await
    }

    /// Merges an already decoded snapshot, then applies retention per note.
    ///
    /// Plaintext sessions of notes that are locked here are skipped.
    pub async fn merge(&self, snapshot: HistorySnapshot) -> Result<MergeReport> {
        let mut report = MergeReport::default();
        let mut touched = BTreeSet::new();

        for note in snapshot.notes {
            if note.note_id.is_empty() {
                return Err(HistoryError::invalid_input("Snapshot note without an id"));
            }
            let locked = self
                .notes
                .note(&note.note_id)
                .await?
                .is_some_and(|local| local.locked);
            for entry in note.sessions {
                if locked && !entry.content.is_encrypted() {
                    tracing::warn!(
                        "[Serializer] Skipping plaintext session {} of locked note {}",
                        entry.session.id,
                        note.note_id
                    );
                    report.skipped += 1;
                    continue;
                }
                match self.sessions.import(entry.session, entry.content).await? {
                    ImportOutcome::Inserted => report.inserted += 1,
                    ImportOutcome::Updated => report.updated += 1,
                    ImportOutcome::Skipped => report.skipped += 1,
                }
            }
            touched.insert(note.note_id);
        }

        for note_id in &touched {
            report.pruned += self
                .sessions
                .cleanup(note_id, self.history.limit_for(note_id))
                .await?;
        }

        tracing::info!(
            "[Serializer] Merged snapshot: {} inserted, {} updated, {} skipped, {} pruned",
            report.inserted,
            report.updated,
            report.skipped,
            report.pruned
        );
        Ok(report)
    }
}
