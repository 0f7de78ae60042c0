//! Portable history snapshot.
//!
//! A snapshot embeds every session's payload so it can be merged on a replica
//! that has no access to this device's blob store.

use serde::{Deserialize, Serialize};

use crate::content::ContentPayload;
use crate::session::Session;

/// Entire history, grouped by note.
///
/// Notes are ordered by id; sessions keep the order `get` returns.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySnapshot {
    pub notes: Vec<NoteHistory>,
}

/// One note's sessions inside a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteHistory {
    pub note_id: String,
    pub sessions: Vec<SnapshotSession>,
}

/// A session together with its embedded content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSession {
    pub session: Session,
    pub content: ContentPayload,
}

impl HistorySnapshot {
    pub fn session_count(&self) -> usize {
        self.notes.iter().map(|note| note.sessions.len()).sum()
    }
}

/// Summary of a snapshot merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
    /// Sessions removed by retention pruning after the merge
    pub pruned: usize,
}
