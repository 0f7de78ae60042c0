//! History snapshot DTOs and migrations.
//!
//! The snapshot is the exchange format for backup and cross-device merge.
//!
//! ## Version History
//! - **1.0.0**: Initial schema with embedded content payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use version_migrate::{FromDomain, IntoDomain, Versioned};

use palimpsest_core::content::ContentPayload;
use palimpsest_core::error::{HistoryError, Result};
use palimpsest_core::session::Session;
use palimpsest_core::snapshot::{HistorySnapshot, NoteHistory, SnapshotSession};

const ENTITY: &str = "history_snapshot";

/// Versions the migrator has a path from.
const KNOWN_VERSIONS: &[&str] = &["1.0.0"];

/// Snapshot session DTO V1.0.0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSessionV1_0_0 {
    pub id: String,
    pub session_identity: String,
    pub date_created: DateTime<Utc>,
    pub date_modified: DateTime<Utc>,
    pub locked: bool,
    /// Embedded blob; replaces the local content reference
    pub content: ContentPayload,
}

/// Note history DTO V1.0.0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteHistoryV1_0_0 {
    pub note_id: String,
    pub sessions: Vec<SnapshotSessionV1_0_0>,
}

/// History snapshot DTO V1.0.0
#[derive(Debug, Clone, Serialize, Deserialize, Versioned)]
#[versioned(version = "1.0.0")]
#[serde(rename_all = "camelCase")]
pub struct HistorySnapshotV1_0_0 {
    #[serde(default)]
    pub notes: Vec<NoteHistoryV1_0_0>,
}

// ============================================================================
// Domain model conversions
// ============================================================================

impl SnapshotSessionV1_0_0 {
    fn into_entry(self, note_id: &str) -> SnapshotSession {
        // The embedded payload is authoritative for the lock flag
        let locked = self.content.is_encrypted();
        SnapshotSession {
            session: Session {
                content_ref: self.id.clone(),
                id: self.id,
                note_id: note_id.to_string(),
                session_identity: self.session_identity,
                date_created: self.date_created,
                date_modified: self.date_modified,
                locked,
            },
            content: self.content,
        }
    }
}

impl From<SnapshotSession> for SnapshotSessionV1_0_0 {
    fn from(entry: SnapshotSession) -> Self {
        SnapshotSessionV1_0_0 {
            id: entry.session.id,
            session_identity: entry.session.session_identity,
            date_created: entry.session.date_created,
            date_modified: entry.session.date_modified,
            locked: entry.session.locked,
            content: entry.content,
        }
    }
}

impl IntoDomain<HistorySnapshot> for HistorySnapshotV1_0_0 {
    fn into_domain(self) -> HistorySnapshot {
        HistorySnapshot {
            notes: self
                .notes
                .into_iter()
                .map(|note| {
                    let note_id = note.note_id;
                    let sessions = note
                        .sessions
                        .into_iter()
                        .map(|session| session.into_entry(&note_id))
                        .collect();
                    NoteHistory { note_id, sessions }
                })
                .collect(),
        }
    }
}

impl FromDomain<HistorySnapshot> for HistorySnapshotV1_0_0 {
    fn from_domain(snapshot: HistorySnapshot) -> Self {
        HistorySnapshotV1_0_0 {
            notes: snapshot
                .notes
                .into_iter()
                .map(|note| NoteHistoryV1_0_0 {
                    note_id: note.note_id,
                    sessions: note.sessions.into_iter().map(Into::into).collect(),
                })
                .collect(),
        }
    }
}

// ============================================================================
// Migrator factory
// ============================================================================

/// Creates a Migrator for HistorySnapshot documents.
pub fn create_snapshot_migrator() -> version_migrate::Migrator {
    let mut migrator = version_migrate::Migrator::builder().build();
    let path = version_migrate::Migrator::define(ENTITY)
        .from::<HistorySnapshotV1_0_0>()
        .into_with_save::<HistorySnapshot>();
    migrator
        .register(path)
        .expect("Failed to register history_snapshot migration path");
    migrator
}

/// Encodes a snapshot as a versioned JSON document.
pub fn encode_snapshot(snapshot: HistorySnapshot) -> Result<String> {
    let migrator = create_snapshot_migrator();
    Ok(migrator.save_domain_flat(ENTITY, snapshot)?)
}

/// Decodes (and migrates, if older) a versioned JSON document.
///
/// The migrator decodes an unrecognised version as the latest schema, so
/// the version is checked here first.
pub fn decode_snapshot(json: &str) -> Result<HistorySnapshot> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    match value.get("version").and_then(|v| v.as_str()) {
        Some(version) if KNOWN_VERSIONS.contains(&version) => {}
        Some(version) => {
            return Err(HistoryError::migration(format!(
                "Unsupported history snapshot version: {}",
                version
            )));
        }
        None => {
            return Err(HistoryError::migration("History snapshot has no version field"));
        }
    }
    let migrator = create_snapshot_migrator();
    Ok(migrator.load_flat_from(ENTITY, value)?)
}

#[cfg(test)]
mod migrator_tests {
    use super::*;
    use palimpsest_core::content::NoteContent;

    #[test]
    fn test_snapshot_migrator_creation() {
        let _migrator = create_snapshot_migrator();
    }

    #[test]
    fn test_decode_v1_0_0_document() {
        let json = r#"{
  "version": "1.0.0",
  "notes": [
    {
      "noteId": "note-1",
      "sessions": [
        {
          "id": "2f7a1c8e-6d0b-4a55-bb1e-3e4f5a6b7c8d",
          "sessionIdentity": "editor-7",
          "dateCreated": "2025-03-01T10:00:00Z",
          "dateModified": "2025-03-01T10:04:00Z",
          "locked": false,
          "content": { "kind": "plain", "type": "tiny", "data": "<p>hello</p>" }
        }
      ]
    }
  ]
}"#;
        let snapshot = decode_snapshot(json).unwrap();

        assert_eq!(snapshot.notes.len(), 1);
        let entry = &snapshot.notes[0].sessions[0];
        assert_eq!(entry.session.note_id, "note-1");
        assert_eq!(entry.session.content_ref, entry.session.id);
        assert_eq!(entry.content.as_plain(), Some(&NoteContent::tiny("<p>hello</p>")));
    }

    #[test]
    fn test_encoded_document_carries_version() {
        let json = encode_snapshot(HistorySnapshot::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["version"], "1.0.0");
        assert!(decode_snapshot(&json).unwrap().notes.is_empty());
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(decode_snapshot("not json").unwrap_err().is_serialization());
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let err = decode_snapshot(r#"{"version":"9.9.9","notes":[]}"#).unwrap_err();
        assert!(err.is_migration());

        let err = decode_snapshot(r#"{"notes":[]}"#).unwrap_err();
        assert!(err.is_migration());
    }
}
