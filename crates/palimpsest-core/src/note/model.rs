//! Note metadata as seen by the history engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content::NoteContent;

/// The slice of a note the history engine cares about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    /// Timestamp of the last edit to the live content
    pub date_edited: DateTime<Utc>,
    /// Whether the note is protected by the vault
    pub locked: bool,
    /// Identity of the editing session that produced the last edit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl Note {
    pub fn new(id: impl Into<String>, date_edited: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            date_edited,
            locked: false,
            session_id: None,
        }
    }
}

/// A single save of a note's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditPayload {
    pub content: NoteContent,
    /// When the edit happened
    pub edit_timestamp: DateTime<Utc>,
    /// Grouping key of the editing session, if the editor supplied one
    pub session_identity: Option<String>,
}

impl EditPayload {
    pub fn new(
        content: NoteContent,
        edit_timestamp: DateTime<Utc>,
        session_identity: impl Into<String>,
    ) -> Self {
        Self {
            content,
            edit_timestamp,
            session_identity: Some(session_identity.into()),
        }
    }
}
