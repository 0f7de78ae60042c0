//! Session domain model.
//!
//! A session is one retained snapshot of a note's content. Saves that share a
//! session identity are folded into the same session.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::content::ContentPayload;

/// One historical snapshot of a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Unique session identifier (UUID format)
    pub id: String,
    /// Owning note
    pub note_id: String,
    /// Caller-supplied grouping key
    pub session_identity: String,
    /// Set at first write, never changed afterwards
    pub date_created: DateTime<Utc>,
    /// Bumped on every write to this session
    pub date_modified: DateTime<Utc>,
    /// Identifier of the blob holding this session's content
    pub content_ref: String,
    /// Whether the blob is a vault envelope
    pub locked: bool,
}

impl Session {
    /// Starts a new session at `timestamp`.
    ///
    /// The blob reference reuses the session id, so one session owns exactly
    /// one blob for its whole lifetime.
    pub fn start(
        note_id: impl Into<String>,
        session_identity: impl Into<String>,
        timestamp: DateTime<Utc>,
        locked: bool,
    ) -> Self {
        let id = Uuid::new_v4().to_string();
        Self {
            content_ref: id.clone(),
            id,
            note_id: note_id.into(),
            session_identity: session_identity.into(),
            date_created: timestamp,
            date_modified: timestamp,
            locked,
        }
    }

    /// Records another write to this session.
    ///
    /// `date_modified` strictly increases: an edit timestamp that is not later
    /// than the current one is bumped by a millisecond.
    pub fn touch(&mut self, timestamp: DateTime<Utc>, locked: bool) {
        self.date_modified = if timestamp > self.date_modified {
            timestamp
        } else {
            self.date_modified + Duration::milliseconds(1)
        };
        self.locked = locked;
    }
}

/// Input for [`SessionRepository::add`](super::SessionRepository::add).
///
/// Every field a save event may lack is optional; a draft with a missing
/// field is dropped rather than failing the save that produced it.
#[derive(Debug, Clone, Default)]
pub struct NewSession {
    pub note_id: Option<String>,
    pub edit_timestamp: DateTime<Utc>,
    pub content: Option<ContentPayload>,
    pub session_identity: Option<String>,
}

impl NewSession {
    pub fn new(
        note_id: impl Into<String>,
        edit_timestamp: DateTime<Utc>,
        content: impl Into<ContentPayload>,
        session_identity: impl Into<String>,
    ) -> Self {
        Self {
            note_id: Some(note_id.into()),
            edit_timestamp,
            content: Some(content.into()),
            session_identity: Some(session_identity.into()),
        }
    }

    /// Splits the draft into its required parts.
    ///
    /// Returns `None` when a required field is absent or empty.
    pub fn into_parts(self) -> Option<(String, String, ContentPayload, DateTime<Utc>)> {
        let note_id = self.note_id.filter(|id| !id.is_empty())?;
        let identity = self.session_identity.filter(|id| !id.is_empty())?;
        let content = self.content?;
        Some((note_id, identity, content, self.edit_timestamp))
    }
}

/// What happened to one session during an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    /// No local session shared the identity; inserted as-is.
    Inserted,
    /// A local session was older; its content and `date_modified` were replaced.
    Updated,
    /// The local session was at least as new; nothing changed.
    Skipped,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::NoteContent;
    use chrono::TimeZone;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    #[test]
    fn test_start_sets_both_dates() {
        let session = Session::start("note", "s1", at(1_000), false);
        assert_eq!(session.date_created, at(1_000));
        assert_eq!(session.date_modified, at(1_000));
        assert_eq!(session.content_ref, session.id);
    }

    #[test]
    fn test_touch_never_moves_backwards() {
        let mut session = Session::start("note", "s1", at(5_000), false);

        session.touch(at(4_000), false);
        assert_eq!(session.date_modified, at(5_001));

        session.touch(at(9_000), true);
        assert_eq!(session.date_modified, at(9_000));
        assert_eq!(session.date_created, at(5_000));
        assert!(session.locked);
    }

    #[test]
    fn test_into_parts_rejects_missing_fields() {
        assert!(NewSession::default().into_parts().is_none());

        let mut draft = NewSession::new("note", at(0), NoteContent::tiny("x"), "s");
        draft.session_identity = Some(String::new());
        assert!(draft.into_parts().is_none());

        let draft = NewSession::new("note", at(0), NoteContent::tiny("x"), "s");
        assert!(draft.into_parts().is_some());
    }
}
