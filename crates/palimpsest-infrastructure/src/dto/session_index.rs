//! Session index DTOs.
//!
//! ## Version History
//! - **1.0.0**: Initial schema, one `[[sessions]]` table per session

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use palimpsest_core::error::{HistoryError, Result};
use palimpsest_core::session::Session;

/// Current schema version of the session index file.
pub const SESSION_INDEX_VERSION: &str = "1.0.0";

/// On-disk session index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionIndexV1_0_0 {
    /// The schema version of this data structure.
    pub schema_version: String,
    #[serde(default)]
    pub sessions: Vec<SessionRecordV1_0_0>,
}

/// One session row of the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecordV1_0_0 {
    pub id: String,
    pub note_id: String,
    pub session_identity: String,
    pub date_created: DateTime<Utc>,
    pub date_modified: DateTime<Utc>,
    pub content_ref: String,
    #[serde(default)]
    pub locked: bool,
}

impl From<&Session> for SessionRecordV1_0_0 {
    fn from(session: &Session) -> Self {
        SessionRecordV1_0_0 {
            id: session.id.clone(),
            note_id: session.note_id.clone(),
            session_identity: session.session_identity.clone(),
            date_created: session.date_created,
            date_modified: session.date_modified,
            content_ref: session.content_ref.clone(),
            locked: session.locked,
        }
    }
}

impl From<SessionRecordV1_0_0> for Session {
    fn from(dto: SessionRecordV1_0_0) -> Self {
        Session {
            id: dto.id,
            note_id: dto.note_id,
            session_identity: dto.session_identity,
            date_created: dto.date_created,
            date_modified: dto.date_modified,
            content_ref: dto.content_ref,
            locked: dto.locked,
        }
    }
}

impl SessionIndexV1_0_0 {
    pub fn from_sessions<'a>(sessions: impl IntoIterator<Item = &'a Session>) -> Self {
        Self {
            schema_version: SESSION_INDEX_VERSION.to_string(),
            sessions: sessions.into_iter().map(Into::into).collect(),
        }
    }

    /// Converts into domain sessions, refusing files written by a newer major version.
    pub fn into_sessions(self) -> Result<Vec<Session>> {
        let major = self.schema_version.split('.').next().unwrap_or_default();
        if major != "1" {
            return Err(HistoryError::migration(format!(
                "Unsupported session index version '{}'",
                self.schema_version
            )));
        }
        Ok(self.sessions.into_iter().map(Into::into).collect())
    }
}
