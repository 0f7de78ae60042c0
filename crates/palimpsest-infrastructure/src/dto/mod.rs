//! Data Transfer Objects (DTOs) for persistence.
//!
//! These DTOs represent the versioned schema for persisting data. They are
//! private to the infrastructure layer and handle the evolution of the
//! storage format over time.
//!
//! ## Schema Versioning (Semantic Versioning)
//!
//! - **MAJOR (X.0.0)**: Breaking changes (field removal, type changes)
//! - **MINOR (1.X.0)**: Backward-compatible additions (new optional fields)
//! - **PATCH (1.0.X)**: Backward-compatible fixes (not typically used for schema)

mod session_index;
mod snapshot;
mod vault_key;

pub use session_index::{SESSION_INDEX_VERSION, SessionIndexV1_0_0, SessionRecordV1_0_0};
pub use snapshot::{
    HistorySnapshotV1_0_0, NoteHistoryV1_0_0, SnapshotSessionV1_0_0, create_snapshot_migrator,
    decode_snapshot, encode_snapshot,
};
pub use vault_key::{VAULT_KEY_VERSION, VaultKeyV1_0_0};
