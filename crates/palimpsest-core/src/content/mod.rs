//! Content domain module.
//!
//! - `model`: content payloads (`NoteContent`, `EncryptedEnvelope`, `ContentPayload`)
//! - `store`: blob store trait (`ContentStore`)

mod model;
mod store;

pub use model::{ContentPayload, ContentType, EncryptedEnvelope, KdfParams, NoteContent};
pub use store::ContentStore;
