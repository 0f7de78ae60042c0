//! Storage layer for atomic file operations and content blobs.

mod atomic_toml;
mod content_store;

pub use atomic_toml::{AtomicTomlError, AtomicTomlFile};
pub use content_store::{DirContentStore, InMemoryContentStore, is_portable_blob_id};
