pub mod config_service;
pub mod dto;
pub mod indexed_session_repository;
pub mod memory_note_store;
pub mod paths;
pub mod storage;
pub mod vault_crypto;

pub use crate::config_service::ConfigService;
pub use crate::indexed_session_repository::IndexedSessionRepository;
pub use crate::memory_note_store::InMemoryNoteStore;
pub use crate::paths::PalimpsestPaths;
pub use crate::storage::{DirContentStore, InMemoryContentStore};
pub use crate::vault_crypto::AesGcmVaultCrypto;
