//! Application layer for Palimpsest.
//!
//! This crate provides the services that coordinate the session repository,
//! the note store, and vault crypto to implement note history.

pub mod bootstrap;
pub mod history_service;
pub mod logging;
pub mod note_editor;
pub mod serializer;
pub mod vault;

pub use bootstrap::HistoryRuntime;
pub use history_service::HistoryService;
pub use note_editor::NoteEditor;
pub use serializer::HistorySerializer;
pub use vault::Vault;
