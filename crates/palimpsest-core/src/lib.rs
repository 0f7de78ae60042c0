//! Domain layer of the Palimpsest note history engine.
//!
//! Holds the models and the traits every other layer plugs into. Nothing in
//! this crate performs I/O.

pub mod config;
pub mod content;
pub mod error;
pub mod note;
pub mod session;
pub mod snapshot;
pub mod vault;

// Re-export common error type
pub use error::{HistoryError, Result};
