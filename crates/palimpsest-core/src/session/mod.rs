//! Session domain module.
//!
//! This module contains the history session model and the repository
//! interface that stores it.
//!
//! # Module Structure
//!
//! - `model`: `Session`, the `NewSession` draft, `ImportOutcome`
//! - `repository`: Repository trait for session persistence

mod model;
mod repository;

pub use model::{ImportOutcome, NewSession, Session};
pub use repository::SessionRepository;
