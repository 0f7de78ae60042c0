//! Note collaborator: metadata model and store trait.

mod model;
mod store;

pub use model::{EditPayload, Note};
pub use store::NoteStore;
