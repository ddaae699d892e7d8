//! Class sessions: the record, its state machine, and its store.

pub mod model;
pub mod store;

pub use model::{ClassSession, NewSession, SessionPatch, SessionState};
pub use store::{MemorySessionStore, SessionStore};
