//! Durable storage for check-in evidence awaiting review.

pub mod file;
pub mod format;

pub use file::{evidence_key, EvidenceStore};
pub use format::EvidenceRecord;
