//! Access and reporting policy.

pub mod access;
pub mod report;

pub use access::{require_role, Caller, Role};
pub use report::{counts_as_present, RosterSummary};
