//! Push provider protocol.

pub mod models;
