//! Cryptographic primitives for identity evidence.

pub mod digest;
pub mod verify;
