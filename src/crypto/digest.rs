//! SHA-256 digests for stored evidence.

use crate::RollcallError;
use base64::{engine::general_purpose::STANDARD, Engine};
use sha2::{Digest, Sha256};

/// Compute SHA-256 digest of bytes and return base64-encoded result.
pub fn sha256_b64(body: &[u8]) -> String {
    STANDARD.encode(Sha256::digest(body))
}

/// Format a digest value as `sha-256=<base64>`.
pub fn format_digest(body: &[u8]) -> String {
    format!("sha-256={}", sha256_b64(body))
}

/// Compare computed digest to a stored `sha-256=<base64>` value.
///
/// A malformed stored value is treated as a mismatch.
pub fn verify_digest(body: &[u8], stored: &str) -> Result<(), RollcallError> {
    let stored = stored.trim();
    let Some(expected_b64) = stored
        .strip_prefix("sha-256=")
        .or_else(|| stored.strip_prefix("SHA-256="))
    else {
        return Err(RollcallError::Internal("malformed evidence digest".to_string()));
    };

    if sha256_b64(body) != expected_b64 {
        return Err(RollcallError::Internal("evidence digest mismatch".to_string()));
    }
    Ok(())
}
