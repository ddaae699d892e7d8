//! Ed25519 verification of student-signed check-in payloads.

use crate::RollcallError;
use base64::{engine::general_purpose::STANDARD, Engine};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::RwLock;

/// Cache for decoded verifying keys, keyed by the registered encoding.
static KEY_CACHE: OnceCell<RwLock<HashMap<String, VerifyingKey>>> = OnceCell::new();

/// Decode a registered Ed25519 public key.
///
/// Accepts 64 hex characters or standard base64 of the 32 raw key bytes.
/// The key is cached after first decode.
pub fn decode_public_key(encoded: &str) -> Result<VerifyingKey, RollcallError> {
    let encoded = encoded.trim();
    let cache = KEY_CACHE.get_or_init(|| RwLock::new(HashMap::new()));
    if let Ok(guard) = cache.read() {
        if let Some(key) = guard.get(encoded) {
            return Ok(*key);
        }
    }

    let bytes = if encoded.len() == 64 && encoded.bytes().all(|b| b.is_ascii_hexdigit()) {
        hex::decode(encoded)
            .map_err(|e| RollcallError::VerificationFailed(format!("invalid public key hex: {}", e)))?
    } else {
        STANDARD.decode(encoded).map_err(|e| {
            RollcallError::VerificationFailed(format!("invalid public key encoding: {}", e))
        })?
    };

    let key_array: [u8; 32] = bytes.try_into().map_err(|_| {
        RollcallError::VerificationFailed("public key must be 32 bytes".to_string())
    })?;

    let verifying_key = VerifyingKey::from_bytes(&key_array).map_err(|e| {
        RollcallError::VerificationFailed(format!("invalid Ed25519 public key: {}", e))
    })?;

    // Best-effort insert. If locking fails, still return the decoded key.
    if let Ok(mut guard) = cache.write() {
        guard.insert(encoded.to_string(), verifying_key);
    }

    Ok(verifying_key)
}

/// Verify a base64 Ed25519 signature over `payload`.
pub fn verify_ed25519(
    signature_b64: &str,
    payload: &[u8],
    verifying_key: &VerifyingKey,
) -> Result<(), RollcallError> {
    let sig_bytes = STANDARD.decode(signature_b64.trim()).map_err(|e| {
        RollcallError::VerificationFailed(format!("invalid signature base64: {}", e))
    })?;

    let sig_array: [u8; 64] = sig_bytes
        .try_into()
        .map_err(|_| RollcallError::VerificationFailed("signature must be 64 bytes".to_string()))?;

    let signature = Signature::from_bytes(&sig_array);

    verifying_key
        .verify(payload, &signature)
        .map_err(|_| RollcallError::VerificationFailed("signature does not match".to_string()))
}
