//! Request signer.
//!
//! Canonicalizes a request body, hashes it with Keccak-256, signs the
//! digest with the account's secp256k1 master key, and attaches the
//! compressed public key so the broker can verify without prior
//! registration.

use crate::hashing::keccak256;
use crate::keys::HdKey;
use crate::{CryptoError, Result};
use k256::ecdsa::{signature::hazmat::PrehashSigner, Signature, SigningKey};
use serde::Serialize;

/// Length in hex chars of a produced signature (64 raw bytes, no recovery id)
pub const SIGNATURE_HEX_LEN: usize = 128;

/// A signed request envelope, ready to be sent as JSON or split across
/// multipart form parts (the caller decides which; `hash` is simply
/// omitted when building a multipart form).
#[derive(Debug, Clone, Serialize)]
pub struct SignedEnvelope {
    #[serde(rename = "requestBody")]
    pub request_body: String,
    pub signature: String,
    #[serde(rename = "publicKey")]
    pub public_key: String,
    pub hash: String,
}

/// Sign an already-canonicalized JSON request body with the master key.
pub fn sign_request(master: &HdKey, request_body: &str) -> Result<SignedEnvelope> {
    let digest = keccak256(request_body.as_bytes());
    let signature = sign_digest(master, digest.as_bytes())?;

    Ok(SignedEnvelope {
        request_body: request_body.to_string(),
        signature,
        public_key: hex::encode(master.public_key_compressed()),
        hash: digest.to_hex(),
    })
}

/// Sign a pre-hashed 32-byte digest, returning a 128-hex-char `(r, s)`
/// signature string with the recovery byte stripped.
pub fn sign_digest(master: &HdKey, digest: &[u8; 32]) -> Result<String> {
    let signing_key = SigningKey::from(master.secret_key().clone());
    let (signature, _recovery_id): (Signature, _) = signing_key
        .sign_prehash_recoverable(digest)
        .map_err(|e| CryptoError::SignFailed(e.to_string()))?;

    let hex = hex::encode(signature.to_bytes());
    if hex.len() != SIGNATURE_HEX_LEN {
        return Err(CryptoError::SignFailed(format!(
            "expected a {}-hex-char signature, got {}",
            SIGNATURE_HEX_LEN,
            hex.len()
        )));
    }
    Ok(hex)
}
