//! Keccak-256 hashing
//!
//! Standard 256-bit Keccak (not NIST SHA3), matching Ethereum conventions.
//! Used both to digest a canonical request body before secp256k1 signing
//! (C3) and to derive a folder's `KeyString` from its private-key hex (C2).

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;

/// Size of a Keccak-256 digest in bytes
pub const HASH_SIZE: usize = 32;

/// A Keccak-256 digest
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Digest256([u8; HASH_SIZE]);

impl Digest256 {
    /// Wrap raw digest bytes
    pub fn new(bytes: [u8; HASH_SIZE]) -> Self {
        Self(bytes)
    }

    /// Borrow the digest bytes
    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    /// Lowercase hex encoding of the digest
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Digest256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest256({})", self.to_hex())
    }
}

impl AsRef<[u8]> for Digest256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Hash arbitrary bytes with Keccak-256
pub fn keccak256(data: &[u8]) -> Digest256 {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let out = hasher.finalize();
    let mut bytes = [0u8; HASH_SIZE];
    bytes.copy_from_slice(&out);
    Digest256(bytes)
}

/// An incremental Keccak-256 hasher, for hashing streamed request bodies.
pub struct IncrementalHasher(Keccak256);

impl IncrementalHasher {
    pub fn new() -> Self {
        Self(Keccak256::new())
    }

    pub fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    pub fn finalize(self) -> Digest256 {
        let out = self.0.finalize();
        let mut bytes = [0u8; HASH_SIZE];
        bytes.copy_from_slice(&out);
        Digest256(bytes)
    }
}

impl Default for IncrementalHasher {
    fn default() -> Self {
        Self::new()
    }
}
