//! Error types for the veilfs-core crate

use thiserror::Error;

/// Result type alias using `CoreError`
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur in chunk math, metadata codec, or the action queue
#[derive(Error, Debug)]
pub enum CoreError {
    /// A folder/file handle string did not discriminate to 64 or 128 hex
    /// chars
    #[error("invalid handle length: expected 64 (folder) or 128 (file) hex chars, got {0}")]
    InvalidHandleLength(usize),

    /// A handle contained non-hex characters
    #[error("invalid handle: {0}")]
    InvalidHandle(String),

    /// Folder metadata failed to (de)serialize to/from its canonical JSON
    #[error("metadata codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// The base64 envelope around an encrypted metadata blob was malformed
    #[error("base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// Sealing or opening a metadata/block ciphertext failed
    #[error("crypto error: {0}")]
    Crypto(#[from] veilfs_crypto::CryptoError),

    /// A file of size 0 was submitted for upload. Callers treat this as a
    /// refusal rather than a fatal error, but the chunk math still rejects it
    #[error("cannot chunk a zero-byte file")]
    EmptyFile,
}
