//! Error types for the veilfs-crypto crate

use thiserror::Error;

/// Result type alias using `CryptoError`
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Errors that can occur during cryptographic operations
#[derive(Error, Debug)]
pub enum CryptoError {
    /// AES-GCM authentication failed while opening a sealed block
    #[error("authentication failed while opening sealed data")]
    AuthFailed,

    /// secp256k1 signing failed
    #[error("signing failed: {0}")]
    SignFailed(String),

    /// Key material of the wrong length was supplied
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// A sealed blob was malformed before an AEAD open was even attempted
    #[error("invalid ciphertext: {0}")]
    InvalidCiphertext(String),

    /// Nonce/IV of the wrong length was supplied
    #[error("invalid nonce: {0}")]
    InvalidNonce(String),

    /// An account handle was not a well-formed 128-hex-char string
    #[error("invalid account handle: {0}")]
    InvalidHandle(String),

    /// Failed to serialize a value to the canonical wire form
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Hex decode error
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),
}
