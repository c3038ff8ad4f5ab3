//! Client error taxonomy.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors surfaced by the broker transport, chunk pipeline, and tree
/// operations. Transport errors inside the upload part loop are absorbed
/// and re-driven by the verification/retry step; everywhere else these
/// propagate to the command boundary.
#[derive(Error, Debug)]
pub enum ClientError {
    /// HTTP transport failure talking to the broker.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Any non-200 broker response not otherwise classified.
    #[error("broker error {status}: {body}")]
    BrokerError { status: u16, body: String },

    /// Account handle rejected by the broker (404 on `account-data`), or
    /// malformed before it ever reached the wire. Fatal to the session.
    #[error("invalid account handle: {0}")]
    InvalidHandle(String),

    /// Upload/download target path doesn't begin with `/`, or a local
    /// path is neither file nor directory.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// 3 retries after `chunks missing` exhausted. Metadata is NOT
    /// updated for the enclosing upload.
    #[error("upload incomplete after retries for file {0}")]
    UploadIncomplete(String),

    /// AES-GCM authentication failure on a downloaded block.
    #[error("download corrupt: {0}")]
    DownloadCorrupt(String),

    /// A move/delete/rename references a handle absent from its parent
    /// metadata.
    #[error("not found: {0}")]
    NotFound(String),

    /// Chunk-geometry or handle-parsing failure from the pure domain crate.
    #[error(transparent)]
    Core(#[from] veilfs_core::CoreError),

    /// Signing, hashing, or AEAD primitive failure.
    #[error(transparent)]
    Crypto(#[from] veilfs_crypto::CryptoError),

    /// Local filesystem failure (reading the upload source, writing the
    /// download destination, temp-directory bookkeeping).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A broker JSON body didn't match the expected shape.
    #[error("invalid broker response: {0}")]
    InvalidResponse(String),

    /// A request body or sealed metadata payload failed to (de)serialize.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    /// True for the handle-rejection cases that should end the session.
    pub fn is_invalid_handle(&self) -> bool {
        matches!(self, Self::InvalidHandle(_))
    }

    /// True for the "nothing to act on" class of error a caller may
    /// choose to treat as a no-op rather than a hard failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
