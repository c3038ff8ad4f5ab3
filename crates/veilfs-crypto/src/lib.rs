//! # veilfs-crypto
//!
//! Key hierarchy, primitive crypto, and request signing for veilfs's
//! end-to-end encrypted storage core.
//!
//! - [`symmetric`]: AES-GCM-256 block sealing used for both file blocks
//!   and folder-metadata blobs (C1).
//! - [`hashing`]: Keccak-256, used for request digests and `KeyString`
//!   derivation (C1).
//! - [`keys`]: account handle parsing and BIP32-style HD key derivation,
//!   producing each folder's `MetadataKey` and `KeyString` (C2).
//! - [`signer`]: canonical-body signing with the master secp256k1 key (C3).
//!
//! All key material lives only in this crate's types, which zeroize on
//! drop. Nothing above this crate ever sees a raw private scalar; callers
//! only see hex-encoded public identifiers and signatures.

pub mod error;
pub mod hashing;
pub mod keys;
pub mod signer;
pub mod symmetric;

pub use error::{CryptoError, Result};
pub use hashing::{keccak256, Digest256};
pub use keys::{derive_folder_key, AccountHandle, FolderKey, HdKey, MasterKey};
pub use signer::{sign_digest, sign_request, SignedEnvelope};
pub use symmetric::{open, seal, BLOCK_OVERHEAD};
