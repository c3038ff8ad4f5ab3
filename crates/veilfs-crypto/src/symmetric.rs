//! AES-GCM-256 block sealing
//!
//! Every folder-metadata blob and every file block is sealed with this
//! module. The wire layout is `len(4) || iv(12) || ciphertext || tag(16)`,
//! a fixed 32-byte overhead per block: the 4-byte big-endian plaintext
//! length is framing the broker relies on to validate a block boundary
//! before attempting to open it, the 12-byte IV is fresh per call, and the
//! 16-byte tag comes from AES-GCM itself. This must match the broker's
//! observed overhead bit-exact.

use crate::{CryptoError, Result};
use aes_gcm::{
    aead::{Aead as AeadTrait, Payload},
    Aes256Gcm, KeyInit,
};
use rand::RngCore;
use rand_core::OsRng;

/// Plaintext key size for AES-256-GCM
pub const KEY_SIZE: usize = 32;
/// IV size used for every seal
pub const IV_SIZE: usize = 12;
/// GCM authentication tag size
pub const TAG_SIZE: usize = 16;
/// Big-endian plaintext-length framing prefix
pub const LEN_PREFIX_SIZE: usize = 4;
/// Total per-block ciphertext overhead mandated by the broker
pub const BLOCK_OVERHEAD: usize = LEN_PREFIX_SIZE + IV_SIZE + TAG_SIZE;

const _: () = assert!(BLOCK_OVERHEAD == 32);

/// Seal `plaintext` under `key`, producing `len || iv || ct || tag`.
pub fn seal(plaintext: &[u8], key: &[u8; KEY_SIZE]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;

    let mut iv = [0u8; IV_SIZE];
    OsRng.fill_bytes(&mut iv);
    let nonce = aes_gcm::Nonce::from_slice(&iv);

    let ciphertext = cipher
        .encrypt(nonce, Payload { msg: plaintext, aad: &[] })
        .map_err(|_| CryptoError::AuthFailed)?;

    let mut out = Vec::with_capacity(LEN_PREFIX_SIZE + IV_SIZE + ciphertext.len());
    out.extend_from_slice(&(plaintext.len() as u32).to_be_bytes());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Open a blob produced by [`seal`], returning the original plaintext.
pub fn open(sealed: &[u8], key: &[u8; KEY_SIZE]) -> Result<Vec<u8>> {
    if sealed.len() < BLOCK_OVERHEAD {
        return Err(CryptoError::InvalidCiphertext(
            "sealed blob shorter than the fixed overhead".to_string(),
        ));
    }

    let declared_len = u32::from_be_bytes(sealed[..LEN_PREFIX_SIZE].try_into().unwrap()) as usize;
    let iv = &sealed[LEN_PREFIX_SIZE..LEN_PREFIX_SIZE + IV_SIZE];
    let ciphertext = &sealed[LEN_PREFIX_SIZE + IV_SIZE..];

    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
    let nonce = aes_gcm::Nonce::from_slice(iv);

    let plaintext = cipher
        .decrypt(nonce, Payload { msg: ciphertext, aad: &[] })
        .map_err(|_| CryptoError::AuthFailed)?;

    if plaintext.len() != declared_len {
        return Err(CryptoError::AuthFailed);
    }

    Ok(plaintext)
}
