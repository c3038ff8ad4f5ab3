//! Account handle parsing and BIP32-style hierarchical key derivation.
//!
//! An [`AccountHandle`] is the single 128-hex-char secret a session is built
//! from; a [`HdKey`] is the (private scalar, chain code) pair carried at
//! every node of the derivation tree, starting at the handle itself
//! ([`MasterKey`]) and descending one [`HdKey::derive_child`] per path
//! segment to reach a folder's key.
//!
//! The derivation rule deviates from standard BIP32 in one respect only:
//! the 4-byte numeric child index is replaced by the raw UTF-8 bytes of a
//! folder-path segment, since folder names are not numeric. See
//! `DESIGN.md` for the full rationale behind this choice.

use crate::hashing::keccak256;
use crate::{CryptoError, Result};
use hmac::{Hmac, Mac};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{Scalar, SecretKey};
use sha2::Sha512;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of a raw private key / chain code, in bytes
pub const COMPONENT_SIZE: usize = 32;
/// Length of a well-formed account handle, in hex chars
pub const HANDLE_HEX_LEN: usize = 128;

type HmacSha512 = Hmac<Sha512>;

/// A validated 128-hex-char account handle.
#[derive(Clone)]
pub struct AccountHandle {
    private_key: [u8; COMPONENT_SIZE],
    chain_code: [u8; COMPONENT_SIZE],
}

impl AccountHandle {
    /// Parse and validate a handle string. Rejects anything that is not
    /// exactly 128 hex characters.
    pub fn parse(handle: &str) -> Result<Self> {
        if handle.len() != HANDLE_HEX_LEN || !handle.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(CryptoError::InvalidHandle(format!(
                "account handle must be {} hex chars, got {}",
                HANDLE_HEX_LEN,
                handle.len()
            )));
        }
        let bytes = hex::decode(handle)?;
        let mut private_key = [0u8; COMPONENT_SIZE];
        let mut chain_code = [0u8; COMPONENT_SIZE];
        private_key.copy_from_slice(&bytes[..COMPONENT_SIZE]);
        chain_code.copy_from_slice(&bytes[COMPONENT_SIZE..]);
        Ok(Self { private_key, chain_code })
    }

    /// Derive the session's master HD key from this handle.
    pub fn master_key(&self) -> Result<MasterKey> {
        HdKey::from_components(self.private_key, self.chain_code)
    }
}

impl Zeroize for AccountHandle {
    fn zeroize(&mut self) {
        self.private_key.zeroize();
        self.chain_code.zeroize();
    }
}

impl Drop for AccountHandle {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// A node in the HD key tree: a secp256k1 private scalar plus chain code.
#[derive(Clone, ZeroizeOnDrop)]
pub struct HdKey {
    #[zeroize(skip)]
    secret: SecretKey,
    chain_code: [u8; COMPONENT_SIZE],
}

/// Alias used at the root of the tree, for readability at call sites.
pub type MasterKey = HdKey;
/// Alias used for a key scoped to one folder path.
pub type FolderKey = HdKey;

impl HdKey {
    fn from_components(private_key: [u8; COMPONENT_SIZE], chain_code: [u8; COMPONENT_SIZE]) -> Result<Self> {
        let secret = SecretKey::from_slice(&private_key)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        Ok(Self { secret, chain_code })
    }

    /// The 32-byte private scalar, as bytes.
    pub fn private_key_bytes(&self) -> [u8; COMPONENT_SIZE] {
        let mut out = [0u8; COMPONENT_SIZE];
        out.copy_from_slice(&self.secret.to_bytes());
        out
    }

    /// Lowercase hex of the private scalar.
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.private_key_bytes())
    }

    /// Compressed (33-byte) SEC1 public key.
    pub fn public_key_compressed(&self) -> [u8; 33] {
        let point = self.secret.public_key().to_encoded_point(true);
        let mut out = [0u8; 33];
        out.copy_from_slice(point.as_bytes());
        out
    }

    /// Derive one child key from a single raw path segment's UTF-8 bytes.
    ///
    /// `HMAC-SHA512(chain_code, 0x00 || parent_priv_scalar || segment)` —
    /// the left 32 bytes are added to the parent scalar mod the group
    /// order to produce the child scalar, the right 32 bytes become the
    /// child chain code.
    pub fn derive_child(&self, segment: &[u8]) -> Result<Self> {
        let mut mac = HmacSha512::new_from_slice(&self.chain_code)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        mac.update(&[0u8]);
        mac.update(&self.private_key_bytes());
        mac.update(segment);
        let out = mac.finalize().into_bytes();

        let il_bytes = *k256::FieldBytes::from_slice(&out[..32]);
        let il: Scalar = Option::from(Scalar::from_repr(il_bytes))
            .ok_or_else(|| CryptoError::InvalidKey("derived scalar out of range".to_string()))?;
        let parent_scalar = self.secret.to_nonzero_scalar();
        let child_scalar = il + parent_scalar.as_ref();

        let child_nonzero: k256::NonZeroScalar = Option::from(k256::NonZeroScalar::new(child_scalar))
            .ok_or_else(|| CryptoError::InvalidKey("derived child scalar is zero".to_string()))?;
        let child_secret = SecretKey::from(child_nonzero);

        let mut chain_code = [0u8; COMPONENT_SIZE];
        chain_code.copy_from_slice(&out[32..]);

        Ok(Self { secret: child_secret, chain_code })
    }

    /// Derive the key for a POSIX-style absolute folder path by walking one
    /// [`derive_child`](Self::derive_child) call per non-empty segment.
    /// `"/"` returns a clone of `self` unchanged, since the root folder's
    /// path has no segments to derive through.
    pub fn derive_path(&self, path: &str) -> Result<Self> {
        let mut current = self.clone();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current = current.derive_child(segment.as_bytes())?;
        }
        Ok(current)
    }

    /// The folder's public `MetadataKey`: `Keccak256(compressed_pubkey)`,
    /// a 32-byte broker-addressable identifier.
    pub fn metadata_key(&self) -> [u8; 32] {
        *keccak256(&self.public_key_compressed()).as_bytes()
    }

    /// The folder's `KeyString`: `Keccak256(private_key_hex_ascii_bytes)`.
    /// This hashes the *hex ASCII representation*, not the raw key bytes —
    /// a wire-compatible quirk of the broker that must be preserved
    /// bit-exact.
    pub fn key_string(&self) -> [u8; 32] {
        *keccak256(self.private_key_hex().as_bytes()).as_bytes()
    }

    /// The underlying secp256k1 secret key, for signing (C3).
    pub fn secret_key(&self) -> &SecretKey {
        &self.secret
    }
}

/// Derive a folder's HD key from the master key and an absolute path.
/// Equivalent to `master.derive_path(path)`, exposed as a free function
/// under the broker's `deriveFolderKey(master, path)` naming.
pub fn derive_folder_key(master: &MasterKey, path: &str) -> Result<FolderKey> {
    master.derive_path(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Identical `(handle, path)` pairs always derive identical keys;
        /// distinct non-root segments derive distinct ones with
        /// overwhelming probability.
        #[test]
        fn derivation_is_deterministic_for_arbitrary_segments(
            priv_bytes in prop::array::uniform32(any::<u8>()).prop_filter("nonzero scalar", |b| b.iter().any(|&x| x != 0)),
            chain_bytes in prop::array::uniform32(any::<u8>()),
            segment in "[a-zA-Z0-9_-]{1,16}",
        ) {
            let handle_hex = hex::encode(priv_bytes) + &hex::encode(chain_bytes);
            let handle = AccountHandle::parse(&handle_hex);
            prop_assume!(handle.is_ok());
            let master = handle.unwrap().master_key();
            prop_assume!(master.is_ok());
            let master = master.unwrap();

            let path = format!("/{segment}");
            let a = derive_folder_key(&master, &path);
            let b = derive_folder_key(&master, &path);
            prop_assume!(a.is_ok() && b.is_ok());
            prop_assert_eq!(a.unwrap().metadata_key(), b.unwrap().metadata_key());
        }
    }

    fn sample_handle() -> String {
        "a".repeat(64) + &"b".repeat(64)
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(AccountHandle::parse("abc").is_err());
        assert!(AccountHandle::parse(&"a".repeat(127)).is_err());
        assert!(AccountHandle::parse(&"a".repeat(129)).is_err());
    }

    #[test]
    fn rejects_non_hex() {
        let mut s = sample_handle();
        s.replace_range(0..1, "z");
        assert!(AccountHandle::parse(&s).is_err());
    }

    #[test]
    fn accepts_well_formed_handle() {
        assert!(AccountHandle::parse(&sample_handle()).is_ok());
    }

    #[test]
    fn derivation_is_deterministic() {
        let handle = AccountHandle::parse(&sample_handle()).unwrap();
        let master = handle.master_key().unwrap();
        let a = derive_folder_key(&master, "/docs/reports").unwrap();
        let b = derive_folder_key(&master, "/docs/reports").unwrap();
        assert_eq!(a.metadata_key(), b.metadata_key());
        assert_eq!(a.key_string(), b.key_string());
    }

    #[test]
    fn distinct_paths_distinct_keys() {
        let handle = AccountHandle::parse(&sample_handle()).unwrap();
        let master = handle.master_key().unwrap();
        let a = derive_folder_key(&master, "/docs").unwrap();
        let b = derive_folder_key(&master, "/photos").unwrap();
        assert_ne!(a.metadata_key(), b.metadata_key());
    }

    #[test]
    fn root_path_is_identity() {
        let handle = AccountHandle::parse(&sample_handle()).unwrap();
        let master = handle.master_key().unwrap();
        let root = derive_folder_key(&master, "/").unwrap();
        assert_eq!(root.metadata_key(), master.metadata_key());
    }

    #[test]
    fn metadata_key_is_32_bytes_hex_is_64_chars() {
        let handle = AccountHandle::parse(&sample_handle()).unwrap();
        let master = handle.master_key().unwrap();
        let key = derive_folder_key(&master, "/a").unwrap();
        assert_eq!(hex::encode(key.metadata_key()).len(), 64);
    }
}
