//! Pure chunk-size math and the handle-discriminant parse boundary.
//!
//! Nothing in this module does I/O; it only computes the part/block
//! geometry the upload and download pipelines drive, and it is the single
//! place that turns a raw hex string into a typed [`Handle`] so the
//! 64-vs-128 length check happens exactly once, at the outer edge.

use crate::error::CoreError;

/// Plaintext bytes sealed per AES-GCM block
pub const BLOCK_SIZE: u64 = 64 * 1024;
/// Fixed per-block ciphertext overhead
pub const BLOCK_OVERHEAD: u64 = veilfs_crypto::symmetric::BLOCK_OVERHEAD as u64;
/// Ciphertext bytes per encrypted block
pub const CIPHER_BLOCK_SIZE: u64 = BLOCK_SIZE + BLOCK_OVERHEAD;
/// Encrypted blocks bundled into one HTTP upload part
pub const BLOCKS_PER_PART: u64 = 80;
/// Ciphertext bytes per upload part
pub const PART_SIZE: u64 = BLOCKS_PER_PART * CIPHER_BLOCK_SIZE;

/// Ciphertext bytes per *download* part. A fixed broker constant,
/// independent of `PART_SIZE` in name only — derived here from the same
/// `BLOCKS_PER_PART`/`CIPHER_BLOCK_SIZE` constants rather than hard-coded,
/// so its equality to `80 * (blockSize + 32)` is enforced by the type
/// system instead of a comment.
pub const DOWNLOAD_PART_SIZE: u64 = PART_SIZE;
const _: () = assert!(DOWNLOAD_PART_SIZE == 5_245_440);

/// Plaintext bytes represented by one upload part (used to slice the
/// source file before per-block sealing).
pub const PART_SIZE_PLAIN: u64 = BLOCKS_PER_PART * BLOCK_SIZE;

/// Ciphertext total for a plaintext file of `plaintext_size` bytes. Each
/// block is sealed non-padded (the last block carries only its own
/// `remaining + overhead` bytes, not a full `BLOCK_SIZE + overhead`), so
/// the total is `plaintext_size + ceil(plaintext_size / BLOCK_SIZE) *
/// overhead`, not `blocks * (BLOCK_SIZE + overhead)`.
pub fn upload_size(plaintext_size: u64) -> u64 {
    let blocks = plaintext_size.div_ceil(BLOCK_SIZE).max(1);
    plaintext_size + blocks * BLOCK_OVERHEAD
}

/// 1-based part count for a given ciphertext total: `ceil(uploadSize /
/// partSize)`.
pub fn end_index(upload_size: u64) -> u32 {
    upload_size.div_ceil(PART_SIZE) as u32
}

/// Number of download parts for a given ciphertext total:
/// `floor(uploadSize / partSize) + 1`.
pub fn download_part_count(upload_size: u64) -> u64 {
    upload_size / DOWNLOAD_PART_SIZE + 1
}

/// Inclusive byte range `[from, to]` on the wire for ranged download part
/// number `part_number` (0-based), clamped to `upload_size - 1`.
pub fn download_byte_range(part_number: u64, upload_size: u64) -> (u64, u64) {
    let from = part_number * DOWNLOAD_PART_SIZE;
    let to = ((part_number + 1) * DOWNLOAD_PART_SIZE - 1).min(upload_size.saturating_sub(1));
    (from, to)
}

/// Split `plaintext_size` bytes into `(offset, len)` windows of at most
/// `BLOCK_SIZE` plaintext bytes each (the last block may be short).
pub fn plaintext_blocks(plaintext_size: u64) -> Vec<(u64, u64)> {
    let mut out = Vec::new();
    let mut offset = 0;
    while offset < plaintext_size {
        let len = BLOCK_SIZE.min(plaintext_size - offset);
        out.push((offset, len));
        offset += len;
    }
    if out.is_empty() {
        out.push((0, 0));
    }
    out
}

/// The plaintext window `[start, end)` owned by upload part `part_index`
/// (0-based), clamped to `plaintext_size`.
pub fn upload_part_plaintext_window(part_index: u64, plaintext_size: u64) -> (u64, u64) {
    let start = (part_index * PART_SIZE_PLAIN).min(plaintext_size);
    let end = ((part_index + 1) * PART_SIZE_PLAIN).min(plaintext_size);
    (start, end)
}

/// A folder's public broker identifier: 64 lowercase hex chars.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FolderHandle([u8; 32]);

impl FolderHandle {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// A file's 128-hex-char handle: 32-byte file id `‖` 32-byte AES key.
/// The file-id must never be sent to the broker together with the
/// file-key; that invariant is enforced by keeping these two halves behind
/// separate accessors — nothing constructs a combined wire payload here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FileHandle {
    file_id: [u8; 32],
    file_key: [u8; 32],
}

impl FileHandle {
    pub fn new(file_id: [u8; 32], file_key: [u8; 32]) -> Self {
        Self { file_id, file_key }
    }

    pub fn file_id(&self) -> &[u8; 32] {
        &self.file_id
    }

    pub fn file_id_hex(&self) -> String {
        hex::encode(self.file_id)
    }

    pub fn file_key(&self) -> &[u8; 32] {
        &self.file_key
    }

    pub fn to_hex(&self) -> String {
        let mut s = hex::encode(self.file_id);
        s.push_str(&hex::encode(self.file_key));
        s
    }
}

/// A handle parsed at the protocol edge, discriminated by hex length —
/// 64 chars is a folder, 128 chars is a file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Handle {
    Folder(FolderHandle),
    File(FileHandle),
}

/// Parse a hex handle string into its typed variant. This is the *only*
/// place the length-64-vs-128 branch is allowed to happen; everywhere
/// else should already hold a typed [`Handle`].
pub fn parse_handle(raw: &str) -> Result<Handle, CoreError> {
    if !raw.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(CoreError::InvalidHandle(raw.to_string()));
    }
    match raw.len() {
        64 => {
            let bytes = hex::decode(raw).map_err(|_| CoreError::InvalidHandle(raw.to_string()))?;
            let mut arr = [0u8; 32];
            arr.copy_from_slice(&bytes);
            Ok(Handle::Folder(FolderHandle(arr)))
        }
        128 => {
            let bytes = hex::decode(raw).map_err(|_| CoreError::InvalidHandle(raw.to_string()))?;
            let mut id = [0u8; 32];
            let mut key = [0u8; 32];
            id.copy_from_slice(&bytes[..32]);
            key.copy_from_slice(&bytes[32..]);
            Ok(Handle::File(FileHandle { file_id: id, file_key: key }))
        }
        other => Err(CoreError::InvalidHandleLength(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Encrypted size is always `S + ceil(S/blockSize) * overhead` (each
        /// block is sealed non-padded, so only the trailing block's actual
        /// remainder carries the overhead, not a full `blockSize`), and
        /// `endIndex` is always `ceil(encryptedSize / partSize)`, for any
        /// plaintext size.
        #[test]
        fn chunk_math_matches_closed_form(size in 0u64..10_000_000) {
            let encrypted = upload_size(size);
            let expected_blocks = size.div_ceil(BLOCK_SIZE).max(1);
            prop_assert_eq!(encrypted, size + expected_blocks * BLOCK_OVERHEAD);
            prop_assert_eq!(end_index(encrypted), encrypted.div_ceil(PART_SIZE) as u32);
        }

        /// The handle discriminant accepts exactly 64 and 128 hex chars
        /// and rejects every other length.
        #[test]
        fn handle_discriminant_is_exact_on_length(len in 0usize..200) {
            let raw = "a".repeat(len);
            match parse_handle(&raw) {
                Ok(Handle::Folder(_)) => prop_assert_eq!(len, 64),
                Ok(Handle::File(_)) => prop_assert_eq!(len, 128),
                Err(_) => prop_assert!(len != 64 && len != 128),
            }
        }

        /// Plaintext blocks always reassemble to the original size and
        /// never exceed `BLOCK_SIZE`.
        #[test]
        fn plaintext_blocks_cover_exact_size(size in 0u64..500_000) {
            let blocks = plaintext_blocks(size);
            let total: u64 = blocks.iter().map(|(_, len)| *len).sum();
            prop_assert_eq!(total, size);
            prop_assert!(blocks.iter().all(|(_, len)| *len <= BLOCK_SIZE));
        }
    }

    #[test]
    fn download_part_size_matches_magic_constant() {
        assert_eq!(DOWNLOAD_PART_SIZE, 5_245_440);
    }

    #[test]
    fn empty_file_has_one_block_of_zero_len() {
        assert_eq!(upload_size(0), BLOCK_OVERHEAD);
    }

    #[test]
    fn single_byte_rounds_up_to_one_block() {
        assert_eq!(upload_size(1), 1 + BLOCK_OVERHEAD);
    }

    #[test]
    fn exact_block_multiple() {
        assert_eq!(upload_size(BLOCK_SIZE * 3), BLOCK_SIZE * 3 + BLOCK_OVERHEAD * 3);
    }

    #[test]
    fn end_index_for_small_file_is_one() {
        assert_eq!(end_index(upload_size(11)), 1);
    }

    #[test]
    fn end_index_grows_with_many_blocks() {
        let size = BLOCK_SIZE * (BLOCKS_PER_PART * 2 + 1);
        assert_eq!(end_index(upload_size(size)), 3);
    }

    #[test]
    fn handle_discriminant_accepts_64_and_128() {
        let folder = "a".repeat(64);
        let file = "b".repeat(128);
        assert!(matches!(parse_handle(&folder), Ok(Handle::Folder(_))));
        assert!(matches!(parse_handle(&file), Ok(Handle::File(_))));
    }

    #[test]
    fn handle_discriminant_rejects_other_lengths() {
        assert!(parse_handle(&"a".repeat(63)).is_err());
        assert!(parse_handle(&"a".repeat(129)).is_err());
        assert!(parse_handle("").is_err());
    }

    #[test]
    fn file_id_never_exposed_with_key_combined() {
        let handle = FileHandle::new([1u8; 32], [2u8; 32]);
        assert_ne!(handle.file_id(), handle.file_key());
        assert_eq!(handle.file_id_hex().len(), 64);
    }

    #[test]
    fn plaintext_blocks_split_on_block_size() {
        let blocks = plaintext_blocks(BLOCK_SIZE + 10);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0], (0, BLOCK_SIZE));
        assert_eq!(blocks[1], (BLOCK_SIZE, 10));
    }
}
