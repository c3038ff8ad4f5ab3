//! Folder metadata model and codec.
//!
//! [`FolderMetaData`] is the tree node persisted (encrypted) on the
//! broker at each folder's `MetadataKey`. [`encrypt_metadata`] /
//! [`decrypt_metadata`] are the codec's only two entry points: seal with
//! serde's default declaration-order struct emission for a stable key
//! order, base64-wrap for the wire, and the reverse.

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// A sub-folder entry inside a parent's [`FolderMetaData`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderEntry {
    pub name: String,
    /// Hex-encoded `MetadataKey` of the sub-folder (64 chars)
    pub handle: String,
}

/// A single immutable version of a file's content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileVersion {
    pub size: u64,
    /// Hex-encoded file handle (128 chars: file-id ‖ file-key)
    pub handle: String,
    pub created: i64,
    pub modified: i64,
}

/// A file entry inside a [`FolderMetaData`]. `versions[0]` is always the
/// latest; this crate never stores more than one, carrying only the
/// single latest version rather than full version history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub created: i64,
    pub modified: i64,
    pub versions: Vec<FileVersion>,
}

impl FileEntry {
    /// Build a new single-version file entry.
    pub fn new(name: impl Into<String>, size: u64, handle: impl Into<String>) -> Self {
        let now = now_ms();
        Self {
            name: name.into(),
            created: now,
            modified: now,
            versions: vec![FileVersion { size, handle: handle.into(), created: now, modified: now }],
        }
    }

    /// The latest version: `versions[0]` is always the most recent.
    pub fn latest(&self) -> Option<&FileVersion> {
        self.versions.first()
    }
}

/// Mutable record associated with one folder. Field declaration order is
/// the canonical wire order: `name, created, modified, folders, files`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FolderMetaData {
    pub name: String,
    pub created: i64,
    pub modified: i64,
    pub folders: Vec<FolderEntry>,
    pub files: Vec<FileEntry>,
}

impl FolderMetaData {
    /// A freshly created, empty folder metadata blob.
    pub fn new(name: impl Into<String>) -> Self {
        let now = now_ms();
        Self { name: name.into(), created: now, modified: now, folders: Vec::new(), files: Vec::new() }
    }

    fn touch(&mut self) {
        self.modified = now_ms();
    }

    /// True if a file of this name already exists, letting a caller
    /// short-circuit an upload before it touches the broker.
    pub fn has_file_named(&self, name: &str) -> bool {
        self.files.iter().any(|f| f.name == name)
    }

    /// Append a file entry, re-stamping `modified`.
    pub fn add_file(&mut self, entry: FileEntry) {
        self.files.push(entry);
        self.touch();
    }

    /// Append a sub-folder entry, re-stamping `modified`.
    pub fn add_folder(&mut self, entry: FolderEntry) {
        self.folders.push(entry);
        self.touch();
    }

    /// Remove a file entry by its handle (128-hex file handle). Returns
    /// the removed entry, or `None` if absent (caller maps this to
    /// `CoreError`/`NotFound` at the tree-operation layer).
    pub fn remove_file_by_handle(&mut self, handle: &str) -> Option<FileEntry> {
        let idx = self.files.iter().position(|f| f.versions.iter().any(|v| v.handle == handle))?;
        self.touch();
        Some(self.files.remove(idx))
    }

    /// Remove a sub-folder entry by its handle (64-hex metadata key).
    pub fn remove_folder_by_handle(&mut self, handle: &str) -> Option<FolderEntry> {
        let idx = self.folders.iter().position(|f| f.handle == handle)?;
        self.touch();
        Some(self.folders.remove(idx))
    }

    /// Find a sub-folder entry by name.
    pub fn find_folder(&self, name: &str) -> Option<&FolderEntry> {
        self.folders.iter().find(|f| f.name == name)
    }

    /// Rename the file identified by `handle`, preserving its extension
    /// unless `new_name` already carries one.
    pub fn rename_file(&mut self, handle: &str, new_name: &str) -> Option<()> {
        let old_name = self.files.iter().find(|f| f.versions.iter().any(|v| v.handle == handle))?.name.clone();
        let extension = old_name.rsplit_once('.').map(|(_, ext)| ext.to_string());
        let final_name = match (&extension, new_name.contains('.')) {
            (Some(ext), false) => format!("{new_name}.{ext}"),
            _ => new_name.to_string(),
        };
        let entry = self.files.iter_mut().find(|f| f.versions.iter().any(|v| v.handle == handle))?;
        entry.name = final_name;
        entry.modified = now_ms();
        self.touch();
        Some(())
    }
}

/// Metadata sealed alongside a file's data, carrying the information the
/// recipient needs to reassemble and present the plaintext.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetaData {
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub p: ChunkParams,
}

/// The chunk geometry a file was uploaded with, carried in its
/// [`FileMetaData`] so a later download knows how to reassemble it even
/// if the defaults ever change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkParams {
    #[serde(rename = "partSize")]
    pub part_size: u64,
    #[serde(rename = "blockSize")]
    pub block_size: u64,
}

/// Canonicalize a [`FolderMetaData`] to its wire JSON string, relying on
/// serde's default declaration-order struct-field emission rather than a
/// `HashMap` so the key order stays stable across serializations.
pub fn canonicalize(meta: &FolderMetaData) -> Result<String> {
    Ok(serde_json::to_string(meta)?)
}

/// Seal a folder's metadata with its `KeyString`, returning the
/// `base64(AES-GCM-256(json))` blob stored on the broker.
pub fn encrypt_metadata(meta: &FolderMetaData, key_string: &[u8; 32]) -> Result<String> {
    let json = canonicalize(meta)?;
    let sealed = veilfs_crypto::seal(json.as_bytes(), key_string).map_err(CoreError::Crypto)?;
    Ok(STANDARD.encode(sealed))
}

/// Open a `base64(AES-GCM-256(json))` blob back into a [`FolderMetaData`].
/// `decrypt(encrypt(x)) == x` must hold; the reverse need not, since fresh
/// IVs make re-sealing non-deterministic.
pub fn decrypt_metadata(blob_b64: &str, key_string: &[u8; 32]) -> Result<FolderMetaData> {
    let sealed = STANDARD.decode(blob_b64)?;
    let json = veilfs_crypto::open(&sealed, key_string).map_err(CoreError::Crypto)?;
    Ok(serde_json::from_slice(&json)?)
}
