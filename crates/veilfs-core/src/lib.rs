//! # veilfs-core
//!
//! Pure domain logic shared by every front end: chunk-size math and the
//! handle-discriminant parse boundary (C5), the folder-metadata model and
//! codec (C6), and the action queue (C8).
//!
//! Nothing in this crate performs network I/O — [`veilfs_client`] owns the
//! broker transport, tree operations, and account session that drive it.

pub mod action;
pub mod chunking;
pub mod error;
pub mod metadata;

pub use action::{Action, ActionHandler, ActionQueue};
pub use chunking::{parse_handle, FileHandle, FolderHandle, Handle};
pub use error::{CoreError, Result};
pub use metadata::{
    canonicalize, decrypt_metadata, encrypt_metadata, ChunkParams, FileEntry, FileMetaData,
    FileVersion, FolderEntry, FolderMetaData,
};
