//! Folder tree operations: create, read, rename, move, delete, copy.
//!
//! Holding "the current folder metadata" as shared session state is a bug
//! surface under concurrent reads — two interleaved operations can each
//! read a view, mutate it, and clobber each other's write. Every function
//! here instead takes and returns an explicit [`FolderView`] value, so the
//! caller threads freshness through the call graph rather than relying on
//! a single stale in-memory copy.

use std::future::Future;
use std::pin::Pin;

use veilfs_core::{decrypt_metadata, encrypt_metadata, parse_handle, FileEntry, FolderEntry, FolderMetaData, Handle};
use veilfs_crypto::{derive_folder_key, MasterKey};

use crate::error::{ClientError, Result};
use crate::transport::BrokerTransport;

/// A folder's derived addressing plus its currently-known metadata. Never
/// held across an `.await` boundary by the session — every call that
/// needs fresh data re-derives and re-fetches it.
#[derive(Clone)]
pub struct FolderView {
    pub path: String,
    pub metadata_key: String,
    pub key_string: [u8; 32],
    pub metadata: FolderMetaData,
}

fn join_path(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{name}")
    } else {
        format!("{}/{}", parent.trim_end_matches('/'), name)
    }
}

fn basename(path: &str) -> String {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or(path).to_string()
}

fn parent_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) => "/".to_string(),
        Some(i) => trimmed[..i].to_string(),
        None => "/".to_string(),
    }
}

/// `getFolderData(path)`: derive `(metadataKey, keyString)`, fetch and open.
pub async fn get_folder_data(transport: &BrokerTransport, master: &MasterKey, path: &str) -> Result<FolderView> {
    if !path.starts_with('/') {
        return Err(ClientError::InvalidPath(path.to_string()));
    }
    let folder_key = derive_folder_key(master, path)?;
    let metadata_key = hex::encode(folder_key.metadata_key());
    let key_string = folder_key.key_string();

    let blob_b64 = transport.metadata_get(master, &metadata_key).await?;
    let metadata = decrypt_metadata(&blob_b64, &key_string)?;

    Ok(FolderView { path: path.to_string(), metadata_key, key_string, metadata })
}

/// `setMetadata(view)`: seal the in-memory metadata and persist it,
/// returning the server-acknowledged re-read view.
pub async fn set_metadata(transport: &BrokerTransport, master: &MasterKey, view: &FolderView) -> Result<FolderView> {
    let sealed = encrypt_metadata(&view.metadata, &view.key_string)?;
    let updated_b64 = transport.metadata_set(master, &view.metadata_key, sealed).await?;
    let metadata = decrypt_metadata(&updated_b64, &view.key_string)?;
    Ok(FolderView { metadata, ..view.clone() })
}

/// `createFolder(absPath)`. A 403 from `metadata/create` means the folder
/// already exists; that path returns the existing entry without touching
/// the parent a second time.
pub async fn create_folder(transport: &BrokerTransport, master: &MasterKey, abs_path: &str) -> Result<FolderEntry> {
    if abs_path == "/" {
        return Err(ClientError::InvalidPath("cannot create the root folder".to_string()));
    }
    if !abs_path.starts_with('/') {
        return Err(ClientError::InvalidPath(abs_path.to_string()));
    }

    let folder_key = derive_folder_key(master, abs_path)?;
    let metadata_key = hex::encode(folder_key.metadata_key());
    let name = basename(abs_path);

    let created = transport.metadata_create(master, &metadata_key).await?;
    if !created {
        return Ok(FolderEntry { name, handle: metadata_key });
    }

    let key_string = folder_key.key_string();
    let empty = FolderMetaData::new(name.clone());
    let sealed = encrypt_metadata(&empty, &key_string)?;
    transport.metadata_set(master, &metadata_key, sealed).await?;

    let mut parent = get_folder_data(transport, master, &parent_path(abs_path)).await?;
    let entry = FolderEntry { name, handle: metadata_key };
    parent.metadata.add_folder(entry.clone());
    set_metadata(transport, master, &parent).await?;

    Ok(entry)
}

/// `AddFileToFolderMetaData`: append a freshly uploaded file's entry to its
/// target folder and persist.
pub async fn add_file_entry(transport: &BrokerTransport, master: &MasterKey, folder_path: &str, entry: FileEntry) -> Result<FolderView> {
    let mut view = get_folder_data(transport, master, folder_path).await?;
    view.metadata.add_file(entry);
    set_metadata(transport, master, &view).await
}

/// Iterative (work-stack) deletion of `folder_path`'s subtree: optionally
/// delete contained files, then every contained folder's own metadata
/// blob. Does not touch the parent's `folders` list — the caller does
/// that once, after this returns.
async fn delete_subtree(transport: &BrokerTransport, master: &MasterKey, folder_path: &str, delete_files: bool) -> Result<()> {
    let mut stack = vec![folder_path.to_string()];
    let mut metadata_keys_to_delete = Vec::new();

    while let Some(path) = stack.pop() {
        let view = get_folder_data(transport, master, &path).await?;

        if delete_files {
            for file in &view.metadata.files {
                if let Some(version) = file.versions.first() {
                    if let Handle::File(fh) = parse_handle(&version.handle)? {
                        transport.delete_file(master, &fh.file_id_hex()).await?;
                    }
                }
            }
        }

        for sub in &view.metadata.folders {
            stack.push(join_path(&path, &sub.name));
        }
        metadata_keys_to_delete.push(view.metadata_key);
    }

    for metadata_key in metadata_keys_to_delete {
        transport.metadata_delete(master, &metadata_key).await?;
    }
    Ok(())
}

/// `delete(folderPath, handle, deleteFiles)`.
pub async fn delete(transport: &BrokerTransport, master: &MasterKey, folder_path: &str, handle_raw: &str, delete_files: bool) -> Result<()> {
    match parse_handle(handle_raw)? {
        Handle::File(file_handle) => {
            transport.delete_file(master, &file_handle.file_id_hex()).await?;
            let mut parent = get_folder_data(transport, master, folder_path).await?;
            parent
                .metadata
                .remove_file_by_handle(&file_handle.to_hex())
                .ok_or_else(|| ClientError::NotFound(format!("file {handle_raw} not in {folder_path}")))?;
            set_metadata(transport, master, &parent).await?;
        }
        Handle::Folder(folder_handle) => {
            let folder_handle_hex = folder_handle.to_hex();
            let parent = get_folder_data(transport, master, folder_path).await?;
            let entry = parent
                .metadata
                .folders
                .iter()
                .find(|f| f.handle == folder_handle_hex)
                .cloned()
                .ok_or_else(|| ClientError::NotFound(format!("folder {handle_raw} not in {folder_path}")))?;

            let sub_path = join_path(folder_path, &entry.name);
            delete_subtree(transport, master, &sub_path, delete_files).await?;

            let mut parent = parent;
            parent.metadata.remove_folder_by_handle(&folder_handle_hex);
            set_metadata(transport, master, &parent).await?;
        }
    }
    Ok(())
}

/// `rename(folder, handle, oldName, newName)`.
pub async fn rename(transport: &BrokerTransport, master: &MasterKey, folder_path: &str, handle_raw: &str, old_name: &str, new_name: &str) -> Result<()> {
    match parse_handle(handle_raw)? {
        Handle::File(file_handle) => {
            let mut parent = get_folder_data(transport, master, folder_path).await?;
            parent
                .metadata
                .rename_file(&file_handle.to_hex(), new_name)
                .ok_or_else(|| ClientError::NotFound(format!("file {handle_raw} not in {folder_path}")))?;
            set_metadata(transport, master, &parent).await?;
        }
        Handle::Folder(_) => {
            let from_path = join_path(folder_path, old_name);
            let to_path = join_path(folder_path, new_name);
            create_folder(transport, master, &to_path).await?;
            copy_metadata(transport, master, from_path, to_path).await?;
            // The folder keeps a new metadataKey after rename; callers
            // relying on a stable handle across rename must re-resolve it.
            delete(transport, master, folder_path, handle_raw, false).await?;
        }
    }
    Ok(())
}

/// `copyMetadata(from, to)`. Overwrites `to`'s file list rather than
/// merging; this is lossy if `to` is nonempty, and the design assumes `to`
/// was just freshly created by the caller. Recursion is bounded by folder
/// nesting depth; boxed because async fns can't recurse directly.
pub fn copy_metadata<'a>(
    transport: &'a BrokerTransport,
    master: &'a MasterKey,
    from_path: String,
    to_path: String,
) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
    Box::pin(async move {
        let from_view = get_folder_data(transport, master, &from_path).await?;

        if !from_view.metadata.files.is_empty() {
            let mut to_view = get_folder_data(transport, master, &to_path).await?;
            to_view.metadata.files = from_view.metadata.files.clone();
            set_metadata(transport, master, &to_view).await?;
        }

        for sub in from_view.metadata.folders.clone() {
            let sub_from = join_path(&from_path, &sub.name);
            let sub_to = join_path(&to_path, &sub.name);
            create_folder(transport, master, &sub_to).await?;
            copy_metadata(transport, master, sub_from, sub_to).await?;
        }

        Ok(())
    })
}

/// `move(fromFolder, item, toFolder)`. Persists the source-side removal
/// before the destination-side write for files, so a crash mid-move never
/// leaves the same entry visible in both folders; for folders, the
/// destination is fully created and copied before the source is deleted.
pub async fn move_item(transport: &BrokerTransport, master: &MasterKey, from_folder: &str, handle_raw: &str, to_folder: &str) -> Result<()> {
    match parse_handle(handle_raw)? {
        Handle::File(file_handle) => {
            let mut from_view = get_folder_data(transport, master, from_folder).await?;
            let entry = from_view
                .metadata
                .remove_file_by_handle(&file_handle.to_hex())
                .ok_or_else(|| ClientError::NotFound(format!("file {handle_raw} not in {from_folder}")))?;
            set_metadata(transport, master, &from_view).await?;

            let mut to_view = get_folder_data(transport, master, to_folder).await?;
            to_view.metadata.add_file(entry);
            set_metadata(transport, master, &to_view).await?;
        }
        Handle::Folder(folder_handle) => {
            let folder_handle_hex = folder_handle.to_hex();
            let from_view = get_folder_data(transport, master, from_folder).await?;
            let item_name = from_view
                .metadata
                .folders
                .iter()
                .find(|f| f.handle == folder_handle_hex)
                .map(|f| f.name.clone())
                .ok_or_else(|| ClientError::NotFound(format!("folder {handle_raw} not in {from_folder}")))?;

            let to_path = join_path(to_folder, &item_name);
            create_folder(transport, master, &to_path).await?;
            copy_metadata(transport, master, join_path(from_folder, &item_name), to_path).await?;
            delete(transport, master, from_folder, handle_raw, false).await?;
        }
    }
    Ok(())
}
