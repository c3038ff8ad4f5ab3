//! Chunk pipeline: parallel encrypted upload and parallel ranged download,
//! with a verification/retry loop on the upload side and temp-directory
//! staged reassembly on the download side.

use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt};
use rand::RngCore;
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument, warn};
use veilfs_core::chunking::{
    self, download_byte_range, download_part_count, plaintext_blocks, upload_part_plaintext_window,
    upload_size, BLOCK_OVERHEAD, BLOCK_SIZE,
};
use veilfs_core::metadata::{ChunkParams, FileMetaData};
use veilfs_core::FileHandle;
use veilfs_crypto::MasterKey;

use crate::config::Config;
use crate::error::{ClientError, Result};
use crate::transport::BrokerTransport;
use crate::types::UploadStatusResponse;

/// Outcome of a successful upload, carrying what [`crate::tree`] needs to
/// append a `FileEntry` to the target folder's metadata.
pub struct UploadedFile {
    pub handle: FileHandle,
    pub name: String,
    pub size: u64,
}

/// Upload `local_path`'s contents. Rejects a zero-byte file up front,
/// without issuing a single broker call.
#[instrument(skip(transport, master, config), fields(local_path = %local_path.display()))]
pub async fn upload(
    transport: &BrokerTransport,
    master: &MasterKey,
    config: &Config,
    local_path: &Path,
) -> Result<UploadedFile> {
    let data = tokio::fs::read(local_path).await?;
    if data.is_empty() {
        return Err(ClientError::InvalidPath(format!("{}: refusing to upload an empty file", local_path.display())));
    }
    let name = local_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ClientError::InvalidPath(local_path.display().to_string()))?
        .to_string();

    let size = data.len() as u64;
    let total_ciphertext = upload_size(size);
    let end_index = chunking::end_index(total_ciphertext);

    let mut file_id = [0u8; 32];
    let mut file_key = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut file_id);
    rand::thread_rng().fill_bytes(&mut file_key);
    let handle = FileHandle::new(file_id, file_key);
    let file_id_hex = handle.file_id_hex();

    let mime_type = mime_guess::from_path(local_path).first_or_octet_stream().essence_str().to_string();
    let file_meta = FileMetaData {
        name: name.clone(),
        size,
        mime_type,
        p: ChunkParams { part_size: chunking::PART_SIZE, block_size: BLOCK_SIZE },
    };
    let sealed_meta = veilfs_crypto::seal(&serde_json::to_vec(&file_meta)?, &file_key)?;

    transport.init_upload(master, &file_id_hex, total_ciphertext, end_index, sealed_meta).await?;

    upload_parts(transport, master, &file_key, &file_id_hex, &data, 0..end_index, end_index, config.upload_workers).await;

    wait_for_upload_completion(transport, master, &file_key, &file_id_hex, &data, end_index, config.max_retries).await?;

    info!(file_id_hex, size, "upload complete");
    Ok(UploadedFile { handle, name, size })
}

/// Seal and POST every part index in `indexes` with bounded concurrency.
/// Per-part transport errors are swallowed here: only `upload-status`
/// drives retry, so a single failed POST just surfaces later as a missing
/// index rather than aborting the whole upload.
async fn upload_parts(
    transport: &BrokerTransport,
    master: &MasterKey,
    file_key: &[u8; 32],
    file_id_hex: &str,
    data: &[u8],
    indexes: std::ops::Range<u32>,
    end_index: u32,
    workers: usize,
) {
    stream::iter(indexes)
        .map(|part_index| upload_one_part(transport, master, file_key, file_id_hex, data, part_index, end_index))
        .buffer_unordered(workers.max(1))
        .collect::<Vec<()>>()
        .await;
}

async fn upload_one_part(
    transport: &BrokerTransport,
    master: &MasterKey,
    file_key: &[u8; 32],
    file_id_hex: &str,
    data: &[u8],
    part_index: u32,
    end_index: u32,
) {
    let (start, end) = upload_part_plaintext_window(part_index as u64, data.len() as u64);
    let mut sealed = Vec::new();
    for (offset, len) in plaintext_blocks(end - start) {
        let block = &data[(start + offset) as usize..(start + offset + len) as usize];
        match veilfs_crypto::seal(block, file_key) {
            Ok(mut s) => sealed.append(&mut s),
            Err(err) => {
                warn!(part_index, %err, "failed to seal block; part will surface as missing");
                return;
            }
        }
    }

    if let Err(err) = transport.upload_part(master, file_id_hex, part_index + 1, end_index, sealed).await {
        warn!(part_index, %err, "part upload failed; relying on upload-status retry");
    }
}

/// Poll `upload-status`, re-driving any `missingIndexes` up to
/// `max_retries` times.
async fn wait_for_upload_completion(
    transport: &BrokerTransport,
    master: &MasterKey,
    file_key: &[u8; 32],
    file_id_hex: &str,
    data: &[u8],
    end_index: u32,
    max_retries: u32,
) -> Result<()> {
    let mut attempt = 0;
    loop {
        let status = transport.upload_status(master, file_id_hex).await?;
        if status.is_complete() {
            return Ok(());
        }
        if status.status != UploadStatusResponse::CHUNKS_MISSING || attempt >= max_retries {
            return Err(ClientError::UploadIncomplete(file_id_hex.to_string()));
        }

        for &missing in &status.missing_indexes {
            let zero_based = missing.saturating_sub(1);
            upload_one_part(transport, master, file_key, file_id_hex, data, zero_based, end_index).await;
        }
        attempt += 1;
    }
}

/// Download the file identified by `handle` into `dest_dir`, returning the
/// final destination path.
#[instrument(skip(transport, config, handle), fields(file_id = %handle.file_id_hex()))]
pub async fn download(
    transport: &BrokerTransport,
    config: &Config,
    handle: &FileHandle,
    dest_dir: &Path,
) -> Result<PathBuf> {
    let file_id_hex = handle.file_id_hex();
    let key = *handle.file_key();

    let download_url = transport.download(&file_id_hex).await?.file_download_url;

    let meta_blob = transport.fetch_metadata_blob(&download_url).await?;
    let meta_json = veilfs_crypto::open(&meta_blob, &key).map_err(|_| ClientError::DownloadCorrupt(file_id_hex.clone()))?;
    let file_meta: FileMetaData = serde_json::from_slice(&meta_json)?;

    let total_ciphertext = upload_size(file_meta.size);
    let num_parts = download_part_count(total_ciphertext);

    let base_name = Path::new(&file_meta.name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(&file_meta.name)
        .to_string();
    let tmp_root = dest_dir.join("tmp");
    let tmp_dir = tmp_root.join(&base_name);
    tokio::fs::create_dir_all(&tmp_dir).await?;

    let fetch_result = fetch_parts(transport, &download_url, &tmp_dir, num_parts, total_ciphertext, config.download_workers).await;
    if let Err(err) = fetch_result {
        let _ = tokio::fs::remove_dir_all(&tmp_dir).await;
        return Err(err);
    }

    let dest_path = dest_dir.join(&file_meta.name);
    let reassembly = reassemble(&tmp_dir, &dest_path, &key, file_meta.size, &file_id_hex).await;

    cleanup_temp_dirs(&tmp_dir, &tmp_root).await;
    reassembly?;

    Ok(dest_path)
}

async fn fetch_parts(
    transport: &BrokerTransport,
    download_url: &str,
    tmp_dir: &Path,
    num_parts: u64,
    total_ciphertext: u64,
    workers: usize,
) -> Result<()> {
    let results = stream::iter(0..num_parts)
        .map(|part_number| {
            let (from, to) = download_byte_range(part_number, total_ciphertext);
            async move {
                let bytes = transport.fetch_file_range(download_url, from, to).await?;
                let path = tmp_dir.join(format!("{part_number}.part"));
                tokio::fs::write(&path, &bytes).await?;
                Ok::<(), ClientError>(())
            }
        })
        .buffer_unordered(workers.max(1))
        .collect::<Vec<_>>()
        .await;

    results.into_iter().collect::<Result<Vec<()>>>()?;
    Ok(())
}

/// Walk the downloaded part files block by block, opening each
/// `blockSize + overhead` window with `key` and appending the plaintext
/// to `dest_path`. A block may span two part files; `partSize` being a
/// multiple of the ciphertext block size guarantees it never spans three.
async fn reassemble(tmp_dir: &Path, dest_path: &Path, key: &[u8; 32], plaintext_size: u64, file_id_hex: &str) -> Result<()> {
    let mut out = tokio::fs::File::create(dest_path).await?;

    let mut part_index = 0u64;
    let mut part_bytes = tokio::fs::read(tmp_dir.join(format!("{part_index}.part"))).await?;
    let mut part_offset = 0usize;
    let mut remaining = plaintext_size;

    while remaining > 0 {
        let block_plain_len = BLOCK_SIZE.min(remaining);
        let cipher_len = (block_plain_len + BLOCK_OVERHEAD) as usize;
        let mut cipher = Vec::with_capacity(cipher_len);

        while cipher.len() < cipher_len {
            if part_offset >= part_bytes.len() {
                part_index += 1;
                part_bytes = tokio::fs::read(tmp_dir.join(format!("{part_index}.part"))).await?;
                part_offset = 0;
            }
            let take = (cipher_len - cipher.len()).min(part_bytes.len() - part_offset);
            cipher.extend_from_slice(&part_bytes[part_offset..part_offset + take]);
            part_offset += take;
        }

        let plaintext = veilfs_crypto::open(&cipher, key).map_err(|_| ClientError::DownloadCorrupt(file_id_hex.to_string()))?;
        out.write_all(&plaintext).await?;
        remaining -= block_plain_len;
    }

    out.flush().await?;
    Ok(())
}

/// Remove `<dest>/tmp/<basename>/`, and `<dest>/tmp/` itself if it is now
/// empty.
async fn cleanup_temp_dirs(tmp_dir: &Path, tmp_root: &Path) {
    let _ = tokio::fs::remove_dir_all(tmp_dir).await;
    if let Ok(mut entries) = tokio::fs::read_dir(tmp_root).await {
        if entries.next_entry().await.ok().flatten().is_none() {
            let _ = tokio::fs::remove_dir(tmp_root).await;
        }
    }
}
