//! Integration tests for the folder tree and chunk pipeline against a
//! mocked broker.
//!
//! Each test stands up a `wiremock` server, seals fixture `FolderMetaData`
//! blobs with the same keys [`AccountSession`] would derive for the paths
//! under test, and asserts both the outcome and the exact broker calls
//! made — a broker call that shouldn't happen is as much a correctness
//! property here as the happy path.

use std::io::Write;

use tempfile::tempdir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use veilfs_client::{AccountSession, Config};
use veilfs_core::chunking::{download_byte_range, download_part_count, upload_size};
use veilfs_core::{encrypt_metadata, ChunkParams, FileEntry, FileMetaData, FolderEntry, FolderMetaData};
use veilfs_crypto::{derive_folder_key, AccountHandle};

fn test_handle() -> String {
    "1".repeat(64) + &"2".repeat(64)
}

async fn mock_account_data(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/account-data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "ok"})))
        .mount(server)
        .await;
}

fn config_for(server: &MockServer) -> Config {
    Config::new(format!("{}/", server.uri()))
}

/// A zero-byte file is refused before any broker call beyond the
/// session's own `account-data` handshake.
#[tokio::test]
async fn empty_upload_is_refused_without_touching_the_upload_endpoints() {
    let server = MockServer::start().await;
    mock_account_data(&server).await;

    let session = AccountSession::connect(&test_handle(), config_for(&server)).await.unwrap();

    let dir = tempdir().unwrap();
    let empty_path = dir.path().join("empty.bin");
    std::fs::File::create(&empty_path).unwrap();

    let uploaded = session.upload(empty_path.to_str().unwrap(), "/docs").await.unwrap();
    assert!(!uploaded);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1, "only the account-data handshake should have fired");
}

/// A single-block upload makes exactly one `init-upload`, one `upload`
/// (partIndex=1), one successful `upload-status`, and persists one new
/// `FileEntry` to the target folder.
#[tokio::test]
async fn single_block_upload_succeeds_with_one_part() {
    let server = MockServer::start().await;
    mock_account_data(&server).await;

    let handle = test_handle();
    let account = AccountHandle::parse(&handle).unwrap();
    let master = account.master_key().unwrap();
    let folder_key = derive_folder_key(&master, "/docs").unwrap();
    let metadata_key = hex::encode(folder_key.metadata_key());
    let key_string = folder_key.key_string();

    let empty_folder = FolderMetaData::new("docs");
    let sealed_folder = encrypt_metadata(&empty_folder, &key_string).unwrap();

    Mock::given(method("POST"))
        .and(path("/metadata/get"))
        .and(body_string_contains(&metadata_key))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"metadata": sealed_folder})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/metadata/set"))
        .and(body_string_contains(&metadata_key))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"metadata": sealed_folder})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/init-upload"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .and(body_string_contains("\"partIndex\":1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/upload-status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "File is uploaded",
            "endIndex": 1,
            "missingIndexes": [],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = AccountSession::connect(&handle, config_for(&server)).await.unwrap();

    let dir = tempdir().unwrap();
    let file_path = dir.path().join("hello.txt");
    std::fs::File::create(&file_path).unwrap().write_all(b"hello world").unwrap();

    let uploaded = session.upload(file_path.to_str().unwrap(), "/docs").await.unwrap();
    assert!(uploaded);
}

/// `upload-status` reporting `missingIndexes: [1]` drives exactly one
/// retry POST of that part before the second poll reports success.
#[tokio::test]
async fn missing_part_is_retried_exactly_once() {
    let server = MockServer::start().await;
    mock_account_data(&server).await;

    let handle = test_handle();
    let account = AccountHandle::parse(&handle).unwrap();
    let master = account.master_key().unwrap();
    let folder_key = derive_folder_key(&master, "/docs").unwrap();
    let metadata_key = hex::encode(folder_key.metadata_key());
    let key_string = folder_key.key_string();

    let empty_folder = FolderMetaData::new("docs");
    let sealed_folder = encrypt_metadata(&empty_folder, &key_string).unwrap();

    Mock::given(method("POST"))
        .and(path("/metadata/get"))
        .and(body_string_contains(&metadata_key))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"metadata": sealed_folder})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/metadata/set"))
        .and(body_string_contains(&metadata_key))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"metadata": sealed_folder})))
        .mount(&server)
        .await;
    Mock::given(method("POST")).and(path("/init-upload")).respond_with(ResponseTemplate::new(200)).mount(&server).await;

    // Every initial part upload + the one retried part (partIndex=1 either way).
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/upload-status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "chunks missing",
            "endIndex": 1,
            "missingIndexes": [1],
        })))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/upload-status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "File is uploaded",
            "endIndex": 1,
            "missingIndexes": [],
        })))
        .with_priority(2)
        .mount(&server)
        .await;

    let session = AccountSession::connect(&handle, config_for(&server)).await.unwrap();

    let dir = tempdir().unwrap();
    let file_path = dir.path().join("retry.txt");
    std::fs::File::create(&file_path).unwrap().write_all(b"retry me please").unwrap();

    let uploaded = session.upload(file_path.to_str().unwrap(), "/docs").await.unwrap();
    assert!(uploaded);
}

/// A target folder that already has a file of the same name skips the
/// upload cleanly, with zero `init-upload` calls.
#[tokio::test]
async fn duplicate_name_upload_is_skipped() {
    let server = MockServer::start().await;
    mock_account_data(&server).await;

    let handle = test_handle();
    let account = AccountHandle::parse(&handle).unwrap();
    let master = account.master_key().unwrap();
    let folder_key = derive_folder_key(&master, "/docs").unwrap();
    let metadata_key = hex::encode(folder_key.metadata_key());
    let key_string = folder_key.key_string();

    let mut folder = FolderMetaData::new("docs");
    folder.add_file(FileEntry::new("dup.txt", 3, "a".repeat(128)));
    let sealed_folder = encrypt_metadata(&folder, &key_string).unwrap();

    Mock::given(method("POST"))
        .and(path("/metadata/get"))
        .and(body_string_contains(&metadata_key))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"metadata": sealed_folder})))
        .mount(&server)
        .await;
    Mock::given(method("POST")).and(path("/init-upload")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

    let session = AccountSession::connect(&handle, config_for(&server)).await.unwrap();

    let dir = tempdir().unwrap();
    let file_path = dir.path().join("dup.txt");
    std::fs::File::create(&file_path).unwrap().write_all(b"abc").unwrap();

    let uploaded = session.upload(file_path.to_str().unwrap(), "/docs").await.unwrap();
    assert!(!uploaded);
}

/// Renaming a folder creates the sibling, copies the file list across,
/// and deletes the old folder's own metadata without ever calling the
/// file-delete endpoint (deleteFiles=false is a move of entries, not
/// data).
#[tokio::test]
async fn folder_rename_moves_entries_without_deleting_file_data() {
    let server = MockServer::start().await;
    mock_account_data(&server).await;

    let handle = test_handle();
    let account = AccountHandle::parse(&handle).unwrap();
    let master = account.master_key().unwrap();

    let a_key = derive_folder_key(&master, "/a").unwrap();
    let a_mk = hex::encode(a_key.metadata_key());
    let a_ks = a_key.key_string();

    let old_key = derive_folder_key(&master, "/a/old").unwrap();
    let old_mk = hex::encode(old_key.metadata_key());
    let old_ks = old_key.key_string();

    let new_key = derive_folder_key(&master, "/a/new").unwrap();
    let new_mk = hex::encode(new_key.metadata_key());
    let new_ks = new_key.key_string();

    let mut a_meta = FolderMetaData::new("a");
    a_meta.add_folder(FolderEntry { name: "old".to_string(), handle: old_mk.clone() });
    let sealed_a = encrypt_metadata(&a_meta, &a_ks).unwrap();

    let old_meta = FolderMetaData::new("old"); // empty: no files, no subfolders
    let sealed_old = encrypt_metadata(&old_meta, &old_ks).unwrap();

    let new_meta = FolderMetaData::new("new");
    let sealed_new = encrypt_metadata(&new_meta, &new_ks).unwrap();

    Mock::given(method("POST"))
        .and(path("/metadata/create"))
        .and(body_string_contains(&new_mk))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/metadata/set"))
        .and(body_string_contains(&new_mk))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"metadata": sealed_new})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/metadata/get"))
        .and(body_string_contains(&a_mk))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"metadata": sealed_a})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/metadata/set"))
        .and(body_string_contains(&a_mk))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"metadata": sealed_a})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/metadata/get"))
        .and(body_string_contains(&old_mk))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"metadata": sealed_old})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/metadata/delete"))
        .and(body_string_contains(&old_mk))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "metadata successfully deleted"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST")).and(path("/delete")).expect(0).mount(&server).await;

    let session = AccountSession::connect(&handle, config_for(&server)).await.unwrap();
    session.rename("/a", &old_mk, "old", "new").await.unwrap();
}

/// A file downloaded back out reassembles to byte-identical plaintext,
/// exercising the ranged-GET + block-boundary reassembly path directly
/// (no upload round trip — the ciphertext is built the same way
/// `pipeline::upload` builds it).
#[tokio::test]
async fn download_reassembles_multi_block_plaintext_exactly() {
    use rand::RngCore;

    let server = MockServer::start().await;
    mock_account_data(&server).await;

    let handle = test_handle();

    let mut file_id = [0u8; 32];
    let mut file_key = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut file_id);
    rand::thread_rng().fill_bytes(&mut file_key);
    let file_handle_hex = format!("{}{}", hex::encode(file_id), hex::encode(file_key));

    // A few blocks' worth of plaintext, deterministic content.
    let plaintext: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();

    let blocks = veilfs_core::chunking::plaintext_blocks(plaintext.len() as u64);
    let mut ciphertext = Vec::new();
    for (offset, len) in &blocks {
        let block = &plaintext[*offset as usize..(*offset + *len) as usize];
        ciphertext.extend(veilfs_crypto::seal(block, &file_key).unwrap());
    }
    let total_ciphertext = upload_size(plaintext.len() as u64);
    assert_eq!(ciphertext.len() as u64, total_ciphertext);

    let file_meta = FileMetaData {
        name: "reassembled.bin".to_string(),
        size: plaintext.len() as u64,
        mime_type: "application/octet-stream".to_string(),
        p: ChunkParams { part_size: veilfs_core::chunking::PART_SIZE, block_size: veilfs_core::chunking::BLOCK_SIZE },
    };
    let sealed_meta = veilfs_crypto::seal(&serde_json::to_vec(&file_meta).unwrap(), &file_key).unwrap();

    Mock::given(method("POST"))
        .and(path("/download"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "fileDownloadUrl": format!("{}/obj", server.uri()),
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/obj/metadata"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(sealed_meta))
        .mount(&server)
        .await;

    let num_parts = download_part_count(total_ciphertext);
    for part_number in 0..num_parts {
        let (from, to) = download_byte_range(part_number, total_ciphertext);
        let slice = ciphertext[from as usize..=(to as usize)].to_vec();
        Mock::given(method("GET"))
            .and(path("/obj/file"))
            .and(wiremock::matchers::header("Range", format!("bytes={from}-{to}").as_str()))
            .respond_with(ResponseTemplate::new(206).set_body_bytes(slice))
            .mount(&server)
            .await;
    }

    let session = AccountSession::connect(&handle, config_for(&server)).await.unwrap();

    let dest = tempdir().unwrap();
    let dest_path = session.download(&file_handle_hex, dest.path().to_str().unwrap()).await.unwrap();

    let downloaded = std::fs::read(&dest_path).unwrap();
    assert_eq!(downloaded, plaintext);

    // The temp staging directory must be cleaned up on success.
    assert!(!dest.path().join("tmp").exists());
}
