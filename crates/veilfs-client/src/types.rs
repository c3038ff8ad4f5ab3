//! Broker wire types, one pair of request/response structs per endpoint.

use serde::{Deserialize, Serialize};

/// Response body of `account-data`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccountStatus {
    pub status: String,
    #[serde(default)]
    pub used_storage: Option<u64>,
}

/// Request body (pre-signing) of `init-upload`.
#[derive(Clone, Debug, Serialize)]
pub struct InitUploadRequest {
    #[serde(rename = "fileHandle")]
    pub file_handle: String,
    #[serde(rename = "fileSizeInByte")]
    pub file_size_in_byte: u64,
    #[serde(rename = "endIndex")]
    pub end_index: u32,
}

/// Request body (pre-signing) of `upload`.
#[derive(Clone, Debug, Serialize)]
pub struct UploadPartRequest {
    #[serde(rename = "fileHandle")]
    pub file_handle: String,
    #[serde(rename = "partIndex")]
    pub part_index: u32,
    #[serde(rename = "endIndex")]
    pub end_index: u32,
}

/// Request body (pre-signing) of `upload-status`.
#[derive(Clone, Debug, Serialize)]
pub struct UploadStatusRequest {
    #[serde(rename = "fileHandle")]
    pub file_handle: String,
}

/// Response body of `upload-status`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadStatusResponse {
    pub status: String,
    #[serde(rename = "endIndex")]
    pub end_index: u32,
    #[serde(rename = "missingIndexes", default)]
    pub missing_indexes: Vec<u32>,
}

impl UploadStatusResponse {
    /// The broker's success sentinel.
    pub const UPLOADED: &'static str = "File is uploaded";
    /// The broker's retry sentinel.
    pub const CHUNKS_MISSING: &'static str = "chunks missing";

    pub fn is_complete(&self) -> bool {
        self.status == Self::UPLOADED
    }
}

/// Unsigned request body of `download`.
#[derive(Clone, Debug, Serialize)]
pub struct DownloadRequest {
    #[serde(rename = "fileID")]
    pub file_id: String,
}

/// Response body of `download`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadUrlResponse {
    #[serde(rename = "fileDownloadUrl")]
    pub file_download_url: String,
}

/// Request body (pre-signing) of `metadata/create`, `metadata/get`, and
/// `metadata/delete`.
#[derive(Clone, Debug, Serialize)]
pub struct MetadataKeyRequest {
    pub timestamp: i64,
    #[serde(rename = "metadataKey")]
    pub metadata_key: String,
}

/// Request body (pre-signing) of `metadata/set`.
#[derive(Clone, Debug, Serialize)]
pub struct MetadataSetRequest {
    pub timestamp: i64,
    #[serde(rename = "metadataKey")]
    pub metadata_key: String,
    pub metadata: String,
}

/// Response body of `metadata/get`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetadataGetResponse {
    /// base64(AES-GCM-256(serialized `FolderMetaData`))
    pub metadata: String,
}

/// Response body of `metadata/delete`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetadataDeleteResponse {
    pub status: String,
}

/// Signed request body of `delete`.
#[derive(Clone, Debug, Serialize)]
pub struct DeleteFileRequest {
    #[serde(rename = "fileID")]
    pub file_id: String,
}
