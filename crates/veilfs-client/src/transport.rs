//! Broker transport: one typed method per endpoint.
//!
//! Every signed call canonicalizes its body with [`serde_json::to_string`],
//! signs it with [`veilfs_crypto::sign_request`], and sends it either as a
//! plain JSON object through one private helper shared by every typed
//! method, or as a multipart form for the two binary-carrying endpoints,
//! whose three signature fields (`requestBody`, `signature`, `publicKey`)
//! travel as separate form parts alongside the binary payload.

use bytes::Bytes;
use chrono::Utc;
use reqwest::{multipart, Client, Response};
use serde::Serialize;
use tracing::{debug, instrument};
use veilfs_crypto::{sign_request, MasterKey};

use crate::config::Config;
use crate::error::{ClientError, Result};
use crate::types::*;

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Thin wrapper over a `reqwest::Client` pointed at one broker base URL.
pub struct BrokerTransport {
    config: Config,
    http: Client,
}

impl BrokerTransport {
    pub fn new(config: Config) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ClientError::BrokerError { status: status.as_u16(), body })
    }

    async fn post_signed_json<B: Serialize>(&self, path: &str, master: &MasterKey, body: &B) -> Result<Response> {
        let canonical = serde_json::to_string(body)?;
        let envelope = sign_request(master, &canonical)?;
        let response = self.http.post(self.endpoint(path)).json(&envelope).send().await?;
        Self::check_status(response).await
    }

    /// Build the three signature form parts (`requestBody`, `signature`,
    /// `publicKey`) plus one named binary part.
    async fn post_signed_multipart<B: Serialize>(
        &self,
        path: &str,
        master: &MasterKey,
        body: &B,
        binary_field: &str,
        binary: Vec<u8>,
    ) -> Result<Response> {
        let canonical = serde_json::to_string(body)?;
        let envelope = sign_request(master, &canonical)?;

        let form = multipart::Form::new()
            .text("requestBody", envelope.request_body)
            .text("signature", envelope.signature)
            .text("publicKey", envelope.public_key)
            .part(binary_field.to_string(), multipart::Part::bytes(binary));

        let response = self.http.post(self.endpoint(path)).multipart(form).send().await?;
        Self::check_status(response).await
    }

    #[instrument(skip(self, master))]
    pub async fn account_data(&self, master: &MasterKey) -> Result<AccountStatus> {
        let response = self
            .http
            .post(self.endpoint("account-data"))
            .json(&sign_request(master, &serde_json::json!({ "timestamp": now_ms() }).to_string())?)
            .send()
            .await?;

        if response.status().as_u16() == 404 {
            return Err(ClientError::InvalidHandle("broker rejected account handle".to_string()));
        }
        let response = Self::check_status(response).await?;
        Ok(response.json().await?)
    }

    #[instrument(skip(self, master, encrypted_metadata), fields(file_handle))]
    pub async fn init_upload(
        &self,
        master: &MasterKey,
        file_handle: &str,
        file_size_in_byte: u64,
        end_index: u32,
        encrypted_metadata: Vec<u8>,
    ) -> Result<()> {
        debug!(file_handle, file_size_in_byte, end_index, "init-upload");
        let body = InitUploadRequest {
            file_handle: file_handle.to_string(),
            file_size_in_byte,
            end_index,
        };
        self.post_signed_multipart("init-upload", master, &body, "metadata", encrypted_metadata).await?;
        Ok(())
    }

    #[instrument(skip(self, master, chunk_data), fields(file_handle, part_index))]
    pub async fn upload_part(
        &self,
        master: &MasterKey,
        file_handle: &str,
        part_index: u32,
        end_index: u32,
        chunk_data: Vec<u8>,
    ) -> Result<()> {
        let body = UploadPartRequest {
            file_handle: file_handle.to_string(),
            part_index,
            end_index,
        };
        self.post_signed_multipart("upload", master, &body, "chunkData", chunk_data).await?;
        Ok(())
    }

    #[instrument(skip(self, master), fields(file_handle))]
    pub async fn upload_status(&self, master: &MasterKey, file_handle: &str) -> Result<UploadStatusResponse> {
        let body = UploadStatusRequest { file_handle: file_handle.to_string() };
        let response = self.post_signed_json("upload-status", master, &body).await?;
        Ok(response.json().await?)
    }

    /// Unsigned: the broker resolves a download URL from the bare file id
    /// without proof of ownership.
    #[instrument(skip(self))]
    pub async fn download(&self, file_id: &str) -> Result<DownloadUrlResponse> {
        let body = DownloadRequest { file_id: file_id.to_string() };
        let response = self.http.post(self.endpoint("download")).json(&body).send().await?;
        let response = Self::check_status(response).await?;
        Ok(response.json().await?)
    }

    #[instrument(skip(self))]
    pub async fn fetch_metadata_blob(&self, download_url: &str) -> Result<Bytes> {
        let url = format!("{download_url}/metadata");
        let response = self.http.get(&url).send().await?;
        let response = Self::check_status(response).await?;
        Ok(response.bytes().await?)
    }

    #[instrument(skip(self))]
    pub async fn fetch_file_range(&self, download_url: &str, from: u64, to: u64) -> Result<Bytes> {
        let url = format!("{download_url}/file");
        let response = self
            .http
            .get(&url)
            .header("Range", format!("bytes={from}-{to}"))
            .send()
            .await?;
        let response = Self::check_status(response).await?;
        Ok(response.bytes().await?)
    }

    /// `true` if this call created fresh metadata; `false` if the broker
    /// returned 403 because the key already exists, letting callers treat
    /// folder creation as idempotent.
    #[instrument(skip(self, master), fields(metadata_key))]
    pub async fn metadata_create(&self, master: &MasterKey, metadata_key: &str) -> Result<bool> {
        let body = MetadataKeyRequest { timestamp: now_ms(), metadata_key: metadata_key.to_string() };
        let canonical = serde_json::to_string(&body)?;
        let envelope = sign_request(master, &canonical)?;
        let response = self.http.post(self.endpoint("metadata/create")).json(&envelope).send().await?;

        if response.status().as_u16() == 403 {
            return Ok(false);
        }
        Self::check_status(response).await?;
        Ok(true)
    }

    #[instrument(skip(self, master), fields(metadata_key))]
    pub async fn metadata_get(&self, master: &MasterKey, metadata_key: &str) -> Result<String> {
        let body = MetadataKeyRequest { timestamp: now_ms(), metadata_key: metadata_key.to_string() };
        let response = self.post_signed_json("metadata/get", master, &body).await?;
        let parsed: MetadataGetResponse = response.json().await?;
        Ok(parsed.metadata)
    }

    #[instrument(skip(self, master, metadata_b64), fields(metadata_key))]
    pub async fn metadata_set(&self, master: &MasterKey, metadata_key: &str, metadata_b64: String) -> Result<String> {
        let body = MetadataSetRequest { timestamp: now_ms(), metadata_key: metadata_key.to_string(), metadata: metadata_b64 };
        let response = self.post_signed_json("metadata/set", master, &body).await?;
        let parsed: MetadataGetResponse = response.json().await?;
        Ok(parsed.metadata)
    }

    #[instrument(skip(self, master), fields(metadata_key))]
    pub async fn metadata_delete(&self, master: &MasterKey, metadata_key: &str) -> Result<()> {
        let body = MetadataKeyRequest { timestamp: now_ms(), metadata_key: metadata_key.to_string() };
        self.post_signed_json("metadata/delete", master, &body).await?;
        Ok(())
    }

    #[instrument(skip(self, master), fields(file_id))]
    pub async fn delete_file(&self, master: &MasterKey, file_id: &str) -> Result<()> {
        let body = DeleteFileRequest { file_id: file_id.to_string() };
        self.post_signed_json("delete", master, &body).await?;
        Ok(())
    }
}
