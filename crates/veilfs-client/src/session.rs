//! Account session.
//!
//! Constructed from a 128-hex handle; immediately verifies it against the
//! broker. Exposes the mutating command surface both directly and through
//! an [`veilfs_core::ActionQueue`], wiring the queue's injected
//! [`ActionHandler`] back into this session's own tree/pipeline calls.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;
use veilfs_core::{Action, ActionHandler, ActionQueue, FileEntry};
use veilfs_crypto::{AccountHandle, MasterKey};

use crate::config::Config;
use crate::error::Result;
use crate::pipeline;
use crate::tree::{self, FolderView};
use crate::transport::BrokerTransport;

/// Default bound on the action queue's backlog before `enqueue` blocks.
const ACTION_QUEUE_CAPACITY: usize = 64;

/// Holds the master key and broker transport for one authenticated
/// session, and orchestrates the transport, tree-operation, pipeline, and
/// action-queue layers above it.
pub struct AccountSession {
    master: MasterKey,
    transport: Arc<BrokerTransport>,
    config: Config,
}

impl AccountSession {
    /// Parse `handle`, derive its master key, and verify it against the
    /// broker's `account-data` endpoint (404 → `InvalidHandle`, fatal).
    #[instrument(skip(handle, config))]
    pub async fn connect(handle: &str, config: Config) -> Result<Self> {
        let account = AccountHandle::parse(handle)?;
        let master = account.master_key()?;
        let transport = Arc::new(BrokerTransport::new(config.clone())?);
        transport.account_data(&master).await?;
        Ok(Self { master, transport, config })
    }

    /// Spawn this session's action queue, backed by a handler that
    /// dispatches into this session's own upload/delete/move.
    pub fn spawn_action_queue(self: &Arc<Self>) -> ActionQueue {
        ActionQueue::spawn(SessionActionHandler { session: self.clone() }, ACTION_QUEUE_CAPACITY)
    }

    #[instrument(skip(self))]
    pub async fn get_folder_data(&self, path: &str) -> Result<FolderView> {
        tree::get_folder_data(&self.transport, &self.master, path).await
    }

    #[instrument(skip(self))]
    pub async fn create_folder(&self, abs_path: &str) -> Result<veilfs_core::FolderEntry> {
        tree::create_folder(&self.transport, &self.master, abs_path).await
    }

    /// `upload(localPath, opacityPath)`: refuses a zero-byte file before
    /// any broker call, then reads the target folder's metadata so a
    /// duplicate name costs only that one round trip, then runs the chunk
    /// pipeline and appends the resulting `FileEntry`.
    #[instrument(skip(self))]
    pub async fn upload(&self, local_path: &str, opacity_path: &str) -> Result<bool> {
        let local_path = Path::new(local_path);
        let name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| crate::error::ClientError::InvalidPath(local_path.display().to_string()))?;

        if tokio::fs::metadata(local_path).await?.len() == 0 {
            return Ok(false);
        }

        let target = self.get_folder_data(opacity_path).await?;
        if target.metadata.has_file_named(name) {
            return Ok(false);
        }

        let uploaded = pipeline::upload(&self.transport, &self.master, &self.config, local_path).await?;
        let entry = FileEntry::new(uploaded.name, uploaded.size, uploaded.handle.to_hex());
        tree::add_file_entry(&self.transport, &self.master, opacity_path, entry).await?;
        Ok(true)
    }

    /// `download(handle, destDir)`.
    #[instrument(skip(self))]
    pub async fn download(&self, handle: &str, dest_dir: &str) -> Result<PathBuf> {
        let file_handle = match veilfs_core::parse_handle(handle)? {
            veilfs_core::Handle::File(fh) => fh,
            veilfs_core::Handle::Folder(_) => {
                return Err(crate::error::ClientError::InvalidPath(format!("{handle} is a folder handle, not a file handle")))
            }
        };
        pipeline::download(&self.transport, &self.config, &file_handle, Path::new(dest_dir)).await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, opacity_path: &str, handle: &str) -> Result<()> {
        tree::delete(&self.transport, &self.master, opacity_path, handle, true).await
    }

    #[instrument(skip(self))]
    pub async fn rename(&self, opacity_path: &str, handle: &str, old_name: &str, new_name: &str) -> Result<()> {
        tree::rename(&self.transport, &self.master, opacity_path, handle, old_name, new_name).await
    }

    #[instrument(skip(self))]
    pub async fn move_item(&self, from_path: &str, handle: &str, to_path: &str) -> Result<()> {
        tree::move_item(&self.transport, &self.master, from_path, handle, to_path).await
    }
}

struct SessionActionHandler {
    session: Arc<AccountSession>,
}

#[async_trait]
impl ActionHandler for SessionActionHandler {
    async fn handle(&self, action: Action) -> std::result::Result<(), String> {
        let result = match action {
            Action::Upload { local_path, opacity_path } => self.session.upload(&local_path, &opacity_path).await.map(|_| ()),
            Action::Delete { opacity_path, handle } => self.session.delete(&opacity_path, &handle).await,
            Action::Move { from, handle, to } => self.session.move_item(&from, &handle, &to).await,
        };
        result.map_err(|err| err.to_string())
    }
}
