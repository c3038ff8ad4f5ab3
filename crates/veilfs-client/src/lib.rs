//! # veilfs-client
//!
//! Broker transport (C4), the encrypted chunk pipeline (C5), and folder
//! tree operations (C7), wired together behind an [`AccountSession`] (C9).
//!
//! This crate owns every bit of network and filesystem I/O in veilfs; the
//! pure domain logic it builds on (chunk-size math, the metadata codec,
//! the action queue) lives in [`veilfs_core`], and all key material and
//! AEAD/signing primitives come from [`veilfs_crypto`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use veilfs_client::{AccountSession, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let session = AccountSession::connect(&handle, Config::default()).await?;
//!     session.create_folder("/docs").await?;
//!     session.upload("/home/me/report.pdf", "/docs").await?;
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod pipeline;
mod session;
mod transport;
mod tree;
mod types;

pub use config::Config;
pub use error::{ClientError, Result};
pub use pipeline::UploadedFile;
pub use session::AccountSession;
pub use transport::BrokerTransport;
pub use tree::FolderView;
pub use types::*;
