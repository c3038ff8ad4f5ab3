//! Error types surfaced at the CLI command boundary.
//!
//! Every variant here is a user-readable string by the time it reaches
//! [`crate::repl::run`]'s print loop; nothing below this layer panics or
//! aborts the REPL — every command error is caught, printed, and the loop
//! continues, rather than silently discarded or fatal.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Error, Debug)]
pub enum CliError {
    /// Account handle rejected before or during session setup; fatal to
    /// the whole process, unlike every other variant here.
    #[error("invalid account handle: {0}")]
    InvalidHandle(String),

    /// A command line didn't parse (wrong arity, unknown verb handled
    /// separately as a printed notice rather than an error).
    #[error("usage: {0}")]
    Usage(String),

    #[error(transparent)]
    Client(#[from] veilfs_client::ClientError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
