//! # veilfs-cli
//!
//! Interactive command-line front end for [`veilfs_client::AccountSession`]:
//! a REPL that reads whitespace-split, shell-quoted commands from stdin and
//! dispatches them against the folder tree.
//!
//! This crate owns no cryptography, transport, or tree-operation logic of
//! its own; it is a thin shell around `veilfs-client`.

pub mod commands;
pub mod config;
pub mod error;
pub mod repl;

pub use config::CliConfig;
pub use error::CliError;
pub use repl::run;
