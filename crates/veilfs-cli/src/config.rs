//! CLI configuration: broker base URL and account handle sourcing.
//!
//! Precedence is CLI flag > environment variable > default, resolved by
//! `clap` fields carrying `env = "..."` attributes read by the derive
//! itself rather than any manual fallback chain.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "veilfs")]
#[command(about = "Interactive client for veilfs's end-to-end encrypted folder tree")]
#[command(version)]
pub struct CliArgs {
    /// 128-hex-char account handle. Prompted interactively if omitted.
    #[arg(long, env = "VEILFS_HANDLE")]
    pub handle: Option<String>,

    /// Broker base URL; defaults to the compile-time broker address.
    #[arg(long, env = "VEILFS_BASE_URL")]
    pub base_url: Option<String>,

    /// Enable debug logging.
    #[arg(short, long, env = "VEILFS_DEBUG")]
    pub debug: bool,
}

/// Resolved session configuration handed to [`crate::repl::run`].
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub handle: Option<String>,
    pub client: veilfs_client::Config,
}

impl From<CliArgs> for CliConfig {
    fn from(args: CliArgs) -> Self {
        let mut client = veilfs_client::Config::default();
        if let Some(base_url) = args.base_url {
            client.base_url = base_url;
        }
        Self { handle: args.handle, client }
    }
}
