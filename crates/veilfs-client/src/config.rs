//! Broker client configuration.

use std::time::Duration;

/// Compile-time default broker base URL.
pub const DEFAULT_BASE_URL: &str = "https://broker-1.opacitynodes.com:3000/api/v1/";

/// Number of parallel upload-part workers.
pub const DEFAULT_UPLOAD_WORKERS: usize = 8;
/// Number of parallel ranged-download workers.
pub const DEFAULT_DOWNLOAD_WORKERS: usize = 5;
/// Retries after `chunks missing` before `UploadIncomplete`.
pub const DEFAULT_MAX_UPLOAD_RETRIES: u32 = 3;

/// Broker transport configuration. Overridable through the CLI's `clap`
/// layer / `.env` file in precedence CLI flag > env var, falling back to
/// [`DEFAULT_BASE_URL`] otherwise.
#[derive(Clone, Debug)]
pub struct Config {
    /// Broker base URL, e.g. `https://broker-1.opacitynodes.com:3000/api/v1/`.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// User agent string sent with every request.
    pub user_agent: String,
    /// Retries for the upload verification loop.
    pub max_retries: u32,
    /// Concurrent upload-part workers.
    pub upload_workers: usize,
    /// Concurrent ranged-download workers.
    pub download_workers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(60),
            user_agent: format!("veilfs-client/{}", env!("CARGO_PKG_VERSION")),
            max_retries: DEFAULT_MAX_UPLOAD_RETRIES,
            upload_workers: DEFAULT_UPLOAD_WORKERS,
            download_workers: DEFAULT_DOWNLOAD_WORKERS,
        }
    }
}

impl Config {
    /// Create a new config pointed at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), ..Default::default() }
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the upload verification retry count.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Build the base URL for API requests.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
