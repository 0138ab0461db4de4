//! Archive transport.
//!
//! Downloads remote archives to temporary files that are deleted when the
//! returned handle is dropped.

use super::types::AddonError;
use reqwest::blocking::Client;
use std::sync::OnceLock;
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Per-request timeout for archive downloads.
const DOWNLOAD_TIMEOUT_SECS: u64 = 300;

/// User agent sent with download requests.
const USER_AGENT: &str = concat!("addon-installer/", env!("CARGO_PKG_VERSION"));

/// Fetches archives from remote locations.
pub trait ArchiveTransport: Send + Sync {
    /// Downloads `url` to a temporary file.
    fn download(&self, url: &str) -> Result<NamedTempFile, AddonError>;
}

/// HTTP(S) transport backed by a blocking reqwest client.
///
/// The client is built on the first download.
#[derive(Debug)]
pub struct HttpTransport {
    /// HTTP client, or the reason it could not be built.
    client: OnceLock<Result<Client, String>>,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport {
    /// Creates a new transport.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: OnceLock::new(),
        }
    }

    fn client(&self) -> Result<&Client, AddonError> {
        self.client
            .get_or_init(|| {
                Client::builder()
                    .user_agent(USER_AGENT)
                    .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
                    .build()
                    .map_err(|e| {
                        warn!("[ADDON-INSTALL] Could not build HTTP client: {}", e);
                        e.to_string()
                    })
            })
            .as_ref()
            .map_err(|e| AddonError::Retrieval(format!("HTTP client unavailable: {}", e)))
    }
}

impl ArchiveTransport for HttpTransport {
    fn download(&self, url: &str) -> Result<NamedTempFile, AddonError> {
        info!("[ADDON-INSTALL] Downloading {}", url);

        let mut response = self
            .client()?
            .get(url)
            .send()
            .map_err(|e| AddonError::Retrieval(format!("Download failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AddonError::Retrieval(format!(
                "Download of {} failed: {}",
                url,
                response.status()
            )));
        }

        let mut file = tempfile::Builder::new()
            .prefix("addon-download-")
            .suffix(".zip")
            .tempfile()?;

        let bytes = response
            .copy_to(file.as_file_mut())
            .map_err(|e| AddonError::Retrieval(format!("Failed to read response: {}", e)))?;

        debug!("[ADDON-INSTALL] Downloaded {} bytes to {:?}", bytes, file.path());
        Ok(file)
    }
}
