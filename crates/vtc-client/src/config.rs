//! Transcode client configuration.

use std::time::Duration;

use url::Url;

use crate::error::{ClientResult, TranscodeError};

const DEFAULT_BASE_URL: &str = "http://localhost:3001";

/// Configuration for the transcode client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the transcode worker
    pub base_url: String,
    /// Per-request timeout, long enough for large uploads
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(600), // 10 minutes for multi-GB uploads
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl ClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("TRANSCODE_SERVICE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            timeout: Duration::from_secs(
                std::env::var("TRANSCODE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600),
            ),
            connect_timeout: Duration::from_secs(
                std::env::var("TRANSCODE_CONNECT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
        }
    }

    /// Create config pointing at a specific worker.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Parse and validate the base URL.
    pub fn parsed_base_url(&self) -> ClientResult<Url> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| TranscodeError::config(format!("invalid base URL {}: {}", self.base_url, e)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(TranscodeError::config(format!(
                "unsupported scheme in base URL: {}",
                url.scheme()
            )));
        }
        if url.cannot_be_a_base() {
            return Err(TranscodeError::config(format!(
                "base URL cannot carry a path: {}",
                self.base_url
            )));
        }

        Ok(url)
    }
}
