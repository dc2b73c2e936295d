//! Orchestrator configuration.

use std::str::FromStr;
use std::time::Duration;

use vtc_client::{ClientConfig, ThumbnailFormat};
use vtc_models::{PathMapping, PathTranslator};

use crate::error::OrchestratorResult;

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

/// Floor for env-configured poll delays, so a zero cannot spin the poller.
const MIN_POLL_DELAY_MS: u64 = 100;

/// Polling cadence for the job tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between polls of a healthy job
    pub interval: Duration,
    /// Delay after a failed poll
    pub backoff: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            backoff: Duration::from_secs(5),
        }
    }
}

impl PollConfig {
    /// Read `TRANSCODE_POLL_INTERVAL_MS` and `TRANSCODE_POLL_BACKOFF_MS`.
    pub fn from_env() -> Self {
        let interval: u64 = env_or("TRANSCODE_POLL_INTERVAL_MS", 2000);
        let backoff: u64 = env_or("TRANSCODE_POLL_BACKOFF_MS", 5000);
        Self {
            interval: Duration::from_millis(interval.max(MIN_POLL_DELAY_MS)),
            backoff: Duration::from_millis(backoff.max(MIN_POLL_DELAY_MS)),
        }
    }
}

/// Thumbnail extraction settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailConfig {
    /// Seconds into the video
    pub timestamp_secs: f64,
    pub format: ThumbnailFormat,
    /// Encoder quality, 1-100
    pub quality: u8,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Local directory served publicly
    pub public_root: String,
    /// URL prefix that `public_root` is served under
    pub public_base_url: String,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            timestamp_secs: 5.0,
            format: ThumbnailFormat::Jpeg,
            quality: 85,
            width: Some(640),
            height: None,
            public_root: "/mnt/media".to_string(),
            public_base_url: "/media".to_string(),
        }
    }
}

impl ThumbnailConfig {
    /// Read thumbnail settings, clamping quality into 1-100.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            timestamp_secs: env_or("TRANSCODE_THUMBNAIL_TIMESTAMP", defaults.timestamp_secs),
            format: env_or("TRANSCODE_THUMBNAIL_FORMAT", defaults.format),
            quality: env_or("TRANSCODE_THUMBNAIL_QUALITY", defaults.quality).clamp(1, 100),
            width: Some(env_or("TRANSCODE_THUMBNAIL_WIDTH", 640)),
            height: None,
            public_root: env_string("TRANSCODE_PUBLIC_ROOT", &defaults.public_root),
            public_base_url: env_string("TRANSCODE_PUBLIC_BASE_URL", &defaults.public_base_url),
        }
    }
}

/// Temp-upload cleanup settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupConfig {
    /// Local prefixes under which deletion is allowed
    pub temp_prefixes: Vec<String>,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            temp_prefixes: vec!["/mnt/uploads/tmp".to_string()],
        }
    }
}

impl CleanupConfig {
    /// Read comma-separated `TRANSCODE_TEMP_PREFIXES`.
    pub fn from_env() -> Self {
        match std::env::var("TRANSCODE_TEMP_PREFIXES") {
            Ok(raw) => Self {
                temp_prefixes: raw
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            },
            Err(_) => Self::default(),
        }
    }
}

/// Full orchestrator configuration.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub client: ClientConfig,
    /// Uploads and media volume mappings
    pub path_mappings: Vec<PathMapping>,
    pub poll: PollConfig,
    pub thumbnail: ThumbnailConfig,
    pub cleanup: CleanupConfig,
    /// Reject submissions locally when the worker reports no capacity
    pub enforce_admission: bool,
    /// Forward `auto` presets to the worker instead of choosing locally
    pub remote_auto_preset: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            path_mappings: vec![
                PathMapping::new("/mnt/uploads", "/data/uploads"),
                PathMapping::new("/mnt/media", "/data/media"),
            ],
            poll: PollConfig::default(),
            thumbnail: ThumbnailConfig::default(),
            cleanup: CleanupConfig::default(),
            enforce_admission: true,
            remote_auto_preset: true,
        }
    }
}

impl OrchestratorConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            client: ClientConfig::from_env(),
            path_mappings: vec![
                PathMapping::new(
                    env_string("TRANSCODE_LOCAL_UPLOADS", "/mnt/uploads"),
                    env_string("TRANSCODE_REMOTE_UPLOADS", "/data/uploads"),
                ),
                PathMapping::new(
                    env_string("TRANSCODE_LOCAL_MEDIA", "/mnt/media"),
                    env_string("TRANSCODE_REMOTE_MEDIA", "/data/media"),
                ),
            ],
            poll: PollConfig::from_env(),
            thumbnail: ThumbnailConfig::from_env(),
            cleanup: CleanupConfig::from_env(),
            enforce_admission: env_flag("TRANSCODE_ENFORCE_ADMISSION", true),
            remote_auto_preset: env_flag("TRANSCODE_REMOTE_AUTO_PRESET", true),
        }
    }

    /// Build the translator for the configured mappings.
    pub fn path_translator(&self) -> OrchestratorResult<PathTranslator> {
        Ok(PathTranslator::new(self.path_mappings.clone())?)
    }
}
