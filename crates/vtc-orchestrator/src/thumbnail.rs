//! Thumbnail extraction for finished transcodes.
//!
//! Thumbnails are best effort: a failure is reported in the outcome and
//! logged, never raised.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use vtc_client::{ThumbnailFormat, ThumbnailRequest, TranscodeClient};
use vtc_models::path::is_under;
use vtc_models::PathTranslator;

use crate::config::ThumbnailConfig;
use crate::error::OrchestratorResult;
use crate::metrics;

/// Result of a thumbnail attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThumbnailOutcome {
    pub success: bool,
    /// Local path of the thumbnail
    pub path: Option<String>,
    /// Public URL, when the thumbnail lives under the public root
    pub url: Option<String>,
    pub error: Option<String>,
}

impl ThumbnailOutcome {
    pub(crate) fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            path: None,
            url: None,
            error: Some(error.into()),
        }
    }
}

/// Default thumbnail location: `<dir>/<stem>_thumb.<ext>` next to the video.
pub fn default_thumbnail_path(video_path: &str, format: ThumbnailFormat) -> String {
    let path = Path::new(video_path);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("video");
    path.with_file_name(format!("{}_thumb.{}", stem, format.extension()))
        .to_string_lossy()
        .into_owned()
}

/// Public URL for a local file, if it is under `public_root`.
pub fn public_url(local_path: &str, public_root: &str, public_base_url: &str) -> Option<String> {
    let root = public_root.trim_end_matches('/');
    if !is_under(local_path, root) {
        return None;
    }
    Some(format!(
        "{}{}",
        public_base_url.trim_end_matches('/'),
        &local_path[root.len()..]
    ))
}

/// Requests thumbnails from the worker and maps results back to local paths.
#[derive(Clone)]
pub struct ThumbnailOrchestrator {
    client: Arc<TranscodeClient>,
    paths: Arc<PathTranslator>,
    config: ThumbnailConfig,
}

impl ThumbnailOrchestrator {
    pub fn new(
        client: Arc<TranscodeClient>,
        paths: Arc<PathTranslator>,
        config: ThumbnailConfig,
    ) -> Self {
        Self {
            client,
            paths,
            config,
        }
    }

    /// Extraction settings in use.
    pub fn config(&self) -> &ThumbnailConfig {
        &self.config
    }

    /// Generate a thumbnail for a local video.
    ///
    /// Without `output_local_path` the thumbnail is written next to the video.
    pub async fn generate(
        &self,
        local_video_path: &str,
        output_local_path: Option<&str>,
    ) -> ThumbnailOutcome {
        match self.try_generate(local_video_path, output_local_path).await {
            Ok((path, url)) => {
                metrics::record_side_effect("thumbnail", "ok");
                info!(video = %local_video_path, thumbnail = %path, "Thumbnail generated");
                ThumbnailOutcome {
                    success: true,
                    path: Some(path),
                    url,
                    error: None,
                }
            }
            Err(e) => {
                metrics::record_side_effect("thumbnail", "failed");
                warn!(video = %local_video_path, "Thumbnail generation failed: {}", e);
                ThumbnailOutcome::failed(e.to_string())
            }
        }
    }

    async fn try_generate(
        &self,
        local_video_path: &str,
        output_local_path: Option<&str>,
    ) -> OrchestratorResult<(String, Option<String>)> {
        let output_local = match output_local_path {
            Some(path) => path.to_string(),
            None => default_thumbnail_path(local_video_path, self.config.format),
        };

        let request = ThumbnailRequest {
            input_file: self.paths.translate(local_video_path)?,
            output_file: Some(self.paths.translate(&output_local)?),
            timestamp: self.config.timestamp_secs,
            format: self.config.format,
            quality: self.config.quality,
            width: self.config.width,
            height: self.config.height,
        };

        let response = self.client.generate_thumbnail(&request).await?;
        let local = self.paths.reverse_translate(&response.thumbnail_path)?;
        let url = public_url(
            &local,
            &self.config.public_root,
            &self.config.public_base_url,
        );
        Ok((local, url))
    }
}
