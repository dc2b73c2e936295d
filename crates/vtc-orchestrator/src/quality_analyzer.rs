//! Bitrate analysis in the caller's namespace.

use std::sync::Arc;

use tracing::{debug, warn};

use vtc_client::TranscodeClient;
use vtc_models::{PathTranslator, QualityAnalysis};

use crate::preset_selector::select_preset;

/// Local preset decision together with the analysis that informed it.
#[derive(Debug, Clone, PartialEq)]
pub struct PresetSuggestion {
    pub preset: &'static str,
    pub analysis: QualityAnalysis,
}

/// Runs the worker's bitrate analysis on caller-side paths.
#[derive(Clone)]
pub struct QualityAnalyzer {
    client: Arc<TranscodeClient>,
    paths: Arc<PathTranslator>,
}

impl QualityAnalyzer {
    pub fn new(client: Arc<TranscodeClient>, paths: Arc<PathTranslator>) -> Self {
        Self { client, paths }
    }

    /// Analyze a local file. Reports `unknown` on any failure.
    pub async fn analyze(&self, local_path: &str) -> QualityAnalysis {
        let remote = match self.paths.translate(local_path) {
            Ok(remote) => remote,
            Err(e) => {
                warn!(path = %local_path, "Skipping bitrate analysis: {}", e);
                return QualityAnalysis::unknown();
            }
        };

        let analysis = self.client.analyze_bitrate(&remote).await;
        debug!(
            path = %local_path,
            quality = %analysis.quality,
            ratio = ?analysis.bitrate_ratio,
            "Bitrate analysis finished"
        );
        analysis
    }

    /// Analyze, then choose a preset locally.
    pub async fn recommend(
        &self,
        local_path: &str,
        size_mb: f64,
        duration_minutes: f64,
    ) -> PresetSuggestion {
        let analysis = self.analyze(local_path).await;
        let preset = select_preset(size_mb, duration_minutes, Some(analysis.quality));
        PresetSuggestion { preset, analysis }
    }
}
