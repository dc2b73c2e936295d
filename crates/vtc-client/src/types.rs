//! Transcode service request/response types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use vtc_models::{JobId, PresetChoice, QualityLevel, SubmitMetadata, TranscodeJob, VideoProbe};

/// Response to any job submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub job_id: JobId,
    /// Probe of the input, when the worker ran one
    #[serde(default, alias = "videoInfo")]
    pub video_probe: Option<VideoProbe>,
}

/// Transcode request for a file already on shared storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathSubmitRequest {
    /// Input path in the worker namespace
    pub input_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,
    pub preset: PresetChoice,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<SubmitMetadata>,
}

/// Dynamic-bitrate transcode request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicSubmitRequest {
    pub input_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_quality: Option<QualityLevel>,
}

/// Wrapper around a full job snapshot.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct JobEnvelope {
    pub job: TranscodeJob,
}

/// Preset catalog response.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PresetsEnvelope {
    #[serde(default)]
    pub presets: Vec<vtc_models::PresetDefinition>,
}

/// Bitrate analysis request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AnalyzeRequest<'a> {
    pub input_file: &'a str,
}

/// Thumbnail image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThumbnailFormat {
    #[default]
    Jpeg,
    Png,
    Webp,
}

impl ThumbnailFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThumbnailFormat::Jpeg => "jpeg",
            ThumbnailFormat::Png => "png",
            ThumbnailFormat::Webp => "webp",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ThumbnailFormat::Jpeg => "jpg",
            ThumbnailFormat::Png => "png",
            ThumbnailFormat::Webp => "webp",
        }
    }
}

impl fmt::Display for ThumbnailFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThumbnailFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(ThumbnailFormat::Jpeg),
            "png" => Ok(ThumbnailFormat::Png),
            "webp" => Ok(ThumbnailFormat::Webp),
            other => Err(format!("unsupported thumbnail format: {}", other)),
        }
    }
}

/// Thumbnail extraction request. Paths are in the worker namespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThumbnailRequest {
    pub input_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,
    /// Seconds into the video
    pub timestamp: f64,
    pub format: ThumbnailFormat,
    /// Encoder quality, 1-100
    pub quality: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// Thumbnail extraction response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThumbnailResponse {
    /// Thumbnail path in the worker namespace
    pub thumbnail_path: String,
    #[serde(default)]
    pub timestamp: Option<f64>,
}

/// Temp-file cleanup request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CleanupRequest<'a> {
    pub file_path: &'a str,
}

/// Temp-file cleanup response.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CleanupResponse {
    /// False when the file was already gone
    #[serde(default)]
    pub deleted: bool,
}

/// Queue clear response.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ClearQueueResponse {
    #[serde(default)]
    pub cleared: u64,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: Option<String>,
}
