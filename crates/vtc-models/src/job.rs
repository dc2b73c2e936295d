//! Transcode job snapshots as observed from the remote worker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque job identifier assigned by the remote worker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Job state on the remote worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Queued, not yet picked up by an encoder
    #[default]
    #[serde(alias = "delayed")]
    Waiting,
    /// Being encoded
    Active,
    /// Finished successfully
    Completed,
    /// Reported as failed by the worker
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Waiting => "waiting",
            JobState::Active => "active",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }

    /// Terminal states are sinks: no further transitions occur.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Output video stream metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStreamInfo {
    #[serde(default)]
    pub codec: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub fps: Option<f64>,
    /// Bits per second
    #[serde(default)]
    pub bitrate: Option<u64>,
}

/// Output audio stream metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioStreamInfo {
    #[serde(default)]
    pub codec: Option<String>,
    #[serde(default)]
    pub channels: Option<u32>,
    #[serde(default)]
    pub sample_rate: Option<u32>,
    #[serde(default)]
    pub bitrate: Option<u64>,
}

/// Result bundle attached to a completed job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscodeResult {
    /// Output path in the worker namespace
    #[serde(default)]
    pub output_path: Option<String>,
    /// Output size divided by input size
    #[serde(default)]
    pub compression_ratio: Option<f64>,
    /// Wall-clock encode time in seconds
    #[serde(default)]
    pub processing_time: Option<f64>,
    #[serde(default)]
    pub output_size: Option<u64>,
    #[serde(default)]
    pub video: Option<VideoStreamInfo>,
    #[serde(default)]
    pub audio: Option<AudioStreamInfo>,
    /// Thumbnail path in the worker namespace, if the worker made one
    #[serde(default)]
    pub thumbnail_path: Option<String>,
}

/// Observed snapshot of a remote transcode job.
///
/// The worker owns the authoritative state; a snapshot is refreshed on every
/// poll and dropped once a terminal state has been observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscodeJob {
    pub id: JobId,
    pub state: JobState,
    /// Progress percentage (0-100)
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub input_file: Option<String>,
    #[serde(default)]
    pub output_file: Option<String>,
    #[serde(default)]
    pub preset: Option<String>,
    #[serde(default)]
    pub result: Option<TranscodeResult>,
    /// Failure reason reported by the worker
    #[serde(default)]
    pub error: Option<String>,
    /// When this snapshot was taken on the client side
    #[serde(skip, default = "Utc::now")]
    pub observed_at: DateTime<Utc>,
}

impl TranscodeJob {
    /// Create a fresh snapshot for a just-submitted job.
    pub fn submitted(id: JobId) -> Self {
        Self {
            id,
            state: JobState::Waiting,
            progress: 0,
            input_file: None,
            output_file: None,
            preset: None,
            result: None,
            error: None,
            observed_at: Utc::now(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Worker-side output path, preferring the result bundle.
    pub fn output_path(&self) -> Option<&str> {
        self.result
            .as_ref()
            .and_then(|r| r.output_path.as_deref())
            .or(self.output_file.as_deref())
    }
}

/// Lightweight progress snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgress {
    pub id: JobId,
    pub state: JobState,
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub error: Option<String>,
}

impl From<&TranscodeJob> for JobProgress {
    fn from(job: &TranscodeJob) -> Self {
        Self {
            id: job.id.clone(),
            state: job.state,
            progress: job.progress,
            error: job.error.clone(),
        }
    }
}
