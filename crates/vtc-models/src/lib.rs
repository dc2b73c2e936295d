//! Shared data models for the GPU transcode client.
//!
//! This crate provides Serde-serializable types for:
//! - Transcode job snapshots and progress
//! - Worker capacity status and queue statistics
//! - Encode presets and bitrate quality analysis
//! - Versioned submission metadata
//! - Path translation between the caller and worker filesystems

pub mod job;
pub mod metadata;
pub mod path;
pub mod preset;
pub mod quality;
pub mod system;

// Re-export common types
pub use job::{
    AudioStreamInfo, JobId, JobProgress, JobState, TranscodeJob, TranscodeResult,
    VideoStreamInfo,
};
pub use metadata::{SubmitMetadata, VideoProbe, METADATA_SCHEMA_VERSION};
pub use path::{Namespace, PathError, PathMapping, PathResult, PathTranslator};
pub use preset::{fallback_catalog, PresetChoice, PresetDefinition, WEB_1080P, WEB_2K, WEB_720P};
pub use quality::{QualityAnalysis, QualityLevel, QualityRecommendation};
pub use system::{GpuStatus, MemoryStatus, QueueStats, SystemStatus};
