//! Orchestration for the remote GPU transcode worker.
//!
//! This crate provides:
//! - Job state tracking with per-job polling tasks
//! - Local preset heuristics and bitrate-analysis wrappers
//! - Best-effort thumbnail and temp-upload cleanup side effects
//! - The end-to-end submit-and-track workflow

pub mod cleanup;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod preset_selector;
pub mod quality_analyzer;
pub mod thumbnail;
pub mod timer;
pub mod tracker;
pub mod workflow;

pub use cleanup::{CleanupCoordinator, CleanupOutcome};
pub use config::{CleanupConfig, OrchestratorConfig, PollConfig, ThumbnailConfig};
pub use error::{JobFailure, OrchestratorError, OrchestratorResult};
pub use logging::{FailureTracker, JobLogger};
pub use preset_selector::select_preset;
pub use quality_analyzer::{PresetSuggestion, QualityAnalyzer};
pub use thumbnail::{ThumbnailOrchestrator, ThumbnailOutcome};
pub use timer::{Timer, TokioTimer};
pub use tracker::{
    ChannelObserver, JobEvent, JobGroup, JobObserver, JobStateTracker, JobStatusSource,
};
pub use workflow::{
    TranscodeRequest, TranscodeWorkflow, WorkflowFailure, WorkflowHandle, WorkflowOutcome,
};
