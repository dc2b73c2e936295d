//! Orchestrator error types.

use thiserror::Error;

use vtc_client::TranscodeError;
use vtc_models::{JobId, PathError, TranscodeJob};

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

/// Errors raised synchronously to orchestrator callers.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Admission rejected: {0}")]
    Admission(String),

    #[error("Job {0} is already being watched")]
    AlreadyWatching(JobId),

    #[error("Transcode service error: {0}")]
    Transport(#[from] TranscodeError),

    #[error("Path error: {0}")]
    Path(#[from] PathError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl OrchestratorError {
    pub fn admission(msg: impl Into<String>) -> Self {
        Self::Admission(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// A job the worker itself reported as failed.
///
/// Only ever delivered through `JobObserver::on_error`.
#[derive(Debug, Clone, Error)]
#[error("Job {job_id} failed: {reason}")]
pub struct JobFailure {
    pub job_id: JobId,
    pub reason: String,
    /// Last observed snapshot
    pub job: TranscodeJob,
}

impl JobFailure {
    pub fn from_job(job: TranscodeJob) -> Self {
        Self {
            job_id: job.id.clone(),
            reason: job
                .error
                .clone()
                .unwrap_or_else(|| "worker reported failure without a reason".to_string()),
            job,
        }
    }
}
