//! End-to-end transcode workflow.
//!
//! Admission check, preset choice, submission, tracking, then the
//! post-completion side effects (thumbnail, temp upload cleanup). All
//! collaborators are constructed explicitly and shared through `Arc`.

use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};

use vtc_client::{SubmitResponse, TranscodeClient, UploadSource};
use vtc_models::{
    JobId, JobProgress, PathTranslator, PresetChoice, SubmitMetadata, TranscodeJob, VideoProbe,
};

use crate::cleanup::{CleanupCoordinator, CleanupOutcome};
use crate::config::OrchestratorConfig;
use crate::error::{JobFailure, OrchestratorError, OrchestratorResult};
use crate::preset_selector::select_preset;
use crate::quality_analyzer::QualityAnalyzer;
use crate::thumbnail::{ThumbnailOrchestrator, ThumbnailOutcome};
use crate::tracker::{JobObserver, JobStateTracker};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// A video to transcode.
#[derive(Debug, Clone)]
pub struct TranscodeRequest {
    pub source: UploadSource,
    pub preset: PresetChoice,
    /// Local output path; the worker picks one when absent
    pub output_path: Option<String>,
    pub metadata: Option<SubmitMetadata>,
    /// Source duration, used when choosing a preset locally
    pub duration_minutes: Option<f64>,
    pub generate_thumbnail: bool,
    /// Delete the source after completion when it is a temp upload
    pub cleanup_source: bool,
}

impl TranscodeRequest {
    /// Request with an `auto` preset, thumbnail and temp cleanup enabled.
    pub fn new(source: UploadSource) -> Self {
        Self {
            source,
            preset: PresetChoice::Auto,
            output_path: None,
            metadata: None,
            duration_minutes: None,
            generate_thumbnail: true,
            cleanup_source: true,
        }
    }

    /// Set the encoding preset.
    pub fn with_preset(mut self, preset: PresetChoice) -> Self {
        self.preset = preset;
        self
    }

    /// Set the local output path.
    pub fn with_output_path(mut self, path: impl Into<String>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// Attach submission metadata.
    pub fn with_metadata(mut self, metadata: SubmitMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Hint the source duration for local preset selection.
    pub fn with_duration_minutes(mut self, minutes: f64) -> Self {
        self.duration_minutes = Some(minutes);
        self
    }

    /// Skip thumbnail generation.
    pub fn without_thumbnail(mut self) -> Self {
        self.generate_thumbnail = false;
        self
    }

    /// Never delete the source after completion.
    pub fn keep_source(mut self) -> Self {
        self.cleanup_source = false;
        self
    }
}

/// Everything known once a workflow finished successfully.
#[derive(Debug, Clone)]
pub struct WorkflowOutcome {
    /// Terminal snapshot
    pub job: TranscodeJob,
    /// Output in the local namespace
    pub output_path: Option<String>,
    pub compression_ratio: Option<f64>,
    pub output_size: Option<u64>,
    /// Encode time in seconds
    pub processing_time: Option<f64>,
    /// `None` when thumbnails were not requested
    pub thumbnail: Option<ThumbnailOutcome>,
    /// `None` when the source was not a temp upload
    pub cleanup: Option<CleanupOutcome>,
}

/// Why a workflow produced no outcome.
#[derive(Debug, Clone, Error)]
pub enum WorkflowFailure {
    #[error(transparent)]
    Job(#[from] JobFailure),

    #[error("Stopped watching job {0} before it finished")]
    Abandoned(JobId),
}

type OutcomeSender = oneshot::Sender<Result<WorkflowOutcome, WorkflowFailure>>;

/// Handle to a submitted workflow.
pub struct WorkflowHandle {
    job_id: JobId,
    video_probe: Option<VideoProbe>,
    progress: watch::Receiver<JobProgress>,
    outcome: oneshot::Receiver<Result<WorkflowOutcome, WorkflowFailure>>,
}

impl WorkflowHandle {
    /// Id assigned by the worker.
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Input probe returned on submission, if any.
    pub fn video_probe(&self) -> Option<&VideoProbe> {
        self.video_probe.as_ref()
    }

    /// Latest observed progress.
    pub fn progress(&self) -> JobProgress {
        self.progress.borrow().clone()
    }

    /// Receiver notified on every progress change.
    pub fn subscribe(&self) -> watch::Receiver<JobProgress> {
        self.progress.clone()
    }

    /// Wait for the job and its side effects to finish.
    pub async fn wait(self) -> Result<WorkflowOutcome, WorkflowFailure> {
        let job_id = self.job_id;
        self.outcome
            .await
            .unwrap_or(Err(WorkflowFailure::Abandoned(job_id)))
    }
}

struct SideEffects {
    paths: Arc<PathTranslator>,
    thumbnails: ThumbnailOrchestrator,
    cleanup: CleanupCoordinator,
    generate_thumbnail: bool,
    /// Local temp upload to delete after completion
    cleanup_path: Option<String>,
}

impl SideEffects {
    async fn run(self, job: TranscodeJob) -> WorkflowOutcome {
        let output_path = job.output_path().and_then(|remote| {
            self.paths
                .reverse_translate(remote)
                .map_err(|e| warn!(job_id = %job.id, "Output path not mappable: {}", e))
                .ok()
        });

        let thumbnail = if self.generate_thumbnail {
            Some(match &output_path {
                Some(output) => self.thumbnails.generate(output, None).await,
                None => ThumbnailOutcome::failed("worker reported no usable output path"),
            })
        } else {
            None
        };

        // Runs after the thumbnail step regardless of its result
        let cleanup = match &self.cleanup_path {
            Some(path) => Some(self.cleanup.delete(path).await),
            None => None,
        };

        let result = job.result.clone().unwrap_or_default();
        WorkflowOutcome {
            output_path,
            compression_ratio: result.compression_ratio,
            output_size: result.output_size,
            processing_time: result.processing_time,
            thumbnail,
            cleanup,
            job,
        }
    }
}

/// Bridges tracker callbacks to a [`WorkflowHandle`].
struct WorkflowObserver {
    progress: watch::Sender<JobProgress>,
    outcome: Mutex<Option<OutcomeSender>>,
    effects: Mutex<Option<SideEffects>>,
}

impl WorkflowObserver {
    fn take_sender(&self) -> Option<OutcomeSender> {
        self.outcome
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl JobObserver for WorkflowObserver {
    fn on_progress(&self, job: &TranscodeJob) {
        self.progress.send_replace(JobProgress::from(job));
    }

    fn on_complete(&self, job: TranscodeJob) {
        self.progress.send_replace(JobProgress::from(&job));
        let Some(sender) = self.take_sender() else {
            return;
        };
        let effects = self
            .effects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        tokio::spawn(async move {
            let outcome = match effects {
                Some(effects) => effects.run(job).await,
                None => return,
            };
            info!(
                job_id = %outcome.job.id,
                output = ?outcome.output_path,
                ratio = ?outcome.compression_ratio,
                "Transcode workflow finished"
            );
            let _ = sender.send(Ok(outcome));
        });
    }

    fn on_error(&self, failure: JobFailure) {
        self.progress.send_replace(JobProgress::from(&failure.job));
        if let Some(sender) = self.take_sender() {
            let _ = sender.send(Err(WorkflowFailure::Job(failure)));
        }
    }
}

/// Submits videos and drives them to completion.
pub struct TranscodeWorkflow {
    client: Arc<TranscodeClient>,
    paths: Arc<PathTranslator>,
    tracker: Arc<JobStateTracker>,
    analyzer: QualityAnalyzer,
    thumbnails: ThumbnailOrchestrator,
    cleanup: CleanupCoordinator,
    enforce_admission: bool,
    remote_auto_preset: bool,
}

impl TranscodeWorkflow {
    /// Build every collaborator from configuration.
    pub fn from_config(config: OrchestratorConfig) -> OrchestratorResult<Self> {
        let client = Arc::new(TranscodeClient::new(config.client.clone())?);
        let tracker = Arc::new(JobStateTracker::new(client.clone(), config.poll));
        Self::new(client, tracker, config)
    }

    /// Assemble from an existing client and tracker.
    pub fn new(
        client: Arc<TranscodeClient>,
        tracker: Arc<JobStateTracker>,
        config: OrchestratorConfig,
    ) -> OrchestratorResult<Self> {
        let paths = Arc::new(config.path_translator()?);
        Ok(Self {
            analyzer: QualityAnalyzer::new(client.clone(), paths.clone()),
            thumbnails: ThumbnailOrchestrator::new(client.clone(), paths.clone(), config.thumbnail),
            cleanup: CleanupCoordinator::new(client.clone(), paths.clone(), config.cleanup),
            client,
            paths,
            tracker,
            enforce_admission: config.enforce_admission,
            remote_auto_preset: config.remote_auto_preset,
        })
    }

    /// Shared HTTP client.
    pub fn client(&self) -> &Arc<TranscodeClient> {
        &self.client
    }

    /// Tracker polling submitted jobs.
    pub fn tracker(&self) -> &Arc<JobStateTracker> {
        &self.tracker
    }

    /// Local/remote path translator.
    pub fn paths(&self) -> &Arc<PathTranslator> {
        &self.paths
    }

    /// Bitrate analysis and preset recommendation.
    pub fn analyzer(&self) -> &QualityAnalyzer {
        &self.analyzer
    }

    /// Thumbnail side effect.
    pub fn thumbnails(&self) -> &ThumbnailOrchestrator {
        &self.thumbnails
    }

    /// Temp upload cleanup side effect.
    pub fn cleanup(&self) -> &CleanupCoordinator {
        &self.cleanup
    }

    /// Submit a video and start tracking it.
    ///
    /// Admission and submission errors are returned here. Everything after
    /// acceptance arrives through the handle. If the worker accepted the job
    /// but its id is already being watched, the error is
    /// [`OrchestratorError::AlreadyWatching`] carrying that id.
    pub async fn submit(&self, request: TranscodeRequest) -> OrchestratorResult<WorkflowHandle> {
        if self.enforce_admission {
            self.check_admission().await?;
        }

        let preset = self.resolve_preset(&request).await;
        let output_remote = request
            .output_path
            .as_deref()
            .map(|p| self.paths.translate(p))
            .transpose()?;

        let cleanup_path = local_source_path(&request.source)
            .filter(|p| request.cleanup_source && self.cleanup.is_temp(p));

        let response = self
            .submit_source(
                request.source,
                &preset,
                output_remote.as_deref(),
                request.metadata.as_ref(),
            )
            .await?;

        let job_id = response.job_id.clone();
        let (progress_tx, progress_rx) =
            watch::channel(JobProgress::from(&TranscodeJob::submitted(job_id.clone())));
        let (outcome_tx, outcome_rx) = oneshot::channel();

        let observer = Arc::new(WorkflowObserver {
            progress: progress_tx,
            outcome: Mutex::new(Some(outcome_tx)),
            effects: Mutex::new(Some(SideEffects {
                paths: self.paths.clone(),
                thumbnails: self.thumbnails.clone(),
                cleanup: self.cleanup.clone(),
                generate_thumbnail: request.generate_thumbnail,
                cleanup_path,
            })),
        });
        self.tracker.watch_job(job_id.clone(), observer)?;

        Ok(WorkflowHandle {
            job_id,
            video_probe: response.video_probe,
            progress: progress_rx,
            outcome: outcome_rx,
        })
    }

    async fn check_admission(&self) -> OrchestratorResult<()> {
        let status = self.client.get_system_status().await?;
        if status.available_for_new_jobs {
            return Ok(());
        }
        warn!(
            queue_depth = status.queue.depth(),
            gpu_utilization = status.gpu.utilization_percent,
            "Worker reports no capacity, rejecting submission"
        );
        Err(OrchestratorError::admission(format!(
            "worker is not accepting new jobs (queue depth {})",
            status.queue.depth()
        )))
    }

    async fn resolve_preset(&self, request: &TranscodeRequest) -> PresetChoice {
        if !request.preset.is_auto() || self.remote_auto_preset {
            return request.preset.clone();
        }

        let duration = request.duration_minutes.unwrap_or(0.0);
        let preset = match &request.source {
            UploadSource::Path(path) => {
                let size_mb = tokio::fs::metadata(path)
                    .await
                    .map(|m| m.len() as f64 / BYTES_PER_MB)
                    .unwrap_or(0.0);
                match path.to_str() {
                    Some(local) => self.analyzer.recommend(local, size_mb, duration).await.preset,
                    None => select_preset(size_mb, duration, None),
                }
            }
            UploadSource::Bytes { data, .. } => {
                select_preset(data.len() as f64 / BYTES_PER_MB, duration, None)
            }
        };

        debug!(preset, "Preset chosen locally");
        PresetChoice::named(preset)
    }

    /// Files already on shared storage are submitted by path; anything else
    /// is uploaded.
    async fn submit_source(
        &self,
        source: UploadSource,
        preset: &PresetChoice,
        output_remote: Option<&str>,
        metadata: Option<&SubmitMetadata>,
    ) -> OrchestratorResult<SubmitResponse> {
        let shared = local_source_path(&source).filter(|p| self.paths.is_local(p));

        let response = match shared {
            Some(local) => {
                let remote = self.paths.translate(&local)?;
                self.client
                    .submit_path(&remote, preset, output_remote, metadata)
                    .await?
            }
            None => {
                self.client
                    .submit(source, preset, output_remote, metadata)
                    .await?
            }
        };
        Ok(response)
    }
}

fn local_source_path(source: &UploadSource) -> Option<String> {
    source
        .path()
        .and_then(|p| p.to_str())
        .map(str::to_string)
}
