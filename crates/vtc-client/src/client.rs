//! Transcode worker HTTP client.
//!
//! One call is one request/response. Nothing here retries: submission
//! failures go straight back to the caller, and poll-level retry belongs to
//! the job tracker.

use std::sync::Arc;
use std::time::Instant;

use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use vtc_models::{
    JobId, JobProgress, PresetChoice, PresetDefinition, QualityAnalysis, QualityLevel, QueueStats,
    SubmitMetadata, SystemStatus, TranscodeJob,
};

use crate::config::ClientConfig;
use crate::error::{ClientResult, TranscodeError};
use crate::metrics::record_request;
use crate::multipart::{MultipartBuilder, ReqwestMultipart, UploadSource};
use crate::types::{
    AnalyzeRequest, CleanupRequest, CleanupResponse, ClearQueueResponse, DynamicSubmitRequest,
    HealthResponse, JobEnvelope, PathSubmitRequest, PresetsEnvelope, SubmitResponse,
    ThumbnailRequest, ThumbnailResponse,
};

/// Header carrying a per-request correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Client for the remote GPU transcoding worker.
#[derive(Clone)]
pub struct TranscodeClient {
    http: Client,
    config: ClientConfig,
    base_url: Url,
    multipart: Arc<dyn MultipartBuilder>,
}

impl TranscodeClient {
    /// Create a new client with the default multipart builder.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        Self::with_multipart(config, Arc::new(ReqwestMultipart::default()))
    }

    /// Create a new client with a custom multipart builder.
    pub fn with_multipart(
        config: ClientConfig,
        multipart: Arc<dyn MultipartBuilder>,
    ) -> ClientResult<Self> {
        let base_url = config.parsed_base_url()?;

        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(10)
            .user_agent(concat!("vtc-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(TranscodeError::Network)?;

        Ok(Self {
            http,
            config,
            base_url,
            multipart,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> ClientResult<Self> {
        Self::new(ClientConfig::from_env())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Upload a video and enqueue a transcode.
    pub async fn submit(
        &self,
        upload: UploadSource,
        preset: &PresetChoice,
        output_path: Option<&str>,
        metadata: Option<&SubmitMetadata>,
    ) -> ClientResult<SubmitResponse> {
        let mut fields = vec![("preset".to_string(), preset.to_string())];
        if let Some(output) = output_path {
            fields.push(("outputPath".to_string(), output.to_string()));
        }
        if let Some(meta) = metadata {
            fields.push(("metadata".to_string(), serde_json::to_string(meta)?));
        }

        let file_name = upload.file_name();
        let form = self.multipart.build(upload, fields).await?;
        let url = self.url(&["api", "transcode", "upload"]);

        debug!(file = %file_name, preset = %preset, "Submitting upload to {}", url);

        let request = self.http.post(url).multipart(form);
        let response: SubmitResponse = self.execute("submit", request).await?;

        info!(job_id = %response.job_id, preset = %preset, "Transcode job submitted");
        Ok(response)
    }

    /// Enqueue a transcode for a file already on shared storage.
    ///
    /// `input_path` and `output_path` must be in the worker namespace.
    pub async fn submit_path(
        &self,
        input_path: &str,
        preset: &PresetChoice,
        output_path: Option<&str>,
        metadata: Option<&SubmitMetadata>,
    ) -> ClientResult<SubmitResponse> {
        let body = PathSubmitRequest {
            input_file: input_path.to_string(),
            output_file: output_path.map(str::to_string),
            preset: preset.clone(),
            metadata: metadata.cloned(),
        };

        let request = self.http.post(self.url(&["api", "transcode"])).json(&body);
        let response: SubmitResponse = self.execute("submit_path", request).await?;

        info!(job_id = %response.job_id, input = %input_path, "Transcode job submitted");
        Ok(response)
    }

    /// Enqueue a dynamic-bitrate transcode.
    pub async fn submit_dynamic(
        &self,
        input_path: &str,
        output_path: Option<&str>,
        target_quality: Option<QualityLevel>,
    ) -> ClientResult<SubmitResponse> {
        let body = DynamicSubmitRequest {
            input_file: input_path.to_string(),
            output_file: output_path.map(str::to_string),
            target_quality: target_quality.and_then(QualityLevel::detected),
        };

        let request = self
            .http
            .post(self.url(&["api", "transcode", "dynamic"]))
            .json(&body);
        let response: SubmitResponse = self.execute("submit_dynamic", request).await?;

        info!(job_id = %response.job_id, input = %input_path, "Dynamic transcode job submitted");
        Ok(response)
    }

    // =========================================================================
    // Job status
    // =========================================================================

    /// Full job snapshot.
    pub async fn get_status(&self, job_id: &JobId) -> ClientResult<TranscodeJob> {
        let request = self.http.get(self.url(&["api", "job", job_id.as_str()]));
        let envelope: JobEnvelope = self.execute("get_status", request).await?;
        Ok(envelope.job)
    }

    /// Lightweight progress snapshot.
    ///
    /// Falls back to [`get_status`](Self::get_status) when the progress
    /// endpoint is unavailable; callers see the same shape either way.
    pub async fn get_progress(&self, job_id: &JobId) -> ClientResult<JobProgress> {
        let request = self
            .http
            .get(self.url(&["api", "job", job_id.as_str(), "progress"]));

        match self.execute::<JobProgress>("get_progress", request).await {
            Ok(progress) => Ok(progress),
            Err(e) => {
                debug!(job_id = %job_id, "Progress endpoint unavailable ({}), using full status", e);
                let job = self.get_status(job_id).await?;
                Ok(JobProgress::from(&job))
            }
        }
    }

    // =========================================================================
    // Capacity and catalog
    // =========================================================================

    /// Worker resource snapshot.
    pub async fn get_system_status(&self) -> ClientResult<SystemStatus> {
        let request = self.http.get(self.url(&["api", "system", "status"]));
        self.execute("get_system_status", request).await
    }

    /// Advisory capacity check. Not atomic with a later submission.
    pub async fn is_available(&self) -> ClientResult<bool> {
        Ok(self.get_system_status().await?.available_for_new_jobs)
    }

    /// Preset catalog from the worker.
    pub async fn get_presets(&self) -> ClientResult<Vec<PresetDefinition>> {
        let request = self.http.get(self.url(&["api", "presets"]));
        let envelope: PresetsEnvelope = self.execute("get_presets", request).await?;
        Ok(envelope.presets)
    }

    /// Bitrate analysis that reports `unknown` instead of failing.
    pub async fn analyze_bitrate(&self, input_path: &str) -> QualityAnalysis {
        match self.try_analyze_bitrate(input_path).await {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!(input = %input_path, "Bitrate analysis failed: {}", e);
                QualityAnalysis::unknown()
            }
        }
    }

    /// Bitrate analysis with the raw error. `input_path` is in the worker namespace.
    pub async fn try_analyze_bitrate(&self, input_path: &str) -> ClientResult<QualityAnalysis> {
        let body = AnalyzeRequest {
            input_file: input_path,
        };
        let request = self
            .http
            .post(self.url(&["api", "analyze", "bitrate"]))
            .json(&body);
        self.execute("analyze_bitrate", request).await
    }

    // =========================================================================
    // Side effects
    // =========================================================================

    /// Extract a thumbnail on the worker.
    pub async fn generate_thumbnail(
        &self,
        request: &ThumbnailRequest,
    ) -> ClientResult<ThumbnailResponse> {
        let builder = self.http.post(self.url(&["api", "thumbnail"])).json(request);
        self.execute("generate_thumbnail", builder).await
    }

    /// Delete a temporary file on the worker. A missing file is not an error.
    pub async fn cleanup(&self, remote_path: &str) -> ClientResult<CleanupResponse> {
        let body = CleanupRequest {
            file_path: remote_path,
        };
        let request = self.http.post(self.url(&["api", "cleanup"])).json(&body);

        match self.execute::<CleanupResponse>("cleanup", request).await {
            Err(e) if e.is_not_found() => {
                debug!(path = %remote_path, "Cleanup target already gone");
                Ok(CleanupResponse { deleted: false })
            }
            other => other,
        }
    }

    // =========================================================================
    // Service health and queue administration
    // =========================================================================

    /// Check if the worker is healthy.
    pub async fn health_check(&self) -> bool {
        let url = self.url(&["health"]);

        match self.http.get(url).send().await {
            Ok(response) if response.status().is_success() => {
                match response.json::<HealthResponse>().await {
                    Ok(health) => health.status == "healthy" || health.status == "ok",
                    Err(e) => {
                        warn!("Transcode service health payload unreadable: {}", e);
                        false
                    }
                }
            }
            Ok(response) => {
                warn!("Transcode service health check failed: {}", response.status());
                false
            }
            Err(e) => {
                warn!("Transcode service health check error: {}", e);
                false
            }
        }
    }

    /// Worker queue counts.
    pub async fn queue_stats(&self) -> ClientResult<QueueStats> {
        let request = self.http.get(self.url(&["api", "queue", "stats"]));
        self.execute("queue_stats", request).await
    }

    /// Drop all waiting jobs on the worker. Returns how many were removed.
    pub async fn clear_queue(&self) -> ClientResult<u64> {
        let request = self.http.post(self.url(&["api", "queue", "clear"]));
        let response: ClearQueueResponse = self.execute("clear_queue", request).await?;
        warn!(cleared = response.cleared, "Transcode queue cleared");
        Ok(response.cleared)
    }

    // =========================================================================
    // Plumbing
    // =========================================================================

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // Validated as a base URL at construction.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Send a request and decode a JSON body.
    ///
    /// Non-2xx statuses and `"success": false` bodies both become errors.
    async fn execute<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> ClientResult<T> {
        let request_id = Uuid::new_v4().to_string();
        let start = Instant::now();

        let response = match request.header(REQUEST_ID_HEADER, &request_id).send().await {
            Ok(response) => response,
            Err(e) => {
                record_request(operation, 0, start.elapsed().as_secs_f64() * 1000.0);
                return Err(self.transport_error(e));
            }
        };

        let status = response.status();
        let body = response.bytes().await.map_err(|e| self.transport_error(e))?;
        record_request(operation, status.as_u16(), start.elapsed().as_secs_f64() * 1000.0);

        if !status.is_success() {
            let text = String::from_utf8_lossy(&body).into_owned();
            debug!(
                operation,
                request_id = %request_id,
                status = status.as_u16(),
                "Transcode service error response"
            );
            return Err(TranscodeError::from_http_status(status.as_u16(), text));
        }

        decode_body(&body)
    }

    fn transport_error(&self, e: reqwest::Error) -> TranscodeError {
        if e.is_timeout() {
            TranscodeError::Timeout(self.config.timeout.as_secs())
        } else {
            TranscodeError::Network(e)
        }
    }
}

/// Decode a success body, honouring the worker's `success` flag.
fn decode_body<T: DeserializeOwned>(body: &[u8]) -> ClientResult<T> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| TranscodeError::invalid_response(format!("body is not JSON: {}", e)))?;

    if value.get("success") == Some(&Value::Bool(false)) {
        let message = value
            .get("error")
            .or_else(|| value.get("message"))
            .and_then(Value::as_str)
            .unwrap_or("no reason given")
            .to_string();
        return Err(TranscodeError::Rejected(message));
    }

    Ok(serde_json::from_value(value)?)
}
