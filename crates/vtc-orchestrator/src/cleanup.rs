//! Temp upload cleanup.
//!
//! Only files under a configured temp-uploads prefix may be deleted. Anything
//! else is refused before a request is made.

use std::sync::Arc;

use tracing::{debug, info, warn};

use vtc_client::TranscodeClient;
use vtc_models::path::is_under;
use vtc_models::PathTranslator;

use crate::config::CleanupConfig;
use crate::metrics;

/// Result of a cleanup attempt. Never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupOutcome {
    Deleted,
    /// The worker had nothing to delete
    AlreadyGone,
    /// Refused locally; no request was made
    Rejected { reason: String },
    /// The delete request failed
    Failed { error: String },
}

impl CleanupOutcome {
    /// `Deleted` and `AlreadyGone` both leave no file behind.
    pub fn is_success(&self) -> bool {
        matches!(self, CleanupOutcome::Deleted | CleanupOutcome::AlreadyGone)
    }

    fn label(&self) -> &'static str {
        match self {
            CleanupOutcome::Deleted => "deleted",
            CleanupOutcome::AlreadyGone => "already_gone",
            CleanupOutcome::Rejected { .. } => "rejected",
            CleanupOutcome::Failed { .. } => "failed",
        }
    }
}

/// Deletes temporary uploads on the worker.
#[derive(Clone)]
pub struct CleanupCoordinator {
    client: Arc<TranscodeClient>,
    paths: Arc<PathTranslator>,
    config: CleanupConfig,
}

impl CleanupCoordinator {
    pub fn new(client: Arc<TranscodeClient>, paths: Arc<PathTranslator>, config: CleanupConfig) -> Self {
        Self {
            client,
            paths,
            config,
        }
    }

    /// True if `local_path` is a file strictly inside a temp prefix.
    pub fn is_temp(&self, local_path: &str) -> bool {
        if local_path.split('/').any(|c| c == "..") {
            return false;
        }
        self.config.temp_prefixes.iter().any(|prefix| {
            let prefix = prefix.trim_end_matches('/');
            !prefix.is_empty()
                && is_under(local_path, prefix)
                && local_path.trim_end_matches('/') != prefix
        })
    }

    /// Delete a temporary upload.
    pub async fn delete(&self, local_path: &str) -> CleanupOutcome {
        let outcome = self.try_delete(local_path).await;
        metrics::record_side_effect("cleanup", outcome.label());
        outcome
    }

    async fn try_delete(&self, local_path: &str) -> CleanupOutcome {
        if !self.is_temp(local_path) {
            warn!(path = %local_path, "Refusing to delete a path outside the temp uploads area");
            return CleanupOutcome::Rejected {
                reason: format!("{} is not a temporary upload", local_path),
            };
        }

        let remote = match self.paths.translate(local_path) {
            Ok(remote) => remote,
            Err(e) => {
                warn!(path = %local_path, "Refusing to delete: {}", e);
                return CleanupOutcome::Rejected {
                    reason: e.to_string(),
                };
            }
        };

        match self.client.cleanup(&remote).await {
            Ok(response) if response.deleted => {
                info!(path = %local_path, "Temporary upload deleted");
                CleanupOutcome::Deleted
            }
            Ok(_) => {
                debug!(path = %local_path, "Temporary upload already gone");
                CleanupOutcome::AlreadyGone
            }
            Err(e) => {
                warn!(path = %local_path, "Temporary upload cleanup failed: {}", e);
                CleanupOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }
}
