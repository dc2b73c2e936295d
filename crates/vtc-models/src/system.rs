//! Worker capacity snapshots.

use serde::{Deserialize, Serialize};

/// GPU resource usage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpuStatus {
    #[serde(default)]
    pub utilization_percent: f64,
    #[serde(default)]
    pub memory_used_mb: u64,
    #[serde(default)]
    pub memory_total_mb: u64,
    #[serde(default)]
    pub temperature_c: Option<f64>,
}

/// Host memory and tmpfs usage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStatus {
    #[serde(default)]
    pub ram_used_mb: u64,
    #[serde(default)]
    pub ram_total_mb: u64,
    #[serde(default)]
    pub tmpfs_used_mb: u64,
    #[serde(default)]
    pub tmpfs_total_mb: u64,
}

/// Job counts per queue state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    #[serde(default)]
    pub waiting: u64,
    #[serde(default)]
    pub active: u64,
    #[serde(default)]
    pub completed: u64,
    #[serde(default)]
    pub failed: u64,
    #[serde(default)]
    pub delayed: u64,
}

impl QueueStats {
    /// Jobs not yet finished.
    pub fn depth(&self) -> u64 {
        self.waiting + self.active + self.delayed
    }
}

/// Point-in-time resource snapshot of the worker.
///
/// Used for advisory admission control only; the value may be stale by the
/// time a job is submitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    #[serde(default)]
    pub gpu: GpuStatus,
    #[serde(default)]
    pub memory: MemoryStatus,
    #[serde(default)]
    pub queue: QueueStats,
    #[serde(default)]
    pub available_for_new_jobs: bool,
}
