//! Bitrate-based quality classification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Source quality as classified by the worker's bitrate analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QualityLevel {
    High,
    Medium,
    Low,
    /// Analysis unavailable or inconclusive
    #[default]
    #[serde(other)]
    Unknown,
}

impl QualityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityLevel::High => "high",
            QualityLevel::Medium => "medium",
            QualityLevel::Low => "low",
            QualityLevel::Unknown => "unknown",
        }
    }

    /// `None` for `Unknown`, so heuristics can treat it as "not detected".
    pub fn detected(self) -> Option<QualityLevel> {
        match self {
            QualityLevel::Unknown => None,
            other => Some(other),
        }
    }
}

impl fmt::Display for QualityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Worker recommendation accompanying an analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityRecommendation {
    #[serde(default)]
    pub preset: Option<String>,
    /// Suggested video bitrate in kbps
    #[serde(default)]
    pub target_bitrate_kbps: Option<u64>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Per-file bitrate analysis. Derived on demand, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityAnalysis {
    /// Source bitrate relative to the expected bitrate for its resolution
    #[serde(default)]
    pub bitrate_ratio: Option<f64>,
    #[serde(default)]
    pub quality: QualityLevel,
    #[serde(default)]
    pub recommendation: Option<QualityRecommendation>,
}

impl QualityAnalysis {
    /// Result reported when analysis failed.
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn is_unknown(&self) -> bool {
        self.quality == QualityLevel::Unknown
    }
}
