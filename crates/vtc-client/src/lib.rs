//! Client for the remote GPU transcoding worker.
//!
//! This crate provides:
//! - Job submission (multipart upload, shared-storage path, dynamic bitrate)
//! - Job status and lightweight progress queries
//! - Capacity status, preset catalog and bitrate analysis
//! - Thumbnail extraction and temp-file cleanup requests
//! - Health check and queue administration

pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod multipart;
pub mod types;

#[cfg(test)]
mod client_tests;

pub use client::TranscodeClient;
pub use config::ClientConfig;
pub use error::{ClientResult, TranscodeError};
pub use multipart::{MultipartBuilder, ReqwestMultipart, UploadSource};
pub use types::{
    CleanupResponse, DynamicSubmitRequest, HealthResponse, PathSubmitRequest, SubmitResponse,
    ThumbnailFormat, ThumbnailRequest, ThumbnailResponse,
};
