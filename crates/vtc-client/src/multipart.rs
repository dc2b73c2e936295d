//! Multipart upload construction.
//!
//! Submission goes through the [`MultipartBuilder`] capability so the
//! orchestration code does not depend on how a runtime produces upload
//! bodies. [`ReqwestMultipart`] streams files straight from disk.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Body;

use crate::error::{ClientResult, TranscodeError};

/// Video to upload.
#[derive(Debug, Clone)]
pub enum UploadSource {
    /// File handle on the local filesystem
    Path(PathBuf),
    /// In-memory bytes
    Bytes { file_name: String, data: Vec<u8> },
}

impl UploadSource {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    pub fn from_bytes(file_name: impl Into<String>, data: Vec<u8>) -> Self {
        Self::Bytes {
            file_name: file_name.into(),
            data,
        }
    }

    /// File name sent in the multipart part.
    pub fn file_name(&self) -> String {
        match self {
            UploadSource::Path(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "upload".to_string()),
            UploadSource::Bytes { file_name, .. } => file_name.clone(),
        }
    }

    /// Local path, when uploading from disk.
    pub fn path(&self) -> Option<&Path> {
        match self {
            UploadSource::Path(path) => Some(path),
            UploadSource::Bytes { .. } => None,
        }
    }
}

/// Guess a video MIME type from a file name.
pub fn video_mime_type(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("mp4") | Some("m4v") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("mkv") => "video/x-matroska",
        Some("webm") => "video/webm",
        Some("avi") => "video/x-msvideo",
        Some("ts") => "video/mp2t",
        _ => "application/octet-stream",
    }
}

/// Builds the multipart body for an upload submission.
#[async_trait]
pub trait MultipartBuilder: Send + Sync {
    /// Build a form carrying the video part plus plain text fields.
    async fn build(&self, upload: UploadSource, fields: Vec<(String, String)>) -> ClientResult<Form>;
}

/// Default builder on top of `reqwest::multipart`.
#[derive(Debug, Clone)]
pub struct ReqwestMultipart {
    /// Form field name of the video part
    pub file_field: String,
}

impl Default for ReqwestMultipart {
    fn default() -> Self {
        Self {
            file_field: "video".to_string(),
        }
    }
}

#[async_trait]
impl MultipartBuilder for ReqwestMultipart {
    async fn build(&self, upload: UploadSource, fields: Vec<(String, String)>) -> ClientResult<Form> {
        let file_name = upload.file_name();
        let mime = video_mime_type(&file_name);

        let part = match upload {
            UploadSource::Path(path) => {
                let file = tokio::fs::File::open(&path).await?;
                let len = file.metadata().await?.len();
                Part::stream_with_length(Body::from(file), len)
            }
            UploadSource::Bytes { data, .. } => Part::bytes(data),
        };

        let part = part
            .file_name(file_name)
            .mime_str(mime)
            .map_err(|e| TranscodeError::invalid_request(format!("invalid MIME type: {}", e)))?;

        let form = fields
            .into_iter()
            .fold(Form::new(), |form, (name, value)| form.text(name, value));

        Ok(form.part(self.file_field.clone(), part))
    }
}
