//! Blob upload client
//!
//! Uploaded media is namespaced by kind under a fixed set of path
//! prefixes. Arbitrary paths are rejected at construction time, so no
//! caller can write outside the allow-list.

use chrono::Utc;
use thiserror::Error;

use crate::http::{HttpClient, HttpError};

/// Storage prefixes a client may write under.
pub const ALLOWED_PATH_PREFIXES: [&str; 3] = ["cards/", "voice-notes/", "profiles/"];

#[derive(Error, Debug)]
pub enum BlobError {
    #[error("path {path:?} is outside the allowed prefixes")]
    DisallowedPath { path: String },
    #[error("upload rejected: HTTP {status}")]
    Rejected { status: u16 },
    #[error("transport: {message}")]
    Transport { message: String },
}

impl From<HttpError> for BlobError {
    fn from(e: HttpError) -> Self {
        match e {
            HttpError::Status { status, .. } if status < 500 => BlobError::Rejected { status },
            other => BlobError::Transport {
                message: other.to_string(),
            },
        }
    }
}

/// A storage path proven to sit under an allowed prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobPath(String);

impl BlobPath {
    pub fn new(path: &str) -> Result<Self, BlobError> {
        let allowed = ALLOWED_PATH_PREFIXES
            .iter()
            .any(|prefix| path.starts_with(prefix) && path.len() > prefix.len());
        if !allowed || path.contains("..") {
            return Err(BlobError::DisallowedPath {
                path: path.to_string(),
            });
        }
        Ok(Self(path.to_string()))
    }

    /// Timestamped path for a card photo.
    pub fn card_photo() -> Self {
        Self(format!("cards/{}.jpg", Utc::now().timestamp_millis()))
    }

    /// Timestamped path for a voice note recording.
    pub fn voice_note() -> Self {
        Self(format!("voice-notes/{}.m4a", Utc::now().timestamp_millis()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BlobPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Content-addressed media storage. Returns a durable, retrievable URL.
pub trait BlobStore: Send + Sync {
    fn upload(
        &self,
        path: &BlobPath,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> impl std::future::Future<Output = Result<String, BlobError>> + Send;
}

/// HTTP blob store: PUTs the bytes to `{base}/{path}` and returns that URL.
pub struct HttpBlobStore {
    http: HttpClient,
    base_url: String,
}

impl HttpBlobStore {
    pub fn new(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl BlobStore for HttpBlobStore {
    async fn upload(
        &self,
        path: &BlobPath,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, BlobError> {
        let url = format!("{}/{}", self.base_url, path);
        tracing::debug!(%path, size = bytes.len(), "uploading blob");
        match self.http.put_bytes(&url, content_type, bytes).await {
            Ok(_) => Ok(url),
            Err(e) => {
                tracing::warn!(%path, error = %e, "blob upload failed");
                Err(e.into())
            }
        }
    }
}
