//! Remote recognition client
//!
//! Wraps the Document-AI / transcription HTTP API. The client never does
//! recognition itself and holds no state beyond its HTTP plumbing.
//!
//! Transport failures do not fail the user flow: the client synthesizes a
//! clearly flagged fallback result instead. The [`Recognized`] wrapper
//! keeps that distinction in the type, so callers can tell placeholder
//! data from the real thing without inspecting status strings.

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use cardfolio_domain::{ContactFields, QaStatus};

use crate::http::{HttpClient, HttpError, RateLimiter};

#[derive(Error, Debug)]
pub enum RecognitionError {
    #[error("request throttled client-side")]
    Throttled,
    #[error("service rejected the request: HTTP {status}: {detail}")]
    Rejected { status: u16, detail: String },
    #[error("unparseable response: {0}")]
    Parse(String),
}

/// A recognition outcome, tagged by provenance.
#[derive(Clone, Debug, PartialEq)]
pub enum Recognized<T> {
    /// Produced by the remote service.
    Genuine(T),
    /// Synthesized locally because the service was unreachable.
    Fallback(T),
}

impl<T> Recognized<T> {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Recognized::Fallback(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            Recognized::Genuine(v) | Recognized::Fallback(v) => v,
        }
    }

    pub fn as_ref(&self) -> &T {
        match self {
            Recognized::Genuine(v) | Recognized::Fallback(v) => v,
        }
    }
}

/// Structured result of a card scan.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionResult {
    pub card_id: Option<String>,
    pub fields: ContactFields,
    pub qa_score: Option<f64>,
    pub qa_status: QaStatus,
    pub missing_fields: Vec<String>,
    pub status: Option<String>,
    pub message: Option<String>,
}

impl RecognitionResult {
    /// Placeholder produced when the service cannot be reached.
    pub fn fallback(detail: &str) -> Self {
        Self {
            qa_status: QaStatus::Mock,
            status: Some("mock".to_string()),
            message: Some(format!("recognition unavailable: {detail}")),
            ..Default::default()
        }
    }
}

/// Result of transcribing a voice recording.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transcription {
    pub text: String,
    pub language: Option<String>,
    #[serde(rename = "duration")]
    pub duration_secs: Option<f64>,
}

impl Transcription {
    pub fn fallback(detail: &str) -> Self {
        Self {
            text: format!("transcription unavailable: {detail}"),
            language: None,
            duration_secs: None,
        }
    }
}

/// The external recognition/transcription API surface.
pub trait RecognitionService: Send + Sync {
    /// Analyze an already-uploaded card image by URL.
    fn analyze_image_url(
        &self,
        image_url: &str,
    ) -> impl std::future::Future<Output = Result<Recognized<RecognitionResult>, RecognitionError>> + Send;

    /// Analyze a card image uploaded directly with the request.
    fn analyze_image(
        &self,
        bytes: Vec<u8>,
        filename: &str,
    ) -> impl std::future::Future<Output = Result<Recognized<RecognitionResult>, RecognitionError>> + Send;

    /// Transcribe a voice recording.
    fn transcribe(
        &self,
        bytes: Vec<u8>,
        filename: &str,
    ) -> impl std::future::Future<Output = Result<Recognized<Transcription>, RecognitionError>> + Send;
}

/// HTTP client for the recognition API.
pub struct HttpRecognitionClient {
    http: HttpClient,
    base_url: String,
    limiter: RateLimiter,
}

impl HttpRecognitionClient {
    pub fn new(http: HttpClient, base_url: impl Into<String>, limiter: RateLimiter) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            limiter,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Classify an HTTP failure: transport problems become a fallback
    /// value, anything else is a real error.
    fn settle<T>(
        result: Result<crate::http::HttpResponse, HttpError>,
        fallback: impl FnOnce(&str) -> T,
    ) -> Result<Recognized<T>, RecognitionError>
    where
        T: serde::de::DeserializeOwned,
    {
        match result {
            Ok(response) => {
                let parsed = serde_json::from_str(&response.body)
                    .map_err(|e| RecognitionError::Parse(e.to_string()))?;
                Ok(Recognized::Genuine(parsed))
            }
            Err(e) if e.is_transport() => {
                tracing::warn!(error = %e, "recognition service unreachable, using fallback");
                Ok(Recognized::Fallback(fallback(&e.to_string())))
            }
            Err(HttpError::Status { status, body }) => {
                tracing::warn!(status, "recognition request rejected");
                Err(RecognitionError::Rejected {
                    status,
                    detail: body,
                })
            }
            Err(e) => Err(RecognitionError::Parse(e.to_string())),
        }
    }

    fn acquire(&self) -> Result<(), RecognitionError> {
        if self.limiter.try_acquire() {
            Ok(())
        } else {
            Err(RecognitionError::Throttled)
        }
    }
}

impl RecognitionService for HttpRecognitionClient {
    async fn analyze_image_url(
        &self,
        image_url: &str,
    ) -> Result<Recognized<RecognitionResult>, RecognitionError> {
        self.acquire()?;
        tracing::debug!(image_url, "analyzing card image by url");
        let result = self
            .http
            .post_json(
                &self.endpoint("cards/analyze-url/"),
                &json!({ "image_url": image_url }),
            )
            .await;
        Self::settle(result, RecognitionResult::fallback)
    }

    async fn analyze_image(
        &self,
        bytes: Vec<u8>,
        filename: &str,
    ) -> Result<Recognized<RecognitionResult>, RecognitionError> {
        self.acquire()?;
        tracing::debug!(filename, size = bytes.len(), "analyzing card image upload");
        let result = self
            .http
            .post_multipart_file(&self.endpoint("cards/"), filename, "image/jpeg", bytes)
            .await;
        Self::settle(result, RecognitionResult::fallback)
    }

    async fn transcribe(
        &self,
        bytes: Vec<u8>,
        filename: &str,
    ) -> Result<Recognized<Transcription>, RecognitionError> {
        self.acquire()?;
        tracing::debug!(filename, size = bytes.len(), "transcribing voice note");
        let result = self
            .http
            .post_multipart_file(&self.endpoint("voice/"), filename, "audio/m4a", bytes)
            .await;
        Self::settle(result, Transcription::fallback)
    }
}
