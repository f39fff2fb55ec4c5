//! HTTP client wrapper shared by the recognition and blob clients

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use reqwest::Client;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Request failed: {message}")]
    RequestFailed { message: String },
    #[error("Invalid URL: {url}")]
    InvalidUrl { url: String },
    #[error("Rate limited")]
    RateLimited,
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Parse error: {message}")]
    ParseError { message: String },
}

impl HttpError {
    /// Whether the failure is a transport-level one (service unreachable,
    /// timed out, throttled, or erroring server-side) as opposed to a
    /// request the service understood and rejected.
    pub fn is_transport(&self) -> bool {
        match self {
            HttpError::RequestFailed { .. } | HttpError::RateLimited => true,
            HttpError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

pub struct HttpClient {
    client: Client,
    user_agent: String,
}

impl HttpClient {
    pub fn new(user_agent: &str, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            user_agent: user_agent.to_string(),
        }
    }

    async fn finish(response: reqwest::Response) -> Result<HttpResponse, HttpError> {
        let status = response.status().as_u16();

        if status == 429 {
            return Err(HttpError::RateLimited);
        }

        let body = response.text().await.map_err(|e| HttpError::ParseError {
            message: e.to_string(),
        })?;

        if status >= 400 {
            return Err(HttpError::Status { status, body });
        }

        Ok(HttpResponse { status, body })
    }

    pub async fn get(&self, url: &str) -> Result<HttpResponse, HttpError> {
        let response = self
            .client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| HttpError::RequestFailed {
                message: e.to_string(),
            })?;
        Self::finish(response).await
    }

    pub async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<HttpResponse, HttpError> {
        let response = self
            .client
            .post(url)
            .header("User-Agent", &self.user_agent)
            .json(body)
            .send()
            .await
            .map_err(|e| HttpError::RequestFailed {
                message: e.to_string(),
            })?;
        Self::finish(response).await
    }

    /// POST a single file as a `file` multipart field, the way the
    /// recognition endpoints expect uploads.
    pub async fn post_multipart_file(
        &self,
        url: &str,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<HttpResponse, HttpError> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(content_type)
            .map_err(|e| HttpError::RequestFailed {
                message: e.to_string(),
            })?;
        let form = reqwest::multipart::Form::new().part("file", part);
        let response = self
            .client
            .post(url)
            .header("User-Agent", &self.user_agent)
            .multipart(form)
            .send()
            .await
            .map_err(|e| HttpError::RequestFailed {
                message: e.to_string(),
            })?;
        Self::finish(response).await
    }

    pub async fn put_bytes(
        &self,
        url: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<HttpResponse, HttpError> {
        let response = self
            .client
            .put(url)
            .header("User-Agent", &self.user_agent)
            .header("Content-Type", content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| HttpError::RequestFailed {
                message: e.to_string(),
            })?;
        Self::finish(response).await
    }
}

/// Client-side request throttle: a minimum interval between calls plus a
/// per-minute cap. Server-side limiting still applies; this only keeps a
/// misbehaving UI from hammering the API.
pub struct RateLimiter {
    min_interval: Duration,
    max_per_minute: u32,
    timestamps: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration, max_per_minute: u32) -> Self {
        Self {
            min_interval,
            max_per_minute,
            timestamps: Mutex::new(VecDeque::new()),
        }
    }

    /// Check whether a request may go out now, recording it if so.
    pub fn try_acquire(&self) -> bool {
        let now = Instant::now();
        let mut timestamps = self.timestamps.lock().unwrap();
        while let Some(front) = timestamps.front() {
            if now.duration_since(*front) >= Duration::from_secs(60) {
                timestamps.pop_front();
            } else {
                break;
            }
        }
        if timestamps.len() >= self.max_per_minute as usize {
            return false;
        }
        if let Some(last) = timestamps.back() {
            if now.duration_since(*last) < self.min_interval {
                return false;
            }
        }
        timestamps.push_back(now);
        true
    }
}
