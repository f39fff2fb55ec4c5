//! Configuration for cardfolio-core
//!
//! Defaults match the original deployment's limits. A TOML file can
//! override any subset; the conventional location is
//! `<config dir>/cardfolio/config.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// System-wide configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub api: ApiConfig,
    pub upload: UploadConfig,
    pub capture: CaptureConfig,
    pub search: SearchConfig,
}

/// Recognition API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
    /// Minimum spacing between requests, client-side.
    pub min_request_interval_ms: u64,
    pub max_requests_per_minute: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.cardfolio.app".to_string(),
            request_timeout_secs: 30,
            min_request_interval_ms: 1_000,
            max_requests_per_minute: 60,
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }
}

/// Blob upload settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub base_url: String,
    pub max_image_bytes: usize,
    pub max_audio_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            base_url: "https://blobs.cardfolio.app".to_string(),
            max_image_bytes: 10 * 1024 * 1024,
            max_audio_bytes: 25 * 1024 * 1024,
        }
    }
}

/// Capture pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Hard cap on voice note length; the recorder stops here.
    pub max_voice_note_secs: f64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_voice_note_secs: 10.0,
        }
    }
}

/// Search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub debounce_ms: u64,
    pub history_limit: usize,
    /// qa_score at or above this counts as "high quality" in filter counts.
    pub high_quality_threshold: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            history_limit: 5,
            high_quality_threshold: 0.8,
        }
    }
}

impl SearchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl CoreConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Conventional config file location for this platform, if resolvable.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("cardfolio").join("config.toml"))
    }

    /// Load from the conventional location, falling back to defaults when
    /// the file is absent or the platform has no config dir.
    pub fn load_or_default() -> Self {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path).unwrap_or_else(|e| {
                tracing::warn!("config load failed, using defaults: {e}");
                Self::default()
            }),
            _ => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployment_limits() {
        let config = CoreConfig::default();
        assert_eq!(config.api.request_timeout_secs, 30);
        assert_eq!(config.upload.max_image_bytes, 10 * 1024 * 1024);
        assert_eq!(config.upload.max_audio_bytes, 25 * 1024 * 1024);
        assert_eq!(config.capture.max_voice_note_secs, 10.0);
        assert_eq!(config.search.history_limit, 5);
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let config: CoreConfig = toml::from_str(
            r#"
            [api]
            base_url = "https://staging.cardfolio.app"

            [search]
            debounce_ms = 150
            "#,
        )
        .unwrap();
        assert_eq!(config.api.base_url, "https://staging.cardfolio.app");
        assert_eq!(config.api.request_timeout_secs, 30);
        assert_eq!(config.search.debounce_ms, 150);
        assert_eq!(config.search.history_limit, 5);
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = CoreConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
