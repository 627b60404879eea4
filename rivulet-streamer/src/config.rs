use crate::error::StreamResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Serialize, Deserialize)]
pub struct StreamerConfigJson {
    pub base_url: String,
    pub manifest_url: String,
    pub cache_root: String,
    #[serde(default)]
    pub bundled_root: Option<String>,
    #[serde(default)]
    pub max_concurrent_downloads: Option<usize>,
    #[serde(default)]
    pub retry_attempts: Option<u32>,
    #[serde(default)]
    pub request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct StreamerConfig {
    /// Base URL asset paths are appended to for download
    pub base_url: String,

    /// URL of the streaming manifest document
    pub manifest_url: String,

    /// Directory the cache store lives in
    pub cache_root: PathBuf,

    /// Directory holding bundled resources, if the build ships any
    pub bundled_root: Option<PathBuf>,

    /// Size of the download worker pool
    pub max_concurrent_downloads: usize,

    /// Total transfer attempts per download task before terminal failure
    pub retry_attempts: u32,

    /// Per-request network timeout
    pub request_timeout: Duration,
}

pub const DEFAULT_MAX_CONCURRENT_DOWNLOADS: usize = 3;
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

impl StreamerConfig {
    pub fn new(
        base_url: &str,
        manifest_url: &str,
        cache_root: &Path,
    ) -> StreamerConfig {
        StreamerConfig {
            base_url: base_url.to_string(),
            manifest_url: manifest_url.to_string(),
            cache_root: cache_root.to_path_buf(),
            bundled_root: None,
            max_concurrent_downloads: DEFAULT_MAX_CONCURRENT_DOWNLOADS,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECONDS),
        }
    }

    pub fn from_file(path: &Path) -> StreamResult<StreamerConfig> {
        let json_str = std::fs::read_to_string(path)?;
        let json: StreamerConfigJson = serde_json::from_str(&json_str)?;
        Ok(Self::from_json(json))
    }

    pub fn from_json(json: StreamerConfigJson) -> StreamerConfig {
        StreamerConfig {
            base_url: json.base_url,
            manifest_url: json.manifest_url,
            cache_root: PathBuf::from(json.cache_root),
            bundled_root: json.bundled_root.map(PathBuf::from),
            max_concurrent_downloads: json
                .max_concurrent_downloads
                .unwrap_or(DEFAULT_MAX_CONCURRENT_DOWNLOADS)
                .max(1),
            retry_attempts: json.retry_attempts.unwrap_or(DEFAULT_RETRY_ATTEMPTS).max(1),
            request_timeout: Duration::from_secs(
                json.request_timeout_seconds
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECONDS),
            ),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_applied_for_missing_fields() {
        let json: StreamerConfigJson = serde_json::from_str(
            r#"{
                "base_url": "http://localhost:8080",
                "manifest_url": "http://localhost:8080/manifest.json",
                "cache_root": "/tmp/rivulet-cache"
            }"#,
        )
        .unwrap();
        let config = StreamerConfig::from_json(json);
        assert_eq!(config.max_concurrent_downloads, 3);
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(config.bundled_root.is_none());
    }

    #[test]
    fn explicit_values_override_defaults() {
        let json: StreamerConfigJson = serde_json::from_str(
            r#"{
                "base_url": "http://cdn.example.com",
                "manifest_url": "http://cdn.example.com/manifest.json",
                "cache_root": "cache",
                "bundled_root": "bundled",
                "max_concurrent_downloads": 8,
                "retry_attempts": 5,
                "request_timeout_seconds": 10
            }"#,
        )
        .unwrap();
        let config = StreamerConfig::from_json(json);
        assert_eq!(config.max_concurrent_downloads, 8);
        assert_eq!(config.retry_attempts, 5);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.bundled_root, Some(PathBuf::from("bundled")));
    }
}
