//! Client configuration loaded from environment variables.
//!
//! Every setting has a default so the client works against a local API with
//! zero configuration. Invalid values are logged and ignored.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use auberge_media::{ExtractorConfig, FfmpegTools};
use auberge_shared::constants::{
    DEFAULT_FRAME_ATTEMPTS, DEFAULT_FRAME_RETRY_DELAY_MS, DEFAULT_FRAME_SETTLE_MS,
    DEFAULT_MAX_UPLOAD_SIZE, DEFAULT_REVALIDATE_INTERVAL_SECS, MIN_FRAME_SETTLE_MS,
};
use auberge_store::TriggerConfig;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the persistence API.
    /// Env: `AUBERGE_API_URL`
    /// Default: `http://127.0.0.1:3000/api`
    pub api_base_url: String,

    /// Storage upload endpoint.
    /// Env: `AUBERGE_UPLOAD_URL`
    /// Default: `{api_base_url}/upload`
    pub upload_url: String,

    /// Hard ceiling for any uploaded asset.
    /// Env: `AUBERGE_MAX_UPLOAD_BYTES`
    /// Default: 100 MiB
    pub max_upload_bytes: usize,

    /// Narrower ceiling for images only.
    /// Env: `AUBERGE_MAX_IMAGE_BYTES`
    /// Default: unset
    pub max_image_bytes: Option<usize>,

    /// Polling interval while a view is mounted, clamped to 15-30 s.
    /// Env: `AUBERGE_REVALIDATE_SECS`
    /// Default: 20 s
    pub revalidate_interval: Duration,

    /// Capture attempts per sampling point.
    /// Env: `AUBERGE_FRAME_RETRIES`
    /// Default: 5
    pub frame_attempts: u32,

    /// Delay between capture attempts.
    /// Env: `AUBERGE_FRAME_RETRY_MS`
    /// Default: 300 ms
    pub frame_retry_delay: Duration,

    /// How long one capture may run before its sample point is abandoned.
    /// Env: `AUBERGE_FRAME_SETTLE_MS` (at least 100 ms)
    /// Default: 1500 ms
    pub frame_settle_timeout: Duration,

    /// Timeout of a single HTTP request.
    /// Env: `AUBERGE_REQUEST_TIMEOUT_SECS`
    /// Default: 30 s
    pub request_timeout: Duration,

    /// Env: `AUBERGE_FFMPEG`
    pub ffmpeg_path: PathBuf,

    /// Env: `AUBERGE_FFPROBE`
    pub ffprobe_path: PathBuf,
}

const DEFAULT_API_URL: &str = "http://127.0.0.1:3000/api";

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            upload_url: upload_url_for(DEFAULT_API_URL),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_SIZE,
            max_image_bytes: None,
            revalidate_interval: Duration::from_secs(DEFAULT_REVALIDATE_INTERVAL_SECS),
            frame_attempts: DEFAULT_FRAME_ATTEMPTS,
            frame_retry_delay: Duration::from_millis(DEFAULT_FRAME_RETRY_DELAY_MS),
            frame_settle_timeout: Duration::from_millis(DEFAULT_FRAME_SETTLE_MS),
            request_timeout: Duration::from_secs(30),
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key/value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("AUBERGE_API_URL") {
            config.api_base_url = url.trim_end_matches('/').to_string();
        }

        config.upload_url = lookup("AUBERGE_UPLOAD_URL")
            .unwrap_or_else(|| upload_url_for(&config.api_base_url));

        if let Some(max) = parse_var(&lookup, "AUBERGE_MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = max;
        }

        config.max_image_bytes = parse_var(&lookup, "AUBERGE_MAX_IMAGE_BYTES");

        if let Some(secs) = parse_var::<u64>(&lookup, "AUBERGE_REVALIDATE_SECS") {
            config.revalidate_interval = TriggerConfig::with_interval_secs(secs).interval;
        }

        if let Some(attempts) = parse_var::<u32>(&lookup, "AUBERGE_FRAME_RETRIES") {
            config.frame_attempts = attempts.max(1);
        }

        if let Some(ms) = parse_var(&lookup, "AUBERGE_FRAME_RETRY_MS") {
            config.frame_retry_delay = Duration::from_millis(ms);
        }

        if let Some(ms) = parse_var::<u64>(&lookup, "AUBERGE_FRAME_SETTLE_MS") {
            config.frame_settle_timeout = Duration::from_millis(ms.max(MIN_FRAME_SETTLE_MS));
        }

        if let Some(secs) = parse_var(&lookup, "AUBERGE_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Some(path) = lookup("AUBERGE_FFMPEG") {
            config.ffmpeg_path = PathBuf::from(path);
        }

        if let Some(path) = lookup("AUBERGE_FFPROBE") {
            config.ffprobe_path = PathBuf::from(path);
        }

        config
    }

    pub fn extractor_config(&self) -> ExtractorConfig {
        ExtractorConfig {
            max_attempts: self.frame_attempts,
            retry_delay: self.frame_retry_delay,
            settle_timeout: self.frame_settle_timeout,
            ..ExtractorConfig::default()
        }
    }

    pub fn trigger_config(&self) -> TriggerConfig {
        TriggerConfig::with_interval_secs(self.revalidate_interval.as_secs())
    }

    pub fn ffmpeg_tools(&self) -> FfmpegTools {
        FfmpegTools {
            ffmpeg: self.ffmpeg_path.clone(),
            ffprobe: self.ffprobe_path.clone(),
        }
    }
}

fn upload_url_for(api_base_url: &str) -> String {
    format!("{}/upload", api_base_url.trim_end_matches('/'))
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Invalid value, using default");
            None
        }
    }
}
