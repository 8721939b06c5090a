//! Configuration types for manga-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration
///
/// Every field has a default, so an empty JSON object deserializes into a working
/// configuration. Loading the configuration from disk is left to the caller.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP client and content API settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Wave sizes for volumes, chapters and pages
    #[serde(default)]
    pub concurrency: ConcurrencyConfig,

    /// Retry configuration for chapter downloads
    #[serde(default)]
    pub retry: RetryConfig,

    /// Artifact assembly settings
    #[serde(default)]
    pub pack: PackConfig,
}

impl Config {
    /// Check that the configuration can drive the pipeline
    ///
    /// Wave sizes and attempts must be positive and the compression level must be
    /// one deflate understands.
    pub fn validate(&self) -> Result<()> {
        let waves = [
            ("concurrency.volumes_per_wave", self.concurrency.volumes_per_wave),
            (
                "concurrency.chapters_per_wave",
                self.concurrency.chapters_per_wave,
            ),
            ("concurrency.pages_per_wave", self.concurrency.pages_per_wave),
        ];
        for (key, value) in waves {
            if value == 0 {
                return Err(Error::Config {
                    message: format!("{key} must be at least 1"),
                    key: Some(key.to_string()),
                });
            }
        }

        if self.retry.max_attempts == 0 {
            return Err(Error::Config {
                message: "retry.max_attempts must be at least 1".to_string(),
                key: Some("retry.max_attempts".to_string()),
            });
        }

        if self.pack.compression_level > 9 {
            return Err(Error::Config {
                message: format!(
                    "pack.compression_level must be between 0 and 9, got {}",
                    self.pack.compression_level
                ),
                key: Some("pack.compression_level".to_string()),
            });
        }

        if self.http.page_limit == 0 {
            return Err(Error::Config {
                message: "http.page_limit must be at least 1".to_string(),
                key: Some("http.page_limit".to_string()),
            });
        }

        Ok(())
    }
}

/// HTTP client configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Base URL of the content API (default: "https://api.mangadex.org")
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// User-Agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Referer sent with page image requests (default: "https://mangadex.org")
    #[serde(default = "default_referer")]
    pub referer: String,

    /// Per-request timeout (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Page size used when listing a manga feed (default: 500)
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,

    /// Which page image set to download
    #[serde(default)]
    pub page_quality: PageQuality,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            user_agent: default_user_agent(),
            referer: default_referer(),
            request_timeout: default_request_timeout(),
            page_limit: default_page_limit(),
            page_quality: PageQuality::default(),
        }
    }
}

/// Page image quality served by the content host
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageQuality {
    /// Original quality images (default)
    #[default]
    Data,
    /// Recompressed, smaller images
    DataSaver,
}

impl PageQuality {
    /// Path segment used in page URLs
    pub fn path_segment(&self) -> &'static str {
        match self {
            PageQuality::Data => "data",
            PageQuality::DataSaver => "data-saver",
        }
    }
}

/// Wave sizes for the batch scheduler
///
/// Each level runs its items in consecutive waves of at most this many concurrent items.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    /// Volume jobs per wave (default: 2)
    #[serde(default = "default_volumes_per_wave")]
    pub volumes_per_wave: usize,

    /// Chapters per wave (default: 5)
    #[serde(default = "default_chapters_per_wave")]
    pub chapters_per_wave: usize,

    /// Pages per wave inside one chapter (default: 5)
    #[serde(default = "default_pages_per_wave")]
    pub pages_per_wave: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            volumes_per_wave: default_volumes_per_wave(),
            chapters_per_wave: default_chapters_per_wave(),
            pages_per_wave: default_pages_per_wave(),
        }
    }
}

/// Retry configuration for chapter downloads
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total number of attempts per chapter, including the first (default: 5)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry (default: 10 seconds)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Perturb each delay by a factor in [0.9, 1.1] (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            jitter: true,
        }
    }
}

/// Artifact assembly configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PackConfig {
    /// Deflate level for archives, 0-9 (default: 6)
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,

    /// File extension for archives (default: "zip"; "cbz" is a common alternative)
    #[serde(default = "default_archive_extension")]
    pub archive_extension: String,

    /// Page size used when an image's dimensions cannot be read (default: 800x1200)
    #[serde(default = "default_fallback_page_size")]
    pub fallback_page_size: (u32, u32),
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            compression_level: default_compression_level(),
            archive_extension: default_archive_extension(),
            fallback_page_size: default_fallback_page_size(),
        }
    }
}

fn default_api_base_url() -> String {
    "https://api.mangadex.org".to_string()
}

fn default_user_agent() -> String {
    concat!("manga-dl/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_referer() -> String {
    "https://mangadex.org".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_page_limit() -> u32 {
    500
}

fn default_volumes_per_wave() -> usize {
    2
}

fn default_chapters_per_wave() -> usize {
    5
}

fn default_pages_per_wave() -> usize {
    5
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(10)
}

fn default_true() -> bool {
    true
}

fn default_compression_level() -> u32 {
    6
}

fn default_archive_extension() -> String {
    "zip".to_string()
}

fn default_fallback_page_size() -> (u32, u32) {
    (800, 1200)
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
