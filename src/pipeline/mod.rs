//! Download pipeline split into focused submodules.
//!
//! The `MangaDownloader` struct and its methods are organized by stage:
//! - [`chapter`] - Page resolution and download of one chapter, wrapped in retries
//! - [`jobs`] - Chapter-mode and volume-mode entry points, packing dispatch
//! - [`workspace`] - Temporary staging directories removed when a job ends

mod chapter;
mod jobs;
mod workspace;

pub use chapter::ChapterOutcome;
pub use workspace::Workspace;

use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use std::sync::Arc;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::grouping::{self, GroupNameCache, JobSettings, VolumeGroupIndex, VolumePlan};
use crate::source::ContentSource;
use crate::types::{Chapter, Volume};

/// Main downloader instance (cloneable - all fields are Arc-wrapped or cheap to clone)
#[derive(Clone)]
pub struct MangaDownloader {
    /// Configuration (wrapped in Arc for sharing across jobs)
    pub(crate) config: Arc<Config>,
    /// HTTP client used for page downloads
    pub(crate) client: reqwest::Client,
    /// Headers sent with every page request (Referer)
    pub(crate) page_headers: HeaderMap,
    /// Content API behind a narrow trait
    pub(crate) source: Arc<dyn ContentSource>,
    /// Group display names shared by every job
    pub(crate) groups: Arc<GroupNameCache>,
}

impl std::fmt::Debug for MangaDownloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MangaDownloader")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl MangaDownloader {
    /// Create a downloader with its own HTTP client
    ///
    /// # Errors
    /// Returns error if the configuration is invalid or the HTTP client cannot be created
    pub fn new(config: Config, source: Arc<dyn ContentSource>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.http.user_agent.as_str())
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;
        Self::with_client(config, client, source)
    }

    /// Create a downloader sharing an existing HTTP client
    ///
    /// # Errors
    /// Returns error if the configuration is invalid
    pub fn with_client(
        config: Config,
        client: reqwest::Client,
        source: Arc<dyn ContentSource>,
    ) -> Result<Self> {
        config.validate()?;

        let mut page_headers = HeaderMap::new();
        if !config.http.referer.is_empty() {
            let referer = HeaderValue::from_str(&config.http.referer).map_err(|e| Error::Config {
                message: format!("invalid referer: {e}"),
                key: Some("http.referer".to_string()),
            })?;
            page_headers.insert(REFERER, referer);
        }

        Ok(Self {
            config: Arc::new(config),
            client,
            page_headers,
            source,
            groups: Arc::new(GroupNameCache::new()),
        })
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Group display name cache shared by every job of this downloader
    pub fn groups(&self) -> &GroupNameCache {
        &self.groups
    }

    /// Display name of the group credited for `chapter`
    pub async fn group_name(&self, chapter: &Chapter) -> String {
        self.groups.resolve(chapter, self.source.as_ref()).await
    }

    /// Plan volume jobs for the picked volumes using this downloader's group cache
    pub async fn plan_volumes(
        &self,
        index: &VolumeGroupIndex,
        picked: &[Volume],
        settings: &JobSettings,
    ) -> VolumePlan {
        grouping::plan_volume_jobs(index, picked, settings, &self.groups, self.source.as_ref())
            .await
    }
}
