//! MangaDex-backed content source

use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use super::ContentSource;
use crate::config::{HttpConfig, PageQuality};
use crate::error::{Error, Result};
use crate::types::{Chapter, PageSet};

/// Relationship type carrying the publishing group of a chapter
const GROUP_RELATIONSHIP: &str = "scanlation_group";

/// [`ContentSource`] backed by the MangaDex JSON API
///
/// Besides the two lookups the pipeline needs, it can list the chapters of a manga feed so
/// that callers can build jobs without another client.
#[derive(Clone, Debug)]
pub struct MangaDexSource {
    client: reqwest::Client,
    api_base_url: String,
    request_timeout: Duration,
    page_limit: u32,
    page_quality: PageQuality,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AtHomeResponse {
    base_url: String,
    chapter: AtHomeChapter,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AtHomeChapter {
    hash: String,
    #[serde(default)]
    data: Vec<String>,
    #[serde(default)]
    data_saver: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GroupResponse {
    data: GroupData,
}

#[derive(Debug, Deserialize)]
struct GroupData {
    attributes: GroupAttributes,
}

#[derive(Debug, Deserialize)]
struct GroupAttributes {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FeedResponse {
    #[serde(default)]
    data: Vec<FeedChapter>,
    #[serde(default)]
    total: u64,
}

#[derive(Debug, Deserialize)]
struct FeedChapter {
    id: String,
    attributes: FeedAttributes,
    #[serde(default)]
    relationships: Vec<Relationship>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedAttributes {
    #[serde(default)]
    chapter: Option<String>,
    #[serde(default)]
    volume: Option<String>,
    #[serde(default)]
    translated_language: Option<String>,
    #[serde(default)]
    external_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Relationship {
    id: String,
    #[serde(rename = "type")]
    kind: String,
}

impl FeedChapter {
    fn into_chapter(self) -> Chapter {
        let group = self
            .relationships
            .into_iter()
            .find(|rel| rel.kind == GROUP_RELATIONSHIP)
            .map(|rel| rel.id);

        Chapter {
            id: self.id,
            number: self.attributes.chapter,
            volume: self.attributes.volume.into(),
            language: self.attributes.translated_language.unwrap_or_default(),
            external_url: self.attributes.external_url,
            group: group.into(),
        }
    }
}

impl MangaDexSource {
    /// Create a source with its own HTTP client
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(http: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(http.user_agent.as_str())
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self::with_client(client, http))
    }

    /// Create a source sharing an existing HTTP client
    pub fn with_client(client: reqwest::Client, http: &HttpConfig) -> Self {
        Self {
            client,
            api_base_url: http.api_base_url.trim_end_matches('/').to_string(),
            request_timeout: http.request_timeout,
            page_limit: http.page_limit,
            page_quality: http.page_quality,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{}", self.api_base_url, path);
        let response = self
            .client
            .get(&url)
            .query(query)
            .timeout(self.request_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Source(format!("HTTP {} for {}", status.as_u16(), url)));
        }

        Ok(response.json::<T>().await?)
    }

    /// List every chapter of a manga feed, ascending by chapter number
    ///
    /// Pages through the feed with the configured page size. With `language` set only
    /// chapters translated into that language are returned.
    pub async fn chapters(&self, manga_id: &str, language: Option<&str>) -> Result<Vec<Chapter>> {
        let path = format!("/manga/{manga_id}/feed");
        let mut chapters = Vec::new();
        let mut offset: u64 = 0;
        let mut total: u64 = 1;

        while offset < total {
            let mut query = vec![
                ("limit", self.page_limit.to_string()),
                ("offset", offset.to_string()),
                ("order[chapter]", "asc".to_string()),
                ("includes[]", GROUP_RELATIONSHIP.to_string()),
            ];
            if let Some(language) = language {
                query.push(("translatedLanguage[]", language.to_string()));
            }

            let page: FeedResponse = self.get_json(&path, &query).await?;
            if page.data.is_empty() {
                break;
            }

            offset += page.data.len() as u64;
            total = page.total;
            chapters.extend(page.data.into_iter().map(FeedChapter::into_chapter));
        }

        debug!(manga = %manga_id, count = chapters.len(), "listed manga feed");
        Ok(chapters)
    }

    /// Language codes the manga has chapters in, in order of first appearance
    pub async fn languages(&self, manga_id: &str) -> Result<Vec<String>> {
        let path = format!("/manga/{manga_id}/feed");
        let mut languages: Vec<String> = Vec::new();
        let mut offset: u64 = 0;
        let mut total: u64 = 1;

        while offset < total {
            let query = [
                ("limit", self.page_limit.to_string()),
                ("offset", offset.to_string()),
            ];
            let page: FeedResponse = self.get_json(&path, &query).await?;
            if page.data.is_empty() {
                break;
            }

            offset += page.data.len() as u64;
            total = page.total;
            for code in page
                .data
                .into_iter()
                .filter_map(|chapter| chapter.attributes.translated_language)
            {
                if !languages.contains(&code) {
                    languages.push(code);
                }
            }
        }

        Ok(languages)
    }
}

#[async_trait::async_trait]
impl ContentSource for MangaDexSource {
    async fn page_locations(&self, chapter_id: &str) -> Result<PageSet> {
        let response: AtHomeResponse = self
            .get_json(&format!("/at-home/server/{chapter_id}"), &[])
            .await?;

        let files = match self.page_quality {
            PageQuality::Data => response.chapter.data,
            PageQuality::DataSaver => response.chapter.data_saver,
        };

        Ok(PageSet {
            base_url: response.base_url,
            hash: response.chapter.hash,
            files,
            quality: self.page_quality,
        })
    }

    async fn group_name(&self, group_id: &str) -> Result<String> {
        let response: GroupResponse = self.get_json(&format!("/group/{group_id}"), &[]).await?;
        Ok(response.data.attributes.name.unwrap_or_default())
    }
}
