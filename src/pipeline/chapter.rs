//! Page download for one chapter
//!
//! One attempt resolves the chapter's page list, then fetches every page that is not already
//! on disk in page waves. The attempt fails if any page failed; the retry engine repeats it,
//! and because finished pages are skipped every retry only fetches what is still missing.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use tracing::{debug, error, info, warn};

use super::MangaDownloader;
use crate::batch::run_in_waves;
use crate::error::{DownloadError, Error, Result};
use crate::fetch::fetch_to_file;
use crate::retry::download_with_retry;
use crate::types::{Chapter, PageSet};
use crate::utils::is_non_empty_file;

/// What a chapter download left on disk
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChapterOutcome {
    /// Every page of the chapter is present in the target directory
    Downloaded {
        /// Distinct pages in the chapter
        pages: usize,
        /// Pages fetched over the network in the final attempt
        fetched: usize,
    },
    /// The chapter is hosted externally; nothing was downloaded
    External,
}

/// Result of handling one page within an attempt
enum PageStep {
    Skipped,
    Fetched,
}

impl MangaDownloader {
    /// Download every page of `chapter` into `dir`, retrying failed attempts
    ///
    /// Returns [`DownloadError::ChapterFailed`] once the retries are exhausted or a permanent
    /// error (such as an empty page list) occurs. The caller decides whether that skips the
    /// chapter or fails the whole job.
    pub(crate) async fn download_chapter_pages(
        &self,
        chapter: &Chapter,
        dir: &Path,
    ) -> Result<ChapterOutcome> {
        if chapter.is_external() {
            info!(
                chapter_id = %chapter.id,
                chapter = chapter.number(),
                url = chapter.external_url.as_deref().unwrap_or_default(),
                "chapter is hosted externally, skipping"
            );
            return Ok(ChapterOutcome::External);
        }

        let attempts = AtomicU32::new(0);
        let result = download_with_retry(&self.config.retry, || {
            attempts.fetch_add(1, Ordering::Relaxed);
            self.fetch_chapter_attempt(chapter, dir)
        })
        .await;

        match result {
            Ok(outcome) => {
                if let ChapterOutcome::Downloaded { pages, fetched } = outcome {
                    info!(
                        chapter_id = %chapter.id,
                        chapter = chapter.number(),
                        pages,
                        fetched,
                        "chapter downloaded"
                    );
                }
                Ok(outcome)
            }
            Err(e) => {
                let attempts = attempts.load(Ordering::Relaxed);
                error!(
                    chapter_id = %chapter.id,
                    chapter = chapter.number(),
                    attempts,
                    error = %e,
                    "chapter failed, skipping"
                );
                Err(Error::Download(DownloadError::ChapterFailed {
                    chapter_id: chapter.id.clone(),
                    chapter: chapter.number().to_string(),
                    attempts,
                    reason: e.to_string(),
                }))
            }
        }
    }

    /// One attempt: resolve pages, fetch the missing ones, fail if any page failed
    async fn fetch_chapter_attempt(&self, chapter: &Chapter, dir: &Path) -> Result<ChapterOutcome> {
        let pages = self.source.page_locations(&chapter.id).await?;
        let files = pages.unique_files();
        if files.is_empty() {
            return Err(DownloadError::NoPages {
                chapter_id: chapter.id.clone(),
            }
            .into());
        }

        let mut targets = Vec::with_capacity(files.len());
        for file in files {
            let Some(dest) = page_path(dir, &file) else {
                return Err(DownloadError::InvalidPageName {
                    chapter_id: chapter.id.clone(),
                    file,
                }
                .into());
            };
            targets.push((file, dest));
        }

        let total = targets.len();
        debug!(chapter_id = %chapter.id, pages = total, dir = ?dir, "fetching pages");

        let pages = &pages;
        let results = run_in_waves(
            targets,
            self.config.concurrency.pages_per_wave,
            move |(file, dest)| async move { self.fetch_page(pages, &file, &dest).await },
        )
        .await;

        let mut failed = 0usize;
        let mut fetched = 0usize;
        for result in results {
            match result {
                Ok(PageStep::Fetched) => fetched += 1,
                Ok(PageStep::Skipped) => {}
                Err(_) => failed += 1,
            }
        }

        if failed > 0 {
            return Err(DownloadError::PagesFailed { failed, total }.into());
        }

        Ok(ChapterOutcome::Downloaded {
            pages: total,
            fetched,
        })
    }

    async fn fetch_page(&self, pages: &PageSet, file: &str, dest: &Path) -> Result<PageStep> {
        if is_non_empty_file(dest).await {
            debug!(page = ?dest, "page already on disk, skipping");
            return Ok(PageStep::Skipped);
        }

        let url = pages.page_url(file);
        match fetch_to_file(
            &self.client,
            &url,
            dest,
            &self.page_headers,
            self.config.http.request_timeout,
        )
        .await
        {
            Ok(_) => Ok(PageStep::Fetched),
            Err(e) => {
                warn!(url = %url, page = ?dest, error = %e, "page download failed");
                Err(e)
            }
        }
    }
}

/// Destination of a page inside `dir`, using only the last component of the remote name
fn page_path(dir: &Path, file: &str) -> Option<PathBuf> {
    let name = Path::new(file).file_name()?;
    Some(dir.join(name))
}
