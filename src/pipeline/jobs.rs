//! Chapter-mode and volume-mode entry points
//!
//! Loose output is written straight into its final folder. Archive and document output is
//! staged in a [`Workspace`] below the output directory, packed once every chapter has been
//! handled, and the workspace is removed whatever happened.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::{ChapterOutcome, MangaDownloader, Workspace};
use crate::batch::run_in_waves;
use crate::error::{DownloadError, Error, Result};
use crate::naming::{chapter_file_name, sanitize, volume_file_name};
use crate::packer;
use crate::types::{Artifact, ArtifactFormat, Chapter, ChapterRequest, DownloadJob, JobReport};
use crate::utils::dir_has_any_file;

/// Subfolder of a volume job holding one chapter's pages
fn chapter_dir_name(chapter: &Chapter) -> String {
    format!("Chapter_{}", sanitize(chapter.number()))
}

fn chapter_workspace_name(chapter: &Chapter) -> String {
    format!("temp-chap-{}", sanitize(&chapter.id))
}

/// Staging folder of a volume job
///
/// Distinct groups can share a display name (every failed lookup is "Unknown Group"), so the
/// group id keeps concurrent jobs of one volume apart.
fn volume_workspace_name(job: &DownloadJob) -> String {
    let mut name = format!(
        "temp-vol-{}-{}",
        sanitize(job.volume.label()),
        sanitize(&job.group_name)
    );
    if let Some(id) = job.group.id() {
        name.push('-');
        name.push_str(&sanitize(id));
    }
    name
}

impl MangaDownloader {
    /// Download one chapter as a standalone artifact
    ///
    /// Returns [`Artifact::Nothing`] for externally hosted chapters. A chapter that fails
    /// after all retries is returned as [`DownloadError::ChapterFailed`] and produces no
    /// artifact.
    ///
    /// # Errors
    /// Returns error if the chapter fails permanently, the output directory cannot be
    /// created, or packing fails.
    pub async fn download_chapter(&self, request: &ChapterRequest) -> Result<JobReport> {
        let chapter = &request.chapter;
        if chapter.is_external() {
            self.download_chapter_pages(chapter, &request.out_dir).await?;
            return Ok(JobReport::complete(Artifact::Nothing));
        }

        let group = self.group_name(chapter).await;
        let extension = request.format.extension(&self.config.pack);
        let name = chapter_file_name(
            &request.manga,
            chapter.number(),
            &chapter.volume,
            &request.language,
            &group,
            extension,
        );

        if request.format == ArtifactFormat::Loose {
            let folder = request.out_dir.join(&name);
            tokio::fs::create_dir_all(&folder).await?;
            self.download_chapter_pages(chapter, &folder).await?;
            info!(chapter_id = %chapter.id, folder = ?folder, "chapter folder ready");
            return Ok(JobReport::complete(Artifact::Folder(folder)));
        }

        let workspace =
            Workspace::create(request.out_dir.join(chapter_workspace_name(chapter))).await?;
        if let Err(e) = self.download_chapter_pages(chapter, workspace.path()).await {
            workspace.close().await;
            return Err(e);
        }

        let dest = request.out_dir.join(&name);
        let packed = packer::pack(request.format, workspace.path(), &dest, &self.config.pack).await;
        workspace.close().await;
        packed?;

        Ok(JobReport::complete(Artifact::Files(vec![dest])))
    }

    /// Download chapters one artifact each, in chapter waves
    ///
    /// Returns one result per chapter in input order. A failed chapter does not affect the
    /// others.
    pub async fn download_chapters(
        &self,
        manga: &str,
        chapters: &[Chapter],
        language: &str,
        out_dir: &Path,
        format: ArtifactFormat,
    ) -> Vec<Result<JobReport>> {
        run_in_waves(
            chapters,
            self.config.concurrency.chapters_per_wave,
            move |chapter| async move {
                let request = ChapterRequest {
                    manga: manga.to_string(),
                    chapter: chapter.clone(),
                    language: language.to_string(),
                    out_dir: out_dir.to_path_buf(),
                    format,
                };
                self.download_chapter(&request).await
            },
        )
        .await
    }

    /// Download one (volume, group) job
    ///
    /// Chapters run in chapter waves, each into its own `Chapter_<n>` subfolder. Chapters that
    /// fail permanently are skipped and listed in [`JobReport::failed_chapters`]; the rest of
    /// the volume is still delivered.
    ///
    /// # Errors
    /// Returns [`DownloadError::NothingDownloaded`] when chapters failed and no page made it
    /// to disk, or the packing error if the artifact could not be written.
    pub async fn download_volume(&self, job: &DownloadJob) -> Result<JobReport> {
        info!(
            volume = %job.volume,
            group = %job.group_name,
            chapters = job.chapters.len(),
            format = ?job.format,
            "starting volume"
        );

        if job.format == ArtifactFormat::Loose {
            let root = job.out_dir.join(volume_file_name(
                &job.manga,
                &job.volume,
                &job.language,
                &job.group_name,
                None,
            ));
            tokio::fs::create_dir_all(&root).await?;
            let failed_chapters = self.download_volume_chapters(job, &root).await;

            if !dir_has_any_file(&root) {
                remove_empty_tree(&root).await;
                return nothing_downloaded(job, failed_chapters);
            }

            info!(volume = %job.volume, folder = ?root, "volume folder ready");
            return Ok(JobReport {
                artifact: Artifact::Folder(root),
                failed_chapters,
            });
        }

        let workspace = Workspace::create(job.out_dir.join(volume_workspace_name(job))).await?;
        let failed_chapters = self.download_volume_chapters(job, workspace.path()).await;

        if !dir_has_any_file(workspace.path()) {
            workspace.close().await;
            return nothing_downloaded(job, failed_chapters);
        }

        let packed = self.pack_volume(job, workspace.path()).await;
        workspace.close().await;

        Ok(JobReport {
            artifact: Artifact::Files(packed?),
            failed_chapters,
        })
    }

    /// Download volume jobs in volume waves, one result per job in input order
    pub async fn download_volumes(&self, jobs: &[DownloadJob]) -> Vec<Result<JobReport>> {
        run_in_waves(
            jobs,
            self.config.concurrency.volumes_per_wave,
            move |job| async move { self.download_volume(job).await },
        )
        .await
    }

    /// Download every chapter of `job` below `root`, returning the permanent failures
    async fn download_volume_chapters(&self, job: &DownloadJob, root: &Path) -> Vec<Error> {
        let results = run_in_waves(
            &job.chapters,
            self.config.concurrency.chapters_per_wave,
            move |chapter| async move {
                let dir = root.join(chapter_dir_name(chapter));
                self.download_chapter_pages(chapter, &dir).await
            },
        )
        .await;

        let mut failed = Vec::new();
        let mut external = 0usize;
        for result in results {
            match result {
                Ok(ChapterOutcome::External) => external += 1,
                Ok(ChapterOutcome::Downloaded { .. }) => {}
                Err(e) => failed.push(e),
            }
        }

        if !failed.is_empty() || external > 0 {
            warn!(
                volume = %job.volume,
                group = %job.group_name,
                failed = failed.len(),
                external,
                "volume is missing chapters"
            );
        }
        failed
    }

    /// Pack a volume workspace into the artifact(s) for `job.format`
    async fn pack_volume(&self, job: &DownloadJob, root: &Path) -> Result<Vec<PathBuf>> {
        if job.format == ArtifactFormat::Document && job.document_per_chapter {
            return self.pack_documents_per_chapter(job, root).await;
        }

        let dest = job.out_dir.join(volume_file_name(
            &job.manga,
            &job.volume,
            &job.language,
            &job.group_name,
            job.format.extension(&self.config.pack),
        ));
        packer::pack(job.format, root, &dest, &self.config.pack).await?;
        Ok(vec![dest])
    }

    async fn pack_documents_per_chapter(
        &self,
        job: &DownloadJob,
        root: &Path,
    ) -> Result<Vec<PathBuf>> {
        let mut seen = HashSet::new();
        let mut written = Vec::new();

        for chapter in &job.chapters {
            let dir_name = chapter_dir_name(chapter);
            if !seen.insert(dir_name.clone()) {
                continue;
            }
            let dir = root.join(&dir_name);
            if !dir_has_any_file(&dir) {
                continue;
            }

            let dest = job.out_dir.join(chapter_file_name(
                &job.manga,
                chapter.number(),
                &job.volume,
                &job.language,
                &job.group_name,
                Some("pdf"),
            ));
            packer::pack_document(&dir, &dest, &self.config.pack).await?;
            written.push(dest);
        }

        Ok(written)
    }
}

/// Outcome of a volume job that left no page on disk
fn nothing_downloaded(job: &DownloadJob, failed_chapters: Vec<Error>) -> Result<JobReport> {
    if failed_chapters.is_empty() {
        info!(volume = %job.volume, group = %job.group_name, "volume has nothing to download");
        return Ok(JobReport::complete(Artifact::Nothing));
    }

    Err(DownloadError::NothingDownloaded {
        volume: job.volume.label().to_string(),
        failed: failed_chapters.len(),
    }
    .into())
}

/// Remove a folder that holds no files, only (possibly) empty chapter subfolders
async fn remove_empty_tree(dir: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(dir).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!(dir = ?dir, error = %e, "failed to remove empty folder");
    }
}
