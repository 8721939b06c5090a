//! Artifact assembly
//!
//! Turns a directory of downloaded page images into a deliverable file:
//! - [`pack_archive`] - deflate-compressed zip archive keeping relative paths
//! - [`pack_document`] - PDF with one page per image, in natural file order
//!
//! Both run their blocking work on `spawn_blocking` and remove the partially written
//! artifact when anything fails.

mod archive;
mod document;

pub use archive::write_archive;
pub use document::{write_document, IMAGE_EXTENSIONS};

use crate::config::PackConfig;
use crate::error::{Error, PackError, Result};
use crate::types::ArtifactFormat;
use std::path::{Path, PathBuf};
use tokio::task::spawn_blocking;
use tracing::{error, info};

/// Zip every file below `src` into `dest`
///
/// Returns the number of files written once the archive is finished and synced to disk.
pub async fn pack_archive(src: &Path, dest: &Path, compression_level: u32) -> Result<usize> {
    let src_owned = src.to_path_buf();
    let dest_owned = dest.to_path_buf();

    let result = run_blocking(dest, move || {
        write_archive(&src_owned, &dest_owned, compression_level)
    })
    .await;

    if let Ok(files) = result {
        info!(archive = ?dest, files, "archive written");
    }
    result
}

/// Compose every page image below `src` into a PDF at `dest`
///
/// Returns the number of pages written.
pub async fn pack_document(src: &Path, dest: &Path, config: &PackConfig) -> Result<usize> {
    let src_owned = src.to_path_buf();
    let dest_owned = dest.to_path_buf();
    let config = config.clone();

    let result = run_blocking(dest, move || {
        write_document(&src_owned, &dest_owned, &config)
    })
    .await;

    if let Ok(pages) = result {
        info!(document = ?dest, pages, "document written");
    }
    result
}

/// Pack `src` into `dest` using the packer for `format`
///
/// Loose output has nothing to pack and returns `Ok(0)` without touching `dest`.
pub async fn pack(
    format: ArtifactFormat,
    src: &Path,
    dest: &Path,
    config: &PackConfig,
) -> Result<usize> {
    match format {
        ArtifactFormat::Loose => Ok(0),
        ArtifactFormat::Archive => pack_archive(src, dest, config.compression_level).await,
        ArtifactFormat::Document => pack_document(src, dest, config).await,
    }
}

/// Run a blocking packer and clean up `dest` if it fails
async fn run_blocking<F>(dest: &Path, work: F) -> Result<usize>
where
    F: FnOnce() -> Result<usize> + Send + 'static,
{
    let result = match spawn_blocking(work).await {
        Ok(result) => result,
        Err(e) => Err(Error::Pack(PackError::TaskPanicked(e.to_string()))),
    };

    if let Err(e) = &result {
        error!(artifact = ?dest, error = %e, "packing failed");
        remove_partial_artifact(dest).await;
    }
    result
}

async fn remove_partial_artifact(dest: &Path) {
    match tokio::fs::remove_file(dest).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(artifact = ?dest, error = %e, "failed to remove partial artifact");
        }
    }
}

/// Path of `file` relative to `root`, with `/` separators
pub(crate) fn relative_name(root: &Path, file: &Path) -> String {
    let rel: PathBuf = file.strip_prefix(root).unwrap_or(file).to_path_buf();
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
