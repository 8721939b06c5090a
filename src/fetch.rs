//! Single-file downloader
//!
//! Streams one remote resource into `<dest>.part` and renames it onto `dest` once the whole
//! body has been written. A failed download never leaves a partial file behind, so the
//! "skip pages that already exist" rule in the chapter pipeline can trust whatever it finds
//! on disk.

use futures::StreamExt;
use reqwest::header::HeaderMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::error::{DownloadError, Error, Result};

/// Suffix of the temporary file a download streams into
pub const PART_SUFFIX: &str = ".part";

/// Path of the temporary file used while downloading `dest`
pub fn part_path(dest: &Path) -> PathBuf {
    let mut name = OsString::from(dest.as_os_str());
    name.push(PART_SUFFIX);
    PathBuf::from(name)
}

/// Download `url` into `dest`
///
/// Parent directories of `dest` are created as needed. The whole exchange (connect, headers
/// and body) must finish within `timeout`. Returns the number of bytes written.
///
/// # Errors
///
/// - [`DownloadError::Timeout`] when the deadline elapses
/// - [`DownloadError::HttpStatus`] for any non-2xx response
/// - [`DownloadError::EmptyBody`] when the response has no body bytes
/// - [`Error::Network`] or [`Error::Io`] for transport and filesystem failures
///
/// In every error case the partial file is removed (best-effort) before returning.
pub async fn fetch_to_file(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    headers: &HeaderMap,
    timeout: Duration,
) -> Result<u64> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let part = part_path(dest);
    let download = stream_to_file(client, url, &part, headers, timeout);
    let outcome = match tokio::time::timeout(timeout, download).await {
        Ok(result) => result,
        Err(_) => Err(timeout_error(url, timeout)),
    };

    let written = match outcome {
        Ok(written) => written,
        Err(e) => {
            remove_partial(&part).await;
            return Err(e);
        }
    };

    if let Err(e) = tokio::fs::rename(&part, dest).await {
        remove_partial(&part).await;
        return Err(e.into());
    }

    tracing::debug!(url = %url, dest = ?dest, bytes = written, "downloaded file");
    Ok(written)
}

async fn stream_to_file(
    client: &reqwest::Client,
    url: &str,
    part: &Path,
    headers: &HeaderMap,
    timeout: Duration,
) -> Result<u64> {
    let response = client
        .get(url)
        .headers(headers.clone())
        .send()
        .await
        .map_err(|e| transport_error(e, url, timeout))?;

    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        }
        .into());
    }

    let file = tokio::fs::File::create(part).await?;
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| transport_error(e, url, timeout))?;
        writer.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    writer.flush().await?;
    writer.into_inner().sync_all().await?;

    if written == 0 {
        return Err(DownloadError::EmptyBody {
            url: url.to_string(),
        }
        .into());
    }

    Ok(written)
}

fn timeout_error(url: &str, timeout: Duration) -> Error {
    DownloadError::Timeout {
        url: url.to_string(),
        timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
    }
    .into()
}

fn transport_error(error: reqwest::Error, url: &str, timeout: Duration) -> Error {
    if error.is_timeout() {
        timeout_error(url, timeout)
    } else {
        Error::Network(error)
    }
}

async fn remove_partial(part: &Path) {
    match tokio::fs::remove_file(part).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = ?part, error = %e, "failed to remove partial download");
        }
    }
}
