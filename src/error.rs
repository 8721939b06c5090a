//! Error types for manga-dl
//!
//! This module provides the error taxonomy used across the pipeline:
//! - Transport and HTTP failures while fetching pages ([`DownloadError`])
//! - Chapter-level outcomes (empty page lists, partial failures, exhausted retries)
//! - Artifact assembly failures ([`PackError`])
//! - Machine-readable error codes for callers that report errors

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for manga-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for manga-dl
///
/// Each variant carries enough context to be logged on its own, since most errors are
/// reported per chapter or per job rather than propagated to the process.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "concurrency.pages_per_wave")
        key: Option<String>,
    },

    /// Page or chapter download error
    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    /// Artifact assembly error (archive or document)
    #[error("packaging error: {0}")]
    Pack(#[from] PackError),

    /// The content source could not answer a lookup
    #[error("content source error: {0}")]
    Source(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Download-related errors
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Server answered with a non-success status
    #[error("HTTP {status} for {url}")]
    HttpStatus {
        /// The requested URL
        url: String,
        /// The status code returned by the server
        status: u16,
    },

    /// The request did not complete before the client-side deadline
    #[error("request timeout after {timeout_ms}ms for {url}")]
    Timeout {
        /// The requested URL
        url: String,
        /// The deadline that elapsed, in milliseconds
        timeout_ms: u64,
    },

    /// The response carried no body bytes
    #[error("empty response body for {url}")]
    EmptyBody {
        /// The requested URL
        url: String,
    },

    /// The chapter resolved to an empty page list
    #[error("chapter {chapter_id} has no pages")]
    NoPages {
        /// The chapter whose page list was empty
        chapter_id: String,
    },

    /// A page file name has no usable file component (for example `..`)
    #[error("chapter {chapter_id} has invalid page name {file:?}")]
    InvalidPageName {
        /// The chapter whose page list holds the name
        chapter_id: String,
        /// The offending name as listed by the source
        file: String,
    },

    /// Some pages of a chapter attempt failed
    #[error("{failed} of {total} pages failed")]
    PagesFailed {
        /// Number of pages that failed in this attempt
        failed: usize,
        /// Number of distinct pages in the chapter
        total: usize,
    },

    /// A chapter could not be downloaded after all attempts
    #[error("chapter {chapter} ({chapter_id}) failed after {attempts} attempt(s): {reason}")]
    ChapterFailed {
        /// The chapter identifier
        chapter_id: String,
        /// The chapter number label used in logs and file names
        chapter: String,
        /// How many attempts were made
        attempts: u32,
        /// The last error that was observed
        reason: String,
    },

    /// No chapter of a volume job produced any file
    #[error("nothing downloaded for volume {volume} ({failed} chapter(s) failed)")]
    NothingDownloaded {
        /// The volume label of the job
        volume: String,
        /// Number of chapters that failed permanently
        failed: usize,
    },
}

/// Artifact assembly errors
#[derive(Debug, Error)]
pub enum PackError {
    /// Writing the archive failed
    #[error("failed to write archive {archive}: {reason}")]
    Archive {
        /// The archive being written
        archive: PathBuf,
        /// The reason writing failed
        reason: String,
    },

    /// Writing the document failed
    #[error("failed to write document {document}: {reason}")]
    Document {
        /// The document being written
        document: PathBuf,
        /// The reason writing failed
        reason: String,
    },

    /// An image could not be decoded or embedded in a document page
    #[error("failed to embed image {image}: {reason}")]
    Image {
        /// The offending image file
        image: PathBuf,
        /// The reason the image was rejected
        reason: String,
    },

    /// The blocking packer task panicked or was cancelled
    #[error("packer task failed: {0}")]
    TaskPanicked(String),
}

impl From<zip::result::ZipError> for Error {
    fn from(error: zip::result::ZipError) -> Self {
        Error::Pack(PackError::Archive {
            archive: PathBuf::new(),
            reason: error.to_string(),
        })
    }
}

impl Error {
    /// Get the machine-readable error code
    pub fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Download(e) => match e {
                DownloadError::HttpStatus { .. } => "http_status",
                DownloadError::Timeout { .. } => "request_timeout",
                DownloadError::EmptyBody { .. } => "empty_body",
                DownloadError::NoPages { .. } => "no_pages",
                DownloadError::InvalidPageName { .. } => "invalid_page_name",
                DownloadError::PagesFailed { .. } => "pages_failed",
                DownloadError::ChapterFailed { .. } => "chapter_failed",
                DownloadError::NothingDownloaded { .. } => "nothing_downloaded",
            },
            Error::Pack(e) => match e {
                PackError::Archive { .. } => "archive_failed",
                PackError::Document { .. } => "document_failed",
                PackError::Image { .. } => "image_failed",
                PackError::TaskPanicked(_) => "packer_panicked",
            },
            Error::Source(_) => "source_error",
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::Other(_) => "internal_error",
        }
    }

    /// Whether the error was produced while assembling an artifact
    pub fn is_packaging(&self) -> bool {
        matches!(self, Error::Pack(_))
    }
}
