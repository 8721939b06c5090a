//! # manga-dl
//!
//! Download pipeline for manga chapters and volumes.
//!
//! ## Design Philosophy
//!
//! manga-dl is designed to be:
//! - **Library-first** - No CLI or prompts, purely a Rust crate for embedding
//! - **Gentle on the host** - Pages, chapters and volumes run in fixed-size waves
//! - **Resumable within a run** - Retries only fetch the pages still missing on disk
//! - **Source-agnostic** - The content API sits behind the [`ContentSource`] trait
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::path::PathBuf;
//! use std::sync::Arc;
//! use manga_dl::{ArtifactFormat, Config, JobSettings, MangaDexSource, MangaDownloader};
//! use manga_dl::grouping::{group_chapters, sort_chapters_by_number};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let source = Arc::new(MangaDexSource::new(&config.http)?);
//!     let downloader = MangaDownloader::new(config, source.clone())?;
//!
//!     let mut chapters = source.chapters("manga-id", Some("en")).await?;
//!     sort_chapters_by_number(&mut chapters);
//!     let index = group_chapters(&chapters);
//!
//!     let settings = JobSettings {
//!         manga: "Some Manga".to_string(),
//!         language: "en".to_string(),
//!         out_dir: PathBuf::from("downloads"),
//!         format: ArtifactFormat::Archive,
//!         document_per_chapter: false,
//!     };
//!     let picked: Vec<_> = index.volumes().into_iter().cloned().collect();
//!     let plan = downloader.plan_volumes(&index, &picked, &settings).await;
//!
//!     for result in downloader.download_volumes(&plan.jobs).await {
//!         match result {
//!             Ok(report) => println!("{:?}", report.artifact),
//!             Err(e) => eprintln!("volume failed: {e}"),
//!         }
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Wave-based batch execution
pub mod batch;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Single-file streaming downloader
pub mod fetch;
/// Volume and group partitioning, group name cache, job planning
pub mod grouping;
/// Output file and folder names
pub mod naming;
/// Zip and PDF artifact writers
pub mod packer;
/// Chapter and volume download pipeline
pub mod pipeline;
/// Retry logic with exponential backoff
pub mod retry;
/// Content API seam and the MangaDex client
pub mod source;
/// Core types
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::{Config, ConcurrencyConfig, HttpConfig, PackConfig, PageQuality, RetryConfig};
pub use error::{DownloadError, Error, PackError, Result};
pub use grouping::{GroupNameCache, JobSettings, VolumeGroupIndex, VolumePlan};
pub use pipeline::{ChapterOutcome, MangaDownloader};
pub use source::{ContentSource, MangaDexSource};
pub use types::{
    Artifact, ArtifactFormat, Chapter, ChapterRequest, DownloadJob, GroupId, JobReport, PageSet,
    Volume,
};
