//! Content source abstraction
//!
//! The pipeline never talks to a content API directly. It asks a [`ContentSource`] where the
//! pages of a chapter live and what a publishing group is called. [`MangaDexSource`] is the
//! production implementation; tests substitute in-memory fakes.

mod mangadex;

pub use mangadex::MangaDexSource;

use crate::error::Result;
use crate::types::PageSet;

/// Narrow view of a remote content API used by the download pipeline
///
/// Implementations must not retry internally: chapter-level retries already wrap every
/// [`ContentSource::page_locations`] call.
#[async_trait::async_trait]
pub trait ContentSource: Send + Sync {
    /// Resolve the page file locations of a chapter
    async fn page_locations(&self, chapter_id: &str) -> Result<PageSet>;

    /// Look up the display name of a publishing group
    async fn group_name(&self, group_id: &str) -> Result<String>;
}
