//! Common test utilities for manga-dl pipeline tests

#![allow(clippy::unwrap_used, clippy::expect_used)]

#[allow(dead_code)]
pub mod fixtures;
#[allow(dead_code)]
pub mod source;

use std::sync::Arc;

use manga_dl::{Config, MangaDownloader};
use wiremock::MockServer;

#[allow(unused_imports)]
pub use fixtures::*;
#[allow(unused_imports)]
pub use source::*;

/// Mock page host, fake source and a downloader wired to both
pub struct Harness {
    /// Page host
    pub server: MockServer,
    /// Content source handed to the downloader
    pub source: Arc<FakeSource>,
    /// Downloader under test
    pub downloader: MangaDownloader,
}

/// Start a harness using [`test_config`]
#[allow(dead_code)]
pub async fn harness() -> Harness {
    harness_with(test_config()).await
}

/// Start a harness with a custom configuration
pub async fn harness_with(config: Config) -> Harness {
    let server = MockServer::start().await;
    let source = Arc::new(FakeSource::new(&server));
    let downloader = MangaDownloader::new(config, source.clone()).expect("create downloader");
    Harness {
        server,
        source,
        downloader,
    }
}
