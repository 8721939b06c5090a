//! In-memory content source serving pages from a wiremock server

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use manga_dl::{ContentSource, Error, PageQuality, PageSet, Result};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::fixtures::{GROUP_ID, GROUP_NAME, png_bytes};

/// Content source whose page lists live in memory and whose pages are served by `server`
pub struct FakeSource {
    base_url: String,
    pages: Mutex<HashMap<String, Vec<String>>>,
    page_lookups: AtomicUsize,
    group_lookups: AtomicUsize,
}

impl FakeSource {
    /// Empty source pointing at `server`
    pub fn new(server: &MockServer) -> Self {
        Self {
            base_url: server.uri(),
            pages: Mutex::new(HashMap::new()),
            page_lookups: AtomicUsize::new(0),
            group_lookups: AtomicUsize::new(0),
        }
    }

    /// Register the page file names of a chapter
    pub fn set_pages(&self, chapter_id: &str, files: &[&str]) {
        self.pages.lock().unwrap().insert(
            chapter_id.to_string(),
            files.iter().map(|f| f.to_string()).collect(),
        );
    }

    /// How many times a page list was requested
    pub fn page_lookups(&self) -> usize {
        self.page_lookups.load(Ordering::SeqCst)
    }

    /// How many times a group name was requested
    pub fn group_lookups(&self) -> usize {
        self.group_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ContentSource for FakeSource {
    async fn page_locations(&self, chapter_id: &str) -> Result<PageSet> {
        self.page_lookups.fetch_add(1, Ordering::SeqCst);
        let files = self
            .pages
            .lock()
            .unwrap()
            .get(chapter_id)
            .cloned()
            .ok_or_else(|| Error::Source(format!("unknown chapter {chapter_id}")))?;

        Ok(PageSet {
            base_url: self.base_url.clone(),
            hash: chapter_id.to_string(),
            files,
            quality: PageQuality::Data,
        })
    }

    async fn group_name(&self, group_id: &str) -> Result<String> {
        self.group_lookups.fetch_add(1, Ordering::SeqCst);
        if group_id == GROUP_ID {
            Ok(GROUP_NAME.to_string())
        } else {
            Err(Error::Source(format!("unknown group {group_id}")))
        }
    }
}

/// Serve every page of a chapter as a PNG, each page `width` pixels wide
///
/// With `expected` set, the server verifies on drop that each page was requested exactly
/// that many times.
pub async fn mount_pages(
    server: &MockServer,
    source: &FakeSource,
    chapter_id: &str,
    files: &[&str],
    width: u32,
    expected: Option<u64>,
) {
    source.set_pages(chapter_id, files);
    for file in files {
        let mock = Mock::given(method("GET"))
            .and(path(format!("/data/{chapter_id}/{file}")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes(width, 20)));
        let mock = match expected {
            Some(times) => mock.expect(times),
            None => mock,
        };
        mock.mount(server).await;
    }
}

/// Make every page of a chapter answer with `status`
pub async fn mount_failing_pages(
    server: &MockServer,
    source: &FakeSource,
    chapter_id: &str,
    files: &[&str],
    status: u16,
) {
    source.set_pages(chapter_id, files);
    for file in files {
        Mock::given(method("GET"))
            .and(path(format!("/data/{chapter_id}/{file}")))
            .respond_with(ResponseTemplate::new(status))
            .mount(server)
            .await;
    }
}

/// Serve bytes that are not an image for every page of a chapter
pub async fn mount_corrupt_pages(
    server: &MockServer,
    source: &FakeSource,
    chapter_id: &str,
    files: &[&str],
) {
    source.set_pages(chapter_id, files);
    for file in files {
        Mock::given(method("GET"))
            .and(path(format!("/data/{chapter_id}/{file}")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"not an image".to_vec()))
            .mount(server)
            .await;
    }
}
