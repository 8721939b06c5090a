//! Chapter fixtures, page images and downloader configuration

use std::io::Cursor;
use std::time::Duration;

use manga_dl::{Chapter, Config, GroupId, Volume};

/// Manga name used in every output name
pub const MANGA: &str = "Manga";

/// Group id the fake source resolves to [`GROUP_NAME`]
pub const GROUP_ID: &str = "g1";

/// Display name of [`GROUP_ID`]
pub const GROUP_NAME: &str = "Group A";

/// Configuration with two attempts and millisecond backoff
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.retry.max_attempts = 2;
    config.retry.initial_delay = Duration::from_millis(5);
    config.retry.jitter = false;
    config.http.request_timeout = Duration::from_secs(5);
    config
}

/// A hosted chapter of volume `volume` credited to [`GROUP_ID`]
pub fn chapter(id: &str, number: &str, volume: Option<&str>) -> Chapter {
    Chapter {
        id: id.to_string(),
        number: Some(number.to_string()),
        volume: Volume::from(volume.map(str::to_string)),
        language: "en".to_string(),
        external_url: None,
        group: GroupId::Id(GROUP_ID.to_string()),
    }
}

/// PNG bytes of a solid image; width and height double as page markers in PDF checks
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbImage::from_pixel(width, height, image::Rgb([20, 120, 220]));
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, image::ImageFormat::Png)
        .expect("encode png");
    out.into_inner()
}

/// Names of the entries directly inside `dir`, sorted
pub fn dir_entries(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("read dir")
        .map(|entry| entry.expect("dir entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Sorted entry names of a zip archive
pub fn zip_entries(path: &std::path::Path) -> Vec<String> {
    let archive = zip::ZipArchive::new(std::fs::File::open(path).expect("open zip"))
        .expect("read zip");
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    names
}

/// Number of pages of a PDF
pub fn pdf_page_count(path: &std::path::Path) -> usize {
    lopdf::Document::load(path).expect("load pdf").get_pages().len()
}
