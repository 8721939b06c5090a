use crate::config::PackConfig;
use crate::error::{Error, PackError};
use crate::packer::document::{Placement, fit_centered, split_alpha};
use crate::packer::*;
use crate::types::ArtifactFormat;
use std::io::{Cursor, Read};
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Write a solid-color PNG of the given size
fn write_png(path: &Path, width: u32, height: u32) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    image::RgbImage::from_pixel(width, height, image::Rgb([200, 30, 30]))
        .save(path)
        .unwrap();
}

/// Write a grayscale JPEG of the given size
fn write_gray_jpeg(path: &Path, width: u32, height: u32) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    image::GrayImage::from_pixel(width, height, image::Luma([128]))
        .save(path)
        .unwrap();
}

/// Write JPEG bytes under a name whose extension says otherwise
fn write_jpeg_bytes_as(path: &Path, width: u32, height: u32) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut out = Cursor::new(Vec::new());
    image::GrayImage::from_pixel(width, height, image::Luma([90]))
        .write_to(&mut out, image::ImageFormat::Jpeg)
        .unwrap();
    std::fs::write(path, out.into_inner()).unwrap();
}

/// Image XObject streams of a document
fn image_streams(doc: &lopdf::Document) -> Vec<&lopdf::Stream> {
    doc.objects
        .values()
        .filter_map(|obj| obj.as_stream().ok())
        .filter(|stream| {
            stream
                .dict
                .get(b"Subtype")
                .and_then(|s| s.as_name())
                .map(|name| name == b"Image")
                .unwrap_or(false)
        })
        .collect()
}

fn name_of<'a>(stream: &'a lopdf::Stream, key: &[u8]) -> Option<&'a [u8]> {
    stream.dict.get(key).and_then(|v| v.as_name()).ok()
}

/// MediaBox width/height of every page, in page order
fn page_sizes(doc: &lopdf::Document) -> Vec<(f32, f32)> {
    doc.get_pages()
        .values()
        .map(|id| {
            let page = doc.get_object(*id).unwrap().as_dict().unwrap();
            let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
            (
                media_box[2].as_float().unwrap(),
                media_box[3].as_float().unwrap(),
            )
        })
        .collect()
}

fn zip_entry_names(path: &Path) -> Vec<String> {
    let file = std::fs::File::open(path).unwrap();
    let archive = zip::ZipArchive::new(file).unwrap();
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    names
}

// ---------------------------------------------------------------------------
// Archive
// ---------------------------------------------------------------------------

#[tokio::test]
async fn archive_preserves_chapter_subfolders() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("temp-vol-1-Group");
    write_png(&src.join("Chapter_1/01.png"), 4, 4);
    write_png(&src.join("Chapter_1/02.png"), 4, 4);
    write_png(&src.join("Chapter_2/01.png"), 4, 4);
    let dest = temp.path().join("vol.zip");

    let files = pack_archive(&src, &dest, 6).await.unwrap();

    assert_eq!(files, 3);
    assert_eq!(
        zip_entry_names(&dest),
        vec!["Chapter_1/01.png", "Chapter_1/02.png", "Chapter_2/01.png"]
    );
}

#[tokio::test]
async fn archive_entries_round_trip_contents() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src");
    std::fs::create_dir_all(&src).unwrap();
    std::fs::write(src.join("notes.txt"), b"page order: 1, 2, 3").unwrap();
    let dest = temp.path().join("out.cbz");

    pack_archive(&src, &dest, 9).await.unwrap();

    let mut archive = zip::ZipArchive::new(std::fs::File::open(&dest).unwrap()).unwrap();
    let mut entry = archive.by_name("notes.txt").unwrap();
    assert_eq!(entry.compression(), zip::CompressionMethod::Deflated);
    let mut contents = String::new();
    entry.read_to_string(&mut contents).unwrap();
    assert_eq!(contents, "page order: 1, 2, 3");
}

#[tokio::test]
async fn archive_of_empty_dir_is_valid_and_empty() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("empty");
    std::fs::create_dir_all(&src).unwrap();
    let dest = temp.path().join("empty.zip");

    assert_eq!(pack_archive(&src, &dest, 6).await.unwrap(), 0);
    assert!(zip_entry_names(&dest).is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn archive_does_not_follow_symlinks() {
    let temp = TempDir::new().unwrap();
    let outside = temp.path().join("outside");
    write_png(&outside.join("secret.png"), 2, 2);
    let src = temp.path().join("src");
    write_png(&src.join("01.png"), 2, 2);
    std::os::unix::fs::symlink(&outside, src.join("link")).unwrap();
    let dest = temp.path().join("out.zip");

    pack_archive(&src, &dest, 6).await.unwrap();

    assert_eq!(zip_entry_names(&dest), vec!["01.png"]);
}

#[tokio::test]
async fn archive_failure_leaves_no_artifact() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src");
    write_png(&src.join("01.png"), 2, 2);
    // Parent directory of the artifact does not exist
    let dest = temp.path().join("missing-dir/out.zip");

    let err = pack_archive(&src, &dest, 6).await.unwrap_err();

    assert!(matches!(err, Error::Pack(PackError::Archive { .. })), "got {err:?}");
    assert!(!dest.exists());
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

#[tokio::test]
async fn document_has_one_page_per_image_and_ignores_other_files() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("chapter");
    write_png(&src.join("1.png"), 30, 40);
    write_png(&src.join("2.PNG"), 30, 40);
    write_gray_jpeg(&src.join("3.jpg"), 30, 40);
    std::fs::write(src.join("info.txt"), b"not an image").unwrap();
    let dest = temp.path().join("chapter.pdf");

    let pages = pack_document(&src, &dest, &PackConfig::default()).await.unwrap();

    assert_eq!(pages, 3);
    let doc = lopdf::Document::load(&dest).unwrap();
    assert_eq!(doc.get_pages().len(), 3);
}

#[tokio::test]
async fn document_pages_follow_natural_order_and_image_size() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("chapter");
    // Width encodes the expected position
    write_png(&src.join("page10.png"), 30, 50);
    write_png(&src.join("page2.png"), 20, 50);
    write_png(&src.join("page1.png"), 10, 50);
    let dest = temp.path().join("chapter.pdf");

    pack_document(&src, &dest, &PackConfig::default()).await.unwrap();

    let doc = lopdf::Document::load(&dest).unwrap();
    assert_eq!(
        page_sizes(&doc),
        vec![(10.0, 50.0), (20.0, 50.0), (30.0, 50.0)]
    );
}

#[tokio::test]
async fn document_orders_across_subfolders() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("volume");
    write_png(&src.join("Chapter_10/01.png"), 30, 10);
    write_png(&src.join("Chapter_2/01.png"), 20, 10);
    write_png(&src.join("Chapter_2/02.png"), 21, 10);
    let dest = temp.path().join("volume.pdf");

    pack_document(&src, &dest, &PackConfig::default()).await.unwrap();

    let doc = lopdf::Document::load(&dest).unwrap();
    let widths: Vec<f32> = page_sizes(&doc).into_iter().map(|(w, _)| w).collect();
    assert_eq!(widths, vec![20.0, 21.0, 30.0]);
}

#[tokio::test]
async fn empty_dir_yields_valid_zero_page_document() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("empty");
    std::fs::create_dir_all(&src).unwrap();
    let dest = temp.path().join("empty.pdf");

    let pages = pack_document(&src, &dest, &PackConfig::default()).await.unwrap();

    assert_eq!(pages, 0);
    let doc = lopdf::Document::load(&dest).unwrap();
    assert!(doc.get_pages().is_empty());
}

#[tokio::test]
async fn gray_jpeg_is_embedded_without_reencoding() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("chapter");
    let jpeg = src.join("1.jpg");
    write_gray_jpeg(&jpeg, 16, 24);
    let original = std::fs::read(&jpeg).unwrap();
    let dest = temp.path().join("chapter.pdf");

    pack_document(&src, &dest, &PackConfig::default()).await.unwrap();

    let doc = lopdf::Document::load(&dest).unwrap();
    let embedded = doc
        .objects
        .values()
        .filter_map(|obj| obj.as_stream().ok())
        .find(|stream| {
            stream
                .dict
                .get(b"Subtype")
                .and_then(|s| s.as_name())
                .map(|name| name == b"Image")
                .unwrap_or(false)
        })
        .expect("image stream");

    assert_eq!(
        embedded.dict.get(b"ColorSpace").unwrap().as_name().unwrap(),
        b"DeviceGray"
    );
    assert_eq!(embedded.content, original);
}

#[tokio::test]
async fn corrupt_image_fails_and_removes_document() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("chapter");
    write_png(&src.join("1.png"), 8, 8);
    std::fs::write(src.join("2.png"), b"definitely not a png").unwrap();
    let dest = temp.path().join("chapter.pdf");

    let err = pack_document(&src, &dest, &PackConfig::default())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Pack(PackError::Image { .. })), "got {err:?}");
    assert!(!dest.exists());
}

#[tokio::test]
async fn transparent_png_is_embedded_losslessly_with_soft_mask() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("chapter");
    std::fs::create_dir_all(&src).unwrap();
    image::RgbaImage::from_pixel(20, 20, image::Rgba([0, 0, 0, 0]))
        .save(src.join("1.png"))
        .unwrap();
    let dest = temp.path().join("chapter.pdf");

    pack_document(&src, &dest, &PackConfig::default()).await.unwrap();

    let doc = lopdf::Document::load(&dest).unwrap();
    let streams = image_streams(&doc);
    assert!(
        streams
            .iter()
            .all(|s| name_of(s, b"Filter") != Some(b"DCTDecode".as_slice())),
        "no page may be JPEG-encoded"
    );

    let page_image = streams
        .iter()
        .find(|s| s.dict.get(b"SMask").is_ok())
        .expect("image with soft mask");
    assert_eq!(name_of(page_image, b"ColorSpace"), Some(b"DeviceRGB".as_slice()));
    assert_eq!(name_of(page_image, b"Filter"), Some(b"FlateDecode".as_slice()));

    let mask_id = page_image.dict.get(b"SMask").unwrap().as_reference().unwrap();
    let mask = doc.get_object(mask_id).unwrap().as_stream().unwrap();
    assert_eq!(name_of(mask, b"ColorSpace"), Some(b"DeviceGray".as_slice()));
    assert_eq!(mask.dict.get(b"Width").unwrap().as_i64().unwrap(), 20);
    assert_eq!(mask.dict.get(b"Height").unwrap().as_i64().unwrap(), 20);
}

#[tokio::test]
async fn opaque_png_is_embedded_losslessly_without_mask() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("chapter");
    write_png(&src.join("1.png"), 16, 16);
    let dest = temp.path().join("chapter.pdf");

    pack_document(&src, &dest, &PackConfig::default()).await.unwrap();

    let doc = lopdf::Document::load(&dest).unwrap();
    let streams = image_streams(&doc);
    assert_eq!(streams.len(), 1);
    assert!(streams[0].dict.get(b"SMask").is_err());
    assert_eq!(name_of(streams[0], b"Filter"), Some(b"FlateDecode".as_slice()));
    assert_eq!(name_of(streams[0], b"ColorSpace"), Some(b"DeviceRGB".as_slice()));
}

#[tokio::test]
async fn document_uses_fallback_page_size_when_size_is_unreadable() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("chapter");
    // JPEG contents under a .png name: probing by extension fails, embedding still works
    write_jpeg_bytes_as(&src.join("1.png"), 20, 20);
    write_png(&src.join("2.png"), 20, 20);
    let dest = temp.path().join("chapter.pdf");

    pack_document(&src, &dest, &PackConfig::default()).await.unwrap();

    let doc = lopdf::Document::load(&dest).unwrap();
    assert_eq!(page_sizes(&doc), vec![(800.0, 1200.0), (20.0, 20.0)]);
}

#[tokio::test]
async fn document_honours_configured_fallback_page_size() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("chapter");
    write_jpeg_bytes_as(&src.join("1.png"), 20, 20);
    let dest = temp.path().join("chapter.pdf");
    let config = PackConfig {
        fallback_page_size: (300, 500),
        ..PackConfig::default()
    };

    pack_document(&src, &dest, &config).await.unwrap();

    let doc = lopdf::Document::load(&dest).unwrap();
    assert_eq!(page_sizes(&doc), vec![(300.0, 500.0)]);
}

#[test]
fn split_alpha_separates_last_channel() {
    let (samples, alpha) = split_alpha(&[1, 2, 3, 4, 5, 6, 7, 8], 4);
    assert_eq!(samples, vec![1, 2, 3, 5, 6, 7]);
    assert_eq!(alpha, vec![4, 8]);

    let (gray, alpha) = split_alpha(&[10, 0, 20, 255], 2);
    assert_eq!(gray, vec![10, 20]);
    assert_eq!(alpha, vec![0, 255]);
}

#[test]
fn fit_centered_keeps_same_size_image_at_origin() {
    assert_eq!(
        fit_centered((800.0, 1200.0), (800.0, 1200.0)),
        Placement {
            x: 0.0,
            y: 0.0,
            width: 800.0,
            height: 1200.0
        }
    );
}

#[test]
fn fit_centered_letterboxes_wide_image() {
    let placement = fit_centered((800.0, 1200.0), (1600.0, 800.0));
    assert_eq!(placement.width, 800.0);
    assert_eq!(placement.height, 400.0);
    assert_eq!(placement.x, 0.0);
    assert_eq!(placement.y, 400.0);
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

#[tokio::test]
async fn loose_format_packs_nothing() {
    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("never-written");

    let written = pack(
        ArtifactFormat::Loose,
        temp.path(),
        &dest,
        &PackConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(written, 0);
    assert!(!dest.exists());
}

#[test]
fn relative_name_uses_forward_slashes() {
    let root = Path::new("/work/temp-vol-1");
    let file = root.join("Chapter_3").join("07.png");
    assert_eq!(relative_name(root, &file), "Chapter_3/07.png");
}
