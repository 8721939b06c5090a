use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegDecoder;
use image::{DynamicImage, ExtendedColorType, ImageDecoder, ImageFormat};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};
use tracing::{debug, warn};

use super::relative_name;
use crate::config::PackConfig;
use crate::error::{Error, PackError, Result};
use crate::utils::{collect_files, natural_cmp};

/// File extensions (lowercase) picked up as document pages
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

const IMAGE_NAME: &[u8] = b"Im0";

fn document_error(document: &Path, reason: impl ToString) -> Error {
    Error::Pack(PackError::Document {
        document: document.to_path_buf(),
        reason: reason.to_string(),
    })
}

fn image_error(image: &Path, reason: impl ToString) -> Error {
    Error::Pack(PackError::Image {
        image: image.to_path_buf(),
        reason: reason.to_string(),
    })
}

fn is_page_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// Page images below `root`, naturally sorted by relative path
fn page_images(root: &Path) -> Vec<PathBuf> {
    let mut images: Vec<(String, PathBuf)> = collect_files(root)
        .into_iter()
        .filter(|path| is_page_image(path))
        .map(|path| (relative_name(root, &path), path))
        .collect();
    images.sort_by(|a, b| natural_cmp(&a.0, &b.0));
    images.into_iter().map(|(_, path)| path).collect()
}

/// Image data ready to embed as a PDF XObject
struct EmbeddedImage {
    width: u32,
    height: u32,
    color_space: &'static str,
    data: ImageData,
}

enum ImageData {
    /// JPEG file contents, embedded with `DCTDecode`
    Jpeg(Vec<u8>),
    /// 8-bit samples in `color_space`, plus an optional alpha plane used as soft mask
    Raw {
        samples: Vec<u8>,
        alpha: Option<Vec<u8>>,
    },
}

/// Produce the image data for embedding `path`
///
/// Gray and RGB JPEGs are embedded as-is. Everything else is decoded to 8-bit gray or RGB
/// samples and embedded losslessly; transparency becomes a soft mask.
fn embed_image(path: &Path) -> Result<EmbeddedImage> {
    let bytes = std::fs::read(path).map_err(|e| image_error(path, e))?;

    if image::guess_format(&bytes).ok() == Some(ImageFormat::Jpeg)
        && let Some((width, height, color_space)) = jpeg_passthrough(&bytes)
    {
        return Ok(EmbeddedImage {
            width,
            height,
            color_space,
            data: ImageData::Jpeg(bytes),
        });
    }

    let decoded = image::load_from_memory(&bytes).map_err(|e| image_error(path, e))?;
    Ok(raw_samples(decoded))
}

/// Size and PDF color space of a JPEG that can be embedded without re-encoding
fn jpeg_passthrough(bytes: &[u8]) -> Option<(u32, u32, &'static str)> {
    let decoder = JpegDecoder::new(Cursor::new(bytes)).ok()?;
    let color_space = match decoder.original_color_type() {
        ExtendedColorType::L8 => "DeviceGray",
        ExtendedColorType::Rgb8 => "DeviceRGB",
        _ => return None,
    };
    let (width, height) = decoder.dimensions();
    Some((width, height, color_space))
}

fn raw_samples(decoded: DynamicImage) -> EmbeddedImage {
    let (width, height) = (decoded.width(), decoded.height());
    let color = decoded.color();

    let (color_space, samples, alpha) = match (color.has_color(), color.has_alpha()) {
        (false, false) => ("DeviceGray", decoded.into_luma8().into_raw(), None),
        (false, true) => {
            let (samples, alpha) = split_alpha(&decoded.into_luma_alpha8().into_raw(), 2);
            ("DeviceGray", samples, Some(alpha))
        }
        (true, false) => ("DeviceRGB", decoded.into_rgb8().into_raw(), None),
        (true, true) => {
            let (samples, alpha) = split_alpha(&decoded.into_rgba8().into_raw(), 4);
            ("DeviceRGB", samples, Some(alpha))
        }
    };

    // Fully opaque images need no mask
    let alpha = alpha.filter(|plane| plane.iter().any(|&a| a != u8::MAX));

    EmbeddedImage {
        width,
        height,
        color_space,
        data: ImageData::Raw { samples, alpha },
    }
}

/// Split interleaved pixels whose last channel is alpha into color samples and alpha plane
pub(crate) fn split_alpha(pixels: &[u8], channels: usize) -> (Vec<u8>, Vec<u8>) {
    let pixel_count = pixels.len() / channels;
    let mut samples = Vec::with_capacity(pixel_count * (channels - 1));
    let mut alpha = Vec::with_capacity(pixel_count);
    for pixel in pixels.chunks_exact(channels) {
        let (color, a) = pixel.split_at(channels - 1);
        samples.extend_from_slice(color);
        alpha.push(a[0]);
    }
    (samples, alpha)
}

/// Placement of an image scaled to fit a page and centered on it
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

pub(crate) fn fit_centered(page: (f32, f32), image: (f32, f32)) -> Placement {
    let (pw, ph) = page;
    let (iw, ih) = (image.0.max(1.0), image.1.max(1.0));
    let scale = (pw / iw).min(ph / ih);
    let width = iw * scale;
    let height = ih * scale;
    Placement {
        x: (pw - width) / 2.0,
        y: (ph - height) / 2.0,
        width,
        height,
    }
}

fn add_raw_image(
    doc: &mut Document,
    path: &Path,
    size: (u32, u32),
    color_space: &str,
    samples: Vec<u8>,
    smask: Option<ObjectId>,
) -> Result<ObjectId> {
    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => size.0 as i64,
        "Height" => size.1 as i64,
        "ColorSpace" => color_space,
        "BitsPerComponent" => 8,
    };
    if let Some(smask) = smask {
        dict.set("SMask", smask);
    }

    let mut stream = Stream::new(dict, samples);
    stream.compress().map_err(|e| image_error(path, e))?;
    Ok(doc.add_object(stream))
}

fn add_image(doc: &mut Document, path: &Path, image: EmbeddedImage) -> Result<ObjectId> {
    let size = (image.width, image.height);
    match image.data {
        ImageData::Jpeg(jpeg) => Ok(doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => image.width as i64,
                "Height" => image.height as i64,
                "ColorSpace" => image.color_space,
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            jpeg,
        ))),
        ImageData::Raw { samples, alpha } => {
            let smask = match alpha {
                Some(alpha) => Some(add_raw_image(doc, path, size, "DeviceGray", alpha, None)?),
                None => None,
            };
            add_raw_image(doc, path, size, image.color_space, samples, smask)
        }
    }
}

fn add_page(
    doc: &mut Document,
    pages_id: ObjectId,
    page_size: (f32, f32),
    path: &Path,
    image: EmbeddedImage,
) -> Result<ObjectId> {
    let placement = fit_centered(page_size, (image.width as f32, image.height as f32));
    let image_id = add_image(doc, path, image)?;

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    placement.width.into(),
                    0.into(),
                    0.into(),
                    placement.height.into(),
                    placement.x.into(),
                    placement.y.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(IMAGE_NAME.to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let encoded = content
        .encode()
        .map_err(|e| Error::Other(format!("failed to encode page content: {e}")))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

    Ok(doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), page_size.0.into(), page_size.1.into()],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! {
                "Im0" => image_id,
            },
        },
    }))
}

/// Write a PDF with one page per image found below `src`
///
/// Images (`.jpg`, `.jpeg`, `.png`, any case) are collected recursively and ordered
/// naturally by relative path. Each page takes the pixel size of its image, or
/// `config.fallback_page_size` when the size cannot be read, and the image is scaled to
/// fit and centered. A directory without images yields a valid zero-page document.
/// Blocking: call from `spawn_blocking`.
pub fn write_document(src: &Path, dest: &Path, config: &PackConfig) -> Result<usize> {
    let images = page_images(src);

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::with_capacity(images.len());

    for path in &images {
        let page_size = match image::image_dimensions(path) {
            Ok((w, h)) if w > 0 && h > 0 => (w as f32, h as f32),
            Ok(_) | Err(_) => {
                warn!(image = ?path, "could not read image size, using fallback page size");
                let (w, h) = config.fallback_page_size;
                (w as f32, h as f32)
            }
        };

        let embedded = embed_image(path)?;
        debug!(image = ?path, width = embedded.width, height = embedded.height, "adding page");
        let page_id = add_page(&mut doc, pages_id, page_size, path, embedded)?;
        kids.push(page_id.into());
    }

    let count = kids.len();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let file = doc.save(dest).map_err(|e| document_error(dest, e))?;
    file.sync_all().map_err(|e| document_error(dest, e))?;

    Ok(count)
}
