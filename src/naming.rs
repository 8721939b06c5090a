//! Deterministic output names for chapters and volumes
//!
//! Names follow two templates:
//!
//! - chapter: `"<manga> - Vol <volume> - Cap <chapter> [<language>][<group>].<ext>"`
//! - volume: `"<manga> - Vol <volume> [<language>][<group>].<ext>"`
//!
//! Chapter and volume labels are zero-padded to two characters and the group name is
//! sanitized. Without an extension the trailing `.` is dropped, which yields folder names.

use crate::types::Volume;

/// Characters that are replaced by [`sanitize`]
pub const FORBIDDEN_CHARS: &[char] = &['/', ':', '*', '?', '"', '<', '>', '|', '\\', '[', ']'];

/// Replace every character that is unsafe in file names (or in the bracketed name template)
/// with `-`
///
/// # Examples
///
/// ```
/// use manga_dl::naming::sanitize;
///
/// assert_eq!(sanitize("Foo/Bar [TL]"), "Foo-Bar -TL-");
/// ```
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if FORBIDDEN_CHARS.contains(&c) { '-' } else { c })
        .collect()
}

/// Left-pad a label with zeros to at least two characters
fn pad2(label: &str) -> String {
    match label.chars().count() {
        0 => "00".to_string(),
        1 => format!("0{label}"),
        _ => label.to_string(),
    }
}

fn with_extension(stem: String, extension: Option<&str>) -> String {
    match extension {
        Some(ext) if !ext.is_empty() => format!("{stem}.{ext}"),
        _ => stem,
    }
}

/// Output name of a single chapter
///
/// # Examples
///
/// ```
/// use manga_dl::naming::chapter_file_name;
/// use manga_dl::types::Volume;
///
/// let volume = Volume::Labeled("1".into());
/// let name = chapter_file_name("X", "7", &volume, "en", "Foo/Bar", Some("pdf"));
/// assert_eq!(name, "X - Vol 1 - Cap 07 [en][Foo-Bar].pdf");
/// ```
pub fn chapter_file_name(
    manga: &str,
    chapter: &str,
    volume: &Volume,
    language: &str,
    group: &str,
    extension: Option<&str>,
) -> String {
    let stem = format!(
        "{manga} - Vol {} - Cap {} [{language}][{}]",
        volume.label(),
        pad2(chapter),
        sanitize(group)
    );
    with_extension(stem, extension)
}

/// Output name of a whole volume
pub fn volume_file_name(
    manga: &str,
    volume: &Volume,
    language: &str,
    group: &str,
    extension: Option<&str>,
) -> String {
    let stem = format!(
        "{manga} - Vol {} [{language}][{}]",
        pad2(volume.label()),
        sanitize(group)
    );
    with_extension(stem, extension)
}
