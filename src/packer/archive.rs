use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use tracing::{debug, warn};
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::relative_name;
use crate::error::{Error, PackError, Result};

fn archive_error(archive: &Path, reason: impl ToString) -> Error {
    Error::Pack(PackError::Archive {
        archive: archive.to_path_buf(),
        reason: reason.to_string(),
    })
}

/// Write a zip archive of every regular file below `src`
///
/// Entries keep their path relative to `src` so chapter subfolders survive. Symlinks are
/// not followed. A file that disappears between listing and reading is skipped with a
/// warning; every other error aborts. Blocking: call from `spawn_blocking`.
pub fn write_archive(src: &Path, dest: &Path, compression_level: u32) -> Result<usize> {
    let file = File::create(dest).map_err(|e| archive_error(dest, e))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(compression_level.min(9) as i32));

    let mut written = 0usize;

    for entry in WalkDir::new(src).follow_links(false).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.io_error().map(io::Error::kind) == Some(io::ErrorKind::NotFound) => {
                warn!(archive = ?dest, error = %e, "entry vanished while listing, skipping");
                continue;
            }
            Err(e) => return Err(archive_error(dest, e)),
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let mut input = match File::open(entry.path()) {
            Ok(input) => input,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(file = ?entry.path(), "file vanished before packing, skipping");
                continue;
            }
            Err(e) => return Err(archive_error(dest, e)),
        };

        let name = relative_name(src, entry.path());
        debug!(archive = ?dest, entry = %name, "adding file");
        zip.start_file(name, options)
            .map_err(|e| archive_error(dest, e))?;
        io::copy(&mut input, &mut zip).map_err(|e| archive_error(dest, e))?;
        written += 1;
    }

    let mut writer = zip.finish().map_err(|e| archive_error(dest, e))?;
    writer.flush().map_err(|e| archive_error(dest, e))?;
    let file = writer
        .into_inner()
        .map_err(|e| archive_error(dest, e.into_error()))?;
    file.sync_all().map_err(|e| archive_error(dest, e))?;

    Ok(written)
}
