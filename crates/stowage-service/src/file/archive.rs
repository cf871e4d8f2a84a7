//! ZIP bundle construction for bulk downloads.

use std::collections::HashSet;
use std::io::{Read, Seek, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use stowage_core::error::{AppError, ErrorKind};
use stowage_core::result::AppResult;
use stowage_entity::file::numbered_name;

/// Assigns unique archive paths, suffixing ` (n)` before the extension on collisions.
#[derive(Debug, Default)]
pub struct EntryNamer {
    taken: HashSet<String>,
}

impl EntryNamer {
    /// Creates an empty namer.
    pub fn new() -> Self {
        Self::default()
    }

    /// A unique path for `filename` under `dirs`.
    pub fn assign(&mut self, dirs: &[String], filename: &str) -> String {
        let prefix: String = dirs.iter().map(|d| format!("{d}/")).collect();
        let mut candidate = format!("{prefix}{filename}");
        let mut n = 1;
        while self.taken.contains(&candidate) {
            candidate = format!("{prefix}{}", numbered_name(filename, n));
            n += 1;
        }
        self.taken.insert(candidate.clone());
        candidate
    }
}

fn zip_error(err: impl std::error::Error + Send + Sync + 'static) -> AppError {
    AppError::with_source(ErrorKind::Internal, format!("Failed to build archive: {err}"), err)
}

/// Deflate one entry per path into a ZIP archive written to `out`.
///
/// `open(i)` supplies the content of `paths[i]`; each source is copied
/// through in chunks, so only one entry is open at a time.
pub fn write_zip<W, R, F>(out: W, paths: &[String], mut open: F) -> AppResult<W>
where
    W: Write + Seek,
    R: Read,
    F: FnMut(usize) -> AppResult<R>,
{
    let mut zip = ZipWriter::new(out);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644)
        .large_file(true);

    for (i, path) in paths.iter().enumerate() {
        let mut source = open(i)?;
        zip.start_file(path.as_str(), options).map_err(zip_error)?;
        std::io::copy(&mut source, &mut zip).map_err(|e| {
            AppError::with_source(
                ErrorKind::StorageUnavailable,
                format!("Failed to read {path} into the archive"),
                e,
            )
        })?;
    }
    zip.finish().map_err(zip_error)
}
