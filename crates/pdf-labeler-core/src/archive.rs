//! In-memory ZIP packaging of processed documents.

use std::collections::HashSet;
use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{Error, Result};

/// Download name of the archive returned for multi-file requests.
pub const ARCHIVE_FILENAME: &str = "processed_pdfs.zip";

/// Build a deflated ZIP holding `entries` in order.
///
/// Entry names that repeat get `-2`, `-3`, ... inserted before the extension.
pub fn build_zip(entries: &[(String, Vec<u8>)]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut used = HashSet::with_capacity(entries.len());

    for (name, data) in entries {
        let name = disambiguate(name, &mut used);
        zip.start_file(name.as_str(), options)
            .map_err(|e| Error::Archive(format!("Failed to add {name}: {e}")))?;
        zip.write_all(data)
            .map_err(|e| Error::Archive(format!("Failed to write {name}: {e}")))?;
    }

    let cursor = zip
        .finish()
        .map_err(|e| Error::Archive(format!("Failed to finish archive: {e}")))?;
    Ok(cursor.into_inner())
}

/// Reserve a name not yet in `used`.
fn disambiguate(name: &str, used: &mut HashSet<String>) -> String {
    if used.insert(name.to_string()) {
        return name.to_string();
    }

    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };

    let mut n = 2_u32;
    loop {
        let candidate = match ext {
            Some(ext) => format!("{stem}-{n}.{ext}"),
            None => format!("{stem}-{n}"),
        };
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}
