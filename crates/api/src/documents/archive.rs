//! ZIP export of engagement documents.

use std::collections::HashSet;
use std::io::{Cursor, Write};

use auditdesk_core::documents::EMPTY_ARCHIVE_README;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// One file to put in the archive, already read from storage.
pub struct ArchiveEntry {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// `name`, or `stem (n).ext` when `name` is taken.
fn unique_name(name: &str, used: &mut HashSet<String>) -> String {
    if used.insert(name.to_string()) {
        return name.to_string();
    }
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, format!(".{ext}")),
        _ => (name, String::new()),
    };
    (2..)
        .map(|n| format!("{stem} ({n}){ext}"))
        .find(|candidate| used.insert(candidate.clone()))
        .unwrap_or_else(|| name.to_string())
}

/// Build the archive. When `entries` is empty it holds a README instead.
pub fn build_zip(entries: Vec<ArchiveEntry>) -> Result<Vec<u8>, zip::result::ZipError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    if entries.is_empty() {
        let (name, text) = EMPTY_ARCHIVE_README;
        writer.start_file(name, options)?;
        writer.write_all(text.as_bytes())?;
    }

    let mut used = HashSet::new();
    for entry in entries {
        writer.start_file(unique_name(&entry.name, &mut used), options)?;
        writer.write_all(&entry.bytes)?;
    }

    Ok(writer.finish()?.into_inner())
}
