use bytes::Bytes;
use std::{collections::BTreeMap, io::{Cursor, Write}};
use thiserror::Error;
use tracing::warn;
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("project has no files to export")]
    Empty,
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Packs a flat file set into an in-memory zip archive.
pub fn zip_files(files: &BTreeMap<String, String>) -> Result<Bytes, ExportError> {
    if files.is_empty() {
        return Err(ExportError::Empty);
    }
    let mut entries: BTreeMap<&str, &str> = BTreeMap::new();
    for (path, content) in files {
        let entry = path.trim_start_matches('/');
        if entry.is_empty() {
            warn!("Skipping export entry with empty path {:?}", path);
        } else if entries.contains_key(entry) {
            warn!("Skipping duplicate export entry {:?}", path);
        } else {
            entries.insert(entry, content);
        }
    }
    if entries.is_empty() {
        return Err(ExportError::Empty);
    }

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (path, content) in entries {
        writer.start_file(path, options)?;
        writer.write_all(content.as_bytes())?;
    }
    Ok(Bytes::from(writer.finish()?.into_inner()))
}

/// File name for the downloaded archive, safe inside a `Content-Disposition` header.
pub fn archive_name(project_name: &str) -> String {
    format!("{}.zip", crate::deploy::slugify(project_name))
}
