use std::io::{Cursor, Read, Seek};

use zip::ZipArchive;

use super::mime::is_image_name;
use super::natural::natural_cmp;
use crate::error::{KomaError, Result};

/// Ordered page names of a CBZ/ZIP archive given as raw bytes.
pub fn build_index(archive_bytes: &[u8]) -> Result<Vec<String>> {
    let zip = ZipArchive::new(Cursor::new(archive_bytes))
        .map_err(|e| KomaError::Index(e.to_string()))?;
    Ok(index_entries(&zip))
}

/// Image entries in reading order. Reads the central directory only.
pub fn index_entries<R: Read + Seek>(zip: &ZipArchive<R>) -> Vec<String> {
    let mut names: Vec<String> = zip
        .file_names()
        .filter(|n| is_page_entry(n))
        .map(str::to_owned)
        .collect();
    names.sort_by(|a, b| natural_cmp(a, b));
    names
}

fn is_page_entry(name: &str) -> bool {
    if name.ends_with('/') || name.starts_with("__MACOSX/") {
        return false;
    }
    let file = name.rsplit('/').next().unwrap_or(name);
    !file.starts_with('.') && is_image_name(file)
}
