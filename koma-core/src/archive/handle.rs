use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tracing::info;
use zip::ZipArchive;

use super::index::index_entries;
use crate::domain::PageSource;
use crate::error::{KomaError, Result};

pub(crate) type ArchiveReader = ZipArchive<Cursor<Arc<[u8]>>>;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// An opened archive and its page order. Owned by one reading session.
pub struct ArchiveHandle {
    id: u64,
    fingerprint: String,
    zip: ArchiveReader,
    entries: Vec<String>,
    open: AtomicBool,
}

impl ArchiveHandle {
    pub fn open(bytes: impl Into<Arc<[u8]>>) -> Result<Self> {
        let bytes: Arc<[u8]> = bytes.into();
        let fingerprint = hex::encode(blake3::hash(&bytes).as_bytes());
        let zip = ZipArchive::new(Cursor::new(bytes.clone()))
            .map_err(|e| KomaError::Index(e.to_string()))?;
        let entries = index_entries(&zip);
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        info!(
            id,
            fingerprint = &fingerprint[..16],
            pages = entries.len(),
            size = bytes.len(),
            "opened archive"
        );
        Ok(Self {
            id,
            fingerprint,
            zip,
            entries,
            open: AtomicBool::new(true),
        })
    }

    pub async fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| KomaError::Index(format!("{}: {e}", path.display())))?;
        Self::open(bytes)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// blake3 of the archive bytes, hex.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    pub fn page_source(&self, index: usize) -> Option<PageSource> {
        self.entry(index).map(|name| PageSource::ArchiveEntry {
            archive_ref: self.fingerprint.clone(),
            entry_name: name.to_string(),
        })
    }

    pub fn source_key(&self, entry: &str) -> String {
        format!("{}/{}", &self.fingerprint[..16], entry)
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Mark the handle released. Results decoded from it afterwards are dropped.
    pub fn release(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            info!(id = self.id, "released archive");
        }
    }

    // shares the parsed central directory, each clone seeks independently
    pub(crate) fn reader(&self) -> ArchiveReader {
        self.zip.clone()
    }
}

impl std::fmt::Debug for ArchiveHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveHandle")
            .field("id", &self.id)
            .field("fingerprint", &self.fingerprint)
            .field("pages", &self.entries.len())
            .field("open", &self.is_open())
            .finish()
    }
}
