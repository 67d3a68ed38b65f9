// koma_core/src/domain.rs
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{KomaError, Result};

/// Where one page's bytes come from. Fixed for the lifetime of a reading session.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PageSource {
    Remote {
        locator: String,
    },
    #[serde(rename_all = "camelCase")]
    ArchiveEntry {
        archive_ref: String,
        entry_name: String,
    },
}

impl PageSource {
    pub fn remote(locator: impl Into<String>) -> Self {
        PageSource::Remote {
            locator: locator.into(),
        }
    }

    /// Build a remote source from a configured base and a page path.
    /// Absolute locators are kept as-is.
    pub fn remote_in(base: Option<&str>, path: &str) -> Result<Self> {
        if Url::parse(path).is_ok() {
            return Ok(Self::remote(path));
        }
        let base = base.ok_or_else(|| {
            KomaError::Config(format!("relative page path {path:?} needs a remote base"))
        })?;
        let mut base = Url::parse(base)
            .map_err(|e| KomaError::Config(format!("invalid remote base {base:?}: {e}")))?;
        if !base.path().ends_with('/') {
            let p = format!("{}/", base.path());
            base.set_path(&p);
        }
        let joined = base
            .join(path.trim_start_matches('/'))
            .map_err(|e| KomaError::Config(format!("cannot join {path:?}: {e}")))?;
        Ok(Self::remote(joined.to_string()))
    }

    pub fn locator(&self) -> Option<&str> {
        match self {
            PageSource::Remote { locator } => Some(locator),
            PageSource::ArchiveEntry { .. } => None,
        }
    }
}

/// One persisted blob in the local byte store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: String,
    pub size_bytes: u64,
    pub path: PathBuf,
}

impl CacheEntry {
    /// Zero-length entries are leftovers of an interrupted write and never served.
    pub fn is_valid(&self) -> bool {
        self.size_bytes > 0
    }
}

/// A page ready for display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedPage {
    pub source_key: String,
    pub payload_uri: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}
