//! Remote page resolution through the local byte store.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::domain::PageSource;
use crate::error::{KomaError, Result};
use crate::fetch::Fetcher;
use crate::key::derive_key;
use crate::store::ByteStore;

#[derive(Debug)]
pub enum Resolution {
    /// Served from a valid slot; no network access.
    Hit { key: String, uri: String },
    /// Fetched, persisted, served from the new slot.
    Fetched { key: String, uri: String },
    /// Caching failed; the page is served straight from its remote locator.
    Fallback { locator: String, error: KomaError },
}

impl Resolution {
    pub fn uri(&self) -> &str {
        match self {
            Resolution::Hit { uri, .. } | Resolution::Fetched { uri, .. } => uri,
            Resolution::Fallback { locator, .. } => locator,
        }
    }

    pub fn is_cached(&self) -> bool {
        !matches!(self, Resolution::Fallback { .. })
    }

    pub fn error(&self) -> Option<&KomaError> {
        match self {
            Resolution::Fallback { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Fetch-or-reuse for remote pages.
///
/// Concurrent resolves of one locator are not deduplicated: both may fetch and
/// both write the same bytes under the same key, the later rename wins.
#[derive(Clone)]
pub struct PageResolver {
    store: Arc<dyn ByteStore>,
    fetcher: Arc<dyn Fetcher>,
}

impl PageResolver {
    pub fn new(store: Arc<dyn ByteStore>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { store, fetcher }
    }

    pub fn store(&self) -> &Arc<dyn ByteStore> {
        &self.store
    }

    /// Never fails: on any store or fetch error the original locator comes back.
    #[instrument(skip(self))]
    pub async fn resolve(&self, locator: &str) -> Resolution {
        match self.try_resolve(locator).await {
            Ok(r) => r,
            Err(error) => {
                warn!(%error, "page not cached, serving remote locator");
                Resolution::Fallback {
                    locator: locator.to_string(),
                    error,
                }
            }
        }
    }

    pub async fn resolve_page(&self, source: &PageSource) -> Result<Resolution> {
        match source {
            PageSource::Remote { locator } => Ok(self.resolve(locator).await),
            PageSource::ArchiveEntry { entry_name, .. } => {
                Err(KomaError::UnsupportedSource(entry_name.clone()))
            }
        }
    }

    /// The resolution steps with errors propagated instead of recovered.
    pub async fn try_resolve(&self, locator: &str) -> Result<Resolution> {
        let key = derive_key(locator);

        if self.store.exists(&key).await? {
            let info = self.store.inspect(&key).await?;
            if info.size_bytes > 0 {
                debug!(%key, "cache hit");
                return Ok(Resolution::Hit {
                    uri: self.store.uri_for(&key)?,
                    key,
                });
            }
            warn!(%key, "zero-byte cache entry, refetching");
            self.store.delete(&key).await?;
        }

        self.store.create(&key, true).await?;
        let bytes = match self.fetch_nonempty(locator).await {
            Ok(b) => b,
            Err(e) => {
                // leave nothing that looks like a slot behind
                if let Err(de) = self.store.delete(&key).await {
                    warn!(%key, error = %de, "cannot remove empty slot");
                }
                return Err(e);
            }
        };
        self.store.write(&key, &bytes).await?;
        info!(%key, len = bytes.len(), "cached page");

        Ok(Resolution::Fetched {
            uri: self.store.uri_for(&key)?,
            key,
        })
    }

    async fn fetch_nonempty(&self, locator: &str) -> Result<Vec<u8>> {
        let bytes = self.fetcher.fetch(locator).await?;
        if bytes.is_empty() {
            return Err(KomaError::Fetch(format!("{locator}: empty body")));
        }
        Ok(bytes)
    }
}
