//! The surface the rendering layer talks to.
//!
//! A session reads one thing at a time: either a remote chapter (a list of
//! page locators resolved through the disk cache) or a local archive. Opening
//! something new closes the previous source, and any decode or fetch still in
//! flight for it is discarded when it lands.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::info;

use crate::archive::ArchiveHandle;
use crate::config::KomaConfig;
use crate::domain::PageSource;
use crate::error::{KomaError, Result};
use crate::fetch::HttpFetcher;
use crate::prefetch::{PrefetchTicket, Prefetcher, RemotePrefetcher, SlotState};
use crate::progress::ReadingProgress;
use crate::resolve::{PageResolver, Resolution};
use crate::store::FsByteStore;

enum Source {
    Nothing,
    Remote(Arc<RemotePrefetcher>),
    Archive(Arc<Prefetcher>),
}

impl Source {
    fn close(&self) {
        match self {
            Source::Nothing => {}
            Source::Remote(r) => r.close(),
            Source::Archive(p) => p.close(),
        }
    }

    fn len(&self) -> usize {
        match self {
            Source::Nothing => 0,
            Source::Remote(r) => r.len(),
            Source::Archive(p) => p.handle().len(),
        }
    }
}

pub struct ReadingSession {
    config: KomaConfig,
    resolver: PageResolver,
    source: Mutex<Source>,
    progress: Mutex<ReadingProgress>,
}

impl ReadingSession {
    pub fn new(config: KomaConfig, resolver: PageResolver) -> Self {
        Self {
            config,
            resolver,
            source: Mutex::new(Source::Nothing),
            progress: Mutex::new(ReadingProgress::default()),
        }
    }

    /// Disk cache under `config.cache_dir`, HTTP fetches with `config.fetch_timeout()`.
    pub async fn from_config(config: KomaConfig) -> Result<Self> {
        let store = Arc::new(FsByteStore::open(&config.cache_dir).await?);
        let fetcher = Arc::new(HttpFetcher::new(config.fetch_timeout())?);
        let resolver = PageResolver::new(store, fetcher);
        Ok(Self::new(config, resolver))
    }

    pub fn config(&self) -> &KomaConfig {
        &self.config
    }

    pub fn resolver(&self) -> &PageResolver {
        &self.resolver
    }

    /// Resolve one remote page through the cache. Archive entries go through
    /// [`Self::get_decoded_slot`] instead.
    pub async fn resolve_page(&self, source: &PageSource) -> Result<Resolution> {
        self.resolver.resolve_page(source).await
    }

    /// Start reading a remote chapter.
    pub fn open_remote(&self, pages: Vec<PageSource>) {
        let remote = RemotePrefetcher::new(self.resolver.clone(), pages, self.config.prefetch.clone());
        info!(pages = remote.len(), "opened remote chapter");
        self.replace(Source::Remote(Arc::new(remote)));
    }

    /// Start reading an archive. Failure to open it is the one error shown to the reader.
    pub fn open_archive(&self, bytes: impl Into<Arc<[u8]>>) -> Result<Arc<ArchiveHandle>> {
        let handle = Arc::new(ArchiveHandle::open(bytes)?);
        self.install_archive(handle.clone());
        Ok(handle)
    }

    pub async fn open_archive_path(&self, path: impl AsRef<Path>) -> Result<Arc<ArchiveHandle>> {
        let handle = Arc::new(ArchiveHandle::open_path(path).await?);
        self.install_archive(handle.clone());
        Ok(handle)
    }

    fn install_archive(&self, handle: Arc<ArchiveHandle>) {
        let p = Prefetcher::new(handle, self.config.prefetch.clone());
        self.replace(Source::Archive(Arc::new(p)));
    }

    fn replace(&self, next: Source) {
        let total = next.len();
        let prev = {
            let mut cur = self.source.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *cur, next)
        };
        prev.close();
        *self.progress.lock().unwrap_or_else(PoisonError::into_inner) = ReadingProgress::new(total);
    }

    pub fn close(&self) {
        self.replace(Source::Nothing);
    }

    /// The current archive, if one is open.
    pub fn archive(&self) -> Option<Arc<ArchiveHandle>> {
        match &*self.source.lock().unwrap_or_else(PoisonError::into_inner) {
            Source::Archive(p) => Some(p.handle().clone()),
            _ => None,
        }
    }

    pub fn page_count(&self) -> usize {
        self.source
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// The rendering layer reports the first visible page. Returns at once;
    /// decodes and fetches complete in the background.
    pub fn on_visible_index_changed(&self, index: usize) -> Result<PrefetchTicket> {
        let ticket = match &*self.source.lock().unwrap_or_else(PoisonError::into_inner) {
            Source::Nothing => return Err(KomaError::Closed),
            Source::Remote(r) => r.on_visible_index_changed(index),
            Source::Archive(p) => p.on_visible_index_changed(index),
        };
        self.progress
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .visible(index);
        Ok(ticket)
    }

    /// `Ready` when the page can be shown; anything else means placeholder.
    pub fn get_decoded_slot(&self, index: usize) -> SlotState {
        match &*self.source.lock().unwrap_or_else(PoisonError::into_inner) {
            Source::Nothing => SlotState::Empty,
            Source::Remote(r) => r.get_decoded_slot(index),
            Source::Archive(p) => p.get_decoded_slot(index),
        }
    }

    pub fn progress(&self) -> ReadingProgress {
        *self.progress.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ReadingSession {
    fn drop(&mut self) {
        self.source
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .close();
    }
}
