use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinHandle;
use tracing::debug;

use super::prefetcher::PrefetchTicket;
use super::slots::{SlotState, SlotTable};
use super::window::PrefetchWindow;
use crate::config::PrefetchConfig;
use crate::domain::{DecodedPage, PageSource};
use crate::key::derive_key;
use crate::resolve::PageResolver;

/// The remote-path counterpart of [`super::Prefetcher`]: resolves the pages
/// around the visible one through the disk cache.
///
/// Resolution never fails (it falls back to the remote locator), so every
/// issued slot ends up ready.
pub struct RemotePrefetcher {
    resolver: PageResolver,
    pages: Arc<[PageSource]>,
    slots: Arc<SlotTable>,
    config: PrefetchConfig,
    live: Arc<AtomicBool>,
    window: Mutex<Option<PrefetchWindow>>,
}

impl RemotePrefetcher {
    pub fn new(resolver: PageResolver, pages: Vec<PageSource>, config: PrefetchConfig) -> Self {
        Self {
            resolver,
            pages: pages.into(),
            slots: Arc::new(SlotTable::new()),
            config,
            live: Arc::new(AtomicBool::new(true)),
            window: Mutex::new(None),
        }
    }

    pub fn pages(&self) -> &[PageSource] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn window(&self) -> Option<PrefetchWindow> {
        *self.window.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn on_visible_index_changed(&self, index: usize) -> PrefetchTicket {
        if !self.live.load(Ordering::Acquire) {
            return PrefetchTicket::idle();
        }
        let window = PrefetchWindow::new(index, &self.config);
        *self.window.lock().unwrap_or_else(PoisonError::into_inner) = Some(window);

        let evicted = match self.config.eviction_margin {
            Some(margin) => self.slots.evict_ready(|i| window.within_margin(i, margin)),
            None => 0,
        };

        let mut issued = Vec::new();
        let mut tasks = Vec::new();
        for i in window.indices(self.pages.len()) {
            let Some(locator) = self.pages[i].locator() else {
                continue;
            };
            if !self.slots.try_claim(i) {
                continue;
            }
            tasks.push(self.spawn_resolve(i, locator.to_string()));
            issued.push(i);
        }
        debug!(index, ?issued, "remote window moved");

        PrefetchTicket {
            window: Some(window),
            issued,
            evicted,
            tasks,
        }
    }

    fn spawn_resolve(&self, index: usize, locator: String) -> JoinHandle<()> {
        let resolver = self.resolver.clone();
        let slots = self.slots.clone();
        let live = self.live.clone();
        tokio::spawn(async move {
            let res = resolver.resolve(&locator).await;
            let page = DecodedPage {
                source_key: derive_key(&locator),
                payload_uri: res.uri().to_string(),
                width: None,
                height: None,
            };
            slots.settle_while(index, SlotState::Ready(Arc::new(page)), || {
                live.load(Ordering::Acquire)
            });
        })
    }

    pub fn get_decoded_slot(&self, index: usize) -> SlotState {
        self.slots.state(index)
    }

    pub fn close(&self) {
        self.live.store(false, Ordering::Release);
        self.slots.clear();
    }
}

impl Drop for RemotePrefetcher {
    fn drop(&mut self) {
        self.live.store(false, Ordering::Release);
    }
}
