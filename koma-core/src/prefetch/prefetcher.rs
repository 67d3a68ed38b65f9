use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::slots::{SlotState, SlotTable};
use super::window::PrefetchWindow;
use crate::archive::{ArchiveHandle, decode};
use crate::config::PrefetchConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrefetchEvent {
    VisibleIndexChanged(usize),
    Close,
}

/// Decodes the pages around the visible one ahead of time.
///
/// Decodes run as independent tasks; moving the window never cancels them. A
/// result that arrives after [`Prefetcher::close`] is discarded.
pub struct Prefetcher {
    handle: Arc<ArchiveHandle>,
    slots: Arc<SlotTable>,
    config: PrefetchConfig,
    window: Mutex<Option<PrefetchWindow>>,
}

/// What one visibility change issued.
#[derive(Debug)]
pub struct PrefetchTicket {
    pub window: Option<PrefetchWindow>,
    /// Newly requested indices, nearest first.
    pub issued: Vec<usize>,
    pub evicted: usize,
    pub(crate) tasks: Vec<JoinHandle<()>>,
}

impl PrefetchTicket {
    pub(crate) fn idle() -> Self {
        Self {
            window: None,
            issued: Vec::new(),
            evicted: 0,
            tasks: Vec::new(),
        }
    }

    /// Wait for every decode this ticket issued.
    pub async fn settled(self) {
        for t in self.tasks {
            if let Err(e) = t.await {
                warn!(error = %e, "prefetch task aborted");
            }
        }
    }
}

impl Prefetcher {
    pub fn new(handle: Arc<ArchiveHandle>, config: PrefetchConfig) -> Self {
        Self {
            handle,
            slots: Arc::new(SlotTable::new()),
            config,
            window: Mutex::new(None),
        }
    }

    pub fn handle(&self) -> &Arc<ArchiveHandle> {
        &self.handle
    }

    pub fn slots(&self) -> &SlotTable {
        &self.slots
    }

    pub fn window(&self) -> Option<PrefetchWindow> {
        *self.window.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Recompute the window and start decoding every absent slot in it.
    /// Returns without waiting; must run inside a tokio runtime.
    pub fn on_visible_index_changed(&self, index: usize) -> PrefetchTicket {
        if !self.handle.is_open() {
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
        for i in window.indices(self.handle.len()) {
            if !self.slots.try_claim(i) {
                continue;
            }
            let Some(entry) = self.handle.entry(i) else {
                continue;
            };
            tasks.push(self.spawn_decode(i, entry.to_string()));
            issued.push(i);
        }
        debug!(index, ?issued, evicted, "prefetch window moved");

        PrefetchTicket {
            window: Some(window),
            issued,
            evicted,
            tasks,
        }
    }

    fn spawn_decode(&self, index: usize, entry: String) -> JoinHandle<()> {
        let handle = self.handle.clone();
        let slots = self.slots.clone();
        tokio::spawn(async move {
            let state = match decode(handle.clone(), entry.clone()).await {
                Ok(page) => SlotState::Ready(Arc::new(page)),
                Err(e) => {
                    warn!(index, %entry, error = %e, "page decode failed, keeping placeholder");
                    SlotState::Failed(e.to_string())
                }
            };
            if !slots.settle_while(index, state, || handle.is_open()) {
                debug!(index, %entry, "archive closed, dropping decoded page");
            }
        })
    }

    pub fn get_decoded_slot(&self, index: usize) -> SlotState {
        self.slots.state(index)
    }

    /// Release the archive and forget every slot.
    pub fn close(&self) {
        self.handle.release();
        self.slots.clear();
    }

    /// Feed visibility changes through a channel instead of direct calls.
    /// The loop ends on [`PrefetchEvent::Close`] or when every sender is dropped.
    pub fn spawn_event_loop(
        self: Arc<Self>,
        buffer: usize,
    ) -> (mpsc::Sender<PrefetchEvent>, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel(buffer.max(1));
        let task = tokio::spawn(async move {
            while let Some(ev) = rx.recv().await {
                match ev {
                    PrefetchEvent::VisibleIndexChanged(i) => {
                        let _ = self.on_visible_index_changed(i);
                    }
                    PrefetchEvent::Close => {
                        self.close();
                        break;
                    }
                }
            }
        });
        (tx, task)
    }
}

impl Drop for Prefetcher {
    fn drop(&mut self) {
        self.handle.release();
    }
}
