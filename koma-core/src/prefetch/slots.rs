use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::domain::DecodedPage;

/// What the rendering layer sees for one page index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlotState {
    /// Never requested, or evicted.
    Empty,
    /// Decode in flight.
    Pending,
    Ready(Arc<DecodedPage>),
    /// Decode failed; the page keeps its placeholder.
    Failed(String),
}

impl SlotState {
    pub fn page(&self) -> Option<&Arc<DecodedPage>> {
        match self {
            SlotState::Ready(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, SlotState::Ready(_))
    }
}

#[derive(Debug, Default)]
pub struct SlotTable {
    slots: DashMap<usize, SlotState>,
}

impl SlotTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, index: usize) -> SlotState {
        self.slots
            .get(&index)
            .map(|s| s.value().clone())
            .unwrap_or(SlotState::Empty)
    }

    /// Mark `index` pending if nothing is recorded for it. True when the caller should decode.
    pub fn try_claim(&self, index: usize) -> bool {
        match self.slots.entry(index) {
            Entry::Vacant(v) => {
                v.insert(SlotState::Pending);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    pub fn fill(&self, index: usize, page: DecodedPage) {
        self.slots.insert(index, SlotState::Ready(Arc::new(page)));
    }

    pub fn fail(&self, index: usize, reason: String) {
        self.slots.insert(index, SlotState::Failed(reason));
    }

    /// Record a finished result unless its source has been closed meanwhile.
    ///
    /// `live` is read again after the write: a close that clears the table
    /// sets its flag first, so either the clear removes this slot or the
    /// second read sees the flag and removes it here.
    pub fn settle_while(&self, index: usize, state: SlotState, live: impl Fn() -> bool) -> bool {
        if !live() {
            return false;
        }
        self.slots.insert(index, state);
        if live() {
            return true;
        }
        self.slots.remove(&index);
        false
    }

    /// Drop ready pages rejected by `keep`. Pending and failed slots stay. Returns how many went.
    pub fn evict_ready(&self, keep: impl Fn(usize) -> bool) -> usize {
        let before = self.slots.len();
        self.slots
            .retain(|&i, s| !matches!(s, SlotState::Ready(_)) || keep(i));
        before - self.slots.len()
    }

    pub fn ready_count(&self) -> usize {
        self.slots.iter().filter(|s| s.value().is_ready()).count()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn clear(&self) {
        self.slots.clear();
    }
}
