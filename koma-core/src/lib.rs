#![forbid(unsafe_code)]

pub mod config;
pub mod domain;
pub mod error;
pub mod key;

pub mod store;

pub mod fetch;

pub mod resolve;

pub mod archive;

pub mod prefetch;

pub mod api;
pub mod progress;
pub mod session;

// Re-exports: stable API surface
pub use archive::{ArchiveHandle, build_index, decode};
pub use config::{KomaConfig, PrefetchConfig};
pub use domain::{CacheEntry, DecodedPage, PageSource};
pub use error::{KomaError, Result};
pub use key::derive_key;
pub use prefetch::{PrefetchEvent, PrefetchWindow, Prefetcher, SlotState};
pub use resolve::{PageResolver, Resolution};
pub use session::ReadingSession;
