//! Windowed look-ahead around the visible page, for archives and remote chapters.

pub mod prefetcher;
pub mod remote;
pub mod slots;
pub mod window;

pub use prefetcher::{PrefetchEvent, PrefetchTicket, Prefetcher};
pub use remote::RemotePrefetcher;
pub use slots::{SlotState, SlotTable};
pub use window::PrefetchWindow;
