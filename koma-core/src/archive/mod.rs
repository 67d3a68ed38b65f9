//! CBZ/ZIP page archives: ordering, handles, entry decoding.

pub mod decode;
pub mod dims;
pub mod handle;
pub mod index;
pub mod mime;
pub mod natural;

pub use decode::{decode, decode_entry};
pub use handle::ArchiveHandle;
pub use index::build_index;
