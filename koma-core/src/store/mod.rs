// koma_core/src/store/mod.rs
use async_trait::async_trait;

use crate::error::Result;

pub mod fs;

pub use fs::FsByteStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotInfo {
    pub size_bytes: u64,
}

/// Keyed persistent blob store. Keys come from [`crate::key::derive_key`].
#[async_trait]
pub trait ByteStore: Send + Sync {
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Only meaningful when `exists(key)` is true.
    async fn inspect(&self, key: &str) -> Result<SlotInfo>;

    /// Allocate a zero-length slot. With `overwrite == false` an existing slot is an error.
    async fn create(&self, key: &str, overwrite: bool) -> Result<()>;

    /// Replace the slot's content with `bytes` in full.
    async fn write(&self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Remove the slot. Absent slots are not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// A reference the rendering layer can load directly. Valid after a successful `write`.
    fn uri_for(&self, key: &str) -> Result<String>;
}
