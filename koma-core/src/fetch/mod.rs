use async_trait::async_trait;

use crate::error::Result;

pub mod http;

pub use http::HttpFetcher;

/// Retrieves the full bytes behind a remote locator.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>>;
}
