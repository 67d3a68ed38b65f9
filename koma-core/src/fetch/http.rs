use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::Fetcher;
use crate::error::{KomaError, Result};

#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| KomaError::Fetch(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get(locator)
            .send()
            .await
            .map_err(|e| KomaError::Fetch(format!("{locator}: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(KomaError::HttpStatus {
                locator: locator.to_string(),
                status: status.as_u16(),
            });
        }
        let body = resp
            .bytes()
            .await
            .map_err(|e| KomaError::Fetch(format!("{locator}: {e}")))?;
        debug!(len = body.len(), "fetched");
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_host_is_fetch_error() {
        let f = HttpFetcher::new(Duration::from_secs(2)).unwrap();
        // port 9 on loopback (discard) is closed on test machines
        let err = f.fetch("http://127.0.0.1:9/c1/p1.jpg").await.unwrap_err();
        assert!(err.is_fetch(), "{err}");
    }

    #[tokio::test]
    async fn malformed_locator_is_fetch_error() {
        let f = HttpFetcher::new(Duration::from_secs(2)).unwrap();
        assert!(f.fetch("not a url").await.unwrap_err().is_fetch());
    }
}
