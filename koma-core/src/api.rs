//! Client for the content API that lists chapters and their page locators.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use crate::domain::PageSource;
use crate::error::{KomaError, Result};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: String,
    pub number: f64,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    /// Page locators in reading order.
    #[serde(default)]
    pub uri: Vec<String>,
}

impl Chapter {
    /// Page sources in stored order; relative paths are joined onto `remote_base`.
    pub fn page_sources(&self, remote_base: Option<&str>) -> Result<Vec<PageSource>> {
        self.uri
            .iter()
            .map(|u| PageSource::remote_in(remote_base, u))
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageCount {
    pub language: String,
    #[serde(rename = "_count")]
    pub count: LanguageTally,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageTally {
    pub language: u64,
}

#[derive(Clone, Debug)]
pub struct ContentClient {
    base: Url,
    http: reqwest::Client,
}

impl ContentClient {
    pub fn new(api_url: &str, http: reqwest::Client) -> Result<Self> {
        let mut base = Url::parse(api_url)
            .map_err(|e| KomaError::Config(format!("invalid api url {api_url:?}: {e}")))?;
        if !base.path().ends_with('/') {
            let p = format!("{}/", base.path());
            base.set_path(&p);
        }
        Ok(Self { base, http })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// `GET {api}/{id}`. The API answers `null` for unknown ids.
    #[instrument(skip(self))]
    pub async fn chapter(&self, id: &str) -> Result<Option<Chapter>> {
        self.get_json(&[id]).await
    }

    /// `GET {api}/feed`: chapter counts per language, most first.
    pub async fn languages(&self) -> Result<Vec<LanguageCount>> {
        self.get_json(&["feed"]).await
    }

    /// `GET {api}/feed/{language}`: newest first.
    pub async fn chapters(&self, language: &str) -> Result<Vec<Chapter>> {
        self.get_json(&["feed", language]).await
    }

    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| KomaError::Config(format!("api url {} cannot be a base", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let url = self.endpoint(segments)?;
        debug!(%url, "api request");
        let resp = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| KomaError::Fetch(format!("{url}: {e}")))?
            .error_for_status()?;
        let body = resp.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chapter_record_decodes() {
        let raw = r#"{
            "id": "ck1",
            "number": 1089,
            "language": "en",
            "release_date": "2024-06-01T00:00:00.000Z",
            "uri": ["https://cdn/1089/01.jpg", "https://cdn/1089/02.jpg"]
        }"#;
        let ch: Chapter = serde_json::from_str(raw).unwrap();
        assert_eq!(ch.number, 1089.0);
        let pages = ch.page_sources(None).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].locator(), Some("https://cdn/1089/02.jpg"));
    }

    #[test]
    fn language_feed_decodes() {
        let raw = r#"[{"_count":{"language":12},"language":"es"}]"#;
        let v: Vec<LanguageCount> = serde_json::from_str(raw).unwrap();
        assert_eq!(v[0].language, "es");
        assert_eq!(v[0].count.language, 12);
    }

    #[test]
    fn endpoints_escape_segments() {
        let c = ContentClient::new("http://10.0.0.3:3000", reqwest::Client::new()).unwrap();
        assert_eq!(c.endpoint(&["feed"]).unwrap().as_str(), "http://10.0.0.3:3000/feed");
        assert_eq!(
            c.endpoint(&["feed", "pt br"]).unwrap().as_str(),
            "http://10.0.0.3:3000/feed/pt%20br"
        );
        let c = ContentClient::new("http://h/api/", reqwest::Client::new()).unwrap();
        assert_eq!(c.endpoint(&["ck1"]).unwrap().as_str(), "http://h/api/ck1");
    }

    #[test]
    fn null_chapter_is_none() {
        let v: Option<Chapter> = serde_json::from_str("null").unwrap();
        assert!(v.is_none());
    }
}
