use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{KomaError, Result};

/// How far around the visible page the archive path decodes eagerly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefetchConfig {
    /// Pages after the visible one. Default 3.
    pub look_ahead: usize,
    /// Pages before the visible one. Default 1.
    pub look_behind: usize,
    /// When set, decoded pages further than this from the visible page are dropped.
    pub eviction_margin: Option<usize>,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            look_ahead: 3,
            look_behind: 1,
            eviction_margin: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KomaConfig {
    pub cache_dir: PathBuf,
    /// Prefix for relative page paths.
    pub remote_base: Option<String>,
    /// Content API base (`GET {api_url}/{chapter_id}`).
    pub api_url: Option<String>,
    pub fetch_timeout_secs: u64,
    pub prefetch: PrefetchConfig,
}

impl Default for KomaConfig {
    fn default() -> Self {
        Self {
            cache_dir: std::env::temp_dir().join("koma-cache"),
            remote_base: None,
            api_url: None,
            fetch_timeout_secs: 30,
            prefetch: PrefetchConfig::default(),
        }
    }
}

impl KomaConfig {
    /// Defaults overridden by `KOMA_*` variables; a `.env` file is loaded first if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut cfg = Self::default();
        if let Some(v) = get("KOMA_CACHE_DIR") {
            cfg.cache_dir = PathBuf::from(v);
        }
        cfg.remote_base = get("KOMA_REMOTE_BASE").or(cfg.remote_base);
        cfg.api_url = get("KOMA_API_URL")
            .or_else(|| get("EXPO_PUBLIC_API_URL"))
            .or(cfg.api_url);
        if let Some(v) = get("KOMA_FETCH_TIMEOUT_SECS") {
            cfg.fetch_timeout_secs = parse_num("KOMA_FETCH_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("KOMA_LOOK_AHEAD") {
            cfg.prefetch.look_ahead = parse_num("KOMA_LOOK_AHEAD", &v)?;
        }
        if let Some(v) = get("KOMA_LOOK_BEHIND") {
            cfg.prefetch.look_behind = parse_num("KOMA_LOOK_BEHIND", &v)?;
        }
        if let Some(v) = get("KOMA_EVICTION_MARGIN") {
            cfg.prefetch.eviction_margin = Some(parse_num("KOMA_EVICTION_MARGIN", &v)?);
        }
        Ok(cfg)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| KomaError::Config(format!("{}: {e}", path.display())))?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

fn parse_num<T: std::str::FromStr>(name: &str, v: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    v.trim()
        .parse()
        .map_err(|e| KomaError::Config(format!("{name}={v:?}: {e}")))
}
