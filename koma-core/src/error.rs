use thiserror::Error;

#[derive(Error, Debug)]
pub enum KomaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store error on {key}: {source}")]
    Store {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("fetch of {locator} returned HTTP {status}")]
    HttpStatus { locator: String, status: u16 },

    #[error("cannot decode {entry}: {reason}")]
    Decode { entry: String, reason: String },

    #[error("cannot open archive: {0}")]
    Index(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("archive session is closed")]
    Closed,

    #[error("page source is not served by this path: {0}")]
    UnsupportedSource(String),
}

impl KomaError {
    pub(crate) fn store(key: &str, source: std::io::Error) -> Self {
        KomaError::Store {
            key: key.to_string(),
            source,
        }
    }

    pub(crate) fn decode(entry: &str, reason: impl ToString) -> Self {
        KomaError::Decode {
            entry: entry.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn is_store(&self) -> bool {
        matches!(self, KomaError::Store { .. } | KomaError::Io(_))
    }

    pub fn is_fetch(&self) -> bool {
        matches!(self, KomaError::Fetch(_) | KomaError::HttpStatus { .. })
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, KomaError::Decode { .. })
    }

    pub fn is_index(&self) -> bool {
        matches!(self, KomaError::Index(_))
    }
}

impl From<reqwest::Error> for KomaError {
    fn from(e: reqwest::Error) -> Self {
        match (e.status(), e.url()) {
            (Some(status), Some(url)) => KomaError::HttpStatus {
                locator: url.to_string(),
                status: status.as_u16(),
            },
            _ => KomaError::Fetch(e.to_string()),
        }
    }
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, KomaError>;
