use reqwest::StatusCode;
use thiserror::Error;

/// Failures while reading one of the upstream documents.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: StatusCode },

    #[error("could not decode {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not decode {path}: {source}")]
    DecodeFile {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid endpoint {0}")]
    InvalidUrl(String),

    #[error("could not build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    #[error("Failed to fetch cycle data")]
    HistoryUnavailable,

    #[error("{0} is not a baker address")]
    MalformedAddress(String),

    #[error("baker {0} not found")]
    BakerNotFound(String),

    #[error("No data found for cycle {0}")]
    CycleNotFound(i64),

    #[error("Invalid cycle parameter: {0}")]
    InvalidCycle(String),
}

impl FetchError {
    /// Missing records, as opposed to the source being unreachable.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            FetchError::MalformedAddress(_)
                | FetchError::BakerNotFound(_)
                | FetchError::CycleNotFound(_)
        )
    }
}
