use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::{debug, warn};
use url::Url;

use crate::config::Config;
use crate::error::FetchError;
use crate::stats::{
    BakerStatus, HistoryEntry, RawStats, StatusDocument, find_cycle, parse_cycle, snapshot_json,
    validate_address,
};

/// Where the displayed history came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryOrigin {
    Remote,
    Fallback,
    Unavailable,
}

#[derive(Debug, Clone)]
pub struct HistoryFetch {
    pub entries: Vec<HistoryEntry>,
    pub origin: HistoryOrigin,
}

/// Secondary history source: a bundled file or another URL
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackSource {
    Remote(String),
    Local(String),
}

impl FallbackSource {
    pub fn parse(raw: &str) -> Self {
        match Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Self::Remote(raw.to_string()),
            _ => Self::Local(raw.to_string()),
        }
    }
}

/// Reader for the three documents published by the statistics pipeline.
#[derive(Clone)]
pub struct DalClient {
    http: reqwest::Client,
    stats_url: String,
    history_url: String,
    history_fallback: FallbackSource,
    baker_status_url: String,
}

impl DalClient {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        for url in [
            &config.stats_url,
            &config.history_url,
            &config.baker_status_url,
        ] {
            Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.clone()))?;
        }
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .user_agent(concat!("dalometer/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FetchError::Build)?;
        Ok(Self {
            http,
            stats_url: config.stats_url.clone(),
            history_url: config.history_url.clone(),
            history_fallback: FallbackSource::parse(&config.history_fallback),
            baker_status_url: config.baker_status_url.clone(),
        })
    }

    pub fn stats_url(&self) -> &str {
        &self.stats_url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let resp = self
            .http
            .get(url)
            .header(reqwest::header::CACHE_CONTROL, "no-store")
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }
        let body = resp.text().await.map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })?;
        serde_json::from_str(&body).map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })
    }

    async fn read_json_file<T: DeserializeOwned>(path: &str) -> Result<T, FetchError> {
        let body = tokio::fs::read_to_string(Path::new(path))
            .await
            .map_err(|source| FetchError::Io {
                path: path.to_string(),
                source,
            })?;
        serde_json::from_str(&body).map_err(|source| FetchError::DecodeFile {
            path: path.to_string(),
            source,
        })
    }

    pub async fn fetch_stats(&self) -> Result<RawStats, FetchError> {
        let stats: RawStats = self.get_json(&self.stats_url).await?;
        debug!(cycle = stats.cycle, "fetched statistics snapshot");
        Ok(stats)
    }

    /// Current snapshot with both derived percentages added.
    pub async fn fetch_snapshot_json(&self) -> Result<serde_json::Value, FetchError> {
        let stats = self.fetch_stats().await?;
        snapshot_json(&stats).map_err(|source| FetchError::Decode {
            url: self.stats_url.clone(),
            source,
        })
    }

    /// Never fails: falls back to the secondary source, then to an empty history.
    pub async fn fetch_history(&self) -> HistoryFetch {
        match self.get_json::<Vec<HistoryEntry>>(&self.history_url).await {
            Ok(entries) => {
                debug!(entries = entries.len(), "fetched history");
                return HistoryFetch {
                    entries,
                    origin: HistoryOrigin::Remote,
                };
            }
            Err(e) => warn!(error = %e, "history unavailable, trying fallback"),
        }

        let fallback = match &self.history_fallback {
            FallbackSource::Remote(url) => self.get_json::<Vec<HistoryEntry>>(url).await,
            FallbackSource::Local(path) => Self::read_json_file(path).await,
        };
        match fallback {
            Ok(entries) => {
                debug!(entries = entries.len(), "loaded history from fallback");
                HistoryFetch {
                    entries,
                    origin: HistoryOrigin::Fallback,
                }
            }
            Err(e) => {
                warn!(error = %e, "history fallback unavailable");
                HistoryFetch {
                    entries: Vec::new(),
                    origin: HistoryOrigin::Unavailable,
                }
            }
        }
    }

    /// History entry of one cycle. An unreachable history is a fetch failure,
    /// not a missing cycle.
    pub async fn fetch_cycle(&self, raw: &str) -> Result<HistoryEntry, FetchError> {
        let cycle = parse_cycle(raw)?;
        let history = self.fetch_history().await;
        if history.origin == HistoryOrigin::Unavailable {
            return Err(FetchError::HistoryUnavailable);
        }
        find_cycle(&history.entries, cycle).cloned()
    }

    /// Malformed addresses are rejected without a request.
    pub async fn fetch_baker_status(&self, address: &str) -> Result<BakerStatus, FetchError> {
        let address = validate_address(address)?;
        let doc: StatusDocument = self.get_json(&self.baker_status_url).await?;
        debug!(bakers = doc.len(), "fetched baker status document");
        doc.get(address)
            .cloned()
            .ok_or_else(|| FetchError::BakerNotFound(address.to_string()))
    }
}
