use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::client::{DalClient, HistoryOrigin};
use crate::config::{Config, STATS_ERROR_MESSAGE};
use crate::error::FetchError;
use crate::stats::{BakerStatus, HistoryEntry, RawStats};

#[derive(Debug, Clone, PartialEq)]
pub enum FetchStatus {
    Loading,
    Ok,
    Stale,
    Error(String),
}

/// Outcome of the last single-baker check
#[derive(Debug, Clone, PartialEq)]
pub enum BakerLookup {
    Pending(String),
    Found { address: String, status: BakerStatus },
    NotFound { address: String, reason: String },
    Failed { address: String, message: String },
}

#[derive(Debug, Clone)]
pub struct DalMetrics {
    pub stats: Option<RawStats>,
    pub history: Vec<HistoryEntry>,
    pub history_origin: HistoryOrigin,
    pub fetch_status: FetchStatus,
    pub last_updated: Instant,
    pub last_successful: Option<Instant>,
    pub stats_url: String,
    pub refresh_interval: Duration,
    pub baker_lookup: Option<BakerLookup>,
}

impl DalMetrics {
    pub fn new(stats_url: String, refresh_interval: Duration) -> Self {
        Self {
            stats: None,
            history: Vec::new(),
            history_origin: HistoryOrigin::Unavailable,
            fetch_status: FetchStatus::Loading,
            last_updated: Instant::now(),
            last_successful: None,
            stats_url,
            refresh_interval,
            baker_lookup: None,
        }
    }

    pub fn participation_percentage(&self) -> f64 {
        crate::stats::participation_percentage(self.stats.as_ref())
    }

    pub fn adoption_percentage(&self) -> f64 {
        crate::stats::adoption_percentage(self.stats.as_ref())
    }
}

pub struct MetricsCollector {
    client: DalClient,
    metrics: DalMetrics,
    stale_after: Duration,
}

impl MetricsCollector {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let client = DalClient::new(config)?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: DalClient, config: &Config) -> Self {
        Self {
            metrics: DalMetrics::new(client.stats_url().to_string(), config.refresh_interval()),
            client,
            stale_after: config.stale_after(),
        }
    }

    /// One fetch-and-update cycle. Snapshot and history are fetched
    /// concurrently and each only updates its own part of the state.
    pub async fn collect_metrics(&mut self) -> &DalMetrics {
        let (stats, history) = tokio::join!(self.client.fetch_stats(), self.client.fetch_history());

        match stats {
            Ok(stats) => {
                info!(cycle = stats.cycle, "statistics refreshed");
                self.metrics.stats = Some(stats);
                self.metrics.fetch_status = FetchStatus::Ok;
            }
            Err(e) => {
                warn!(error = %e, "statistics refresh failed");
                self.metrics.stats = None;
                self.metrics.fetch_status = FetchStatus::Error(STATS_ERROR_MESSAGE.to_string());
            }
        }

        self.metrics.history = history.entries;
        self.metrics.history_origin = history.origin;

        self.metrics.last_updated = Instant::now();
        if matches!(self.metrics.fetch_status, FetchStatus::Ok) {
            self.metrics.last_successful = Some(self.metrics.last_updated);
        }
        &self.metrics
    }

    pub async fn lookup_baker(&mut self, address: &str) -> &DalMetrics {
        let address = address.trim().to_string();
        let lookup = match self.client.fetch_baker_status(&address).await {
            Ok(status) => BakerLookup::Found { address, status },
            Err(e) if e.is_not_found() => BakerLookup::NotFound {
                address,
                reason: e.to_string(),
            },
            Err(e) => {
                warn!(error = %e, "baker status check failed");
                BakerLookup::Failed {
                    address,
                    message: "Could not retrieve the DAL status. Please verify the address or try again later.".to_string(),
                }
            }
        };
        self.metrics.baker_lookup = Some(lookup);
        &self.metrics
    }

    pub fn set_lookup_pending(&mut self, address: &str) {
        self.metrics.baker_lookup = Some(BakerLookup::Pending(address.trim().to_string()));
    }

    pub fn get_metrics(&self) -> &DalMetrics {
        &self.metrics
    }

    pub fn check_staleness(&mut self) {
        if matches!(
            self.metrics.fetch_status,
            FetchStatus::Ok | FetchStatus::Stale
        ) {
            if let Some(last_ok) = self.metrics.last_successful {
                if last_ok.elapsed() > self.stale_after {
                    self.metrics.fetch_status = FetchStatus::Stale;
                }
            }
        }
    }
}
