//! Background refresh task.
//!
//! A single task owns the [`MetricsCollector`], so fetches never overlap.
//! Refresh requests are coalesced through a [`Notify`] permit and every state
//! change is published on a `watch` channel.
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::data::{DalMetrics, MetricsCollector};

/// How often the published status is re-checked for staleness
pub const STALENESS_CHECK: Duration = Duration::from_secs(5);

const LOOKUP_QUEUE: usize = 8;

pub struct Poller {
    refresh: Arc<Notify>,
    lookups: mpsc::Sender<String>,
    state: watch::Receiver<DalMetrics>,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Poller {
    /// Starts polling; the first fetch happens immediately.
    pub fn spawn(collector: MetricsCollector, interval: Duration) -> Self {
        let (state_tx, state) = watch::channel(collector.get_metrics().clone());
        let (lookups, lookup_rx) = mpsc::channel(LOOKUP_QUEUE);
        let refresh = Arc::new(Notify::new());
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(run(
            collector,
            interval,
            refresh.clone(),
            lookup_rx,
            state_tx,
            cancel.clone(),
        ));

        Self {
            refresh,
            lookups,
            state,
            cancel,
            handle: Some(handle),
        }
    }

    /// Requests an out-of-schedule fetch. Requests made while one is already
    /// pending collapse into it.
    pub fn request_refresh(&self) {
        self.refresh.notify_one();
    }

    /// Queues a single-baker check. Returns false if the queue is full.
    pub fn lookup_baker(&self, address: impl Into<String>) -> bool {
        self.lookups.try_send(address.into()).is_ok()
    }

    pub fn subscribe(&self) -> watch::Receiver<DalMetrics> {
        self.state.clone()
    }

    /// Latest published state
    pub fn metrics(&self) -> DalMetrics {
        self.state.borrow().clone()
    }

    /// Stops the task, abandoning any in-flight fetch.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "poller task failed");
            }
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run(
    mut collector: MetricsCollector,
    interval: Duration,
    refresh: Arc<Notify>,
    mut lookups: mpsc::Receiver<String>,
    state: watch::Sender<DalMetrics>,
    cancel: CancellationToken,
) {
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut staleness = time::interval_at(Instant::now() + STALENESS_CHECK, STALENESS_CHECK);
    staleness.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(interval_secs = interval.as_secs(), "poller started");
    tokio::select! {
        _ = cancel.cancelled() => {
            info!("poller stopped");
            return;
        }
        metrics = collector.collect_metrics() => {
            state.send_replace(metrics.clone());
        }
    }

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                debug!("scheduled refresh");
            }
            _ = refresh.notified() => {
                debug!("manual refresh");
                ticker.reset();
            }
            Some(address) = lookups.recv() => {
                collector.set_lookup_pending(&address);
                state.send_replace(collector.get_metrics().clone());
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    metrics = collector.lookup_baker(&address) => {
                        state.send_replace(metrics.clone());
                    }
                }
                continue;
            }
            _ = staleness.tick() => {
                let before = collector.get_metrics().fetch_status.clone();
                collector.check_staleness();
                if collector.get_metrics().fetch_status != before {
                    state.send_replace(collector.get_metrics().clone());
                }
                continue;
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            metrics = collector.collect_metrics() => {
                state.send_replace(metrics.clone());
            }
        }
    }
    info!("poller stopped");
}
