//! DAL-o-meter: a terminal dashboard for the Tezos Data-Availability Layer
//! participation statistics published by an external pipeline.

pub mod client;
pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod poller;
pub mod stats;
pub mod ui;

pub use client::{DalClient, HistoryFetch, HistoryOrigin};
pub use config::{Cli, Command, Config};
pub use data::{BakerLookup, DalMetrics, FetchStatus, MetricsCollector};
pub use error::FetchError;
pub use poller::Poller;
pub use stats::{
    BakerStatus, HistoryEntry, RawStats, adoption_percentage, find_cycle,
    participation_percentage,
};
