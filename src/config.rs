//! Configuration parameters for the DAL-o-meter dashboard
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_STATS_URL: &str =
    "https://aurelienmonteillet.github.io/dal-dashboard/dal_stats.json";
pub const DEFAULT_HISTORY_URL: &str =
    "https://aurelienmonteillet.github.io/dal-dashboard/dal_stats_history.json";
pub const DEFAULT_BAKER_STATUS_URL: &str =
    "https://aurelienmonteillet.github.io/dal-dashboard/dal_status.json";

/// Bundled copy of the history, read when the remote history is unreachable
pub const DEFAULT_HISTORY_FALLBACK: &str = "dal_stats_history.json";

/// Upstream documents are regenerated every 1-2 hours
pub const DEFAULT_REFRESH_SECS: u64 = 3600;

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_LOG_FILE: &str = "dalometer.log";

/// A snapshot is reported stale after this many missed refresh intervals
pub const STALE_AFTER_INTERVALS: u32 = 2;

/// Redraw period of the terminal UI
pub const TICK_RATE: Duration = Duration::from_millis(100);

/// Shown instead of the underlying fetch error
pub const STATS_ERROR_MESSAGE: &str = "Unable to load DAL statistics";

/// Command line interface
#[derive(Debug, Parser)]
#[command(
    name = "dalometer",
    version = env!("CARGO_PKG_VERSION"),
    about = "Terminal dashboard for Tezos DAL baker participation statistics"
)]
pub struct Cli {
    #[command(flatten)]
    pub config: Config,

    /// File receiving the dashboard's logs
    #[arg(long, env = "DAL_LOG_FILE", default_value = DEFAULT_LOG_FILE, global = true)]
    pub log_file: PathBuf,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the interactive dashboard (default)
    Watch,
    /// Fetch the current snapshot once and print it with derived percentages
    Snapshot {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the history entry of one cycle
    Cycle {
        /// Cycle number
        cycle: String,
    },
    /// Check whether a baker is online on the DAL network
    Baker {
        /// Baker address (tz1...)
        address: String,
    },
}

/// Endpoints and timings, resolved once at start-up
#[derive(Debug, Clone, Args)]
pub struct Config {
    /// URL of the current statistics snapshot
    #[arg(long, env = "DAL_STATS_URL", default_value = DEFAULT_STATS_URL, global = true)]
    pub stats_url: String,

    /// URL of the statistics history array
    #[arg(long, env = "DAL_HISTORY_URL", default_value = DEFAULT_HISTORY_URL, global = true)]
    pub history_url: String,

    /// Local file or URL read when the history URL fails
    #[arg(long, env = "DAL_HISTORY_FALLBACK", default_value = DEFAULT_HISTORY_FALLBACK, global = true)]
    pub history_fallback: String,

    /// URL of the per-baker status document
    #[arg(long, env = "DAL_BAKER_STATUS_URL", default_value = DEFAULT_BAKER_STATUS_URL, global = true)]
    pub baker_status_url: String,

    /// Seconds between two refreshes
    #[arg(long, env = "DAL_REFRESH_SECS", default_value_t = DEFAULT_REFRESH_SECS, global = true)]
    pub refresh_secs: u64,

    /// HTTP request timeout in seconds
    #[arg(long, env = "DAL_HTTP_TIMEOUT_SECS", default_value_t = DEFAULT_HTTP_TIMEOUT_SECS, global = true)]
    pub http_timeout_secs: u64,
}

impl Config {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_secs.max(1))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.max(1))
    }

    pub fn stale_after(&self) -> Duration {
        self.refresh_interval() * STALE_AFTER_INTERVALS
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stats_url: DEFAULT_STATS_URL.to_string(),
            history_url: DEFAULT_HISTORY_URL.to_string(),
            history_fallback: DEFAULT_HISTORY_FALLBACK.to_string(),
            baker_status_url: DEFAULT_BAKER_STATUS_URL.to_string(),
            refresh_secs: DEFAULT_REFRESH_SECS,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_cli_defaults() {
        let cli = Cli::try_parse_from(["dalometer"]).unwrap();
        let defaults = Config::default();
        assert_eq!(cli.config.stats_url, defaults.stats_url);
        assert_eq!(cli.config.history_fallback, defaults.history_fallback);
        assert_eq!(cli.config.refresh_secs, DEFAULT_REFRESH_SECS);
        assert!(cli.command.is_none());
    }

    #[test]
    fn flags_after_subcommand_are_accepted() {
        let cli = Cli::try_parse_from([
            "dalometer",
            "cycle",
            "852",
            "--history-url",
            "http://localhost:9000/history.json",
        ])
        .unwrap();
        assert_eq!(cli.config.history_url, "http://localhost:9000/history.json");
        assert!(matches!(cli.command, Some(Command::Cycle { ref cycle }) if cycle == "852"));
    }

    #[test]
    fn stale_after_spans_two_intervals() {
        let config = Config {
            refresh_secs: 60,
            ..Config::default()
        };
        assert_eq!(config.stale_after(), Duration::from_secs(120));
    }

    #[test]
    fn zero_interval_is_raised_to_one_second() {
        let config = Config {
            refresh_secs: 0,
            ..Config::default()
        };
        assert_eq!(config.refresh_interval(), Duration::from_secs(1));
    }
}
