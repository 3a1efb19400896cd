//! Shared fixtures for the integration tests

#![allow(dead_code)]

use dalometer::Config;
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const STATS_PATH: &str = "/dal_stats.json";
pub const HISTORY_PATH: &str = "/dal_stats_history.json";
pub const STATUS_PATH: &str = "/dal_status.json";

pub const ONLINE_BAKER: &str = "tz1burnburnburnburnburnburnburjAYjjX";
pub const OFFLINE_BAKER: &str = "tz3WmWTSLiZq9AppJVCYbfwG4TYbXLq6ZLgu";
pub const UNKNOWN_BAKER: &str = "tz2FCNBrERXtaTtNX6iimR1UJ5JSDxvdHM93";

/// Config pointing every endpoint at the mock server
pub fn config_for(server: &MockServer) -> Config {
    Config {
        stats_url: format!("{}{}", server.uri(), STATS_PATH),
        history_url: format!("{}{}", server.uri(), HISTORY_PATH),
        history_fallback: "/nonexistent/dal_stats_history.json".to_string(),
        baker_status_url: format!("{}{}", server.uri(), STATUS_PATH),
        refresh_secs: 3600,
        http_timeout_secs: 5,
    }
}

pub fn stats_json() -> Value {
    json!({
        "timestamp": "2025-03-14T10:02:11.123456",
        "cycle": 852,
        "total_bakers": 289,
        "dal_active_bakers": 62,
        "dal_inactive_bakers": 100,
        "unclassified_bakers": 20,
        "non_attesting_bakers": 39,
        "dal_baking_power_percentage": 28.1,
        "total_baking_power": 712345678901234u64,
        "dal_baking_power": 200123456789012u64
    })
}

pub fn history_json() -> Value {
    json!([
        {
            "timestamp": "2025-03-12T10:00:00",
            "cycle": 850,
            "dal_active_bakers": 58,
            "dal_baking_power_percentage": 26.9,
            "dal_participation_percentage": 23.2,
            "dal_adoption_percentage": 44.1
        },
        {
            "timestamp": "2025-03-13T10:00:00",
            "cycle": 851,
            "dal_active_bakers": 60,
            "dal_baking_power_percentage": 27.5,
            "dal_participation_percentage": 24.0,
            "dal_adoption_percentage": 44.9
        }
    ])
}

pub fn status_json() -> Value {
    json!({
        "timestamp": "2025-03-14T09:00:00",
        "data": {
            ONLINE_BAKER: { "online": true, "last_checked": "2025-03-14T09:00:00" },
            OFFLINE_BAKER: { "online": false, "last_checked": "2025-03-14T09:00:00" }
        }
    })
}

pub async fn mount_json(server: &MockServer, at: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mount_status(server: &MockServer, at: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

pub async fn hits(server: &MockServer, at: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == at)
        .count()
}
