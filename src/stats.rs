//! DAL statistics documents and the percentages derived from them.
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::FetchError;

/// Current network snapshot as published by the statistics pipeline.
///
/// Counts are signed: upstream data is not validated and the derivations
/// below must tolerate inconsistent values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawStats {
    pub timestamp: String,
    pub cycle: i64,
    pub total_bakers: i64,
    pub dal_active_bakers: i64,
    pub dal_inactive_bakers: i64,
    pub unclassified_bakers: i64,
    pub non_attesting_bakers: i64,
    pub dal_baking_power_percentage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_baking_power: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dal_baking_power: Option<f64>,
}

impl RawStats {
    pub fn participation_percentage(&self) -> f64 {
        participation_percentage(Some(self))
    }

    pub fn adoption_percentage(&self) -> f64 {
        adoption_percentage(Some(self))
    }
}

/// Past snapshot with its percentages derived at collection time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: String,
    pub cycle: i64,
    #[serde(default)]
    pub dal_active_bakers: i64,
    #[serde(default)]
    pub dal_baking_power_percentage: f64,
    #[serde(default)]
    pub dal_participation_percentage: f64,
    #[serde(default)]
    pub dal_adoption_percentage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_bakers: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dal_inactive_bakers: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unclassified_bakers: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_attesting_bakers: Option<i64>,
}

/// DAL status of a single baker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BakerStatus {
    #[serde(alias = "has_dal")]
    pub online: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<String>,
}

/// Per-baker status document, with or without the `data` envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StatusDocument {
    Envelope {
        #[serde(default)]
        timestamp: Option<String>,
        data: HashMap<String, BakerStatus>,
    },
    Bare(HashMap<String, BakerStatus>),
}

impl StatusDocument {
    pub fn get(&self, address: &str) -> Option<&BakerStatus> {
        match self {
            StatusDocument::Envelope { data, .. } => data.get(address),
            StatusDocument::Bare(map) => map.get(address),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            StatusDocument::Envelope { data, .. } => data.len(),
            StatusDocument::Bare(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Share of attesting bakers running DAL.
///
/// Zero when there is no snapshot or no attesting baker. Not clamped.
pub fn participation_percentage(stats: Option<&RawStats>) -> f64 {
    let Some(stats) = stats else {
        return 0.0;
    };
    let attesting = stats.total_bakers - stats.non_attesting_bakers;
    if attesting <= 0 {
        return 0.0;
    }
    (stats.dal_active_bakers as f64 / attesting as f64) * 100.0
}

/// Share of bakers that are neither DAL-inactive, unclassified nor
/// non-attesting.
///
/// Zero when there is no snapshot or no baker. Not clamped: inconsistent
/// counts can make it negative.
pub fn adoption_percentage(stats: Option<&RawStats>) -> f64 {
    let Some(stats) = stats else {
        return 0.0;
    };
    if stats.total_bakers <= 0 {
        return 0.0;
    }
    let adopting = stats.total_bakers
        - stats.dal_inactive_bakers
        - stats.unclassified_bakers
        - stats.non_attesting_bakers;
    (adopting as f64 / stats.total_bakers as f64) * 100.0
}

/// Ratio of active DAL bakers, for the first gauge.
pub fn active_ratio(stats: Option<&RawStats>) -> f64 {
    match stats {
        Some(s) if s.total_bakers > 0 => s.dal_active_bakers as f64 / s.total_bakers as f64,
        _ => 0.0,
    }
}

/// Gauge fill for a percentage. Only the drawing is clamped.
pub fn gauge_ratio(percentage: f64) -> f64 {
    if percentage.is_finite() {
        (percentage / 100.0).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

pub fn parse_cycle(raw: &str) -> Result<i64, FetchError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| FetchError::InvalidCycle(raw.to_string()))
}

pub fn find_cycle(history: &[HistoryEntry], cycle: i64) -> Result<&HistoryEntry, FetchError> {
    history
        .iter()
        .find(|entry| entry.cycle == cycle)
        .ok_or(FetchError::CycleNotFound(cycle))
}

/// Base58 prefixes of tz1, tz2, tz3 and tz4 addresses
const ADDRESS_PREFIXES: [[u8; 3]; 4] = [
    [6, 161, 159],
    [6, 161, 161],
    [6, 161, 164],
    [6, 161, 166],
];
const ADDRESS_HASH_LEN: usize = 20;

/// Checks that `raw` is a base58check-encoded implicit account address.
pub fn validate_address(raw: &str) -> Result<&str, FetchError> {
    let address = raw.trim();
    let payload = bs58::decode(address)
        .with_check(None)
        .into_vec()
        .map_err(|_| FetchError::MalformedAddress(raw.to_string()))?;
    let well_formed = payload.len() == 3 + ADDRESS_HASH_LEN
        && ADDRESS_PREFIXES.iter().any(|p| payload.starts_with(p));
    if well_formed {
        Ok(address)
    } else {
        Err(FetchError::MalformedAddress(raw.to_string()))
    }
}

/// Snapshot document with both derived percentages added.
pub fn snapshot_json(stats: &RawStats) -> Result<serde_json::Value, serde_json::Error> {
    let mut value = serde_json::to_value(stats)?;
    if let Some(obj) = value.as_object_mut() {
        obj.insert(
            "dal_participation_percentage".into(),
            stats.participation_percentage().into(),
        );
        obj.insert(
            "dal_adoption_percentage".into(),
            stats.adoption_percentage().into(),
        );
    }
    Ok(value)
}

/// Renders an ISO-8601 timestamp as a date, falling back to the raw text.
pub fn format_date(timestamp: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(timestamp) {
        return dt.format("%Y-%m-%d").to_string();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f") {
        return dt.format("%Y-%m-%d").to_string();
    }
    timestamp.to_string()
}
