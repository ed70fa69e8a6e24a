// src/models/stats.rs
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::asset::request_label;

// ==================== PENDING ====================

/// Raw pending row as read from storage.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PendingAssetRow {
    pub np_number: String,
    pub biopsy_type: String,
    pub start_time: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingAssetView {
    pub np_number: String,
    pub biopsy_type: String,
    pub start_time: String,
}

impl PendingAssetView {
    pub fn from_row(row: PendingAssetRow, now: NaiveDateTime) -> Self {
        Self {
            start_time: format_relative_start(row.start_time, now),
            np_number: row.np_number,
            biopsy_type: row.biopsy_type,
        }
    }
}

/// Formats a start instant relative to `now`.
pub fn format_relative_start(start: NaiveDateTime, now: NaiveDateTime) -> String {
    if start == now {
        return "Now".to_string();
    }

    let today = now.date();
    let clock = start.format("%H:%M");

    if start.date() == today {
        format!("Today, {}", clock)
    } else if start.date() == today - Duration::days(1) {
        format!("Yesterday, {}", clock)
    } else {
        start.format("%d-%m-%Y, %H:%M").to_string()
    }
}

// ==================== AGGREGATES ====================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestCount {
    pub request_type: String,
    pub count: i64,
}

impl RequestCount {
    pub fn from_code(code: &str, count: i64) -> Self {
        Self {
            request_type: request_label(code),
            count,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CasesCount {
    pub internal_cases_count: i64,
    pub external_cases_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSummary {
    pub stat: String,
    pub mean: f64,
    pub max: i64,
}
