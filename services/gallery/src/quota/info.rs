use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use super::pacific;

const MIB: f64 = 1024.0 * 1024.0;

/// Snapshot of an artist's upload allowance for the current Pacific day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaInfo {
    pub daily_limit_bytes: u64,
    pub used_bytes: u64,
    pub remaining_bytes: u64,
    pub reset_time: DateTime<Utc>,
    pub percent_used: f64,
}

impl QuotaInfo {
    pub fn new(daily_limit_bytes: u64, used_bytes: u64, reset_time: DateTime<Utc>) -> Self {
        Self {
            daily_limit_bytes,
            used_bytes,
            remaining_bytes: daily_limit_bytes.saturating_sub(used_bytes),
            reset_time,
            percent_used: percent_used(used_bytes, daily_limit_bytes),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining_bytes == 0
    }
}

/// Percentage of `limit` consumed, rounded to two decimals.
pub fn percent_used(used: u64, limit: u64) -> f64 {
    if limit == 0 {
        return 0.0;
    }
    ((used as f64 / limit as f64) * 10_000.0).round() / 100.0
}

pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes}B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1}KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1}MB", bytes as f64 / MIB)
    }
}

/// `5h 12m`, or `12m` when less than an hour remains.
pub fn format_time_until(now: DateTime<Utc>, reset: DateTime<Utc>) -> String {
    let minutes_total = (reset - now).num_minutes().max(0);
    let hours = minutes_total / 60;
    let minutes = minutes_total % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Remediation text returned with a rejected upload.
pub fn exceeded_hint(info: &QuotaInfo, attempted_bytes: u64, now: DateTime<Utc>) -> String {
    let reset_day = pacific::pacific_date(info.reset_time);
    format!(
        "You've used {:.1}MB of your {:.0}MB daily quota. Quota resets at {}/{}/{} 00:00 Pacific (in {}). Your upload: {:.1}MB.",
        info.used_bytes as f64 / MIB,
        info.daily_limit_bytes as f64 / MIB,
        reset_day.month(),
        reset_day.day(),
        reset_day.year(),
        format_time_until(now, info.reset_time),
        attempted_bytes as f64 / MIB,
    )
}
