// 💳 Transaction Model
// The read-only record the duplicate detector works on

use crate::error::{DetectionError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Shortest digit run read as epoch milliseconds (1973-03-03 onwards)
const MIN_EPOCH_MILLIS_DIGITS: usize = 11;

/// Naive date-time layouts accepted after RFC 3339 (interpreted as UTC)
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Transaction as supplied by the caller
///
/// Account, amount and category fields are optional: a missing value is still
/// a valid part of the business key (missing == missing).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Opaque identifier, used for traceability only
    #[serde(default = "default_id")]
    pub id: String,

    #[serde(default)]
    pub source_account: Option<String>,

    #[serde(default)]
    pub target_account: Option<String>,

    #[serde(default)]
    pub amount: Option<f64>,

    #[serde(default)]
    pub category: Option<String>,

    /// When the transaction happened (RFC 3339, naive ISO, YYYY[-MM[-DD]] or epoch ms)
    pub time: String,
}

// Helper function for serde defaults
fn default_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl Transaction {
    /// Create a transaction with every business field present
    pub fn new(
        id: impl Into<String>,
        source_account: impl Into<String>,
        target_account: impl Into<String>,
        amount: f64,
        category: impl Into<String>,
        time: impl Into<String>,
    ) -> Self {
        Transaction {
            id: id.into(),
            source_account: Some(source_account.into()),
            target_account: Some(target_account.into()),
            amount: Some(amount),
            category: Some(category.into()),
            time: time.into(),
        }
    }

    /// Resolve `time` to an instant, failing with the transaction's id
    pub fn instant(&self) -> Result<DateTime<Utc>> {
        parse_time(&self.time).ok_or_else(|| DetectionError::InvalidTimestamp {
            id: self.id.clone(),
            value: self.time.clone(),
        })
    }
}

/// Parse a transaction time string into a UTC instant
///
/// Tries, in order: integer epoch milliseconds (11+ digits), RFC 3339, naive
/// date-time (UTC), a bare `YYYY-MM-DD` date (midnight UTC), and the partial
/// dates `YYYY-MM` / `YYYY` (first day, midnight UTC). Shorter digit runs such
/// as `20180302` are rejected rather than read as instants near 1970.
pub fn parse_time(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Some(millis) = parse_epoch_millis(value) {
        return DateTime::from_timestamp_millis(millis);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|naive| Utc.from_utc_datetime(&naive));
    }

    parse_partial_date(value)
}

/// `YYYY-MM` or `YYYY`, starting at the first day of the period
fn parse_partial_date(value: &str) -> Option<DateTime<Utc>> {
    let (year, month) = match value.split_once('-') {
        Some((year, month)) if month.len() == 2 => (year, month.parse().ok()?),
        Some(_) => return None,
        None => (value, 1),
    };
    if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    NaiveDate::from_ymd_opt(year.parse().ok()?, month, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn parse_epoch_millis(value: &str) -> Option<i64> {
    let digits = value.strip_prefix('-').unwrap_or(value);
    if digits.len() < MIN_EPOCH_MILLIS_DIGITS || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

// ============================================================================
// TESTS
// ============================================================================
