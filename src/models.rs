//! Data Models Module
//!
//! This module defines the core data structures used by pmtalyzer to represent
//! PowerMTA accounting-log records, derived delivery statuses, search and
//! filter inputs, and the analysis summary. It also provides implementations
//! for converting from strings and parsing log timestamps.
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One row of a PowerMTA accounting log.
///
/// Records are immutable once parsed: derived values such as the delivery
/// status, parsed timestamps or the sending-source fallback chain are
/// computed on read and never written back. Required text fields keep the
/// raw log value (empty string when the column is absent); optional fields
/// are `None` when the column is absent or empty. Unrecognized columns are
/// preserved verbatim in `extra`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct DeliveryRecord {
    pub record_type: String,
    pub time_logged: String,
    pub time_queued: String,
    pub orig: String,
    pub rcpt: String,
    pub dsn_action: String,
    pub dsn_status: String,
    pub dsn_diag: String,
    pub vmta: Option<String>,
    pub dlv_source_ip: Option<String>,
    pub bounce_cat: Option<String>,
    pub job_id: Option<String>,
    pub message_id: Option<String>,
    pub subject: Option<String>,
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl DeliveryRecord {
    /// The sending infrastructure identifier: the VMTA name, falling back to
    /// the delivery source IP, falling back to `"unknown"`.
    pub fn sending_source(&self) -> &str {
        non_empty(self.vmta.as_deref())
            .or_else(|| non_empty(self.dlv_source_ip.as_deref()))
            .unwrap_or("unknown")
    }

    /// The bounce category tag, `"unknown"` when absent.
    pub fn bounce_category(&self) -> &str {
        non_empty(self.bounce_cat.as_deref()).unwrap_or("unknown")
    }

    /// The `timeLogged` field parsed to UTC, `None` when missing or in an
    /// unrecognized format. The raw text stays available in `time_logged`.
    pub fn logged_at(&self) -> Option<DateTime<Utc>> {
        parse_log_timestamp(&self.time_logged)
    }

    /// Domain part of the recipient address, if it has one.
    pub fn recipient_domain(&self) -> Option<&str> {
        self.rcpt.split('@').nth(1).filter(|d| !d.is_empty())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Parses a PowerMTA log timestamp.
///
/// Tries RFC 3339, then the native accounting format
/// (`2024-01-15 10:30:45+0000`), then a naive datetime assumed UTC.
/// Returns `None` for anything else; an unparseable timestamp is never fatal.
pub fn parse_log_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%z") {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    None
}

/// Delivery status derived from a record's DSN fields.
///
/// The five named variants come from the classifier's rule list; anything
/// that matches no rule carries its raw (capitalized) action text.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
pub enum DeliveryStatus {
    Delivered,
    Failed,
    Queued,
    Delayed,
    Expanded,
    Other(String),
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryStatus::Delivered => write!(f, "Delivered"),
            DeliveryStatus::Failed => write!(f, "Failed"),
            DeliveryStatus::Queued => write!(f, "Queued"),
            DeliveryStatus::Delayed => write!(f, "Delayed"),
            DeliveryStatus::Expanded => write!(f, "Expanded"),
            DeliveryStatus::Other(label) => write!(f, "{}", label),
        }
    }
}

impl FromStr for DeliveryStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err("Empty delivery status".to_string());
        }
        match trimmed.to_lowercase().as_str() {
            "delivered" => Ok(DeliveryStatus::Delivered),
            "failed" => Ok(DeliveryStatus::Failed),
            "queued" => Ok(DeliveryStatus::Queued),
            "delayed" => Ok(DeliveryStatus::Delayed),
            "expanded" => Ok(DeliveryStatus::Expanded),
            _ => Ok(DeliveryStatus::Other(crate::classifier::capitalize(trimmed))),
        }
    }
}

/// Field a search query runs against.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchField {
    Recipient,
    Sender,
    Diagnostic,
    Vmta,
    #[default]
    All,
}

impl fmt::Display for SearchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchField::Recipient => write!(f, "recipient"),
            SearchField::Sender => write!(f, "sender"),
            SearchField::Diagnostic => write!(f, "diagnostic"),
            SearchField::Vmta => write!(f, "vmta"),
            SearchField::All => write!(f, "all"),
        }
    }
}

impl FromStr for SearchField {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "recipient" => Ok(SearchField::Recipient),
            "sender" => Ok(SearchField::Sender),
            "diagnostic" => Ok(SearchField::Diagnostic),
            "vmta" => Ok(SearchField::Vmta),
            "all" => Ok(SearchField::All),
            _ => Err(format!("Invalid search field: {}", s)),
        }
    }
}

/// A substring search over the record sequence.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct SearchQuery {
    pub term: String,
    pub field: SearchField,
}

/// Closed `[start, end]` interval over `timeLogged`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Conjunctive filter criteria; `None` means no constraint on that axis.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct FilterCriteria {
    pub status: Option<DeliveryStatus>,
    pub vmta: Option<String>,
    pub bounce_category: Option<String>,
    pub date_range: Option<DateRange>,
}

/// Headline counts and rates over the whole record set.
///
/// The five count buckets partition `total`: `deferred` counts records
/// classified `Delayed`, and `other` absorbs `Expanded` plus every
/// fallthrough label. Rates are percentages, `0.0` on an empty set.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Overview {
    pub total: u64,
    pub delivered: u64,
    pub failed: u64,
    pub queued: u64,
    pub deferred: u64,
    pub other: u64,
    pub delivery_rate: f64,
    pub failure_rate: f64,
    pub queued_rate: f64,
    pub deferred_rate: f64,
}

/// Per-sending-source counts and delivery rate.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct VmtaStats {
    pub total: u64,
    pub delivered: u64,
    pub failed: u64,
    pub delivery_rate: f64,
}

/// Counts for one hourly time bucket, keyed `YYYY-MM-DD HH:00`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct TimeBucket {
    pub bucket: String,
    pub total: u64,
    pub delivered: u64,
    pub failed: u64,
}

/// One entry of a top-N address ranking.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AddressCount {
    pub address: String,
    pub count: u64,
}

/// The full analysis summary: a pure function of the record sequence,
/// recomputed whenever the input changes.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct AnalysisResult {
    pub overview: Overview,
    pub vmta_performance: BTreeMap<String, VmtaStats>,
    pub status_breakdown: BTreeMap<String, u64>,
    pub bounce_analysis: BTreeMap<String, u64>,
    pub time_series: Vec<TimeBucket>,
    pub top_recipients: Vec<AddressCount>,
    pub top_senders: Vec<AddressCount>,
}
