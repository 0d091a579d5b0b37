//! Status Classifier Module
//!
//! Derives a human-facing delivery status from a record's DSN action, status
//! code and diagnostic text. Classification is an ordered list of
//! `(predicate, status)` rules evaluated first-match-wins; the order is part
//! of the contract. An action-based failure outranks a queued-sounding
//! diagnostic, so a bounced record whose diagnostic mentions "queued" still
//! classifies `Failed`.
//!
//! A companion summarizer condenses raw diagnostic text into a short
//! human-readable reason for display; it never feeds back into
//! classification.

use crate::models::{DeliveryRecord, DeliveryStatus};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref DELIVERED_STATUS: Regex =
        Regex::new(r"(?i)2\.0\.0|2\.6\.0|2\.1\.5|success").unwrap();
    static ref FAILED_ACTION: Regex =
        Regex::new(r"(?i)failed|failure|bounced|rejected|denied|deferred|error").unwrap();
    static ref SMTP_CODE: Regex = Regex::new(r"\b\d{3,5}\b").unwrap();
    static ref OK_WORD: Regex = Regex::new(r"(?i)\bok\b").unwrap();
}

type Predicate = fn(&DeliveryRecord) -> bool;

// Order is contractual; see the module docs.
static RULES: [(Predicate, DeliveryStatus); 5] = [
    (relayed_with_success_status, DeliveryStatus::Delivered),
    (failing_action, DeliveryStatus::Failed),
    (queued_diagnostic, DeliveryStatus::Queued),
    (delayed_action, DeliveryStatus::Delayed),
    (expanded_action, DeliveryStatus::Expanded),
];

fn relayed_with_success_status(record: &DeliveryRecord) -> bool {
    record.dsn_action.to_lowercase().contains("relayed")
        && DELIVERED_STATUS.is_match(&record.dsn_status)
}

fn failing_action(record: &DeliveryRecord) -> bool {
    FAILED_ACTION.is_match(&record.dsn_action)
}

fn queued_diagnostic(record: &DeliveryRecord) -> bool {
    record.dsn_diag.to_lowercase().contains("queued")
}

fn delayed_action(record: &DeliveryRecord) -> bool {
    record.dsn_action.to_lowercase().contains("delayed")
}

fn expanded_action(record: &DeliveryRecord) -> bool {
    record.dsn_action.to_lowercase().contains("expanded")
}

/// Classifies a record's delivery status. Never fails: a record matching no
/// rule yields `Other` with its raw action text capitalized (`"Unknown"`
/// when the action is empty).
pub fn classify(record: &DeliveryRecord) -> DeliveryStatus {
    for (applies, status) in &RULES {
        if applies(record) {
            return status.clone();
        }
    }
    let action = record.dsn_action.trim();
    if action.is_empty() {
        DeliveryStatus::Other("Unknown".to_string())
    } else {
        DeliveryStatus::Other(capitalize(action))
    }
}

/// Uppercases the first character, leaving the rest untouched.
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Extracts the first SMTP-style numeric code (3 to 5 digits) from a
/// diagnostic message.
pub fn extract_smtp_code(diag: &str) -> Option<&str> {
    SMTP_CODE.find(diag).map(|m| m.as_str())
}

type DiagPredicate = fn(&str) -> bool;

// Evaluated against the lowercased diagnostic, in this order.
static DIAG_RULES: [(DiagPredicate, &str); 7] = [
    (|d| d.contains("invalid recipient"), "Invalid Recipient"),
    (|d| d.contains("accepted"), "Accepted for Delivery"),
    (|d| d.contains("no mail hosts"), "No Mail Hosts for Domain"),
    (|d| OK_WORD.is_match(d), "OK"),
    (|d| d.contains("queued"), "Queued for Delivery"),
    (|d| d.contains("success"), "Success"),
    (|d| d.contains("fail"), "Delivery Failed"),
];

const MAX_VERBATIM_LEN: usize = 60;

/// Condenses a diagnostic message into a short display reason.
///
/// Known phrasings map to fixed labels; anything else passes through
/// verbatim, truncated with an ellipsis past 60 characters.
pub fn summarize_diagnostic(diag: &str) -> String {
    let trimmed = diag.trim();
    let lowered = trimmed.to_lowercase();
    for (applies, reason) in &DIAG_RULES {
        if applies(&lowered) {
            return (*reason).to_string();
        }
    }
    if trimmed.chars().count() > MAX_VERBATIM_LEN {
        let head: String = trimmed.chars().take(MAX_VERBATIM_LEN).collect();
        format!("{}...", head.trim_end())
    } else {
        trimmed.to_string()
    }
}
