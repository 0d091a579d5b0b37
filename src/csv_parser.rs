//! CSV Parser Module
//!
//! This module parses PowerMTA accounting-log CSV text into delivery records.
//! The header row is matched case-sensitively against the known PMTA column
//! names; unrecognized columns are preserved as extra attributes but never
//! interpreted. Parsing is all-or-nothing: an empty source, a header with no
//! recognizable PMTA column, or a row whose column count disagrees with the
//! header aborts with an error (the row error names the offending 1-based
//! data row), so downstream aggregation always sees a rectangular table.

use crate::error::{PmtaError, Result};
use crate::models::DeliveryRecord;
use csv::StringRecord;

/// Accounting column names recognized by the parser, as PowerMTA writes them.
pub const KNOWN_COLUMNS: [&str; 14] = [
    "type",
    "timeLogged",
    "timeQueued",
    "orig",
    "rcpt",
    "dsnAction",
    "dsnStatus",
    "dsnDiag",
    "vmta",
    "dlvSourceIp",
    "bounceCat",
    "jobId",
    "messageId",
    "subject",
];

/// Parses the full text of one accounting log into an ordered record
/// sequence, one entry per non-header data line.
///
/// # Errors
///
/// Returns `PmtaError::Parse` when the source is empty, when the header row
/// contains none of the known PMTA columns, or when a data row's column
/// count disagrees with the header.
pub fn parse_accounting_csv(content: &str) -> Result<Vec<DeliveryRecord>> {
    if content.trim().is_empty() {
        return Err(PmtaError::Parse("Empty input".to_string()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| PmtaError::Parse(format!("Unreadable header row: {}", e)))?
        .clone();

    if !headers.iter().any(|name| KNOWN_COLUMNS.contains(&name)) {
        return Err(PmtaError::Parse(
            "No recognized PowerMTA columns in header row".to_string(),
        ));
    }

    let mut records = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row = row.map_err(|e| {
            PmtaError::Parse(format!("Malformed row {}: {}", index + 1, e))
        })?;
        records.push(build_record(&headers, &row));
    }

    log::debug!("Parsed {} delivery records", records.len());
    Ok(records)
}

fn build_record(headers: &StringRecord, row: &StringRecord) -> DeliveryRecord {
    let mut record = DeliveryRecord::default();
    for (name, value) in headers.iter().zip(row.iter()) {
        match name {
            "type" => record.record_type = value.to_string(),
            "timeLogged" => record.time_logged = value.to_string(),
            "timeQueued" => record.time_queued = value.to_string(),
            "orig" => record.orig = value.to_string(),
            "rcpt" => record.rcpt = value.to_string(),
            "dsnAction" => record.dsn_action = value.to_string(),
            "dsnStatus" => record.dsn_status = value.to_string(),
            "dsnDiag" => record.dsn_diag = value.to_string(),
            "vmta" => record.vmta = optional(value),
            "dlvSourceIp" => record.dlv_source_ip = optional(value),
            "bounceCat" => record.bounce_cat = optional(value),
            "jobId" => record.job_id = optional(value),
            "messageId" => record.message_id = optional(value),
            "subject" => record.subject = optional(value),
            other => {
                record.extra.insert(other.to_string(), value.to_string());
            }
        }
    }
    record
}

fn optional(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
type,timeLogged,orig,rcpt,dsnAction,dsnStatus,dsnDiag,vmta,bounceCat
d,2024-01-15 10:30:45+0000,news@sender.io,alice@example.com,relayed,2.0.0,smtp;250 OK,vmta-1,
b,2024-01-15 10:31:02+0000,news@sender.io,bob@example.com,failed,5.1.1,smtp;550 Invalid recipient,vmta-2,bad-mailbox
";

    #[test]
    fn test_parse_preserves_row_order() {
        let records = parse_accounting_csv(SAMPLE).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].rcpt, "alice@example.com");
        assert_eq!(records[0].record_type, "d");
        assert_eq!(records[1].rcpt, "bob@example.com");
        assert_eq!(records[1].dsn_action, "failed");
    }

    #[test]
    fn test_empty_optional_columns_become_none() {
        let records = parse_accounting_csv(SAMPLE).unwrap();
        assert_eq!(records[0].bounce_cat, None);
        assert_eq!(records[1].bounce_cat, Some("bad-mailbox".to_string()));
        // Columns absent from the header stay at their defaults.
        assert_eq!(records[0].dlv_source_ip, None);
        assert_eq!(records[0].time_queued, "");
    }

    #[test]
    fn test_unknown_columns_preserved_as_extra() {
        let csv = "type,rcpt,dlvSize,queueName\nd,a@b.com,2048,default\n";
        let records = parse_accounting_csv(csv).unwrap();
        assert_eq!(records[0].extra.get("dlvSize"), Some(&"2048".to_string()));
        assert_eq!(records[0].extra.get("queueName"), Some(&"default".to_string()));
    }

    #[test]
    fn test_known_column_match_is_case_sensitive() {
        // "TimeLogged" is not a PMTA column name; it lands in extras.
        let csv = "type,TimeLogged,rcpt\nd,2024-01-15 10:30:45+0000,a@b.com\n";
        let records = parse_accounting_csv(csv).unwrap();
        assert_eq!(records[0].time_logged, "");
        assert!(records[0].extra.contains_key("TimeLogged"));
    }

    #[test]
    fn test_empty_input_is_a_parse_error() {
        assert!(matches!(parse_accounting_csv(""), Err(PmtaError::Parse(_))));
        assert!(matches!(parse_accounting_csv("   \n  "), Err(PmtaError::Parse(_))));
    }

    #[test]
    fn test_unrecognized_header_is_a_parse_error() {
        let csv = "foo,bar\n1,2\n";
        let err = parse_accounting_csv(csv).unwrap_err();
        assert!(err.to_string().contains("header"));
    }

    #[test]
    fn test_ragged_row_aborts_with_row_number() {
        let csv = "type,rcpt,dsnAction\nd,a@b.com,relayed\nb,too-few\n";
        let err = parse_accounting_csv(csv).unwrap_err();
        assert!(err.to_string().contains("row 2"), "{}", err);
    }

    #[test]
    fn test_header_only_input_yields_no_records() {
        let records = parse_accounting_csv("type,rcpt,dsnAction\n").unwrap();
        assert!(records.is_empty());
    }
}
