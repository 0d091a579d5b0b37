//! Export Module
//!
//! Flattens delivery records into one flat key/value mapping per record,
//! keyed by the source column names plus the derived `status`, `dsnCode`
//! and `diagSummary` fields, and serializes the projection as comma- or
//! tab-delimited text or JSON. A pure derived view over the record
//! sequence; nothing is persisted.

use crate::classifier::{classify, extract_smtp_code, summarize_diagnostic};
use crate::error::Result;
use crate::models::DeliveryRecord;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

const BASE_COLUMNS: [&str; 17] = [
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
    "status",
    "dsnCode",
    "diagSummary",
];

/// Projects one record to a flat key/value mapping using the source column
/// names; derived fields ride along, extras are carried through verbatim.
pub fn flatten(record: &DeliveryRecord) -> BTreeMap<String, String> {
    let mut flat = BTreeMap::new();
    flat.insert("type".to_string(), record.record_type.clone());
    flat.insert("timeLogged".to_string(), record.time_logged.clone());
    flat.insert("timeQueued".to_string(), record.time_queued.clone());
    flat.insert("orig".to_string(), record.orig.clone());
    flat.insert("rcpt".to_string(), record.rcpt.clone());
    flat.insert("dsnAction".to_string(), record.dsn_action.clone());
    flat.insert("dsnStatus".to_string(), record.dsn_status.clone());
    flat.insert("dsnDiag".to_string(), record.dsn_diag.clone());
    flat.insert("vmta".to_string(), record.vmta.clone().unwrap_or_default());
    flat.insert(
        "dlvSourceIp".to_string(),
        record.dlv_source_ip.clone().unwrap_or_default(),
    );
    flat.insert("bounceCat".to_string(), record.bounce_cat.clone().unwrap_or_default());
    flat.insert("jobId".to_string(), record.job_id.clone().unwrap_or_default());
    flat.insert("messageId".to_string(), record.message_id.clone().unwrap_or_default());
    flat.insert("subject".to_string(), record.subject.clone().unwrap_or_default());
    flat.insert("status".to_string(), classify(record).to_string());
    flat.insert(
        "dsnCode".to_string(),
        extract_smtp_code(&record.dsn_diag).unwrap_or_default().to_string(),
    );
    flat.insert("diagSummary".to_string(), summarize_diagnostic(&record.dsn_diag));
    for (key, value) in &record.extra {
        flat.insert(key.clone(), value.clone());
    }
    flat
}

// Fixed base order, then any extra columns sorted by name.
fn export_columns(records: &[DeliveryRecord]) -> Vec<String> {
    let mut columns: Vec<String> = BASE_COLUMNS.iter().map(|c| c.to_string()).collect();
    let extras: BTreeSet<&String> = records.iter().flat_map(|r| r.extra.keys()).collect();
    columns.extend(extras.into_iter().cloned());
    columns
}

/// Writes the flattened projection with the given field delimiter.
pub fn write_delimited<W: Write>(
    records: &[DeliveryRecord],
    writer: W,
    delimiter: u8,
) -> Result<()> {
    let columns = export_columns(records);
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);
    wtr.write_record(&columns)?;
    for record in records {
        let flat = flatten(record);
        let row: Vec<&str> = columns
            .iter()
            .map(|column| flat.get(column).map(String::as_str).unwrap_or(""))
            .collect();
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Comma-separated projection.
pub fn write_csv<W: Write>(records: &[DeliveryRecord], writer: W) -> Result<()> {
    write_delimited(records, writer, b',')
}

/// Tab-separated projection.
pub fn write_tsv<W: Write>(records: &[DeliveryRecord], writer: W) -> Result<()> {
    write_delimited(records, writer, b'\t')
}

/// Pretty JSON array of the flattened projection.
pub fn to_json(records: &[DeliveryRecord]) -> Result<String> {
    let flat: Vec<BTreeMap<String, String>> = records.iter().map(flatten).collect();
    serde_json::to_string_pretty(&flat)
        .map_err(|e| crate::error::PmtaError::Format(e.to_string()))
}
