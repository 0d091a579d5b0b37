//! Search Engine Module
//!
//! Case-insensitive substring search over the record sequence, against one
//! chosen field or every field. Order-preserving; an empty or
//! whitespace-only term matches everything. No fuzzy matching, no
//! tokenization.

use crate::models::{DeliveryRecord, SearchField, SearchQuery};

/// Returns the records whose selected field contains the query term,
/// preserving source order. Empty term: identity.
pub fn search(records: &[DeliveryRecord], query: &SearchQuery) -> Vec<DeliveryRecord> {
    let term = query.term.trim().to_lowercase();
    if term.is_empty() {
        return records.to_vec();
    }
    records
        .iter()
        .filter(|record| matches_field(record, &term, query.field))
        .cloned()
        .collect()
}

fn matches_field(record: &DeliveryRecord, term: &str, field: SearchField) -> bool {
    match field {
        SearchField::Recipient => contains(&record.rcpt, term),
        SearchField::Sender => contains(&record.orig, term),
        SearchField::Diagnostic => contains(&record.dsn_diag, term),
        SearchField::Vmta => contains(record.sending_source(), term),
        SearchField::All => any_field_contains(record, term),
    }
}

fn any_field_contains(record: &DeliveryRecord, term: &str) -> bool {
    let known = [
        record.record_type.as_str(),
        record.time_logged.as_str(),
        record.time_queued.as_str(),
        record.orig.as_str(),
        record.rcpt.as_str(),
        record.dsn_action.as_str(),
        record.dsn_status.as_str(),
        record.dsn_diag.as_str(),
        record.vmta.as_deref().unwrap_or(""),
        record.dlv_source_ip.as_deref().unwrap_or(""),
        record.bounce_cat.as_deref().unwrap_or(""),
        record.job_id.as_deref().unwrap_or(""),
        record.message_id.as_deref().unwrap_or(""),
        record.subject.as_deref().unwrap_or(""),
    ];
    known.iter().any(|value| contains(value, term))
        || record.extra.values().any(|value| contains(value, term))
}

fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<DeliveryRecord> {
        vec![
            DeliveryRecord {
                orig: "news@sender.io".to_string(),
                rcpt: "Alice@Example.com".to_string(),
                dsn_diag: "smtp;250 OK".to_string(),
                vmta: Some("vmta-east".to_string()),
                ..Default::default()
            },
            DeliveryRecord {
                orig: "promo@sender.io".to_string(),
                rcpt: "bob@other.net".to_string(),
                dsn_diag: "smtp;550 Invalid recipient".to_string(),
                dlv_source_ip: Some("10.0.0.1".to_string()),
                ..Default::default()
            },
        ]
    }

    #[test]
    fn test_empty_term_is_identity() {
        let records = records();
        for term in ["", "   "] {
            let query = SearchQuery { term: term.to_string(), field: SearchField::All };
            assert_eq!(search(&records, &query), records);
        }
    }

    #[test]
    fn test_recipient_search_is_case_insensitive() {
        let query = SearchQuery { term: "alice".to_string(), field: SearchField::Recipient };
        let hits = search(&records(), &query);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].rcpt, "Alice@Example.com");
    }

    #[test]
    fn test_vmta_search_uses_fallback_source() {
        // The second record has no vmta; its source IP stands in.
        let query = SearchQuery { term: "10.0.0".to_string(), field: SearchField::Vmta };
        assert_eq!(search(&records(), &query).len(), 1);
    }

    #[test]
    fn test_all_fields_search_preserves_order() {
        let query = SearchQuery { term: "sender.io".to_string(), field: SearchField::All };
        let hits = search(&records(), &query);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].rcpt, "Alice@Example.com");
        assert_eq!(hits[1].rcpt, "bob@other.net");
    }

    #[test]
    fn test_all_fields_search_reaches_extra_columns() {
        let mut record = DeliveryRecord::default();
        record.extra.insert("queueName".to_string(), "priority-queue".to_string());
        let query = SearchQuery { term: "priority".to_string(), field: SearchField::All };
        assert_eq!(search(&[record], &query).len(), 1);
    }

    #[test]
    fn test_no_match_yields_empty_not_error() {
        let query = SearchQuery { term: "zzz-no-such".to_string(), field: SearchField::All };
        assert!(search(&records(), &query).is_empty());
    }
}
