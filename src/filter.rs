//! Filter Engine Module
//!
//! Conjunctive filtering of the record sequence by status, sending source,
//! bounce category and logged-time range. Order-preserving; default criteria
//! are the identity. The status criterion is evaluated through the
//! classifier, so filter results always agree with displayed status labels.

use crate::classifier::classify;
use crate::models::{DeliveryRecord, FilterCriteria};
use std::collections::BTreeSet;

/// Returns the records matching every non-empty criterion, preserving
/// source order. A criterion naming an unobserved value matches nothing;
/// it never errors.
pub fn filter(records: &[DeliveryRecord], criteria: &FilterCriteria) -> Vec<DeliveryRecord> {
    records
        .iter()
        .filter(|record| matches_criteria(record, criteria))
        .cloned()
        .collect()
}

fn matches_criteria(record: &DeliveryRecord, criteria: &FilterCriteria) -> bool {
    if let Some(status) = &criteria.status {
        if classify(record) != *status {
            return false;
        }
    }
    if let Some(vmta) = &criteria.vmta {
        if record.sending_source() != vmta {
            return false;
        }
    }
    if let Some(category) = &criteria.bounce_category {
        if record.bounce_category() != category {
            return false;
        }
    }
    if let Some(range) = &criteria.date_range {
        // Closed interval; records without a parseable timestamp are
        // excluded while a date filter is active.
        match record.logged_at() {
            Some(logged) => {
                if logged < range.start || logged > range.end {
                    return false;
                }
            }
            None => return false,
        }
    }
    true
}

/// Distinct classified status labels observed in the record set, sorted.
/// Filter criteria are built from observed values.
pub fn distinct_statuses(records: &[DeliveryRecord]) -> BTreeSet<String> {
    records.iter().map(|r| classify(r).to_string()).collect()
}

/// Distinct sending sources (after the vmta fallback chain), sorted.
pub fn distinct_vmtas(records: &[DeliveryRecord]) -> BTreeSet<String> {
    records.iter().map(|r| r.sending_source().to_string()).collect()
}

/// Distinct bounce categories (after the "unknown" fallback), sorted.
pub fn distinct_bounce_categories(records: &[DeliveryRecord]) -> BTreeSet<String> {
    records.iter().map(|r| r.bounce_category().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{parse_log_timestamp, DateRange, DeliveryStatus};

    fn records() -> Vec<DeliveryRecord> {
        vec![
            DeliveryRecord {
                time_logged: "2024-01-15 10:30:45+0000".to_string(),
                dsn_action: "relayed".to_string(),
                dsn_status: "2.0.0".to_string(),
                vmta: Some("vmta-1".to_string()),
                ..Default::default()
            },
            DeliveryRecord {
                time_logged: "2024-01-15 14:02:10+0000".to_string(),
                dsn_action: "bounced".to_string(),
                bounce_cat: Some("bad-mailbox".to_string()),
                vmta: Some("vmta-2".to_string()),
                ..Default::default()
            },
            DeliveryRecord {
                time_logged: "garbled".to_string(),
                dsn_action: "bounced".to_string(),
                vmta: Some("vmta-2".to_string()),
                ..Default::default()
            },
        ]
    }

    #[test]
    fn test_default_criteria_is_identity() {
        let records = records();
        assert_eq!(filter(&records, &FilterCriteria::default()), records);
    }

    #[test]
    fn test_status_criterion_agrees_with_classifier() {
        let criteria = FilterCriteria {
            status: Some(DeliveryStatus::Failed),
            ..Default::default()
        };
        let hits = filter(&records(), &criteria);
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|r| classify(r) == DeliveryStatus::Failed));
    }

    #[test]
    fn test_criteria_are_conjunctive() {
        let criteria = FilterCriteria {
            status: Some(DeliveryStatus::Failed),
            bounce_category: Some("bad-mailbox".to_string()),
            ..Default::default()
        };
        let hits = filter(&records(), &criteria);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].vmta, Some("vmta-2".to_string()));
    }

    #[test]
    fn test_date_range_is_a_closed_interval() {
        let range = DateRange {
            start: parse_log_timestamp("2024-01-15 10:30:45+0000").unwrap(),
            end: parse_log_timestamp("2024-01-15 14:02:10+0000").unwrap(),
        };
        let criteria = FilterCriteria { date_range: Some(range), ..Default::default() };
        // Both endpoint records match; the garbled-timestamp record is excluded.
        assert_eq!(filter(&records(), &criteria).len(), 2);
    }

    #[test]
    fn test_date_filter_excludes_unparseable_timestamps() {
        let range = DateRange {
            start: parse_log_timestamp("2000-01-01 00:00:00+0000").unwrap(),
            end: parse_log_timestamp("2100-01-01 00:00:00+0000").unwrap(),
        };
        let criteria = FilterCriteria { date_range: Some(range), ..Default::default() };
        let hits = filter(&records(), &criteria);
        assert!(hits.iter().all(|r| r.logged_at().is_some()));
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_unobserved_value_matches_nothing() {
        let criteria = FilterCriteria {
            vmta: Some("no-such-vmta".to_string()),
            ..Default::default()
        };
        assert!(filter(&records(), &criteria).is_empty());
    }

    #[test]
    fn test_filter_is_monotone() {
        let records = records();
        let criteria = FilterCriteria {
            vmta: Some("vmta-2".to_string()),
            ..Default::default()
        };
        assert!(filter(&records, &criteria).len() <= records.len());
    }

    #[test]
    fn test_distinct_value_helpers() {
        let records = records();
        let statuses: Vec<String> = distinct_statuses(&records).into_iter().collect();
        assert_eq!(statuses, vec!["Delivered".to_string(), "Failed".to_string()]);

        let vmtas: Vec<String> = distinct_vmtas(&records).into_iter().collect();
        assert_eq!(vmtas, vec!["vmta-1".to_string(), "vmta-2".to_string()]);

        let categories: Vec<String> = distinct_bounce_categories(&records).into_iter().collect();
        assert_eq!(categories, vec!["bad-mailbox".to_string(), "unknown".to_string()]);
    }
}
