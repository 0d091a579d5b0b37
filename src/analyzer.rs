//! Aggregation Engine Module
//!
//! Reduces a record sequence to an `AnalysisResult` in a single pass:
//! overview counts and rates, per-VMTA performance, status and
//! bounce-category breakdowns, an hourly time series, and bounded top-N
//! recipient/sender rankings. Pure function of its input; empty input
//! yields the identity result, never an error.
//!
//! Records whose `timeLogged` does not parse are omitted from the time
//! series only; they still count toward every other aggregate.

use crate::classifier::classify;
use crate::models::{
    AddressCount, AnalysisResult, DeliveryRecord, DeliveryStatus, Overview, TimeBucket, VmtaStats,
};
use std::collections::{BTreeMap, HashMap};

/// Bounded length of the top-recipient and top-sender rankings.
pub const TOP_LIST_CAP: usize = 10;

/// Computes the full analysis summary for a record sequence.
pub fn analyze(records: &[DeliveryRecord]) -> AnalysisResult {
    let mut overview = Overview::default();
    let mut vmta_performance: BTreeMap<String, VmtaStats> = BTreeMap::new();
    let mut status_breakdown: BTreeMap<String, u64> = BTreeMap::new();
    let mut bounce_analysis: BTreeMap<String, u64> = BTreeMap::new();
    let mut buckets: BTreeMap<String, TimeBucket> = BTreeMap::new();
    let mut recipients: HashMap<String, u64> = HashMap::new();
    let mut senders: HashMap<String, u64> = HashMap::new();

    for record in records {
        let status = classify(record);

        overview.total += 1;
        match status {
            DeliveryStatus::Delivered => overview.delivered += 1,
            DeliveryStatus::Failed => overview.failed += 1,
            DeliveryStatus::Queued => overview.queued += 1,
            DeliveryStatus::Delayed => overview.deferred += 1,
            DeliveryStatus::Expanded | DeliveryStatus::Other(_) => overview.other += 1,
        }

        *status_breakdown.entry(status.to_string()).or_insert(0) += 1;

        let source = vmta_performance
            .entry(record.sending_source().to_string())
            .or_default();
        source.total += 1;
        match status {
            DeliveryStatus::Delivered => source.delivered += 1,
            DeliveryStatus::Failed => source.failed += 1,
            _ => {}
        }

        if status == DeliveryStatus::Failed {
            *bounce_analysis
                .entry(record.bounce_category().to_string())
                .or_insert(0) += 1;
        }

        if let Some(logged) = record.logged_at() {
            // The key format sorts lexicographically in chronological order.
            let key = logged.format("%Y-%m-%d %H:00").to_string();
            let bucket = buckets.entry(key.clone()).or_insert_with(|| TimeBucket {
                bucket: key,
                ..Default::default()
            });
            bucket.total += 1;
            match status {
                DeliveryStatus::Delivered => bucket.delivered += 1,
                DeliveryStatus::Failed => bucket.failed += 1,
                _ => {}
            }
        }

        if !record.rcpt.is_empty() {
            *recipients.entry(record.rcpt.clone()).or_insert(0) += 1;
        }
        if !record.orig.is_empty() {
            *senders.entry(record.orig.clone()).or_insert(0) += 1;
        }
    }

    overview.delivery_rate = rate(overview.delivered, overview.total);
    overview.failure_rate = rate(overview.failed, overview.total);
    overview.queued_rate = rate(overview.queued, overview.total);
    overview.deferred_rate = rate(overview.deferred, overview.total);

    for stats in vmta_performance.values_mut() {
        stats.delivery_rate = rate(stats.delivered, stats.total);
    }

    AnalysisResult {
        overview,
        vmta_performance,
        status_breakdown,
        bounce_analysis,
        time_series: buckets.into_values().collect(),
        top_recipients: top_n(recipients, TOP_LIST_CAP),
        top_senders: top_n(senders, TOP_LIST_CAP),
    }
}

fn rate(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

// Descending by count, ties broken by ascending address so repeated runs agree.
fn top_n(counts: HashMap<String, u64>, cap: usize) -> Vec<AddressCount> {
    let mut ranking: Vec<AddressCount> = counts
        .into_iter()
        .map(|(address, count)| AddressCount { address, count })
        .collect();
    ranking.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.address.cmp(&b.address)));
    ranking.truncate(cap);
    ranking
}
