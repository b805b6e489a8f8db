//! Flow result reporting
//!
//! Every reconciliation flow returns a [`FlowSummary`]: what it processed,
//! what it wrote, and what it skipped, bucketed by reason. The driver turns
//! the summary into the operator-facing status line; the flow itself logs
//! its own structured completion entry.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Outcome counts for one flow run.
#[derive(Debug, Clone)]
pub struct FlowSummary {
    /// Human-readable flow name, e.g. "Products".
    pub flow: &'static str,

    /// When the flow started.
    pub started_at: DateTime<Utc>,

    /// Wall-clock duration of the run.
    pub duration: Duration,

    /// Source units considered after grouping and deduplication.
    pub processed: u64,

    /// Target-side entities created.
    pub created: u64,

    /// Target-side entities updated.
    pub updated: u64,

    /// Units skipped, keyed by reason.
    pub skipped: BTreeMap<&'static str, u64>,
}

impl FlowSummary {
    pub fn new(flow: &'static str) -> Self {
        Self {
            flow,
            started_at: Utc::now(),
            duration: Duration::from_secs(0),
            processed: 0,
            created: 0,
            updated: 0,
            skipped: BTreeMap::new(),
        }
    }

    /// Set the duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Add to a skip bucket. Zero counts are not recorded.
    pub fn record_skips(&mut self, reason: &'static str, count: u64) {
        if count > 0 {
            *self.skipped.entry(reason).or_insert(0) += count;
        }
    }

    /// Total units skipped across all reasons.
    pub fn skipped_total(&self) -> u64 {
        self.skipped.values().sum()
    }

    /// One-line rendering for the notification sink.
    pub fn status_line(&self) -> String {
        let mut line = format!(
            "{} sync: processed={} created={} updated={} skipped={}",
            self.flow,
            self.processed,
            self.created,
            self.updated,
            self.skipped_total()
        );
        if !self.skipped.is_empty() {
            let reasons = self
                .skipped
                .iter()
                .map(|(reason, count)| format!("{reason}={count}"))
                .collect::<Vec<_>>()
                .join(", ");
            line.push_str(&format!(" ({reasons})"));
        }
        line.push_str(&format!(" in {:.1}s", self.duration.as_secs_f64()));
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_skips_merges_buckets() {
        let mut summary = FlowSummary::new("Stock");
        summary.record_skips("negative", 2);
        summary.record_skips("negative", 1);
        summary.record_skips("duplicate", 4);
        summary.record_skips("empty_sku", 0);

        assert_eq!(summary.skipped.get("negative"), Some(&3));
        assert_eq!(summary.skipped.get("duplicate"), Some(&4));
        assert!(!summary.skipped.contains_key("empty_sku"));
        assert_eq!(summary.skipped_total(), 7);
    }

    #[test]
    fn test_status_line_without_skips() {
        let mut summary = FlowSummary::new("Products").with_duration(Duration::from_millis(2500));
        summary.processed = 10;
        summary.created = 2;
        summary.updated = 8;

        assert_eq!(
            summary.status_line(),
            "Products sync: processed=10 created=2 updated=8 skipped=0 in 2.5s"
        );
    }

    #[test]
    fn test_status_line_lists_skip_reasons() {
        let mut summary = FlowSummary::new("Prices").with_duration(Duration::from_secs(1));
        summary.processed = 5;
        summary.record_skips("missing", 2);
        summary.record_skips("invalid", 1);

        let line = summary.status_line();
        assert!(line.contains("skipped=3"));
        assert!(line.contains("(invalid=1, missing=2)"));
    }
}
