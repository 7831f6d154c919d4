//! Data-quality signals raised while reconstructing history.
//!
//! Neither signal is an error. Unresolved statuses are treated as no-op
//! transitions, and negative counts are clamped to zero, but both mean the
//! stored state and the activity log disagree, so they are counted here and
//! logged.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// Counters for log/state inconsistencies seen during one computation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DataQuality {
    /// Status ids found in the log that no longer resolve, with occurrence counts
    pub unresolved_statuses: BTreeMap<String, usize>,
    /// Number of series values that would have gone negative (or exceeded total)
    pub clamp_events: usize,
}

impl DataQuality {
    /// Note a status id that could not be resolved to a category.
    pub fn record_unresolved(&mut self, story_id: &str, status_id: &str) {
        tracing::warn!(story_id, status_id, "Unresolved status in activity log");
        *self
            .unresolved_statuses
            .entry(status_id.to_string())
            .or_insert(0) += 1;
    }

    /// Note a value clamped into range. `raw` is the value before clamping.
    pub fn record_clamp(&mut self, date: NaiveDate, metric: &'static str, raw: i64) {
        tracing::warn!(
            %date,
            metric,
            raw,
            "Clamped reconstructed count; activity log and current state disagree"
        );
        self.clamp_events += 1;
    }

    /// Fold another computation's counters into this one.
    pub fn merge(&mut self, other: &DataQuality) {
        for (status_id, count) in &other.unresolved_statuses {
            *self
                .unresolved_statuses
                .entry(status_id.clone())
                .or_insert(0) += count;
        }
        self.clamp_events += other.clamp_events;
    }

    /// True when nothing suspicious was seen.
    pub fn is_clean(&self) -> bool {
        self.unresolved_statuses.is_empty() && self.clamp_events == 0
    }

    /// Total number of unresolved status occurrences.
    pub fn unresolved_count(&self) -> usize {
        self.unresolved_statuses.values().sum()
    }
}
