//! Daily delta aggregation.
//!
//! Buckets every post-start log record into signed per-day deltas. Records
//! on the same day are summed; only the net effect per day is observable in
//! a once-per-day series, so intra-day order is not reconstructed.

use crate::analytics::quality::DataQuality;
use crate::analytics::reader::ContainerLog;
use crate::analytics::status::StatusClassifier;
use crate::types::StatusCategory;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Net daily changes keyed by calendar day (UTC).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DailyDeltas {
    /// Joins minus leaves
    pub scope: BTreeMap<NaiveDate, i64>,
    /// Became completed minus left completed
    pub completion: BTreeMap<NaiveDate, i64>,
    /// Became started minus left started
    pub in_progress: BTreeMap<NaiveDate, i64>,
}

impl DailyDeltas {
    pub fn scope_on(&self, day: NaiveDate) -> i64 {
        self.scope.get(&day).copied().unwrap_or(0)
    }

    pub fn completion_on(&self, day: NaiveDate) -> i64 {
        self.completion.get(&day).copied().unwrap_or(0)
    }

    pub fn in_progress_on(&self, day: NaiveDate) -> i64 {
        self.in_progress.get(&day).copied().unwrap_or(0)
    }
}

fn bump(map: &mut BTreeMap<NaiveDate, i64>, day: NaiveDate, delta: i64) {
    if delta != 0 {
        *map.entry(day).or_insert(0) += delta;
    }
}

/// Aggregate membership and status records into per-day deltas.
///
/// Status records whose old or new id no longer resolves are skipped and
/// counted in `quality`.
pub fn aggregate_daily_deltas(
    log: &ContainerLog,
    classifier: &StatusClassifier,
    quality: &mut DataQuality,
) -> DailyDeltas {
    let start = log.window.start;
    let container_id = log.container.id();
    let mut deltas = DailyDeltas::default();

    for record in log.membership.iter().filter(|r| r.changed_at >= start) {
        let delta = if record.joins(container_id) {
            1
        } else if record.leaves(container_id) {
            -1
        } else {
            0
        };
        bump(&mut deltas.scope, record.day(), delta);
    }

    for record in log.status.iter().filter(|r| r.changed_at >= start) {
        let transition = match classifier.transition(record) {
            Ok(transition) => transition,
            Err(status_id) => {
                quality.record_unresolved(&record.story_id, status_id);
                continue;
            }
        };

        let done = |c: StatusCategory| c.is_done();
        let started = |c: StatusCategory| c == StatusCategory::Started;

        let completion = i64::from(transition.entered(done)) - i64::from(transition.exited(done));
        let in_progress =
            i64::from(transition.entered(started)) - i64::from(transition.exited(started));

        bump(&mut deltas.completion, record.day(), completion);
        bump(&mut deltas.in_progress, record.day(), in_progress);
    }

    tracing::debug!(
        container = %log.container,
        scope_days = deltas.scope.len(),
        completion_days = deltas.completion.len(),
        "Aggregated daily deltas"
    );

    deltas
}
