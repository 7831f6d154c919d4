//! Time-series builder.
//!
//! Walks the window one calendar day at a time, starting from the
//! reconstructed initial state and applying each day's deltas. Each point is
//! the state at the end of its day.
//!
//! Completion deltas are applied only for days up to and including today;
//! later days carry the last known value forward. Scope deltas are always
//! applied, since stories can be scheduled into future days of a sprint.

use crate::analytics::delta::DailyDeltas;
use crate::analytics::quality::DataQuality;
use crate::analytics::reader::AnalysisWindow;
use crate::analytics::reconstruct::InitialState;
use chrono::{Duration, NaiveDate};
use serde::Serialize;

/// One day of a sprint burndown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BurndownPoint {
    pub date: NaiveDate,
    /// Stories in scope and not completed
    pub remaining: i64,
    /// Straight-line target from the day's scope to zero on the last day
    pub ideal: i64,
}

/// One day of an objective progress chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressPoint {
    pub date: NaiveDate,
    pub completed: i64,
    pub in_progress: i64,
    pub total: i64,
}

/// Every calendar day from `first` to `last`, inclusive and ascending.
///
/// Empty when `last` precedes `first`.
pub fn date_series(first: NaiveDate, last: NaiveDate) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut day = first;
    while day <= last {
        days.push(day);
        day += Duration::days(1);
    }
    days
}

/// Linear projection of `scope` to zero over `n` days, evaluated at day `i`.
fn ideal_remaining(scope: i64, i: usize, n: usize) -> i64 {
    if n <= 1 || i == 0 {
        return scope.max(0);
    }
    let fraction = (n - i - 1) as f64 / (n - 1) as f64;
    ((scope as f64) * fraction).round().max(0.0) as i64
}

/// Clamp `value` into `[0, ceiling]`, recording a data-quality event when it was out of range.
fn clamp(
    value: i64,
    ceiling: i64,
    day: NaiveDate,
    metric: &'static str,
    quality: &mut DataQuality,
) -> i64 {
    if value < 0 || value > ceiling {
        quality.record_clamp(day, metric, value);
    }
    value.clamp(0, ceiling.max(0))
}

/// Running scope and category counts across the window.
struct Walk<'a> {
    deltas: &'a DailyDeltas,
    today: NaiveDate,
    total: i64,
    completed: i64,
    in_progress: i64,
}

impl<'a> Walk<'a> {
    fn new(initial: &InitialState, deltas: &'a DailyDeltas, today: NaiveDate) -> Self {
        Self {
            deltas,
            today,
            total: initial.scope(),
            completed: initial.completed_count(),
            in_progress: initial.started_count(),
        }
    }

    fn advance(&mut self, day: NaiveDate) {
        self.total += self.deltas.scope_on(day);
        if day <= self.today {
            self.completed += self.deltas.completion_on(day);
            self.in_progress += self.deltas.in_progress_on(day);
        }
    }
}

/// Build a sprint burndown over `window`.
pub fn build_burndown(
    initial: &InitialState,
    deltas: &DailyDeltas,
    window: &AnalysisWindow,
    today: NaiveDate,
    quality: &mut DataQuality,
) -> Vec<BurndownPoint> {
    let days = date_series(window.first_day(), window.last_day());
    let n = days.len();
    let mut walk = Walk::new(initial, deltas, today);

    days.into_iter()
        .enumerate()
        .map(|(i, date)| {
            walk.advance(date);
            let total = clamp(walk.total, i64::MAX, date, "total", quality);
            let remaining = clamp(walk.total - walk.completed, total, date, "remaining", quality);
            // The line starts from the scope at the start instant
            let base = if i == 0 { initial.scope() } else { total };
            BurndownPoint {
                date,
                remaining,
                ideal: ideal_remaining(base, i, n),
            }
        })
        .collect()
}

/// Build an objective progress chart over `window`.
pub fn build_progress(
    initial: &InitialState,
    deltas: &DailyDeltas,
    window: &AnalysisWindow,
    today: NaiveDate,
    quality: &mut DataQuality,
) -> Vec<ProgressPoint> {
    let days = date_series(window.first_day(), window.last_day());
    let mut walk = Walk::new(initial, deltas, today);

    days.into_iter()
        .map(|date| {
            walk.advance(date);
            let total = clamp(walk.total, i64::MAX, date, "total", quality);
            let completed = clamp(walk.completed, total, date, "completed", quality);
            let in_progress = clamp(
                walk.in_progress,
                total - completed,
                date,
                "in_progress",
                quality,
            );
            ProgressPoint {
                date,
                completed,
                in_progress,
                total,
            }
        })
        .collect()
}
