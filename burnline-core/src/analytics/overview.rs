//! Scalar sprint summary and health heuristic.
//!
//! Health compares work progress (completion percentage) with time progress
//! (elapsed share of the sprint). It is a UX signal for dashboards and makes
//! no promise about whether a sprint will actually finish.

use crate::analytics::breakdown::StoryBreakdown;
use crate::config::HealthThresholds;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Coarse sprint health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// The sprint has ended
    Completed,
    /// The sprint has not begun
    NotStarted,
    Behind,
    AtRisk,
    OnTrack,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Completed => "completed",
            HealthStatus::NotStarted => "not_started",
            HealthStatus::Behind => "behind",
            HealthStatus::AtRisk => "at_risk",
            HealthStatus::OnTrack => "on_track",
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Summary metrics for a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Overview {
    /// Completed share of current stories, floored to a whole percent
    pub completion_pct: i64,
    pub days_elapsed: i64,
    pub days_remaining: i64,
    pub total_days: i64,
    pub status: HealthStatus,
}

/// Whole days in `to - from`, floored, never negative.
fn whole_days(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    ((to - from).num_hours() / 24).max(0)
}

/// Compute the overview of a container running from `start` to `end`, as seen at `now`.
pub fn compute_overview(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    now: DateTime<Utc>,
    breakdown: &StoryBreakdown,
    thresholds: &HealthThresholds,
) -> Overview {
    let completion_pct = if breakdown.total == 0 {
        0
    } else {
        breakdown.completed * 100 / breakdown.total
    };
    let days_elapsed = whole_days(start, now);
    let days_remaining = whole_days(now, end);
    let total_days = whole_days(start, end);

    let status = if now > end {
        HealthStatus::Completed
    } else if now < start {
        HealthStatus::NotStarted
    } else {
        // A sprint shorter than a day is entirely elapsed once it starts
        let time_progress = if total_days == 0 {
            1.0
        } else {
            days_elapsed as f64 / total_days as f64
        };
        let work_progress = completion_pct as f64 / 100.0;

        if work_progress < time_progress - thresholds.behind_margin {
            HealthStatus::Behind
        } else if work_progress < time_progress - thresholds.at_risk_margin {
            HealthStatus::AtRisk
        } else {
            HealthStatus::OnTrack
        }
    };

    Overview {
        completion_pct,
        days_elapsed,
        days_remaining,
        total_days,
        status,
    }
}
