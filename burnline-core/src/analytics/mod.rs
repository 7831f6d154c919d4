//! Temporal analytics for burnline
//!
//! Rebuilds day-by-day history of a sprint or objective from current story
//! state plus the append-only activity log:
//! - Reading current members and the container's activity ([`reader`])
//! - Resolving status ids to categories ([`status`])
//! - Recovering the state at the window start by log inversion ([`reconstruct`])
//! - Bucketing later changes into daily deltas ([`delta`])
//! - Walking the window into burndown and progress series ([`series`])
//! - Scalar summaries and health ([`overview`]) and breakdowns ([`breakdown`])
//!
//! ## Pipeline
//!
//! ```text
//! AnalyticsSource ─▶ read_container_log ─▶ reconstruct_initial_state ─┐
//!                                      └─▶ aggregate_daily_deltas ────┴─▶ build_burndown / build_progress
//! ```
//!
//! Every stage after the reader is a pure function of its inputs and the
//! injected [`Clock`]. [`AnalyticsService`] wires the stages together and
//! runs the sprint breakdowns concurrently.

pub mod breakdown;
pub mod clock;
pub mod delta;
pub mod orchestrator;
pub mod overview;
pub mod quality;
pub mod reader;
pub mod reconstruct;
pub mod series;
pub mod source;
pub mod status;

#[cfg(test)]
mod testing;

pub use breakdown::{allocate_by_team, StoryBreakdown, TeamAllocation};
pub use clock::{Clock, FixedClock, SystemClock};
pub use delta::{aggregate_daily_deltas, DailyDeltas};
pub use orchestrator::{AnalyticsService, BurndownReport, ObjectiveProgress, SprintAnalytics};
pub use overview::{compute_overview, HealthStatus, Overview};
pub use quality::DataQuality;
pub use reader::{read_container_log, AnalysisWindow, ContainerLog};
pub use reconstruct::{reconstruct_initial_state, InitialState};
pub use series::{build_burndown, build_progress, date_series, BurndownPoint, ProgressPoint};
pub use source::AnalyticsSource;
pub use status::{Classified, StatusClassifier, StatusTransition};
