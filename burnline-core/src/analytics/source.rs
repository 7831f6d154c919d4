//! Data-source seam for the analytics engine.
//!
//! The engine never talks to storage directly; everything it reads comes
//! through [`AnalyticsSource`]. [`crate::db::Database`] is the production
//! implementation. Implementations are synchronous and may block on I/O; the
//! orchestrator moves calls onto blocking worker threads.

use crate::error::Result;
use crate::types::{ActivityRecord, ContainerRef, Objective, Sprint, Status, Story, Team};
use chrono::{DateTime, Utc};

/// Read-only access to current state and the activity log.
///
/// Failures are reported as errors and are fatal to the analytics request;
/// implementations own any retry policy.
pub trait AnalyticsSource: Send + Sync {
    /// Look up a sprint by id.
    fn fetch_sprint(&self, sprint_id: &str) -> Result<Option<Sprint>>;

    /// Look up an objective by id.
    fn fetch_objective(&self, objective_id: &str) -> Result<Option<Objective>>;

    /// Live (not deleted, not archived) stories currently in the container,
    /// including their current status.
    fn fetch_current_members(&self, container: &ContainerRef) -> Result<Vec<Story>>;

    /// Stories by id regardless of deletion or archive markers.
    fn fetch_stories(&self, story_ids: &[String]) -> Result<Vec<Story>>;

    /// Membership-field records whose old or new value is the container,
    /// with `since <= changed_at <= until`, ordered by `changed_at`.
    fn fetch_membership_log(
        &self,
        container: &ContainerRef,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<ActivityRecord>>;

    /// Status-field records for the given stories with
    /// `since <= changed_at <= until`, ordered by `changed_at`.
    fn fetch_status_log(
        &self,
        story_ids: &[String],
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<ActivityRecord>>;

    /// Every status currently defined, used to resolve status ids to categories.
    fn fetch_statuses(&self) -> Result<Vec<Status>>;

    /// Every team, used to label allocation breakdowns.
    fn fetch_teams(&self) -> Result<Vec<Team>>;
}
