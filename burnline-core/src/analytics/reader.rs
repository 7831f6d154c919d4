//! Activity log reader.
//!
//! Gathers everything one container's reconstruction needs in a single
//! pass over the data source: current members, the stories that ever
//! touched the container during the window, and their membership and
//! status transitions.

use crate::analytics::AnalyticsSource;
use crate::error::{Error, Result};
use crate::types::{ActivityRecord, ActivityType, ContainerRef, Story};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::{BTreeMap, BTreeSet};

/// The closed time range `[start, end]` being analyzed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl AnalysisWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end < start {
            return Err(Error::InvalidWindow(format!(
                "end {} is before start {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    /// A window of `days` calendar days ending on `now`'s date, starting at
    /// midnight UTC of the first day.
    pub fn trailing(now: DateTime<Utc>, days: u32) -> Result<Self> {
        if days == 0 {
            return Err(Error::InvalidWindow(
                "trailing window needs at least one day".to_string(),
            ));
        }
        let first_day = now.date_naive() - Duration::days(i64::from(days) - 1);
        let start = first_day
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| Error::InvalidWindow(format!("no midnight on {}", first_day)))?
            .and_utc();
        Self::new(start, now)
    }

    pub fn first_day(&self) -> NaiveDate {
        self.start.date_naive()
    }

    pub fn last_day(&self) -> NaiveDate {
        self.end.date_naive()
    }

    /// Number of calendar days covered, inclusive.
    pub fn day_count(&self) -> usize {
        (self.last_day() - self.first_day()).num_days() as usize + 1
    }

    /// Upper bound for log fetches.
    ///
    /// At least one day past the window end so same-day boundary changes are
    /// seen, and never earlier than `now`: inverting current state needs every
    /// change made since the window started.
    pub fn fetch_until(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        (self.end + Duration::days(1)).max(now)
    }
}

/// Current state and activity for one container.
#[derive(Debug, Clone)]
pub struct ContainerLog {
    pub container: ContainerRef,
    pub window: AnalysisWindow,
    /// Every story that is, or was during the window, in the container
    pub stories: BTreeMap<String, Story>,
    /// Ids of live stories currently in the container
    pub current_members: BTreeSet<String>,
    /// Membership-field transitions touching the container, oldest first
    pub membership: Vec<ActivityRecord>,
    /// Status transitions of `stories`, oldest first
    pub status: Vec<ActivityRecord>,
}

/// Read the current state and activity log for `container` over `window`.
pub fn read_container_log<S: AnalyticsSource + ?Sized>(
    source: &S,
    container: &ContainerRef,
    window: &AnalysisWindow,
    now: DateTime<Utc>,
) -> Result<ContainerLog> {
    let since = window.start;
    let until = window.fetch_until(now);

    let members = source.fetch_current_members(container)?;
    let mut membership = source.fetch_membership_log(container, since, until)?;

    let current_members: BTreeSet<String> = members.iter().map(|s| s.id.clone()).collect();
    let mut stories: BTreeMap<String, Story> =
        members.into_iter().map(|s| (s.id.clone(), s)).collect();

    // Stories that left (or joined and left) are no longer current members
    let former: Vec<String> = membership
        .iter()
        .map(|r| r.story_id.clone())
        .filter(|id| !stories.contains_key(id))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if !former.is_empty() {
        for story in source.fetch_stories(&former)? {
            stories.insert(story.id.clone(), story);
        }
    }

    // A story created directly in the container logs no join. When one was
    // created inside the window, its first logged move (if any) is a leave;
    // treat its creation as the join.
    let container_id = container.id();
    let mut first_move: BTreeMap<&str, bool> = BTreeMap::new();
    for record in membership.iter().filter(|r| r.changed_at >= since) {
        let joined = record.joins(container_id);
        if joined || record.leaves(container_id) {
            first_move.entry(record.story_id.as_str()).or_insert(joined);
        }
    }
    let implicit: Vec<ActivityRecord> = stories
        .values()
        .filter(|story| story.created_at >= since)
        .filter(|story| match first_move.get(story.id.as_str()) {
            Some(&joined) => !joined,
            None => current_members.contains(&story.id),
        })
        .map(|story| ActivityRecord {
            id: 0,
            story_id: story.id.clone(),
            field: container.membership_field(),
            old_value: None,
            new_value: Some(container_id.to_string()),
            changed_at: story.created_at,
            activity_type: ActivityType::Created,
        })
        .collect();
    if !implicit.is_empty() {
        tracing::debug!(
            container = %container,
            count = implicit.len(),
            "Synthesized joins for stories created in the container"
        );
        membership.extend(implicit);
    }
    membership.sort_by(|a, b| a.changed_at.cmp(&b.changed_at).then(a.id.cmp(&b.id)));

    let universe: Vec<String> = stories.keys().cloned().collect();
    let mut status = source.fetch_status_log(&universe, since, until)?;
    status.sort_by(|a, b| a.changed_at.cmp(&b.changed_at).then(a.id.cmp(&b.id)));

    tracing::debug!(
        container = %container,
        current = current_members.len(),
        universe = stories.len(),
        membership_records = membership.len(),
        status_records = status.len(),
        "Read container activity log"
    );

    Ok(ContainerLog {
        container: container.clone(),
        window: *window,
        stories,
        current_members,
        membership,
        status,
    })
}
