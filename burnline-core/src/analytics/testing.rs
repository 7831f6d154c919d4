//! Fixture builders for analytics unit tests.

use crate::analytics::reader::{AnalysisWindow, ContainerLog};
use crate::analytics::status::StatusClassifier;
use crate::types::*;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::{BTreeMap, BTreeSet};

pub const SPRINT_ID: &str = "sprint-1";

/// 2024-06-`day` at `hour`:00 UTC.
pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, day, hour, 0, 0).unwrap()
}

pub fn ids(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Builds a [`ContainerLog`] for sprint `sprint-1` by hand.
pub struct LogBuilder {
    window: AnalysisWindow,
    stories: BTreeMap<String, Story>,
    current: BTreeSet<String>,
    membership: Vec<ActivityRecord>,
    status: Vec<ActivityRecord>,
    next_id: i64,
}

impl LogBuilder {
    pub fn sprint(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            window: AnalysisWindow::new(start, end).unwrap(),
            stories: BTreeMap::new(),
            current: BTreeSet::new(),
            membership: Vec::new(),
            status: Vec::new(),
            next_id: 1,
        }
    }

    /// Statuses `backlog`, `todo`, `doing`, `paused`, `done`, `wontfix`.
    pub fn classifier() -> StatusClassifier {
        let status = |id: &str, category| Status {
            id: id.to_string(),
            name: id.to_string(),
            category,
        };
        StatusClassifier::new(vec![
            status("backlog", StatusCategory::Backlog),
            status("todo", StatusCategory::Unstarted),
            status("doing", StatusCategory::Started),
            status("paused", StatusCategory::Paused),
            status("done", StatusCategory::Completed),
            status("wontfix", StatusCategory::Cancelled),
        ])
    }

    fn story(&self, id: &str, status: &str, created_at: DateTime<Utc>, current: bool) -> Story {
        Story {
            id: id.to_string(),
            team_id: "team-1".to_string(),
            sequence_id: self.stories.len() as i64 + 1,
            title: format!("Story {}", id),
            status_id: status.to_string(),
            sprint_id: current.then(|| SPRINT_ID.to_string()),
            objective_id: None,
            created_at,
            deleted_at: None,
            archived_at: None,
        }
    }

    /// A current member created well before the window.
    pub fn member(self, id: &str, status: &str) -> Self {
        let created = self.window.start - Duration::days(30);
        self.member_created(id, status, created)
    }

    pub fn member_created(mut self, id: &str, status: &str, created_at: DateTime<Utc>) -> Self {
        let story = self.story(id, status, created_at, true);
        self.stories.insert(id.to_string(), story);
        self.current.insert(id.to_string());
        self
    }

    /// A story that is no longer in the container, created well before the window.
    pub fn former(self, id: &str, status: &str) -> Self {
        let created = self.window.start - Duration::days(30);
        self.former_created(id, status, created)
    }

    pub fn former_created(mut self, id: &str, status: &str, created_at: DateTime<Utc>) -> Self {
        let story = self.story(id, status, created_at, false);
        self.stories.insert(id.to_string(), story);
        self
    }

    fn record(
        &mut self,
        id: &str,
        field: TrackedField,
        old: Option<&str>,
        new: Option<&str>,
        changed_at: DateTime<Utc>,
    ) -> ActivityRecord {
        let record = ActivityRecord {
            id: self.next_id,
            story_id: id.to_string(),
            field,
            old_value: old.map(str::to_string),
            new_value: new.map(str::to_string),
            changed_at,
            activity_type: ActivityType::Updated,
        };
        self.next_id += 1;
        record
    }

    pub fn join(mut self, id: &str, changed_at: DateTime<Utc>) -> Self {
        let r = self.record(id, TrackedField::Sprint, None, Some(SPRINT_ID), changed_at);
        self.membership.push(r);
        self
    }

    pub fn leave(mut self, id: &str, changed_at: DateTime<Utc>) -> Self {
        let r = self.record(id, TrackedField::Sprint, Some(SPRINT_ID), None, changed_at);
        self.membership.push(r);
        self
    }

    pub fn status(
        mut self,
        id: &str,
        old: Option<&str>,
        new: Option<&str>,
        changed_at: DateTime<Utc>,
    ) -> Self {
        let r = self.record(id, TrackedField::Status, old, new, changed_at);
        self.status.push(r);
        self
    }

    pub fn build(mut self) -> ContainerLog {
        self.membership
            .sort_by(|a, b| a.changed_at.cmp(&b.changed_at).then(a.id.cmp(&b.id)));
        self.status
            .sort_by(|a, b| a.changed_at.cmp(&b.changed_at).then(a.id.cmp(&b.id)));
        ContainerLog {
            container: ContainerRef::Sprint(SPRINT_ID.to_string()),
            window: self.window,
            stories: self.stories,
            current_members: self.current,
            membership: self.membership,
            status: self.status,
        }
    }
}
