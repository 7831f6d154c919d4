//! Initial-state reconstruction by event-log inversion.
//!
//! Only current state is stored, so the state at the window start is
//! recovered by undoing every logged change made since then:
//!
//! ```text
//! M0 = current_members − joined_since(start) ∪ left_since(start)
//! C0 = {e ∈ M0 : currently completed} − became_completed_since(start)
//!                                     ∪ left_completed_since(start)
//! ```
//!
//! "Joined since" and "left since" are decided per story by its *first*
//! transition at or after the start instant. A story that joined and then
//! left is therefore correctly absent from `M0`, and one that left and
//! rejoined is correctly present.

use crate::analytics::reader::ContainerLog;
use crate::analytics::status::StatusClassifier;
use crate::types::StatusCategory;
use std::collections::{BTreeMap, BTreeSet};

/// Membership and category subsets at the window start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitialState {
    /// Stories in the container at the start instant
    pub members: BTreeSet<String>,
    /// Members that were completed at the start instant
    pub completed: BTreeSet<String>,
    /// Members that were in a started category at the start instant
    pub started: BTreeSet<String>,
}

impl InitialState {
    pub fn scope(&self) -> i64 {
        self.members.len() as i64
    }

    pub fn completed_count(&self) -> i64 {
        self.completed.len() as i64
    }

    pub fn started_count(&self) -> i64 {
        self.started.len() as i64
    }
}

/// Reconstruct membership and completion at `log.window.start`.
pub fn reconstruct_initial_state(
    log: &ContainerLog,
    classifier: &StatusClassifier,
) -> InitialState {
    let members = members_at_start(log);
    let completed = category_subset_at_start(log, classifier, &members, |c| c.is_done());
    let started =
        category_subset_at_start(log, classifier, &members, |c| c == StatusCategory::Started);

    tracing::debug!(
        container = %log.container,
        current = log.current_members.len(),
        members = members.len(),
        completed = completed.len(),
        started = started.len(),
        "Reconstructed initial state"
    );

    InitialState {
        members,
        completed,
        started,
    }
}

fn members_at_start(log: &ContainerLog) -> BTreeSet<String> {
    let start = log.window.start;
    let container_id = log.container.id();

    // First post-start membership transition per story (records are oldest first)
    let mut first: BTreeMap<&str, bool> = BTreeMap::new();
    for record in log.membership.iter().filter(|r| r.changed_at >= start) {
        let joined = record.joins(container_id);
        if !joined && !record.leaves(container_id) {
            continue;
        }
        first.entry(record.story_id.as_str()).or_insert(joined);
    }

    let joined_since: BTreeSet<&str> = first
        .iter()
        .filter(|&(_, &joined)| joined)
        .map(|(&id, _)| id)
        .collect();
    let left_since: BTreeSet<&str> = first
        .iter()
        .filter(|&(_, &joined)| !joined)
        .map(|(&id, _)| id)
        .collect();

    let mut members: BTreeSet<String> = log
        .current_members
        .iter()
        .filter(|id| !joined_since.contains(id.as_str()))
        .cloned()
        .collect();
    members.extend(left_since.iter().map(|id| id.to_string()));

    // Creation time wins over any stray log record
    members.retain(|id| match log.stories.get(id) {
        Some(story) => story.created_at <= start,
        None => true,
    });

    members
}

fn category_subset_at_start(
    log: &ContainerLog,
    classifier: &StatusClassifier,
    members: &BTreeSet<String>,
    pred: impl Fn(StatusCategory) -> bool,
) -> BTreeSet<String> {
    let start = log.window.start;

    // Category each story held just before its first resolvable post-start change
    let mut before_first_change: BTreeMap<&str, bool> = BTreeMap::new();
    for record in log.status.iter().filter(|r| r.changed_at >= start) {
        if !members.contains(&record.story_id) {
            continue;
        }
        if let Ok(transition) = classifier.transition(record) {
            before_first_change
                .entry(record.story_id.as_str())
                .or_insert_with(|| transition.from.map(&pred).unwrap_or(false));
        }
    }

    members
        .iter()
        .filter(|id| match before_first_change.get(id.as_str()) {
            Some(&held) => held,
            None => log
                .stories
                .get(*id)
                .and_then(|story| classifier.resolve(&story.status_id))
                .map(&pred)
                .unwrap_or(false),
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::testing::{at, ids, LogBuilder};

    #[test]
    fn test_no_activity_means_current_state() {
        let log = LogBuilder::sprint(at(1, 0), at(5, 0))
            .member("a", "todo")
            .member("b", "done")
            .member("c", "doing")
            .build();

        let state = reconstruct_initial_state(&log, &LogBuilder::classifier());
        assert_eq!(state.scope(), 3);
        assert_eq!(state.completed, ids(&["b"]));
        assert_eq!(state.started, ids(&["c"]));
    }

    #[test]
    fn test_joined_after_start_is_removed() {
        let log = LogBuilder::sprint(at(1, 0), at(5, 0))
            .member("a", "todo")
            .member("late", "todo")
            .join("late", at(3, 10))
            .build();

        let state = reconstruct_initial_state(&log, &LogBuilder::classifier());
        assert_eq!(state.members, ids(&["a"]));
    }

    #[test]
    fn test_left_after_start_is_restored() {
        let log = LogBuilder::sprint(at(1, 0), at(5, 0))
            .member("a", "todo")
            .former("gone", "todo")
            .leave("gone", at(2, 12))
            .build();

        let state = reconstruct_initial_state(&log, &LogBuilder::classifier());
        assert_eq!(state.scope(), 2);
        assert!(state.members.contains("gone"));
    }

    #[test]
    fn test_join_then_leave_is_net_zero() {
        let log = LogBuilder::sprint(at(1, 0), at(5, 0))
            .member("a", "todo")
            .former("blip", "todo")
            .join("blip", at(2, 9))
            .leave("blip", at(2, 15))
            .build();

        let state = reconstruct_initial_state(&log, &LogBuilder::classifier());
        assert_eq!(state.members, ids(&["a"]));
    }

    #[test]
    fn test_leave_then_rejoin_was_member() {
        let log = LogBuilder::sprint(at(1, 0), at(5, 0))
            .member("a", "todo")
            .leave("a", at(2, 9))
            .join("a", at(3, 9))
            .build();

        let state = reconstruct_initial_state(&log, &LogBuilder::classifier());
        assert_eq!(state.members, ids(&["a"]));
    }

    #[test]
    fn test_created_after_start_never_in_initial_scope() {
        let log = LogBuilder::sprint(at(1, 0), at(5, 0))
            .member("a", "todo")
            .former_created("ghost", "todo", at(3, 0))
            // Stray record claims it left, which would normally restore it
            .leave("ghost", at(4, 0))
            .build();

        let state = reconstruct_initial_state(&log, &LogBuilder::classifier());
        assert_eq!(state.members, ids(&["a"]));
    }

    #[test]
    fn test_membership_before_start_is_ignored() {
        let log = LogBuilder::sprint(at(2, 0), at(5, 0))
            .member("a", "todo")
            .join("a", at(1, 12))
            .build();

        let state = reconstruct_initial_state(&log, &LogBuilder::classifier());
        assert_eq!(state.scope(), 1);
    }

    #[test]
    fn test_completion_inverted() {
        let log = LogBuilder::sprint(at(1, 0), at(5, 0))
            // Completed during the window: was not done at the start
            .member("finished", "done")
            .status("finished", Some("doing"), Some("done"), at(3, 0))
            // Reopened during the window: was done at the start
            .member("reopened", "doing")
            .status("reopened", Some("done"), Some("doing"), at(2, 0))
            // Completed before the window
            .member("old", "done")
            .build();

        let state = reconstruct_initial_state(&log, &LogBuilder::classifier());
        assert_eq!(
            state.completed,
            ids(&["old", "reopened"])
        );
        assert_eq!(state.started, ids(&["finished"]));
    }

    #[test]
    fn test_unresolved_first_change_falls_through_to_next() {
        let log = LogBuilder::sprint(at(1, 0), at(5, 0))
            .member("a", "done")
            .status("a", Some("deleted-status"), Some("doing"), at(2, 0))
            .status("a", Some("doing"), Some("done"), at(3, 0))
            .build();

        let state = reconstruct_initial_state(&log, &LogBuilder::classifier());
        assert!(state.completed.is_empty());
    }

    #[test]
    fn test_completion_only_counted_for_initial_members() {
        let log = LogBuilder::sprint(at(1, 0), at(5, 0))
            .member("late", "done")
            .join("late", at(2, 0))
            .build();

        let state = reconstruct_initial_state(&log, &LogBuilder::classifier());
        assert!(state.members.is_empty());
        assert!(state.completed.is_empty());
    }
}
