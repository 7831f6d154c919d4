//! Category and team breakdowns of a container's current stories.

use crate::analytics::status::StatusClassifier;
use crate::types::{StatusCategory, Story, Team};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Count of current stories per status category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoryBreakdown {
    pub total: i64,
    pub backlog: i64,
    pub unstarted: i64,
    pub started: i64,
    pub paused: i64,
    pub completed: i64,
    pub cancelled: i64,
    /// Stories whose status id no longer resolves
    pub unresolved: i64,
}

impl StoryBreakdown {
    /// Tally `stories` by the category of their current status.
    pub fn tally<'a>(
        stories: impl IntoIterator<Item = &'a Story>,
        classifier: &StatusClassifier,
    ) -> Self {
        let mut breakdown = Self::default();
        for story in stories {
            breakdown.add(classifier.resolve(&story.status_id));
        }
        breakdown
    }

    fn add(&mut self, category: Option<StatusCategory>) {
        self.total += 1;
        let slot = match category {
            Some(StatusCategory::Backlog) => &mut self.backlog,
            Some(StatusCategory::Unstarted) => &mut self.unstarted,
            Some(StatusCategory::Started) => &mut self.started,
            Some(StatusCategory::Paused) => &mut self.paused,
            Some(StatusCategory::Completed) => &mut self.completed,
            Some(StatusCategory::Cancelled) => &mut self.cancelled,
            None => &mut self.unresolved,
        };
        *slot += 1;
    }

    /// Stories that are started or paused.
    pub fn in_progress(&self) -> i64 {
        self.started + self.paused
    }
}

/// Story counts for one team within a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamAllocation {
    pub team_id: String,
    /// Falls back to the team id when the team is unknown
    pub team_name: String,
    pub story_count: i64,
    pub completed_count: i64,
    pub in_progress_count: i64,
    /// Share of the container's stories, floored to a whole percent
    pub share_pct: i64,
}

/// Group `stories` by owning team, largest allocation first.
pub fn allocate_by_team(
    stories: &[Story],
    teams: &[Team],
    classifier: &StatusClassifier,
) -> Vec<TeamAllocation> {
    let names: HashMap<&str, &str> = teams
        .iter()
        .map(|t| (t.id.as_str(), t.name.as_str()))
        .collect();

    let mut by_team: BTreeMap<&str, StoryBreakdown> = BTreeMap::new();
    for story in stories {
        by_team
            .entry(story.team_id.as_str())
            .or_default()
            .add(classifier.resolve(&story.status_id));
    }

    let total = stories.len() as i64;
    let mut allocations: Vec<TeamAllocation> = by_team
        .into_iter()
        .map(|(team_id, counts)| TeamAllocation {
            team_id: team_id.to_string(),
            team_name: names.get(team_id).unwrap_or(&team_id).to_string(),
            story_count: counts.total,
            completed_count: counts.completed,
            in_progress_count: counts.in_progress(),
            share_pct: if total == 0 {
                0
            } else {
                counts.total * 100 / total
            },
        })
        .collect();

    // Stable sort keeps team-id order among ties
    allocations.sort_by(|a, b| b.story_count.cmp(&a.story_count));
    allocations
}
