//! Core domain types for burnline
//!
//! These types describe the slice of the project tracker that temporal
//! analytics reads: stories, the containers they belong to, status
//! categories, and the append-only field-change log.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Story** | A unit of tracked work; belongs to at most one sprint and one objective at a time |
//! | **Container** | A time-boxed grouping of stories: a sprint, or an objective viewed through a trailing window |
//! | **Status** | A team-defined workflow state (e.g. "In Review") |
//! | **Category** | The coarse class of a status; all done/in-progress decisions use it |
//! | **Activity** | One recorded field transition on a story |
//! | **Scope** | The set of stories counted as "in" a container at an instant |
//!
//! Only current state and the activity log are stored. Historical state is
//! derived by undoing logged changes (see [`crate::analytics::reconstruct`]).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ============================================
// Status
// ============================================

/// Coarse classification of a workflow status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCategory {
    Backlog,
    Unstarted,
    Started,
    Paused,
    Completed,
    Cancelled,
}

impl StatusCategory {
    /// All categories, in workflow order.
    pub const ALL: [StatusCategory; 6] = [
        StatusCategory::Backlog,
        StatusCategory::Unstarted,
        StatusCategory::Started,
        StatusCategory::Paused,
        StatusCategory::Completed,
        StatusCategory::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCategory::Backlog => "backlog",
            StatusCategory::Unstarted => "unstarted",
            StatusCategory::Started => "started",
            StatusCategory::Paused => "paused",
            StatusCategory::Completed => "completed",
            StatusCategory::Cancelled => "cancelled",
        }
    }

    /// Whether a story in this category counts as done.
    ///
    /// Only `Completed` is done; `Cancelled` stays in scope as not-done work.
    pub fn is_done(&self) -> bool {
        matches!(self, StatusCategory::Completed)
    }
}

impl std::str::FromStr for StatusCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "backlog" => Ok(StatusCategory::Backlog),
            "unstarted" => Ok(StatusCategory::Unstarted),
            "started" => Ok(StatusCategory::Started),
            // Older workspaces stored the paused category as "blocked"
            "paused" | "blocked" => Ok(StatusCategory::Paused),
            "completed" => Ok(StatusCategory::Completed),
            "cancelled" | "canceled" => Ok(StatusCategory::Cancelled),
            _ => Err(format!("unknown status category: {}", s)),
        }
    }
}

impl std::fmt::Display for StatusCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A workflow status defined by a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// Unique identifier, as referenced by `stories.status_id` and the activity log
    pub id: String,
    /// Display name
    pub name: String,
    /// Category driving all analytics decisions
    pub category: StatusCategory,
}

// ============================================
// Teams & containers
// ============================================

/// A team owning stories and sprints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
}

/// A time-boxed iteration with explicit start and end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sprint {
    pub id: String,
    pub team_id: String,
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

/// An objective (key result) that stories contribute to.
///
/// Objectives have no explicit window; progress is charted over a trailing
/// window ending "now".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Objective {
    pub id: String,
    pub name: String,
    pub target_date: Option<DateTime<Utc>>,
}

/// Reference to a container whose membership is tracked in the activity log.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum ContainerRef {
    Sprint(String),
    Objective(String),
}

impl ContainerRef {
    /// The container's identifier.
    pub fn id(&self) -> &str {
        match self {
            ContainerRef::Sprint(id) | ContainerRef::Objective(id) => id,
        }
    }

    /// The story field whose changes move stories in and out of this container.
    pub fn membership_field(&self) -> TrackedField {
        match self {
            ContainerRef::Sprint(_) => TrackedField::Sprint,
            ContainerRef::Objective(_) => TrackedField::Objective,
        }
    }
}

impl std::fmt::Display for ContainerRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContainerRef::Sprint(id) => write!(f, "sprint:{}", id),
            ContainerRef::Objective(id) => write!(f, "objective:{}", id),
        }
    }
}

// ============================================
// Story
// ============================================

/// Current state of a story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Story {
    pub id: String,
    pub team_id: String,
    /// Per-team sequence number (allocated elsewhere)
    pub sequence_id: i64,
    pub title: String,
    /// Current status identifier
    pub status_id: String,
    /// Current sprint, if any
    pub sprint_id: Option<String>,
    /// Current objective, if any
    pub objective_id: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Soft-delete marker
    pub deleted_at: Option<DateTime<Utc>>,
    /// Archive marker
    pub archived_at: Option<DateTime<Utc>>,
}

impl Story {
    /// True when the story has neither a soft-delete nor an archive marker.
    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none() && self.archived_at.is_none()
    }
}

// ============================================
// Activity log
// ============================================

/// Story fields whose transitions are recorded in the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackedField {
    Sprint,
    Objective,
    Status,
}

impl TrackedField {
    /// Column name as stored in `story_activities.field_changed`.
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackedField::Sprint => "sprint_id",
            TrackedField::Objective => "objective_id",
            TrackedField::Status => "status_id",
        }
    }
}

impl std::str::FromStr for TrackedField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sprint_id" => Ok(TrackedField::Sprint),
            "objective_id" => Ok(TrackedField::Objective),
            "status_id" => Ok(TrackedField::Status),
            _ => Err(format!("untracked field: {}", s)),
        }
    }
}

/// What kind of story operation produced an activity record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Created,
    Updated,
    Deleted,
    Archived,
    Restored,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Created => "created",
            ActivityType::Updated => "updated",
            ActivityType::Deleted => "deleted",
            ActivityType::Archived => "archived",
            ActivityType::Restored => "restored",
        }
    }
}

impl std::str::FromStr for ActivityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(ActivityType::Created),
            "updated" => Ok(ActivityType::Updated),
            "deleted" => Ok(ActivityType::Deleted),
            "archived" => Ok(ActivityType::Archived),
            "restored" => Ok(ActivityType::Restored),
            _ => Err(format!("unknown activity type: {}", s)),
        }
    }
}

/// One field transition on a story.
///
/// `old_value` is `None` when the field was never set before this change;
/// `new_value` is `None` when the change cleared it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// Log row id (monotonic, used to keep same-instant records in write order)
    pub id: i64,
    pub story_id: String,
    pub field: TrackedField,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub changed_at: DateTime<Utc>,
    pub activity_type: ActivityType,
}

impl ActivityRecord {
    /// Calendar day (UTC) this change belongs to.
    pub fn day(&self) -> NaiveDate {
        self.changed_at.date_naive()
    }

    /// True when this record moves the story into `container_id`.
    pub fn joins(&self, container_id: &str) -> bool {
        self.new_value.as_deref() == Some(container_id)
            && self.old_value.as_deref() != Some(container_id)
    }

    /// True when this record moves the story out of `container_id`.
    pub fn leaves(&self, container_id: &str) -> bool {
        self.old_value.as_deref() == Some(container_id)
            && self.new_value.as_deref() != Some(container_id)
    }
}
