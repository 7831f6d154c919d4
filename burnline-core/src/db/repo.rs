//! Database repository layer
//!
//! Provides the read queries the analytics engine needs, plus the handful of
//! upserts used to seed current state and the activity log.

use crate::analytics::AnalyticsSource;
use crate::error::{Error, Result};
use crate::types::*;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::PathBuf;
use std::sync::Mutex;

/// Maximum number of bound ids per `IN (...)` clause.
const IN_CLAUSE_CHUNK: usize = 500;

/// Format a timestamp for storage (fixed width, so text comparison orders correctly).
pub(crate) fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error(
    column: usize,
    err: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, err.into())
}

fn parse_ts(row: &Row, column: &str) -> rusqlite::Result<DateTime<Utc>> {
    let value: String = row.get(column)?;
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(row.as_ref().column_index(column).unwrap_or(0), e))
}

fn parse_ts_opt(row: &Row, column: &str) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let value: Option<String> = row.get(column)?;
    value
        .map(|v| {
            DateTime::parse_from_rfc3339(&v)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| conversion_error(row.as_ref().column_index(column).unwrap_or(0), e))
        })
        .transpose()
}

fn parse_text<T>(row: &Row, column: &str) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    let value: String = row.get(column)?;
    value
        .parse()
        .map_err(|e: String| conversion_error(row.as_ref().column_index(column).unwrap_or(0), e))
}

/// Database handle (single connection behind a mutex)
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA cache_size = -64000;  -- 64MB cache
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        super::schema::run_migrations(&conn)
    }

    // ============================================
    // Seed operations
    // ============================================

    /// Insert or update a status definition
    pub fn upsert_status(&self, status: &Status) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO statuses (id, name, category)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                category = excluded.category
            "#,
            params![status.id, status.name, status.category.as_str()],
        )?;
        Ok(())
    }

    /// Remove a status definition (stories and log rows keep referencing its id)
    pub fn delete_status(&self, status_id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM statuses WHERE id = ?", [status_id])?;
        Ok(())
    }

    /// Insert or update a team
    pub fn upsert_team(&self, team: &Team) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO teams (id, name) VALUES (?1, ?2)
            ON CONFLICT(id) DO UPDATE SET name = excluded.name
            "#,
            params![team.id, team.name],
        )?;
        Ok(())
    }

    /// Insert or update a sprint
    pub fn upsert_sprint(&self, sprint: &Sprint) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO sprints (id, team_id, name, start_date, end_date)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                start_date = excluded.start_date,
                end_date = excluded.end_date
            "#,
            params![
                sprint.id,
                sprint.team_id,
                sprint.name,
                format_ts(sprint.start_date),
                format_ts(sprint.end_date),
            ],
        )?;
        Ok(())
    }

    /// Insert or update an objective
    pub fn upsert_objective(&self, objective: &Objective) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO objectives (id, name, target_date)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                target_date = excluded.target_date
            "#,
            params![
                objective.id,
                objective.name,
                objective.target_date.map(format_ts),
            ],
        )?;
        Ok(())
    }

    /// Insert or update a story's current state
    pub fn upsert_story(&self, story: &Story) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO stories (
                id, team_id, sequence_id, title, status_id, sprint_id, objective_id,
                created_at, deleted_at, archived_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                status_id = excluded.status_id,
                sprint_id = excluded.sprint_id,
                objective_id = excluded.objective_id,
                deleted_at = excluded.deleted_at,
                archived_at = excluded.archived_at
            "#,
            params![
                story.id,
                story.team_id,
                story.sequence_id,
                story.title,
                story.status_id,
                story.sprint_id,
                story.objective_id,
                format_ts(story.created_at),
                story.deleted_at.map(format_ts),
                story.archived_at.map(format_ts),
            ],
        )?;
        Ok(())
    }

    /// Append an activity record, returning its log id
    pub fn insert_activity(
        &self,
        story_id: &str,
        field: TrackedField,
        old_value: Option<&str>,
        new_value: Option<&str>,
        activity_type: ActivityType,
        changed_at: DateTime<Utc>,
    ) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO story_activities (
                story_id, field_changed, old_value, new_value, activity_type, changed_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                story_id,
                field.as_str(),
                old_value,
                new_value,
                activity_type.as_str(),
                format_ts(changed_at),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    // ============================================
    // Row mapping
    // ============================================

    fn row_to_story(row: &Row) -> rusqlite::Result<Story> {
        Ok(Story {
            id: row.get("id")?,
            team_id: row.get("team_id")?,
            sequence_id: row.get("sequence_id")?,
            title: row.get("title")?,
            status_id: row.get("status_id")?,
            sprint_id: row.get("sprint_id")?,
            objective_id: row.get("objective_id")?,
            created_at: parse_ts(row, "created_at")?,
            deleted_at: parse_ts_opt(row, "deleted_at")?,
            archived_at: parse_ts_opt(row, "archived_at")?,
        })
    }

    fn row_to_activity(row: &Row) -> rusqlite::Result<ActivityRecord> {
        Ok(ActivityRecord {
            id: row.get("id")?,
            story_id: row.get("story_id")?,
            field: parse_text(row, "field_changed")?,
            old_value: row.get("old_value")?,
            new_value: row.get("new_value")?,
            changed_at: parse_ts(row, "changed_at")?,
            activity_type: parse_text(row, "activity_type")?,
        })
    }

    fn row_to_sprint(row: &Row) -> rusqlite::Result<Sprint> {
        Ok(Sprint {
            id: row.get("id")?,
            team_id: row.get("team_id")?,
            name: row.get("name")?,
            start_date: parse_ts(row, "start_date")?,
            end_date: parse_ts(row, "end_date")?,
        })
    }

    fn row_to_objective(row: &Row) -> rusqlite::Result<Objective> {
        Ok(Objective {
            id: row.get("id")?,
            name: row.get("name")?,
            target_date: parse_ts_opt(row, "target_date")?,
        })
    }

    fn row_to_status(row: &Row) -> rusqlite::Result<Status> {
        Ok(Status {
            id: row.get("id")?,
            name: row.get("name")?,
            category: parse_text(row, "category")?,
        })
    }
}

// ============================================
// Analytics queries
// ============================================

impl AnalyticsSource for Database {
    fn fetch_sprint(&self, sprint_id: &str) -> Result<Option<Sprint>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT * FROM sprints WHERE id = ?",
            [sprint_id],
            Self::row_to_sprint,
        )
        .optional()
        .map_err(Error::from)
    }

    fn fetch_objective(&self, objective_id: &str) -> Result<Option<Objective>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT * FROM objectives WHERE id = ?",
            [objective_id],
            Self::row_to_objective,
        )
        .optional()
        .map_err(Error::from)
    }

    fn fetch_current_members(&self, container: &ContainerRef) -> Result<Vec<Story>> {
        let sql = match container {
            ContainerRef::Sprint(_) => {
                r#"
                SELECT * FROM stories
                WHERE sprint_id = ? AND deleted_at IS NULL AND archived_at IS NULL
                ORDER BY id
                "#
            }
            ContainerRef::Objective(_) => {
                r#"
                SELECT * FROM stories
                WHERE objective_id = ? AND deleted_at IS NULL AND archived_at IS NULL
                ORDER BY id
                "#
            }
        };

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(sql)?;
        let stories = stmt
            .query_map([container.id()], Self::row_to_story)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(stories)
    }

    fn fetch_stories(&self, story_ids: &[String]) -> Result<Vec<Story>> {
        let conn = self.conn.lock().unwrap();
        let mut stories = Vec::with_capacity(story_ids.len());

        for chunk in story_ids.chunks(IN_CLAUSE_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!("SELECT * FROM stories WHERE id IN ({})", placeholders);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(chunk.iter()), Self::row_to_story)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            stories.extend(rows);
        }

        stories.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(stories)
    }

    fn fetch_membership_log(
        &self,
        container: &ContainerRef,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<ActivityRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM story_activities
            WHERE field_changed = ?1
              AND (old_value = ?2 OR new_value = ?2)
              AND changed_at >= ?3
              AND changed_at <= ?4
            ORDER BY changed_at ASC, id ASC
            "#,
        )?;

        let records = stmt
            .query_map(
                params![
                    container.membership_field().as_str(),
                    container.id(),
                    format_ts(since),
                    format_ts(until),
                ],
                Self::row_to_activity,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn fetch_status_log(
        &self,
        story_ids: &[String],
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<ActivityRecord>> {
        let conn = self.conn.lock().unwrap();
        let since = format_ts(since);
        let until = format_ts(until);
        let mut records = Vec::new();

        for chunk in story_ids.chunks(IN_CLAUSE_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                r#"
                SELECT * FROM story_activities
                WHERE field_changed = ?
                  AND changed_at >= ?
                  AND changed_at <= ?
                  AND story_id IN ({})
                "#,
                placeholders
            );

            let mut bound: Vec<&str> =
                vec![TrackedField::Status.as_str(), since.as_str(), until.as_str()];
            bound.extend(chunk.iter().map(String::as_str));

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(bound), Self::row_to_activity)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            records.extend(rows);
        }

        records.sort_by(|a, b| a.changed_at.cmp(&b.changed_at).then(a.id.cmp(&b.id)));
        Ok(records)
    }

    fn fetch_statuses(&self) -> Result<Vec<Status>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT * FROM statuses ORDER BY id")?;
        let statuses = stmt
            .query_map([], Self::row_to_status)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(statuses)
    }

    fn fetch_teams(&self) -> Result<Vec<Team>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT id, name FROM teams ORDER BY id")?;
        let teams = stmt
            .query_map([], |row| {
                Ok(Team {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(teams)
    }
}
