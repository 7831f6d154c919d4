//! Database schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.
//! Timestamps are stored as fixed-width RFC 3339 UTC text so that range
//! predicates compare correctly as strings.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: Current state tables + activity log
    r#"
    -- ============================================
    -- Current state
    -- ============================================

    CREATE TABLE IF NOT EXISTS statuses (
        id               TEXT PRIMARY KEY,
        name             TEXT NOT NULL,
        category         TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS teams (
        id               TEXT PRIMARY KEY,
        name             TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS sprints (
        id               TEXT PRIMARY KEY,
        team_id          TEXT NOT NULL REFERENCES teams(id),
        name             TEXT NOT NULL,
        start_date       DATETIME NOT NULL,
        end_date         DATETIME NOT NULL
    );

    CREATE TABLE IF NOT EXISTS objectives (
        id               TEXT PRIMARY KEY,
        name             TEXT NOT NULL,
        target_date      DATETIME
    );

    CREATE TABLE IF NOT EXISTS stories (
        id               TEXT PRIMARY KEY,
        team_id          TEXT NOT NULL REFERENCES teams(id),
        sequence_id      INTEGER NOT NULL,
        title            TEXT NOT NULL,
        -- Not a foreign key: statuses may be deleted while stories keep the id
        status_id        TEXT NOT NULL,
        sprint_id        TEXT REFERENCES sprints(id),
        objective_id     TEXT REFERENCES objectives(id),
        created_at       DATETIME NOT NULL,
        deleted_at       DATETIME,
        archived_at      DATETIME,

        UNIQUE(team_id, sequence_id)
    );

    -- ============================================
    -- Append-only activity log
    -- ============================================

    CREATE TABLE IF NOT EXISTS story_activities (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        story_id         TEXT NOT NULL REFERENCES stories(id),
        field_changed    TEXT NOT NULL,
        old_value        TEXT,
        new_value        TEXT,
        activity_type    TEXT NOT NULL,
        changed_at       DATETIME NOT NULL
    );

    -- ============================================
    -- Indexes
    -- ============================================

    CREATE INDEX IF NOT EXISTS idx_stories_sprint ON stories(sprint_id);
    CREATE INDEX IF NOT EXISTS idx_stories_objective ON stories(objective_id);
    CREATE INDEX IF NOT EXISTS idx_stories_team ON stories(team_id);
    CREATE INDEX IF NOT EXISTS idx_activities_story ON story_activities(story_id, changed_at);
    CREATE INDEX IF NOT EXISTS idx_activities_field ON story_activities(field_changed, changed_at);
    "#,
    // Version 2: Lookups by container value for membership history
    r#"
    CREATE INDEX IF NOT EXISTS idx_activities_new_value
        ON story_activities(field_changed, new_value, changed_at);
    CREATE INDEX IF NOT EXISTS idx_activities_old_value
        ON story_activities(field_changed, old_value, changed_at);
    "#,
];

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> crate::error::Result<()> {
    let current_version: i32 = conn
        .query_row("PRAGMA user_version", [], |r| r.get(0))
        .unwrap_or(0);

    tracing::info!(
        current_version,
        target_version = SCHEMA_VERSION,
        "Checking database migrations"
    );

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current_version {
            tracing::info!(version, "Running migration");
            conn.execute_batch(migration)?;
            conn.execute(&format!("PRAGMA user_version = {}", version), [])?;
        }
    }

    if current_version < SCHEMA_VERSION {
        tracing::info!(
            from = current_version,
            to = SCHEMA_VERSION,
            "Migrations complete"
        );
    }

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> crate::error::Result<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(version)
}
