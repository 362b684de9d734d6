//! Database migrations

use crate::error::Result;
use libsql::Connection;

/// Current schema version
const CURRENT_VERSION: i32 = 1;

/// Run all pending migrations
pub async fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn).await?;

    if version < 1 {
        migrate_v1(conn).await?;
    }

    Ok(())
}

/// Get the current schema version
async fn get_version(conn: &Connection) -> Result<i32> {
    let mut rows = conn
        .query(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            (),
        )
        .await?;

    let exists: bool = if let Some(row) = rows.next().await? {
        row.get::<i32>(0)? != 0
    } else {
        false
    };

    if !exists {
        return Ok(0);
    }

    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;

    let version: i32 = if let Some(row) = rows.next().await? {
        row.get(0)?
    } else {
        0
    };

    Ok(version)
}

/// Migration to version 1: courses, assignments and resources
async fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute("BEGIN TRANSACTION", ()).await?;

    let statements = [
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        "CREATE TABLE IF NOT EXISTS courses (
            id TEXT PRIMARY KEY,
            moodle_id INTEGER NOT NULL UNIQUE,
            fullname TEXT NOT NULL,
            shortname TEXT NOT NULL,
            category_id INTEGER,
            progress INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS assignments (
            id TEXT PRIMARY KEY,
            moodle_id INTEGER NOT NULL UNIQUE,
            course_id INTEGER NOT NULL REFERENCES courses(moodle_id),
            cmid INTEGER,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            due_date INTEGER,
            submitted INTEGER NOT NULL DEFAULT 0,
            grade TEXT,
            is_new INTEGER NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_assignments_course ON assignments(course_id)",
        "CREATE INDEX IF NOT EXISTS idx_assignments_due ON assignments(due_date)",
        // moodle_id is not unique for files; file_url is the identity
        "CREATE TABLE IF NOT EXISTS resources (
            id TEXT PRIMARY KEY,
            moodle_id INTEGER NOT NULL DEFAULT 0,
            course_id INTEGER NOT NULL REFERENCES courses(moodle_id),
            section TEXT NOT NULL,
            filename TEXT NOT NULL,
            file_url TEXT NOT NULL UNIQUE,
            mimetype TEXT NOT NULL DEFAULT '',
            filesize INTEGER NOT NULL DEFAULT 0,
            time_created INTEGER,
            is_new INTEGER NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_resources_course ON resources(course_id)",
        "CREATE INDEX IF NOT EXISTS idx_resources_moodle_id ON resources(moodle_id)",
        "CREATE INDEX IF NOT EXISTS idx_resources_created ON resources(time_created DESC)",
        "INSERT INTO schema_version (version) VALUES (1)",
    ];

    for stmt in statements {
        if let Err(e) = conn.execute(stmt, ()).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }
    }

    if let Err(e) = conn.execute("COMMIT", ()).await {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e.into());
    }

    tracing::info!("Migrated database to version {CURRENT_VERSION}");
    Ok(())
}
