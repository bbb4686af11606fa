//! Database schema migrations for respite.
//!
//! Migrations are versioned and applied automatically when opening the
//! database. The `schema_version` table tracks the current migration
//! version.

use rusqlite::{Connection, Result as SqliteResult};

/// Apply all pending migrations to bring the database to the current
/// schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }

    Ok(())
}

/// Create the schema_version table if it doesn't exist.
fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (initial database).
fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or(0)
}

/// Set the schema version in the database.
fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

/// v1: users, meetings, content library, recommendations, and
/// completed-break feedback.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id                       TEXT PRIMARY KEY,
            email                    TEXT NOT NULL UNIQUE,
            full_name                TEXT,
            timezone                 TEXT NOT NULL DEFAULT 'UTC',
            preferred_break_duration INTEGER NOT NULL DEFAULT 10,
            biggest_challenge        TEXT,
            created_at               TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS meetings (
            id             TEXT PRIMARY KEY,
            user_id        TEXT NOT NULL,
            title          TEXT NOT NULL,
            start_time     TEXT NOT NULL,
            end_time       TEXT NOT NULL,
            attendee_count INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS break_items (
            id               TEXT PRIMARY KEY,
            title            TEXT NOT NULL,
            description      TEXT,
            category         TEXT NOT NULL,
            duration_minutes INTEGER NOT NULL,
            content_url      TEXT,
            is_active        INTEGER NOT NULL DEFAULT 1,
            created_at       TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS recommendations (
            id               TEXT PRIMARY KEY,
            user_id          TEXT NOT NULL,
            item_id          TEXT,
            category         TEXT NOT NULL,
            recommended_time TEXT NOT NULL,
            duration_minutes INTEGER NOT NULL,
            reason           TEXT NOT NULL DEFAULT '',
            score            REAL NOT NULL,
            status           TEXT NOT NULL DEFAULT 'pending',
            created_at       TEXT NOT NULL,
            expires_at       TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS completed_breaks (
            id                TEXT PRIMARY KEY,
            user_id           TEXT NOT NULL,
            recommendation_id TEXT,
            completed_at      TEXT NOT NULL,
            felt_better       INTEGER
        );

        -- Indexes for the per-user, per-day query patterns
        CREATE INDEX IF NOT EXISTS idx_meetings_user_start ON meetings(user_id, start_time);
        CREATE INDEX IF NOT EXISTS idx_recommendations_user_time
            ON recommendations(user_id, recommended_time);
        CREATE INDEX IF NOT EXISTS idx_recommendations_user_status
            ON recommendations(user_id, status);
        CREATE INDEX IF NOT EXISTS idx_completed_breaks_user_time
            ON completed_breaks(user_id, completed_at);
        CREATE INDEX IF NOT EXISTS idx_break_items_category ON break_items(category);",
    )?;
    set_schema_version(conn, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), 1);
    }

    #[test]
    fn all_tables_exist_after_migration() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        for table in [
            "users",
            "meetings",
            "break_items",
            "recommendations",
            "completed_breaks",
        ] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "missing table {table}");
        }
    }
}
