//! SQLite-based storage for profiles, meetings, the break content
//! library, recommendations, and completed-break feedback.
//!
//! `Database` implements the engine's store collaborator traits; the
//! pending-row replacement runs as a single transaction so two
//! concurrent regeneration triggers cannot interleave deletes and
//! inserts.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::warn;

use super::{data_dir, migrations};
use crate::calendar::Meeting;
use crate::error::DatabaseError;
use crate::matcher::{BreakCategory, BreakMatcher, Challenge, ContentItem};
use crate::recommend::{
    CalendarStore, ContentStore, ProfileStore, Recommendation, RecommendationStatus,
    RecommendationStore, UserProfile,
};

// === Helper Functions ===

/// Parse datetime from RFC3339 string with fallback to current time
fn parse_datetime_fallback(dt_str: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(dt_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Parse recommendation status from database string
fn parse_status(status_str: &str) -> RecommendationStatus {
    RecommendationStatus::parse(status_str).unwrap_or(RecommendationStatus::Pending)
}

/// Parse break category from database string
fn parse_category(category_str: &str) -> BreakCategory {
    BreakCategory::parse(category_str).unwrap_or(BreakCategory::Meditation)
}

fn row_to_profile(row: &rusqlite::Row) -> Result<UserProfile, rusqlite::Error> {
    let challenge: Option<String> = row.get(5)?;
    let created_at: String = row.get(6)?;
    Ok(UserProfile {
        id: row.get(0)?,
        email: row.get(1)?,
        full_name: row.get(2)?,
        timezone: row.get(3)?,
        preferred_break_duration: row.get(4)?,
        biggest_challenge: challenge.as_deref().and_then(Challenge::parse),
        created_at: parse_datetime_fallback(&created_at),
    })
}

fn row_to_meeting(row: &rusqlite::Row) -> Result<Meeting, rusqlite::Error> {
    let start: String = row.get(2)?;
    let end: String = row.get(3)?;
    Ok(Meeting {
        id: row.get(0)?,
        title: row.get(1)?,
        start_time: parse_datetime_fallback(&start),
        end_time: parse_datetime_fallback(&end),
        attendee_count: row.get(4)?,
    })
}

fn row_to_item(row: &rusqlite::Row) -> Result<ContentItem, rusqlite::Error> {
    let active: i64 = row.get(6)?;
    Ok(ContentItem {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        duration_minutes: row.get(4)?,
        content_url: row.get(5)?,
        is_active: active != 0,
    })
}

fn row_to_recommendation(row: &rusqlite::Row) -> Result<Recommendation, rusqlite::Error> {
    let category: String = row.get(3)?;
    let recommended_time: String = row.get(4)?;
    let status: String = row.get(8)?;
    let created_at: String = row.get(9)?;
    let expires_at: String = row.get(10)?;
    Ok(Recommendation {
        id: row.get(0)?,
        user_id: row.get(1)?,
        item_id: row.get(2)?,
        category: parse_category(&category),
        recommended_time: parse_datetime_fallback(&recommended_time),
        duration_minutes: row.get(5)?,
        reason: row.get(6)?,
        score: row.get(7)?,
        status: parse_status(&status),
        created_at: parse_datetime_fallback(&created_at),
        expires_at: parse_datetime_fallback(&expires_at),
    })
}

const RECOMMENDATION_COLUMNS: &str = "id, user_id, item_id, category, recommended_time, \
     duration_minutes, reason, score, status, created_at, expires_at";

/// SQLite database for the respite store collaborators.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `~/.config/respite/respite.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, DatabaseError> {
        let path = data_dir()
            .map_err(|e| DatabaseError::OpenFailed {
                path: "~/.config/respite".into(),
                source: rusqlite::Error::InvalidPath(e.to_string().into()),
            })?
            .join("respite.db");
        Self::open_at(&path)
    }

    /// Open the database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests and dry runs).
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        migrations::migrate(&self.conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))
    }

    // === Profiles ===

    /// Insert or replace a user profile.
    pub fn upsert_profile(&self, profile: &UserProfile) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO users
             (id, email, full_name, timezone, preferred_break_duration, biggest_challenge, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                profile.id,
                profile.email,
                profile.full_name,
                profile.timezone,
                profile.preferred_break_duration,
                profile.biggest_challenge.map(|c| c.as_str()),
                profile.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Look up a profile by email.
    pub fn find_profile_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserProfile>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, email, full_name, timezone, preferred_break_duration,
                    biggest_challenge, created_at
             FROM users WHERE email = ?1",
        )?;
        Ok(stmt
            .query_row(params![email], row_to_profile)
            .optional()?)
    }

    /// All profiles, for batch drivers iterating users independently.
    pub fn list_profiles(&self) -> Result<Vec<UserProfile>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, email, full_name, timezone, preferred_break_duration,
                    biggest_challenge, created_at
             FROM users ORDER BY email",
        )?;
        let rows = stmt.query_map([], row_to_profile)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // === Meetings ===

    /// Store one meeting for a user.
    pub fn insert_meeting(&self, user_id: &str, meeting: &Meeting) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO meetings
             (id, user_id, title, start_time, end_time, attendee_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                meeting.id,
                user_id,
                meeting.title,
                meeting.start_time.to_rfc3339(),
                meeting.end_time.to_rfc3339(),
                meeting.attendee_count,
            ],
        )?;
        Ok(())
    }

    /// Delete a user's meetings starting inside [start, end).
    pub fn delete_meetings_between(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<usize, DatabaseError> {
        let deleted = self.conn.execute(
            "DELETE FROM meetings
             WHERE user_id = ?1 AND start_time >= ?2 AND start_time < ?3",
            params![user_id, start.to_rfc3339(), end.to_rfc3339()],
        )?;
        Ok(deleted)
    }

    // === Content library ===

    /// Add a content item to the break library.
    pub fn insert_item(&self, item: &ContentItem) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO break_items
             (id, title, description, category, duration_minutes, content_url, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                item.id,
                item.title,
                item.description,
                item.category,
                item.duration_minutes,
                item.content_url,
                if item.is_active { 1 } else { 0 },
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// All items, library order.
    pub fn list_items(&self) -> Result<Vec<ContentItem>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, description, category, duration_minutes, content_url, is_active
             FROM break_items ORDER BY rowid",
        )?;
        let rows = stmt.query_map([], row_to_item)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Seed the library with a starter set per category. No-op when
    /// the table already has rows; returns the number inserted.
    pub fn seed_content_library(&self) -> Result<usize, DatabaseError> {
        let existing: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM break_items", [], |row| row.get(0))?;
        if existing > 0 {
            return Ok(0);
        }

        let seed: &[(&str, &str, i64)] = &[
            ("Guided body scan", "meditation", 10),
            ("Loving-kindness meditation", "meditation", 25),
            ("Desk stretch circuit", "movement", 10),
            ("Brisk walk outside", "movement", 25),
            ("Box breathing", "breathing", 5),
            ("Extended exhale practice", "breathing", 10),
            ("Two-minute energizer", "energizing", 5),
            ("Upbeat movement burst", "energizing", 10),
            ("Mindful observation", "mindfulness", 10),
            ("Open-awareness sit", "mindfulness", 25),
            ("Confidence visualization", "confidence", 5),
            ("Power posture reset", "confidence", 10),
        ];

        for (title, category, duration) in seed {
            self.insert_item(&ContentItem {
                id: uuid::Uuid::new_v4().to_string(),
                title: (*title).to_string(),
                description: None,
                category: (*category).to_string(),
                duration_minutes: *duration,
                content_url: None,
                is_active: true,
            })?;
        }
        Ok(seed.len())
    }

    // === Recommendations ===

    /// Fetch one recommendation by id.
    pub fn get_recommendation(&self, id: &str) -> Result<Option<Recommendation>, DatabaseError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECOMMENDATION_COLUMNS} FROM recommendations WHERE id = ?1"
        ))?;
        Ok(stmt
            .query_row(params![id], row_to_recommendation)
            .optional()?)
    }

    /// A user's recommendations with times inside [start, end), best
    /// score first.
    pub fn list_recommendations_between(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Recommendation>, DatabaseError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECOMMENDATION_COLUMNS} FROM recommendations
             WHERE user_id = ?1 AND recommended_time >= ?2 AND recommended_time < ?3
             ORDER BY score DESC, recommended_time"
        ))?;
        let rows = stmt.query_map(
            params![user_id, start.to_rfc3339(), end.to_rfc3339()],
            row_to_recommendation,
        )?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Move a recommendation to a non-pending status.
    pub fn update_status(
        &self,
        id: &str,
        status: RecommendationStatus,
    ) -> Result<(), DatabaseError> {
        let updated = self.conn.execute(
            "UPDATE recommendations SET status = ?2 WHERE id = ?1",
            params![id, status.as_str()],
        )?;
        if updated == 0 {
            return Err(DatabaseError::NotFound {
                entity: "recommendation",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    // === Completed breaks ===

    /// Record completed-break feedback; feeds the recency term of the
    /// scorer on the next generation run.
    pub fn record_completed_break(
        &self,
        user_id: &str,
        recommendation_id: Option<&str>,
        completed_at: DateTime<Utc>,
        felt_better: Option<bool>,
    ) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO completed_breaks (id, user_id, recommendation_id, completed_at, felt_better)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                uuid::Uuid::new_v4().to_string(),
                user_id,
                recommendation_id,
                completed_at.to_rfc3339(),
                felt_better.map(|b| if b { 1 } else { 0 }),
            ],
        )?;
        Ok(())
    }
}

impl ProfileStore for Database {
    fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, email, full_name, timezone, preferred_break_duration,
                    biggest_challenge, created_at
             FROM users WHERE id = ?1",
        )?;
        Ok(stmt
            .query_row(params![user_id], row_to_profile)
            .optional()?)
    }
}

impl CalendarStore for Database {
    fn meetings_between(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Meeting>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, start_time, end_time, attendee_count
             FROM meetings
             WHERE user_id = ?1 AND start_time >= ?2 AND start_time < ?3
             ORDER BY start_time",
        )?;
        let rows = stmt.query_map(
            params![user_id, start.to_rfc3339(), end.to_rfc3339()],
            row_to_meeting,
        )?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn break_times_between(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT completed_at FROM completed_breaks
             WHERE user_id = ?1 AND completed_at >= ?2 AND completed_at < ?3
             ORDER BY completed_at",
        )?;
        let rows = stmt.query_map(
            params![user_id, start.to_rfc3339(), end.to_rfc3339()],
            |row| {
                let completed: String = row.get(0)?;
                Ok(parse_datetime_fallback(&completed))
            },
        )?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

impl ContentStore for Database {
    fn find_item(
        &self,
        category: BreakCategory,
        target_duration_minutes: i64,
    ) -> Result<Option<ContentItem>, DatabaseError> {
        // Duration-window logic lives in the matcher; the store just
        // supplies the library in order.
        let items = self.list_items()?;
        Ok(BreakMatcher::new()
            .select_item(&items, category, target_duration_minutes)
            .cloned())
    }
}

impl RecommendationStore for Database {
    fn find_pending_for_today(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        day_end: DateTime<Utc>,
    ) -> Result<Option<Recommendation>, DatabaseError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECOMMENDATION_COLUMNS} FROM recommendations
             WHERE user_id = ?1 AND status = 'pending'
               AND recommended_time >= ?2 AND recommended_time < ?3
             ORDER BY score DESC LIMIT 1"
        ))?;
        Ok(stmt
            .query_row(
                params![user_id, now.to_rfc3339(), day_end.to_rfc3339()],
                row_to_recommendation,
            )
            .optional()?)
    }

    fn delete_pending_for_today(
        &self,
        user_id: &str,
        day_start: DateTime<Utc>,
        day_end: DateTime<Utc>,
    ) -> Result<usize, DatabaseError> {
        let deleted = self.conn.execute(
            "DELETE FROM recommendations
             WHERE user_id = ?1 AND status = 'pending'
               AND recommended_time >= ?2 AND recommended_time < ?3",
            params![user_id, day_start.to_rfc3339(), day_end.to_rfc3339()],
        )?;
        Ok(deleted)
    }

    fn insert(&self, recommendation: &Recommendation) -> Result<(), DatabaseError> {
        self.conn.execute(
            &format!(
                "INSERT INTO recommendations ({RECOMMENDATION_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
            ),
            params![
                recommendation.id,
                recommendation.user_id,
                recommendation.item_id,
                recommendation.category.as_str(),
                recommendation.recommended_time.to_rfc3339(),
                recommendation.duration_minutes,
                recommendation.reason,
                recommendation.score,
                recommendation.status.as_str(),
                recommendation.created_at.to_rfc3339(),
                recommendation.expires_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Delete today's pending rows and insert replacements in a single
    /// transaction, so one of two racing regenerations wins wholesale.
    fn replace_pending_for_today(
        &self,
        user_id: &str,
        day_start: DateTime<Utc>,
        day_end: DateTime<Utc>,
        recommendations: &[Recommendation],
    ) -> Result<usize, DatabaseError> {
        self.conn.execute_batch("BEGIN IMMEDIATE TRANSACTION;")?;
        let result: Result<usize, DatabaseError> = (|| {
            let deleted = self.delete_pending_for_today(user_id, day_start, day_end)?;
            for recommendation in recommendations {
                self.insert(recommendation)?;
            }
            Ok(deleted)
        })();
        match result {
            Ok(deleted) => {
                self.conn.execute_batch("COMMIT;")?;
                Ok(deleted)
            }
            Err(err) => {
                warn!(user_id, error = %err, "rolling back recommendation replacement");
                let _ = self.conn.execute_batch("ROLLBACK;");
                Err(err)
            }
        }
    }
}
