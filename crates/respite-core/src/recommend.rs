//! Recommendation orchestration.
//!
//! Composes the boundary calculator, gap finder, scorer, and matcher
//! into recommendation records, and drives the get-or-generate
//! idempotency rule against the store collaborators. The engine itself
//! holds no mutable state and is safe to invoke concurrently for
//! different users.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::calendar::{validate_meetings, Meeting};
use crate::classify::MeetingClassifier;
use crate::error::{CoreError, DatabaseError, Result};
use crate::gaps::GapFinder;
use crate::matcher::{BreakCategory, BreakMatcher, Challenge, ContentItem};
use crate::scoring::{OpportunityScorer, ScoredOpportunity};
use crate::workday::{end_of_local_day, local_day_bounds, parse_timezone, WorkdayWindow};

/// User profile fields consumed by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    /// IANA timezone name, e.g. "America/New_York"
    pub timezone: String,
    /// Informational only in the current scope
    pub preferred_break_duration: i64,
    pub biggest_challenge: Option<Challenge>,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(email: impl Into<String>, timezone: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.into(),
            full_name: None,
            timezone: timezone.into(),
            preferred_break_duration: 10,
            biggest_challenge: None,
            created_at: Utc::now(),
        }
    }
}

/// Lifecycle status of a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationStatus {
    Pending,
    Accepted,
    Dismissed,
    Completed,
}

impl RecommendationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationStatus::Pending => "pending",
            RecommendationStatus::Accepted => "accepted",
            RecommendationStatus::Dismissed => "dismissed",
            RecommendationStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RecommendationStatus::Pending),
            "accepted" => Some(RecommendationStatus::Accepted),
            "dismissed" => Some(RecommendationStatus::Dismissed),
            "completed" => Some(RecommendationStatus::Completed),
            _ => None,
        }
    }
}

/// A break recommendation for one user on one day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    pub user_id: String,
    /// Linked content item, if one fit the slot
    pub item_id: Option<String>,
    pub category: BreakCategory,
    pub recommended_time: DateTime<Utc>,
    pub duration_minutes: i64,
    /// Human-readable justification
    pub reason: String,
    /// Normalized confidence in [0, 1]
    pub score: f64,
    pub status: RecommendationStatus,
    pub created_at: DateTime<Utc>,
    /// End of the local day containing the recommended time
    pub expires_at: DateTime<Utc>,
}

/// Day-level meeting summary, exposed for observability alongside the
/// per-neighbor context the scorer uses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayAnalysis {
    pub meeting_count: usize,
    pub total_intensity: u32,
    pub average_intensity: f64,
    pub tag_counts: BTreeMap<String, usize>,
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How many top-scored candidates become recommendations (MVP: 1)
    pub max_per_day: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { max_per_day: 1 }
    }
}

// === Store collaborator seams ===

/// Profile lookup collaborator.
pub trait ProfileStore {
    fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, DatabaseError>;
}

/// Calendar and break-history collaborator. Hands the engine the day's
/// meetings (ordered by start time) and the instants of breaks already
/// taken.
pub trait CalendarStore {
    fn meetings_between(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Meeting>, DatabaseError>;

    fn break_times_between(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, DatabaseError>;
}

/// Recommendation persistence collaborator.
pub trait RecommendationStore {
    /// Highest-scoring pending recommendation whose time is now or
    /// later, within the local day ending at `day_end`.
    fn find_pending_for_today(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        day_end: DateTime<Utc>,
    ) -> Result<Option<Recommendation>, DatabaseError>;

    /// Delete pending rows for the local day. Returns the count removed.
    fn delete_pending_for_today(
        &self,
        user_id: &str,
        day_start: DateTime<Utc>,
        day_end: DateTime<Utc>,
    ) -> Result<usize, DatabaseError>;

    fn insert(&self, recommendation: &Recommendation) -> Result<(), DatabaseError>;

    /// Delete today's pending rows and insert the replacements as one
    /// unit. At most one concurrent caller's insert set may survive;
    /// implementations backed by a real store must run this in a
    /// transaction. This default is delete-then-insert without that
    /// guarantee and is only suitable for single-threaded callers.
    fn replace_pending_for_today(
        &self,
        user_id: &str,
        day_start: DateTime<Utc>,
        day_end: DateTime<Utc>,
        recommendations: &[Recommendation],
    ) -> Result<usize, DatabaseError> {
        let deleted = self.delete_pending_for_today(user_id, day_start, day_end)?;
        for recommendation in recommendations {
            self.insert(recommendation)?;
        }
        Ok(deleted)
    }
}

/// Content library collaborator.
pub trait ContentStore {
    /// First active item matching the category whose duration fits the
    /// target, with a shorter-than-target fallback.
    fn find_item(
        &self,
        category: BreakCategory,
        target_duration_minutes: i64,
    ) -> Result<Option<ContentItem>, DatabaseError>;
}

/// The recommendation engine.
///
/// Pure function of (today's meetings, user profile, recent break
/// history) except for the orchestrating read-modify-write against the
/// recommendation store.
#[derive(Debug, Clone, Default)]
pub struct RecommendationEngine {
    classifier: MeetingClassifier,
    gap_finder: GapFinder,
    scorer: OpportunityScorer,
    matcher: BreakMatcher,
    config: EngineConfig,
}

impl RecommendationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Generate recommendations for one user-day.
    ///
    /// Pure except for fresh ids and `created_at`: identical inputs
    /// yield identical (time, category, score) sets. Returns an empty
    /// vector when no gap clears the fifteen-minute threshold; that is
    /// a legitimate outcome, not an error.
    pub fn generate(
        &self,
        profile: &UserProfile,
        meetings: &[Meeting],
        recent_breaks: &[DateTime<Utc>],
        now: DateTime<Utc>,
    ) -> Result<Vec<Recommendation>> {
        let tz = parse_timezone(&profile.timezone)?;
        validate_meetings(meetings)?;

        let window = WorkdayWindow::for_day(meetings, tz, now)?;
        let opportunities = self.gap_finder.find(meetings, &window);
        let mut scored = self
            .scorer
            .score_all(&opportunities, meetings, recent_breaks, tz);
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));

        debug!(
            user_id = %profile.id,
            meetings = meetings.len(),
            candidates = scored.len(),
            "scored break opportunities"
        );

        scored
            .iter()
            .take(self.config.max_per_day)
            .map(|candidate| self.to_recommendation(profile, candidate, tz))
            .collect()
    }

    fn to_recommendation(
        &self,
        profile: &UserProfile,
        candidate: &ScoredOpportunity,
        tz: Tz,
    ) -> Result<Recommendation> {
        let category = self
            .matcher
            .select_category(candidate, profile.biggest_challenge, tz);
        let expires_at = end_of_local_day(candidate.opportunity.start_time, tz)?;
        Ok(Recommendation {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: profile.id.clone(),
            item_id: None,
            category,
            recommended_time: candidate.opportunity.start_time,
            duration_minutes: candidate.opportunity.duration_minutes,
            reason: self.reason(candidate, tz),
            score: (candidate.score / 10.0).min(1.0),
            status: RecommendationStatus::Pending,
            created_at: Utc::now(),
            expires_at,
        })
    }

    /// Human-readable justification for the chosen slot.
    fn reason(&self, candidate: &ScoredOpportunity, tz: Tz) -> String {
        if let Some(preceding) = &candidate.preceding {
            if preceding.intensity >= 7 {
                return format!(
                    "After your {}, a break can help you reset and recharge.",
                    preceding.title.to_lowercase()
                );
            }
        }
        if let Some(following) = &candidate.following {
            if following.intensity >= 7 {
                return format!(
                    "Before your {}, a break can help you prepare and focus.",
                    following.title.to_lowercase()
                );
            }
        }
        match candidate.local_hour(tz) {
            14..=16 => "Mid-afternoon is a perfect time to recharge your energy levels.",
            h if h <= 11 => "A morning break can set a positive tone for your day.",
            h if h >= 17 => "An end-of-day break can help you transition and unwind.",
            _ => "This gap in your schedule is a perfect opportunity for a mindful break.",
        }
        .to_string()
    }

    /// Summarize the day's meetings (count, intensity, tag histogram).
    pub fn analyze_day(&self, meetings: &[Meeting]) -> DayAnalysis {
        let mut total_intensity: u32 = 0;
        let mut tag_counts: BTreeMap<String, usize> = BTreeMap::new();

        for meeting in meetings {
            let context = self.classifier.context(meeting);
            total_intensity += u32::from(context.intensity);
            for tag in &context.tags {
                *tag_counts.entry(tag.as_str().to_string()).or_insert(0) += 1;
            }
        }

        DayAnalysis {
            meeting_count: meetings.len(),
            total_intensity,
            average_intensity: if meetings.is_empty() {
                0.0
            } else {
                f64::from(total_intensity) / meetings.len() as f64
            },
            tag_counts,
        }
    }

    /// Generate recommendations for today, attach content items, and
    /// atomically replace the user's pending rows.
    pub fn generate_and_store<S>(
        &self,
        profile: &UserProfile,
        now: DateTime<Utc>,
        store: &S,
    ) -> Result<Vec<Recommendation>>
    where
        S: CalendarStore + RecommendationStore + ContentStore,
    {
        let tz = parse_timezone(&profile.timezone)?;
        let (day_start, day_end) = local_day_bounds(now, tz)?;

        let meetings = store.meetings_between(&profile.id, day_start, day_end)?;
        let recent_breaks = store.break_times_between(&profile.id, day_start, now)?;

        let mut recommendations = self.generate(profile, &meetings, &recent_breaks, now)?;
        for recommendation in &mut recommendations {
            let item = store.find_item(
                recommendation.category,
                recommendation.duration_minutes,
            )?;
            recommendation.item_id = item.map(|item| item.id);
        }

        let replaced =
            store.replace_pending_for_today(&profile.id, day_start, day_end, &recommendations)?;
        info!(
            user_id = %profile.id,
            generated = recommendations.len(),
            replaced,
            "stored break recommendations"
        );
        Ok(recommendations)
    }

    /// Get today's recommendation, generating one if none is live.
    ///
    /// Returns the highest-scoring pending row whose time is now or
    /// later; a stale or missing row triggers a synchronous
    /// regeneration. `Ok(None)` means today legitimately has no
    /// recommendable slot left.
    pub fn get_or_generate<S>(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        store: &S,
    ) -> Result<Option<Recommendation>>
    where
        S: ProfileStore + CalendarStore + RecommendationStore + ContentStore,
    {
        let profile = store
            .get_profile(user_id)?
            .ok_or_else(|| DatabaseError::NotFound {
                entity: "user",
                id: user_id.to_string(),
            })?;
        let tz = parse_timezone(&profile.timezone)?;
        let (_, day_end) = local_day_bounds(now, tz)?;

        if let Some(existing) = store.find_pending_for_today(user_id, now, day_end)? {
            debug!(user_id, recommendation_id = %existing.id, "serving existing recommendation");
            return Ok(Some(existing));
        }

        let generated = self.generate_and_store(&profile, now, store)?;
        Ok(generated.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workday::local_at;
    use chrono::{Duration, NaiveDate};
    use std::cell::RefCell;

    fn tz() -> Tz {
        "America/New_York".parse().unwrap()
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        let date: NaiveDate = "2025-03-18".parse().unwrap();
        local_at(tz(), date, h, m).unwrap()
    }

    fn profile() -> UserProfile {
        let mut p = UserProfile::new("test@company.com", "America/New_York");
        p.biggest_challenge = Some(Challenge::Stress);
        p
    }

    fn meeting(h: u32, m: u32, minutes: i64, title: &str, attendees: u32) -> Meeting {
        Meeting::new(title, at(h, m), at(h, m) + Duration::minutes(minutes), attendees).unwrap()
    }

    #[test]
    fn generates_top_scored_recommendation() {
        let engine = RecommendationEngine::new();
        let meetings = vec![
            meeting(10, 0, 60, "Morning Meeting", 3),
            meeting(14, 0, 30, "Afternoon Sync", 3),
            meeting(16, 0, 60, "Final Review", 3),
        ];
        let recs = engine
            .generate(&profile(), &meetings, &[], at(8, 0))
            .unwrap();
        assert_eq!(recs.len(), 1);
        let rec = &recs[0];
        assert!(rec.score > 0.0 && rec.score <= 1.0);
        assert_eq!(rec.status, RecommendationStatus::Pending);
        assert!(!rec.reason.is_empty());
        assert!(rec.expires_at > rec.recommended_time);
    }

    #[test]
    fn empty_day_with_top_two_policy() {
        let engine = RecommendationEngine::with_config(EngineConfig { max_per_day: 2 });
        let recs = engine.generate(&profile(), &[], &[], at(8, 0)).unwrap();
        assert_eq!(recs.len(), 2);
        for rec in &recs {
            assert_eq!(rec.duration_minutes, 15);
        }
        let spacing = (recs[0].recommended_time - recs[1].recommended_time)
            .num_hours()
            .abs();
        assert!(spacing >= 3);
    }

    #[test]
    fn generation_is_idempotent_in_content() {
        let engine = RecommendationEngine::with_config(EngineConfig { max_per_day: 3 });
        let meetings = vec![
            meeting(9, 0, 30, "Standup", 6),
            meeting(11, 0, 60, "Design Review", 8),
            meeting(15, 0, 30, "1:1 with Dana", 2),
        ];
        let now = at(8, 0);
        let first = engine.generate(&profile(), &meetings, &[], now).unwrap();
        let second = engine.generate(&profile(), &meetings, &[], now).unwrap();

        let key = |recs: &[Recommendation]| {
            recs.iter()
                .map(|r| (r.recommended_time, r.category))
                .collect::<Vec<_>>()
        };
        assert_eq!(key(&first), key(&second));
        // New rows each time.
        assert_ne!(first[0].id, second[0].id);
    }

    #[test]
    fn unknown_timezone_fails_generation() {
        let engine = RecommendationEngine::new();
        let mut p = profile();
        p.timezone = "Nowhere/Void".to_string();
        assert!(engine.generate(&p, &[], &[], at(8, 0)).is_err());
    }

    #[test]
    fn malformed_meeting_fails_generation() {
        let engine = RecommendationEngine::new();
        let mut m = meeting(10, 0, 60, "Sync", 3);
        m.end_time = m.start_time;
        let result = engine.generate(&profile(), &[m], &[], at(8, 0));
        assert!(matches!(result, Err(CoreError::Validation(_))));
    }

    #[test]
    fn back_to_back_day_leans_on_boundary_slack() {
        // 25-minute meetings every 30 minutes with the window flush
        // against the first and last meeting leaves no candidate.
        let engine = RecommendationEngine::new();
        let mut meetings = Vec::new();
        for hour in 7..21 {
            for slot in [0, 30] {
                meetings.push(meeting(hour, slot, 25, "Back to back", 3));
            }
        }
        let recs = engine
            .generate(&profile(), &meetings, &[], at(7, 0))
            .unwrap();
        // Only the window-boundary slack can qualify; no between
        // candidate exists and generation must not error.
        assert!(recs.len() <= 1);
    }

    #[test]
    fn intense_preceding_meeting_shapes_the_reason() {
        let engine = RecommendationEngine::new();
        let meetings = vec![meeting(10, 0, 120, "Quarterly Review - URGENT", 10)];
        let recs = engine
            .generate(&profile(), &meetings, &[], at(8, 0))
            .unwrap();
        assert_eq!(recs.len(), 1);
        assert!(
            recs[0].reason.contains("quarterly review - urgent"),
            "reason was: {}",
            recs[0].reason
        );
    }

    #[test]
    fn analyze_day_counts_tags_and_intensity() {
        let engine = RecommendationEngine::new();
        let meetings = vec![
            meeting(10, 0, 60, "Design Review", 8),
            meeting(14, 0, 30, "Team lunch", 5),
        ];
        let analysis = engine.analyze_day(&meetings);
        assert_eq!(analysis.meeting_count, 2);
        assert_eq!(analysis.tag_counts.get("high_stress"), Some(&1));
        assert_eq!(analysis.tag_counts.get("creative"), Some(&1));
        assert_eq!(analysis.tag_counts.get("social"), Some(&1));
        assert!(analysis.average_intensity > 0.0);
        let empty = engine.analyze_day(&[]);
        assert_eq!(empty.meeting_count, 0);
        assert!(empty.average_intensity.abs() < f64::EPSILON);
    }

    // In-memory store double covering all four collaborator seams.
    #[derive(Default)]
    struct MemoryStore {
        profile: Option<UserProfile>,
        meetings: Vec<Meeting>,
        breaks: Vec<DateTime<Utc>>,
        items: Vec<ContentItem>,
        recommendations: RefCell<Vec<Recommendation>>,
    }

    impl ProfileStore for MemoryStore {
        fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, DatabaseError> {
            Ok(self
                .profile
                .clone()
                .filter(|profile| profile.id == user_id))
        }
    }

    impl CalendarStore for MemoryStore {
        fn meetings_between(
            &self,
            _user_id: &str,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
        ) -> Result<Vec<Meeting>, DatabaseError> {
            let mut meetings: Vec<Meeting> = self
                .meetings
                .iter()
                .filter(|m| m.start_time >= start && m.start_time < end)
                .cloned()
                .collect();
            meetings.sort_by_key(|m| m.start_time);
            Ok(meetings)
        }

        fn break_times_between(
            &self,
            _user_id: &str,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
        ) -> Result<Vec<DateTime<Utc>>, DatabaseError> {
            Ok(self
                .breaks
                .iter()
                .copied()
                .filter(|t| *t >= start && *t < end)
                .collect())
        }
    }

    impl RecommendationStore for MemoryStore {
        fn find_pending_for_today(
            &self,
            user_id: &str,
            now: DateTime<Utc>,
            day_end: DateTime<Utc>,
        ) -> Result<Option<Recommendation>, DatabaseError> {
            Ok(self
                .recommendations
                .borrow()
                .iter()
                .filter(|r| {
                    r.user_id == user_id
                        && r.status == RecommendationStatus::Pending
                        && r.recommended_time >= now
                        && r.recommended_time < day_end
                })
                .max_by(|a, b| a.score.total_cmp(&b.score))
                .cloned())
        }

        fn delete_pending_for_today(
            &self,
            user_id: &str,
            day_start: DateTime<Utc>,
            day_end: DateTime<Utc>,
        ) -> Result<usize, DatabaseError> {
            let mut rows = self.recommendations.borrow_mut();
            let before = rows.len();
            rows.retain(|r| {
                !(r.user_id == user_id
                    && r.status == RecommendationStatus::Pending
                    && r.recommended_time >= day_start
                    && r.recommended_time < day_end)
            });
            Ok(before - rows.len())
        }

        fn insert(&self, recommendation: &Recommendation) -> Result<(), DatabaseError> {
            self.recommendations
                .borrow_mut()
                .push(recommendation.clone());
            Ok(())
        }
    }

    impl ContentStore for MemoryStore {
        fn find_item(
            &self,
            category: BreakCategory,
            target_duration_minutes: i64,
        ) -> Result<Option<ContentItem>, DatabaseError> {
            Ok(BreakMatcher::new()
                .select_item(&self.items, category, target_duration_minutes)
                .cloned())
        }
    }

    #[test]
    fn get_or_generate_serves_then_reuses() {
        let engine = RecommendationEngine::new();
        let user = profile();
        let store = MemoryStore {
            profile: Some(user.clone()),
            meetings: vec![
                meeting(10, 0, 60, "Morning Meeting", 3),
                meeting(14, 0, 30, "Afternoon Sync", 3),
            ],
            ..Default::default()
        };

        let now = at(8, 0);
        let first = engine.get_or_generate(&user.id, now, &store).unwrap().unwrap();
        assert_eq!(store.recommendations.borrow().len(), 1);

        // Second call returns the stored row instead of regenerating.
        let second = engine.get_or_generate(&user.id, now, &store).unwrap().unwrap();
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn get_or_generate_attaches_fitting_content() {
        let engine = RecommendationEngine::new();
        let user = profile();
        let store = MemoryStore {
            profile: Some(user.clone()),
            items: vec![ContentItem {
                id: "body-scan".to_string(),
                title: "Body scan".to_string(),
                description: None,
                category: "meditation".to_string(),
                duration_minutes: 12,
                content_url: None,
                is_active: true,
            }],
            ..Default::default()
        };

        // Empty day: slot duration 15, fallback category meditation.
        let rec = engine
            .get_or_generate(&user.id, at(8, 0), &store)
            .unwrap()
            .unwrap();
        assert_eq!(rec.item_id.as_deref(), Some("body-scan"));
    }

    #[test]
    fn get_or_generate_for_unknown_user_is_an_error() {
        let engine = RecommendationEngine::new();
        let store = MemoryStore::default();
        assert!(engine.get_or_generate("ghost", at(8, 0), &store).is_err());
    }

    #[test]
    fn stale_pending_row_triggers_regeneration() {
        let engine = RecommendationEngine::new();
        let user = profile();
        let store = MemoryStore {
            profile: Some(user.clone()),
            ..Default::default()
        };

        // Seed a pending row whose slot has already passed.
        let mut stale = engine
            .generate(&user, &[], &[], at(7, 0))
            .unwrap()
            .remove(0);
        stale.recommended_time = at(7, 30);
        store.insert(&stale).unwrap();

        let now = at(12, 0);
        let served = engine.get_or_generate(&user.id, now, &store).unwrap().unwrap();
        assert_ne!(served.id, stale.id);
        // The stale pending row was superseded by the regeneration.
        let rows = store.recommendations.borrow();
        assert_eq!(
            rows.iter()
                .filter(|r| r.status == RecommendationStatus::Pending)
                .count(),
            1
        );
    }
}
