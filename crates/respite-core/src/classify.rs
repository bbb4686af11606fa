//! Meeting classification heuristics.
//!
//! Pure functions over a meeting's title, duration, and attendee count:
//! an intensity score (1-10, how draining the meeting is) and a set of
//! type tags used for break-category matching.
//!
//! Intensity uses first-match-wins keyword buckets (stress, then
//! creative, then social), while `classify` reports every bucket that
//! matched. The asymmetry is deliberate; callers depend on both
//! behaviors.

use serde::{Deserialize, Serialize};

use crate::calendar::Meeting;

/// Keyword buckets matched case-insensitively as substrings of a
/// meeting title. Static configuration data, injected into the
/// classifier so tests can override individual buckets.
#[derive(Debug, Clone, Copy)]
pub struct KeywordTable {
    pub stress: &'static [&'static str],
    pub creative: &'static [&'static str],
    pub social: &'static [&'static str],
    pub focus: &'static [&'static str],
}

pub const STRESS_KEYWORDS: &[&str] = &[
    "review", "deadline", "urgent", "presentation", "demo", "pitch", "interview", "performance",
    "quarterly", "annual", "board", "crisis", "escalation", "critical", "emergency",
];

pub const CREATIVE_KEYWORDS: &[&str] = &[
    "brainstorm", "ideation", "design", "planning", "strategy", "workshop", "creative",
    "innovation", "concept", "roadmap",
];

pub const SOCIAL_KEYWORDS: &[&str] = &[
    "1:1", "one-on-one", "team", "all-hands", "standup", "social", "coffee", "lunch",
    "networking", "meet", "sync", "check-in",
];

pub const FOCUS_KEYWORDS: &[&str] = &[
    "blocked", "focus time", "deep work", "coding", "writing", "analysis", "research",
    "documentation", "study",
];

impl Default for KeywordTable {
    fn default() -> Self {
        Self {
            stress: STRESS_KEYWORDS,
            creative: CREATIVE_KEYWORDS,
            social: SOCIAL_KEYWORDS,
            focus: FOCUS_KEYWORDS,
        }
    }
}

/// Type tag assigned to a meeting from its title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingTag {
    HighStress,
    Creative,
    Social,
    Focus,
    General,
}

impl MeetingTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeetingTag::HighStress => "high_stress",
            MeetingTag::Creative => "creative",
            MeetingTag::Social => "social",
            MeetingTag::Focus => "focus",
            MeetingTag::General => "general",
        }
    }
}

/// Summary of a single meeting used when scoring and matching the
/// neighbors of a break slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingContext {
    /// First matching tag (or General)
    pub primary: MeetingTag,
    /// Every tag that matched
    pub tags: Vec<MeetingTag>,
    /// Intensity score, 1-10
    pub intensity: u8,
    pub title: String,
}

impl MeetingContext {
    pub fn has_tag(&self, tag: MeetingTag) -> bool {
        self.tags.contains(&tag)
    }
}

/// Classifier over meeting titles, durations, and attendee counts.
#[derive(Debug, Clone, Default)]
pub struct MeetingClassifier {
    keywords: KeywordTable,
}

impl MeetingClassifier {
    /// Create a classifier with the built-in keyword table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a classifier with a custom keyword table.
    pub fn with_keywords(keywords: KeywordTable) -> Self {
        Self { keywords }
    }

    /// Calculate meeting intensity (1-10).
    ///
    /// Base 1; the stress/creative/social buckets are mutually
    /// exclusive here, checked in that order. Duration and attendee
    /// tiers add on top, and the sum is capped at 10.
    pub fn intensity(&self, title: &str, duration_minutes: i64, attendee_count: u32) -> u8 {
        let mut score: u8 = 1;
        let title_lower = title.to_lowercase();

        if matches_any(&title_lower, self.keywords.stress) {
            score += 4;
        } else if matches_any(&title_lower, self.keywords.creative) {
            score += 2;
        } else if matches_any(&title_lower, self.keywords.social) {
            score += 1;
        }

        if duration_minutes >= 120 {
            score += 3;
        } else if duration_minutes >= 60 {
            score += 2;
        } else if duration_minutes >= 30 {
            score += 1;
        }

        if attendee_count >= 10 {
            score += 3;
        } else if attendee_count >= 6 {
            score += 2;
        } else if attendee_count >= 3 {
            score += 1;
        }

        score.min(10)
    }

    /// Classify a meeting title into type tags.
    ///
    /// Unlike `intensity`, every bucket is tested independently and all
    /// matches are returned. Falls back to `[General]` when nothing
    /// matched.
    pub fn classify(&self, title: &str) -> Vec<MeetingTag> {
        let mut tags = Vec::new();
        let title_lower = title.to_lowercase();

        if matches_any(&title_lower, self.keywords.stress) {
            tags.push(MeetingTag::HighStress);
        }
        if matches_any(&title_lower, self.keywords.creative) {
            tags.push(MeetingTag::Creative);
        }
        if matches_any(&title_lower, self.keywords.social) {
            tags.push(MeetingTag::Social);
        }
        if matches_any(&title_lower, self.keywords.focus) {
            tags.push(MeetingTag::Focus);
        }

        if tags.is_empty() {
            tags.push(MeetingTag::General);
        }
        tags
    }

    /// Build the full context summary for one meeting.
    pub fn context(&self, meeting: &Meeting) -> MeetingContext {
        let tags = self.classify(&meeting.title);
        let intensity = self.intensity(
            &meeting.title,
            meeting.duration_minutes(),
            meeting.attendee_count,
        );
        MeetingContext {
            primary: tags[0],
            tags,
            intensity,
            title: meeting.title.clone(),
        }
    }
}

fn matches_any(title_lower: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| title_lower.contains(kw))
}
