//! Break category matching and content selection.
//!
//! Maps the winning slot's context (neighboring meeting types, time of
//! day, the user's stated challenge) to a break category, then picks a
//! content item from the library whose duration fits the slot.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::classify::MeetingTag;
use crate::scoring::ScoredOpportunity;

/// Content label for a break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakCategory {
    Meditation,
    Movement,
    Breathing,
    Energizing,
    Mindfulness,
    Confidence,
}

impl BreakCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakCategory::Meditation => "meditation",
            BreakCategory::Movement => "movement",
            BreakCategory::Breathing => "breathing",
            BreakCategory::Energizing => "energizing",
            BreakCategory::Mindfulness => "mindfulness",
            BreakCategory::Confidence => "confidence",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "meditation" => Some(BreakCategory::Meditation),
            "movement" => Some(BreakCategory::Movement),
            "breathing" => Some(BreakCategory::Breathing),
            "energizing" => Some(BreakCategory::Energizing),
            "mindfulness" => Some(BreakCategory::Mindfulness),
            "confidence" => Some(BreakCategory::Confidence),
            _ => None,
        }
    }
}

impl std::fmt::Display for BreakCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The user's stated biggest challenge from onboarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Challenge {
    Meetings,
    Focus,
    Energy,
    Stress,
    Anxiety,
}

impl Challenge {
    pub fn as_str(&self) -> &'static str {
        match self {
            Challenge::Meetings => "meetings",
            Challenge::Focus => "focus",
            Challenge::Energy => "energy",
            Challenge::Stress => "stress",
            Challenge::Anxiety => "anxiety",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "meetings" => Some(Challenge::Meetings),
            "focus" => Some(Challenge::Focus),
            "energy" => Some(Challenge::Energy),
            "stress" => Some(Challenge::Stress),
            "anxiety" => Some(Challenge::Anxiety),
            _ => None,
        }
    }

    /// Fallback category when no context rule fires.
    fn default_category(self) -> BreakCategory {
        match self {
            Challenge::Stress | Challenge::Anxiety => BreakCategory::Meditation,
            Challenge::Energy | Challenge::Focus => BreakCategory::Movement,
            Challenge::Meetings => BreakCategory::Meditation,
        }
    }
}

/// A break content item from the library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    /// Free-form category label, matched loosely against [`BreakCategory`]
    pub category: String,
    pub duration_minutes: i64,
    pub content_url: Option<String>,
    pub is_active: bool,
}

/// Matcher for break categories and content items.
#[derive(Debug, Clone, Copy, Default)]
pub struct BreakMatcher;

impl BreakMatcher {
    pub fn new() -> Self {
        Self
    }

    /// Select the break category for the winning slot.
    ///
    /// Rules are checked in order, first match wins:
    /// 1. preceding tagged high_stress -> meditation
    /// 2. preceding tagged creative -> movement
    /// 3. preceding intensity >= 7 -> breathing
    /// 4. following tagged high_stress -> breathing
    /// 5. following title contains "presentation" -> confidence
    /// 6. local hour in 14..=16 -> energizing
    /// 7. local hour >= 17 -> mindfulness
    /// 8. the user's challenge default, else meditation
    pub fn select_category(
        &self,
        scored: &ScoredOpportunity,
        challenge: Option<Challenge>,
        tz: Tz,
    ) -> BreakCategory {
        if let Some(preceding) = &scored.preceding {
            if preceding.has_tag(MeetingTag::HighStress) {
                return BreakCategory::Meditation;
            }
            if preceding.has_tag(MeetingTag::Creative) {
                return BreakCategory::Movement;
            }
            if preceding.intensity >= 7 {
                return BreakCategory::Breathing;
            }
        }

        if let Some(following) = &scored.following {
            if following.has_tag(MeetingTag::HighStress) {
                return BreakCategory::Breathing;
            }
            if following.title.to_lowercase().contains("presentation") {
                return BreakCategory::Confidence;
            }
        }

        match scored.local_hour(tz) {
            14..=16 => BreakCategory::Energizing,
            h if h >= 17 => BreakCategory::Mindfulness,
            _ => challenge
                .map(Challenge::default_category)
                .unwrap_or(BreakCategory::Meditation),
        }
    }

    /// Pick a content item for the chosen category and slot length.
    ///
    /// First active item whose category loosely matches and whose
    /// duration lies within [max(requested-5, 5), requested+2] minutes;
    /// falls back to any active item no longer than requested+2. `None`
    /// means the recommendation ships without a content reference.
    pub fn select_item<'a>(
        &self,
        items: &'a [ContentItem],
        category: BreakCategory,
        requested_minutes: i64,
    ) -> Option<&'a ContentItem> {
        let min = (requested_minutes - 5).max(5);
        let max = requested_minutes + 2;

        items
            .iter()
            .find(|item| {
                item.is_active
                    && item.category.to_lowercase().contains(category.as_str())
                    && item.duration_minutes >= min
                    && item.duration_minutes <= max
            })
            .or_else(|| {
                items
                    .iter()
                    .find(|item| item.is_active && item.duration_minutes <= max)
            })
    }
}
