//! Opportunity scoring.
//!
//! Assigns each candidate break slot an additive desirability score:
//! longer gaps, longer stretches since the last break, draining
//! neighboring meetings, and known good times of day all push the
//! score up. Scores are unbounded here; normalization to [0, 1]
//! happens when a recommendation record is created.

use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::calendar::Meeting;
use crate::classify::{MeetingClassifier, MeetingContext};
use crate::gaps::BreakOpportunity;

/// A candidate slot with its score and resolved neighbor context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredOpportunity {
    pub opportunity: BreakOpportunity,
    pub score: f64,
    pub preceding: Option<MeetingContext>,
    pub following: Option<MeetingContext>,
}

impl ScoredOpportunity {
    /// Local hour of the candidate start in the user's timezone.
    pub fn local_hour(&self, tz: Tz) -> u32 {
        self.opportunity.start_time.with_timezone(&tz).hour()
    }
}

/// Scorer for break opportunities.
#[derive(Debug, Clone, Default)]
pub struct OpportunityScorer {
    classifier: MeetingClassifier,
}

impl OpportunityScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_classifier(classifier: MeetingClassifier) -> Self {
        Self { classifier }
    }

    /// Score one candidate. Base 1.0, strictly additive.
    ///
    /// `recent_breaks` holds the instants of breaks already taken
    /// today; an empty list means no break yet and earns a flat bonus.
    pub fn score(
        &self,
        opportunity: &BreakOpportunity,
        meetings: &[Meeting],
        recent_breaks: &[DateTime<Utc>],
        tz: Tz,
    ) -> f64 {
        let mut score = 1.0;

        score += match opportunity.duration_minutes {
            d if d >= 30 => 3.0,
            d if d >= 20 => 2.0,
            d if d >= 15 => 1.0,
            _ => 0.0,
        };

        score += match recent_breaks.iter().max() {
            None => 2.0,
            Some(last) => {
                let hours_since =
                    (opportunity.start_time - *last).num_seconds() as f64 / 3600.0;
                if hours_since >= 3.0 {
                    3.0
                } else if hours_since >= 2.0 {
                    2.0
                } else if hours_since >= 1.0 {
                    1.0
                } else {
                    0.0
                }
            }
        };

        if let Some(idx) = opportunity.preceding {
            if let Some(meeting) = meetings.get(idx) {
                score += f64::from(self.classifier.context(meeting).intensity) * 0.3;
            }
        }
        if let Some(idx) = opportunity.following {
            if let Some(meeting) = meetings.get(idx) {
                score += f64::from(self.classifier.context(meeting).intensity) * 0.2;
            }
        }

        score += match opportunity.start_time.with_timezone(&tz).hour() {
            10..=11 => 1.5,
            14..=15 => 2.0,
            16..=17 => 1.5,
            _ => 0.0,
        };

        score
    }

    /// Score every candidate, resolving neighbor contexts once.
    pub fn score_all(
        &self,
        opportunities: &[BreakOpportunity],
        meetings: &[Meeting],
        recent_breaks: &[DateTime<Utc>],
        tz: Tz,
    ) -> Vec<ScoredOpportunity> {
        opportunities
            .iter()
            .map(|opportunity| {
                let context_of = |idx: Option<usize>| {
                    idx.and_then(|i| meetings.get(i))
                        .map(|m| self.classifier.context(m))
                };
                ScoredOpportunity {
                    score: self.score(opportunity, meetings, recent_breaks, tz),
                    preceding: context_of(opportunity.preceding),
                    following: context_of(opportunity.following),
                    opportunity: opportunity.clone(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gaps::GapKind;
    use crate::workday::local_at;
    use chrono::{Duration, NaiveDate};

    fn tz() -> Tz {
        "America/New_York".parse().unwrap()
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        let date: NaiveDate = "2025-03-18".parse().unwrap();
        local_at(tz(), date, h, m).unwrap()
    }

    fn slot(h: u32, m: u32, duration: i64) -> BreakOpportunity {
        BreakOpportunity {
            start_time: at(h, m),
            duration_minutes: duration,
            kind: GapKind::BetweenMeetings,
            preceding: None,
            following: None,
        }
    }

    #[test]
    fn base_score_with_no_signals() {
        let scorer = OpportunityScorer::new();
        // 13:00, 10 minutes, break taken 30 minutes ago: no bonuses.
        let recent = vec![at(12, 30)];
        let score = scorer.score(&slot(13, 0, 10), &[], &recent, tz());
        assert!((score - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn duration_tiers() {
        let scorer = OpportunityScorer::new();
        let recent = vec![at(12, 45)];
        let short = scorer.score(&slot(13, 0, 15), &[], &recent, tz());
        let medium = scorer.score(&slot(13, 0, 20), &[], &recent, tz());
        let long = scorer.score(&slot(13, 0, 30), &[], &recent, tz());
        assert!((short - 2.0).abs() < f64::EPSILON);
        assert!((medium - 3.0).abs() < f64::EPSILON);
        assert!((long - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn no_break_yet_today_earns_flat_bonus() {
        let scorer = OpportunityScorer::new();
        let score = scorer.score(&slot(13, 0, 10), &[], &[], tz());
        assert!((score - 3.0).abs() < f64::EPSILON); // 1.0 + 2.0
    }

    #[test]
    fn recency_tiers_use_most_recent_break() {
        let scorer = OpportunityScorer::new();
        let candidate = slot(13, 0, 10);
        // Breaks at 08:00 and 11:30; only the 11:30 one counts.
        let recent = vec![at(8, 0), at(11, 30)];
        let score = scorer.score(&candidate, &[], &recent, tz());
        assert!((score - 2.0).abs() < f64::EPSILON); // 1h30 since -> +1.0

        let recent = vec![at(9, 30)];
        let score = scorer.score(&candidate, &[], &recent, tz());
        assert!((score - 4.0).abs() < f64::EPSILON); // 3h30 -> +3.0
    }

    #[test]
    fn neighbor_intensity_weights() {
        let scorer = OpportunityScorer::new();
        let meetings = vec![
            Meeting::new("Quarterly Review - URGENT", at(11, 0), at(13, 0), 10).unwrap(),
        ];
        let recent = vec![at(12, 45)];

        let mut candidate = slot(13, 2, 10);
        candidate.preceding = Some(0);
        let preceding_score = scorer.score(&candidate, &meetings, &recent, tz());
        assert!((preceding_score - (1.0 + 10.0 * 0.3)).abs() < 1e-9);

        let mut candidate = slot(13, 2, 10);
        candidate.following = Some(0);
        let following_score = scorer.score(&candidate, &meetings, &recent, tz());
        assert!((following_score - (1.0 + 10.0 * 0.2)).abs() < 1e-9);
    }

    #[test]
    fn time_of_day_bands() {
        let scorer = OpportunityScorer::new();
        let recent = vec![at(5, 0)];
        // Kill recency variance by making every slot >= 3h after the break.
        let at_hour = |h| scorer.score(&slot(h, 0, 10), &[], &recent, tz()) - 4.0;
        assert!((at_hour(10) - 1.5).abs() < f64::EPSILON);
        assert!((at_hour(11) - 1.5).abs() < f64::EPSILON);
        assert!((at_hour(14) - 2.0).abs() < f64::EPSILON);
        assert!((at_hour(15) - 2.0).abs() < f64::EPSILON);
        assert!((at_hour(16) - 1.5).abs() < f64::EPSILON);
        assert!((at_hour(17) - 1.5).abs() < f64::EPSILON);
        assert!(at_hour(13).abs() < f64::EPSILON);
        assert!(at_hour(9).abs() < f64::EPSILON);
    }

    #[test]
    fn score_all_resolves_neighbor_contexts() {
        let scorer = OpportunityScorer::new();
        let meetings = vec![
            Meeting::new("Design Workshop", at(10, 0), at(11, 0), 5).unwrap(),
            Meeting::new("Board Presentation", at(12, 0), at(13, 0), 12).unwrap(),
        ];
        let candidate = BreakOpportunity {
            start_time: at(11, 2),
            duration_minutes: 30,
            kind: GapKind::BetweenMeetings,
            preceding: Some(0),
            following: Some(1),
        };
        let scored = scorer.score_all(&[candidate], &meetings, &[], tz());
        assert_eq!(scored.len(), 1);
        let preceding = scored[0].preceding.as_ref().unwrap();
        let following = scored[0].following.as_ref().unwrap();
        assert_eq!(preceding.title, "Design Workshop");
        assert_eq!(following.intensity, 10);
    }
}
