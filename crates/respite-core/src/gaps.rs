//! Break opportunity detection in calendar gaps.
//!
//! Sweeps the day's meetings inside the workday window and emits a
//! candidate break slot for every gap of at least fifteen minutes.
//! Neighbor meetings are referenced by index into the caller's meeting
//! slice rather than by embedded copies; meetings are read-only inputs
//! and need no back-references.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::calendar::Meeting;
use crate::workday::WorkdayWindow;

/// Minimum actionable gap between meetings, in minutes.
pub const MIN_GAP_MINUTES: i64 = 15;
/// Buffer subtracted from a gap when sizing the break.
pub const GAP_BUFFER_MINUTES: i64 = 5;
/// Longest break ever offered.
pub const MAX_BREAK_MINUTES: i64 = 30;
/// Offset after a preceding meeting before the break starts.
pub const START_BUFFER_MINUTES: i64 = 2;

/// Where in the day a gap was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapKind {
    BeforeFirst,
    BetweenMeetings,
    AfterLast,
    EmptyDay,
}

impl GapKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GapKind::BeforeFirst => "before_first",
            GapKind::BetweenMeetings => "between_meetings",
            GapKind::AfterLast => "after_last",
            GapKind::EmptyDay => "empty_day",
        }
    }
}

/// A candidate break slot, before scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakOpportunity {
    pub start_time: chrono::DateTime<chrono::Utc>,
    pub duration_minutes: i64,
    pub kind: GapKind,
    /// Index of the meeting ending before this slot, if any.
    pub preceding: Option<usize>,
    /// Index of the meeting starting after this slot, if any.
    pub following: Option<usize>,
}

/// Gap finder over a day's meetings.
///
/// Operates on the start-sorted sequence without merging overlapping
/// intervals; a pathologically overlapping calendar may under- or
/// over-report gaps. Callers get the calendar as the provider ships it.
#[derive(Debug, Clone)]
pub struct GapFinder {
    min_gap_minutes: i64,
    max_break_minutes: i64,
}

impl Default for GapFinder {
    fn default() -> Self {
        Self {
            min_gap_minutes: MIN_GAP_MINUTES,
            max_break_minutes: MAX_BREAK_MINUTES,
        }
    }
}

impl GapFinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find break opportunities for a day.
    ///
    /// An empty day synthesizes two fallback slots two and five hours
    /// into the window. Otherwise candidates come out in day order:
    /// before the first meeting, between adjacent pairs, after the
    /// last meeting.
    pub fn find(&self, meetings: &[Meeting], window: &WorkdayWindow) -> Vec<BreakOpportunity> {
        if meetings.is_empty() {
            return vec![
                BreakOpportunity {
                    start_time: window.start + Duration::hours(2),
                    duration_minutes: 15,
                    kind: GapKind::EmptyDay,
                    preceding: None,
                    following: None,
                },
                BreakOpportunity {
                    start_time: window.start + Duration::hours(5),
                    duration_minutes: 15,
                    kind: GapKind::EmptyDay,
                    preceding: None,
                    following: None,
                },
            ];
        }

        // Sort indices by start time; the indices keep pointing into
        // the caller's slice.
        let mut order: Vec<usize> = (0..meetings.len()).collect();
        order.sort_by_key(|&i| meetings[i].start_time);

        let mut opportunities = Vec::new();

        let first = &meetings[order[0]];
        let lead_gap = (first.start_time - window.start).num_minutes();
        if lead_gap >= self.min_gap_minutes {
            opportunities.push(BreakOpportunity {
                start_time: window.start,
                duration_minutes: self.break_length(lead_gap),
                kind: GapKind::BeforeFirst,
                preceding: None,
                following: Some(order[0]),
            });
        }

        for pair in order.windows(2) {
            let (current, next) = (&meetings[pair[0]], &meetings[pair[1]]);
            let gap = (next.start_time - current.end_time).num_minutes();
            if gap >= self.min_gap_minutes {
                opportunities.push(BreakOpportunity {
                    start_time: current.end_time + Duration::minutes(START_BUFFER_MINUTES),
                    duration_minutes: self.break_length(gap),
                    kind: GapKind::BetweenMeetings,
                    preceding: Some(pair[0]),
                    following: Some(pair[1]),
                });
            }
        }

        let last_idx = order[order.len() - 1];
        let last = &meetings[last_idx];
        let tail_gap = (window.end - last.end_time).num_minutes();
        if tail_gap >= self.min_gap_minutes {
            opportunities.push(BreakOpportunity {
                start_time: last.end_time + Duration::minutes(START_BUFFER_MINUTES),
                duration_minutes: self.break_length(tail_gap),
                kind: GapKind::AfterLast,
                preceding: Some(last_idx),
                following: None,
            });
        }

        opportunities
    }

    fn break_length(&self, gap_minutes: i64) -> i64 {
        (gap_minutes - GAP_BUFFER_MINUTES).min(self.max_break_minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workday::local_at;
    use chrono::{DateTime, Duration, NaiveDate, Utc};
    use chrono_tz::Tz;
    use proptest::prelude::*;

    fn tz() -> Tz {
        "America/New_York".parse().unwrap()
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        let date: NaiveDate = "2025-03-18".parse().unwrap();
        local_at(tz(), date, h, m).unwrap()
    }

    fn meeting(h: u32, m: u32, minutes: i64) -> Meeting {
        Meeting::new("Sync", at(h, m), at(h, m) + Duration::minutes(minutes), 3).unwrap()
    }

    fn window(start_h: u32, end_h: u32) -> WorkdayWindow {
        WorkdayWindow {
            start: at(start_h, 0),
            end: at(end_h, 0),
        }
    }

    #[test]
    fn empty_day_synthesizes_two_slots_three_hours_apart() {
        let finder = GapFinder::new();
        let w = window(9, 18);
        let slots = finder.find(&[], &w);
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].start_time, at(11, 0));
        assert_eq!(slots[1].start_time, at(14, 0));
        assert_eq!(slots[1].start_time - slots[0].start_time, Duration::hours(3));
        for slot in &slots {
            assert_eq!(slot.duration_minutes, 15);
            assert_eq!(slot.kind, GapKind::EmptyDay);
            assert!(slot.preceding.is_none() && slot.following.is_none());
        }
    }

    #[test]
    fn finds_all_three_gap_kinds() {
        let finder = GapFinder::new();
        let meetings = vec![meeting(10, 0, 60), meeting(12, 0, 60)];
        let slots = finder.find(&meetings, &window(9, 18));

        assert_eq!(slots.len(), 3);
        assert_eq!(slots[0].kind, GapKind::BeforeFirst);
        assert_eq!(slots[0].start_time, at(9, 0));
        assert_eq!(slots[0].duration_minutes, 30); // min(60 - 5, 30)
        assert_eq!(slots[0].following, Some(0));

        assert_eq!(slots[1].kind, GapKind::BetweenMeetings);
        assert_eq!(slots[1].start_time, at(11, 2)); // 11:00 end + 2min
        assert_eq!(slots[1].preceding, Some(0));
        assert_eq!(slots[1].following, Some(1));

        assert_eq!(slots[2].kind, GapKind::AfterLast);
        assert_eq!(slots[2].start_time, at(13, 2));
        assert_eq!(slots[2].preceding, Some(1));
    }

    #[test]
    fn five_minute_gaps_yield_no_between_candidates() {
        // Back-to-back 25-minute meetings every 30 minutes, 09:00-17:00.
        let finder = GapFinder::new();
        let mut meetings = Vec::new();
        for hour in 9..17 {
            for slot in [0, 30] {
                meetings.push(meeting(hour, slot, 25));
            }
        }
        let slots = finder.find(&meetings, &window(8, 18));
        assert!(slots
            .iter()
            .all(|s| s.kind != GapKind::BetweenMeetings));
        // Window slack still leaves boundary candidates.
        assert!(slots.iter().any(|s| s.kind == GapKind::BeforeFirst));
        assert!(slots.iter().any(|s| s.kind == GapKind::AfterLast));
    }

    #[test]
    fn exactly_fifteen_minute_gap_qualifies() {
        let finder = GapFinder::new();
        let meetings = vec![meeting(10, 0, 60), meeting(11, 15, 30)];
        let slots = finder.find(&meetings, &window(10, 12));
        let between: Vec<_> = slots
            .iter()
            .filter(|s| s.kind == GapKind::BetweenMeetings)
            .collect();
        assert_eq!(between.len(), 1);
        assert_eq!(between[0].duration_minutes, 10); // 15 - 5
    }

    #[test]
    fn unsorted_input_is_handled() {
        let finder = GapFinder::new();
        let meetings = vec![meeting(14, 0, 30), meeting(10, 0, 60)];
        let slots = finder.find(&meetings, &window(9, 18));
        let between: Vec<_> = slots
            .iter()
            .filter(|s| s.kind == GapKind::BetweenMeetings)
            .collect();
        assert_eq!(between.len(), 1);
        // Neighbor indices point into the original, unsorted slice.
        assert_eq!(between[0].preceding, Some(1));
        assert_eq!(between[0].following, Some(0));
    }

    proptest! {
        #[test]
        fn candidates_stay_inside_the_window(
            layout in proptest::collection::vec((9u32..17, 0u32..2, 10i64..90), 0..8)
        ) {
            let finder = GapFinder::new();
            let meetings: Vec<Meeting> = layout
                .iter()
                .map(|&(h, half, minutes)| meeting(h, half * 30, minutes))
                .collect();
            let w = window(8, 22);
            for slot in finder.find(&meetings, &w) {
                prop_assert!(slot.duration_minutes > 0);
                if slot.kind != GapKind::EmptyDay {
                    let end = slot.start_time + Duration::minutes(slot.duration_minutes);
                    prop_assert!(end <= w.end);
                    prop_assert!(slot.start_time >= w.start);
                }
            }
        }
    }
}
