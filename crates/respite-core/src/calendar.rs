//! Calendar meeting inputs.
//!
//! Meetings are read-only inputs to the engine; synchronization with a
//! calendar provider happens outside this crate and hands us a plain
//! list of intervals for the day.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A calendar meeting for a single day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meeting {
    pub id: String,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Number of attendees, including the user. Always >= 1.
    pub attendee_count: u32,
}

impl Meeting {
    /// Create a meeting, validating that `end_time > start_time`.
    pub fn new(
        title: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        attendee_count: u32,
    ) -> Result<Self, ValidationError> {
        if end_time <= start_time {
            return Err(ValidationError::InvalidTimeRange {
                start: start_time,
                end: end_time,
            });
        }
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            start_time,
            end_time,
            attendee_count: attendee_count.max(1),
        })
    }

    /// Meeting length in whole minutes.
    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }

    /// Check if this meeting overlaps with a time range.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_time < end && self.end_time > start
    }
}

/// Validate a whole day's meeting list before analysis.
///
/// The engine fails fast on the first malformed interval; a generation
/// call never produces partial output from bad input.
pub fn validate_meetings(meetings: &[Meeting]) -> Result<(), ValidationError> {
    for meeting in meetings {
        if meeting.end_time <= meeting.start_time {
            return Err(ValidationError::InvalidTimeRange {
                start: meeting.start_time,
                end: meeting.end_time,
            });
        }
    }
    Ok(())
}
