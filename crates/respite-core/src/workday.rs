//! Workday boundary calculation.
//!
//! Derives the active window of a day from the meeting list: one hour
//! of slack before the first meeting, thirty minutes after the last,
//! clamped to [06:00, 22:00] local time. An empty day falls back to a
//! fixed 09:00-18:00 default in the user's timezone.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::calendar::Meeting;
use crate::error::ValidationError;

/// The analyzable window of a single day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorkdayWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl WorkdayWindow {
    /// Derive the window for the day `now` falls on.
    ///
    /// Non-empty meeting lists produce [earliest start - 1h,
    /// latest end + 30min]. The clamp to 06:00/22:00 builds both
    /// bounds from the *window start*'s local date; a meeting list
    /// straddling midnight can therefore mis-clamp the end. That
    /// matches the observed behavior this engine replicates and is
    /// kept as-is.
    pub fn for_day(
        meetings: &[Meeting],
        tz: Tz,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        if meetings.is_empty() {
            let today = now.with_timezone(&tz).date_naive();
            return Ok(Self {
                start: local_at(tz, today, 9, 0)?,
                end: local_at(tz, today, 18, 0)?,
            });
        }

        let earliest_start = meetings
            .iter()
            .map(|m| m.start_time)
            .min()
            .unwrap_or(now);
        let latest_end = meetings.iter().map(|m| m.end_time).max().unwrap_or(now);

        let mut start = earliest_start - Duration::hours(1);
        let mut end = latest_end + Duration::minutes(30);

        let reference_date = start.with_timezone(&tz).date_naive();
        let min_start = local_at(tz, reference_date, 6, 0)?;
        let max_end = local_at(tz, reference_date, 22, 0)?;

        start = start.max(min_start);
        end = end.min(max_end);

        Ok(Self { start, end })
    }

    /// Window length in whole minutes.
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant <= self.end
    }
}

/// Resolve a local wall-clock time on `date` to a UTC instant.
///
/// DST-ambiguous times resolve to the earlier occurrence; nonexistent
/// times (spring-forward gap) are a validation error.
pub fn local_at(
    tz: Tz,
    date: NaiveDate,
    hour: u32,
    minute: u32,
) -> Result<DateTime<Utc>, ValidationError> {
    let naive = date
        .and_hms_opt(hour, minute, 0)
        .ok_or_else(|| ValidationError::InvalidValue {
            field: "local_time".to_string(),
            message: format!("{hour:02}:{minute:02} is not a valid wall-clock time"),
        })?;
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| ValidationError::UnrepresentableLocalTime {
            time: naive.to_string(),
            timezone: tz.name().to_string(),
        })
}

/// [midnight, next midnight) of the local day containing `instant`.
pub fn local_day_bounds(
    instant: DateTime<Utc>,
    tz: Tz,
) -> Result<(DateTime<Utc>, DateTime<Utc>), ValidationError> {
    let date = instant.with_timezone(&tz).date_naive();
    let start = local_at(tz, date, 0, 0)?;
    let end = local_at(tz, date + Duration::days(1), 0, 0)?;
    Ok((start, end))
}

/// 23:59:59 local on the day containing `instant`; recommendations
/// expire at the end of the day they were placed in.
pub fn end_of_local_day(instant: DateTime<Utc>, tz: Tz) -> Result<DateTime<Utc>, ValidationError> {
    let date = instant.with_timezone(&tz).date_naive();
    let naive = date
        .and_hms_opt(23, 59, 59)
        .ok_or_else(|| ValidationError::InvalidValue {
            field: "local_time".to_string(),
            message: "23:59:59 rejected".to_string(),
        })?;
    tz.from_local_datetime(&naive)
        .latest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| ValidationError::UnrepresentableLocalTime {
            time: naive.to_string(),
            timezone: tz.name().to_string(),
        })
}

/// Parse an IANA timezone name from a user profile.
pub fn parse_timezone(name: &str) -> Result<Tz, ValidationError> {
    name.parse::<Tz>()
        .map_err(|_| ValidationError::UnknownTimezone(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn tz() -> Tz {
        "America/New_York".parse().unwrap()
    }

    fn local(date: &str, hour: u32, minute: u32) -> DateTime<Utc> {
        let date: NaiveDate = date.parse().unwrap();
        local_at(tz(), date, hour, minute).unwrap()
    }

    fn meeting(date: &str, h: u32, m: u32, minutes: i64, title: &str) -> Meeting {
        let start = local(date, h, m);
        Meeting::new(title, start, start + Duration::minutes(minutes), 3).unwrap()
    }

    #[test]
    fn empty_day_defaults_to_nine_to_six() {
        let now = local("2025-03-18", 8, 0);
        let window = WorkdayWindow::for_day(&[], tz(), now).unwrap();
        assert_eq!(window.start, local("2025-03-18", 9, 0));
        assert_eq!(window.end, local("2025-03-18", 18, 0));
    }

    #[test]
    fn window_wraps_meetings_with_slack() {
        // Meetings 10:00-11:00, 14:00-14:30, 16:00-17:00 -> [09:00, 17:30]
        let meetings = vec![
            meeting("2025-03-18", 10, 0, 60, "Morning Meeting"),
            meeting("2025-03-18", 14, 0, 30, "Afternoon Sync"),
            meeting("2025-03-18", 16, 0, 60, "Final Review"),
        ];
        let now = local("2025-03-18", 8, 0);
        let window = WorkdayWindow::for_day(&meetings, tz(), now).unwrap();
        assert_eq!(window.start, local("2025-03-18", 9, 0));
        assert_eq!(window.end, local("2025-03-18", 17, 30));
    }

    #[test]
    fn early_meeting_clamps_to_six_am() {
        let meetings = vec![meeting("2025-03-18", 6, 30, 60, "Early Client Call")];
        let now = local("2025-03-18", 6, 0);
        let window = WorkdayWindow::for_day(&meetings, tz(), now).unwrap();
        // 6:30 - 1h = 5:30, clamped up to 6:00
        assert_eq!(window.start, local("2025-03-18", 6, 0));
    }

    #[test]
    fn late_meeting_clamps_to_ten_pm() {
        let meetings = vec![
            meeting("2025-03-18", 9, 0, 60, "Kickoff"),
            meeting("2025-03-18", 21, 0, 60, "Late Team Sync"),
        ];
        let now = local("2025-03-18", 9, 0);
        let window = WorkdayWindow::for_day(&meetings, tz(), now).unwrap();
        // 22:00 + 30min clamped back to 22:00
        assert_eq!(window.end, local("2025-03-18", 22, 0));
    }

    #[test]
    fn end_of_local_day_is_last_second() {
        let instant = local("2025-03-18", 14, 0);
        let expiry = end_of_local_day(instant, tz()).unwrap();
        let local_expiry = expiry.with_timezone(&tz());
        assert_eq!(local_expiry.hour(), 23);
        assert_eq!(local_expiry.minute(), 59);
        assert_eq!(local_expiry.second(), 59);
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        assert!(parse_timezone("Mars/Olympus_Mons").is_err());
        assert!(parse_timezone("America/New_York").is_ok());
    }

    #[test]
    fn local_day_bounds_cover_24h_on_normal_days() {
        let now = local("2025-03-18", 12, 0);
        let (start, end) = local_day_bounds(now, tz()).unwrap();
        assert_eq!((end - start).num_hours(), 24);
        assert!(start <= now && now < end);
    }
}
