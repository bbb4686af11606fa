use chrono::Utc;
use clap::Subcommand;
use respite_core::workday::local_day_bounds;
use respite_core::{CalendarStore, Database, Meeting};

use super::common::{parse_time, resolve_user, user_timezone, CliResult};

#[derive(Subcommand)]
pub enum CalendarAction {
    /// Add a meeting to today's calendar
    Add {
        /// Meeting title
        title: String,
        /// Start time (RFC3339 or HH:MM local)
        start: String,
        /// End time (RFC3339 or HH:MM local)
        end: String,
        /// Attendee count
        #[arg(long, default_value_t = 1)]
        attendees: u32,
        /// Acting user email
        #[arg(long)]
        user: Option<String>,
    },
    /// List today's meetings
    List {
        #[arg(long)]
        user: Option<String>,
    },
    /// Remove today's meetings
    Clear {
        #[arg(long)]
        user: Option<String>,
    },
}

pub fn run(action: CalendarAction) -> CliResult {
    let db = Database::open()?;
    match action {
        CalendarAction::Add {
            title,
            start,
            end,
            attendees,
            user,
        } => {
            let profile = resolve_user(&db, user.as_deref())?;
            let tz = user_timezone(&profile)?;
            let meeting = Meeting::new(
                title,
                parse_time(&start, tz)?,
                parse_time(&end, tz)?,
                attendees,
            )?;
            db.insert_meeting(&profile.id, &meeting)?;
            println!("meeting added: {}", meeting.id);
        }
        CalendarAction::List { user } => {
            let profile = resolve_user(&db, user.as_deref())?;
            let tz = user_timezone(&profile)?;
            let (day_start, day_end) = local_day_bounds(Utc::now(), tz)?;
            for meeting in db.meetings_between(&profile.id, day_start, day_end)? {
                println!(
                    "{} - {}  {} ({} attendees)",
                    meeting.start_time.with_timezone(&tz).format("%H:%M"),
                    meeting.end_time.with_timezone(&tz).format("%H:%M"),
                    meeting.title,
                    meeting.attendee_count,
                );
            }
        }
        CalendarAction::Clear { user } => {
            let profile = resolve_user(&db, user.as_deref())?;
            let tz = user_timezone(&profile)?;
            let (day_start, day_end) = local_day_bounds(Utc::now(), tz)?;
            let deleted = db.delete_meetings_between(&profile.id, day_start, day_end)?;
            println!("removed {deleted} meetings");
        }
    }
    Ok(())
}
