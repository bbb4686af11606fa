use chrono::Utc;
use clap::Subcommand;
use respite_core::workday::{local_day_bounds, WorkdayWindow};
use respite_core::{CalendarStore, Database, RecommendationEngine};

use super::common::{resolve_user, user_timezone, CliResult};

#[derive(Subcommand)]
pub enum DayAction {
    /// Summarize today's meetings: count, intensity, tag histogram
    Analyze {
        #[arg(long)]
        user: Option<String>,
    },
    /// Show today's derived workday window
    Window {
        #[arg(long)]
        user: Option<String>,
    },
}

pub fn run(action: DayAction) -> CliResult {
    let db = Database::open()?;
    match action {
        DayAction::Analyze { user } => {
            let profile = resolve_user(&db, user.as_deref())?;
            let tz = user_timezone(&profile)?;
            let (day_start, day_end) = local_day_bounds(Utc::now(), tz)?;
            let meetings = db.meetings_between(&profile.id, day_start, day_end)?;
            let analysis = RecommendationEngine::new().analyze_day(&meetings);
            println!("{}", serde_json::to_string_pretty(&analysis)?);
        }
        DayAction::Window { user } => {
            let profile = resolve_user(&db, user.as_deref())?;
            let tz = user_timezone(&profile)?;
            let now = Utc::now();
            let (day_start, day_end) = local_day_bounds(now, tz)?;
            let meetings = db.meetings_between(&profile.id, day_start, day_end)?;
            let window = WorkdayWindow::for_day(&meetings, tz, now)?;
            println!(
                "workday {} - {}",
                window.start.with_timezone(&tz).format("%H:%M"),
                window.end.with_timezone(&tz).format("%H:%M"),
            );
        }
    }
    Ok(())
}
