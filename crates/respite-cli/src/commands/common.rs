//! Shared helpers for CLI commands.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use respite_core::workday::local_at;
use respite_core::{Config, Database, UserProfile};

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Resolve the acting user: an explicit --user email, else the
/// configured default.
pub fn resolve_user(db: &Database, explicit: Option<&str>) -> CliResult<UserProfile> {
    let config = Config::load_or_default();
    let email = explicit
        .map(str::to_string)
        .or(config.default_user)
        .ok_or("no user given; pass --user or set default_user in config.toml")?;
    db.find_profile_by_email(&email)?
        .ok_or_else(|| format!("no profile for {email}; run `profile set` first").into())
}

/// Parse the user's IANA timezone.
pub fn user_timezone(profile: &UserProfile) -> CliResult<Tz> {
    Ok(respite_core::workday::parse_timezone(&profile.timezone)?)
}

/// Parse a time argument: RFC3339, or "HH:MM" taken as today in the
/// user's timezone.
pub fn parse_time(input: &str, tz: Tz) -> CliResult<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }
    let parts: Vec<&str> = input.split(':').collect();
    if parts.len() == 2 {
        if let (Ok(hour), Ok(minute)) = (parts[0].parse(), parts[1].parse()) {
            let today = Utc::now().with_timezone(&tz).date_naive();
            return Ok(local_at(tz, today, hour, minute)?);
        }
    }
    Err(format!("cannot parse time {input:?}; use RFC3339 or HH:MM").into())
}
