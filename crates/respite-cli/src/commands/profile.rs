use clap::Subcommand;
use respite_core::{Challenge, Config, Database, UserProfile};

use super::common::CliResult;

#[derive(Subcommand)]
pub enum ProfileAction {
    /// Create or update a profile
    Set {
        /// Email identifying the profile
        email: String,
        /// IANA timezone name, e.g. America/New_York
        #[arg(long)]
        timezone: Option<String>,
        /// Full name
        #[arg(long)]
        name: Option<String>,
        /// Biggest challenge: meetings, focus, energy, stress, anxiety
        #[arg(long)]
        challenge: Option<String>,
        /// Preferred break duration in minutes
        #[arg(long)]
        duration: Option<i64>,
        /// Make this the CLI's default user
        #[arg(long)]
        default: bool,
    },
    /// Show a profile
    Show {
        /// Email (defaults to the configured default user)
        email: Option<String>,
    },
    /// List all profiles
    List,
}

pub fn run(action: ProfileAction) -> CliResult {
    let db = Database::open()?;
    match action {
        ProfileAction::Set {
            email,
            timezone,
            name,
            challenge,
            duration,
            default,
        } => {
            let config = Config::load_or_default();
            let mut profile = db
                .find_profile_by_email(&email)?
                .unwrap_or_else(|| {
                    let mut p = UserProfile::new(email.clone(), "UTC");
                    p.preferred_break_duration = config.engine.default_break_duration;
                    p
                });
            if let Some(timezone) = timezone {
                respite_core::workday::parse_timezone(&timezone)?;
                profile.timezone = timezone;
            }
            if let Some(name) = name {
                profile.full_name = Some(name);
            }
            if let Some(challenge) = challenge {
                profile.biggest_challenge = Some(
                    Challenge::parse(&challenge)
                        .ok_or_else(|| format!("unknown challenge {challenge:?}"))?,
                );
            }
            if let Some(duration) = duration {
                profile.preferred_break_duration = duration;
            }
            db.upsert_profile(&profile)?;

            if default {
                let mut config = config;
                config.default_user = Some(email.clone());
                config.save()?;
            }
            println!("profile saved: {email}");
        }
        ProfileAction::Show { email } => {
            let profile = super::common::resolve_user(&db, email.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        ProfileAction::List => {
            for profile in db.list_profiles()? {
                println!(
                    "{}  {}  {}",
                    profile.email,
                    profile.timezone,
                    profile
                        .biggest_challenge
                        .map(|c| c.as_str())
                        .unwrap_or("-")
                );
            }
        }
    }
    Ok(())
}
