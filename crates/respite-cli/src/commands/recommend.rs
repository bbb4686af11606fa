use chrono::Utc;
use clap::Subcommand;
use respite_core::workday::local_day_bounds;
use respite_core::{
    Config, CoreError, Database, RecommendationEngine, RecommendationStatus,
};
use tracing::{error, warn};

use super::common::{resolve_user, user_timezone, CliResult};

#[derive(Subcommand)]
pub enum RecommendAction {
    /// Get (or generate) today's best recommendation
    Today {
        #[arg(long)]
        user: Option<String>,
    },
    /// Force regeneration of today's recommendations
    Generate {
        #[arg(long)]
        user: Option<String>,
    },
    /// Regenerate for every profile, continuing past per-user failures
    GenerateAll,
    /// List today's recommendation rows
    List {
        #[arg(long)]
        user: Option<String>,
    },
    /// Accept a recommendation
    Accept { id: String },
    /// Dismiss a recommendation
    Dismiss { id: String },
    /// Mark a recommendation completed and record the break
    Complete {
        id: String,
        /// Quick feedback: did the break help?
        #[arg(long)]
        felt_better: bool,
    },
}

fn engine() -> RecommendationEngine {
    RecommendationEngine::with_config(Config::load_or_default().engine_config())
}

pub fn run(action: RecommendAction) -> CliResult {
    let db = Database::open()?;
    match action {
        RecommendAction::Today { user } => {
            let profile = resolve_user(&db, user.as_deref())?;
            match engine().get_or_generate(&profile.id, Utc::now(), &db) {
                Ok(Some(rec)) => println!("{}", serde_json::to_string_pretty(&rec)?),
                Ok(None) => println!("no recommendation available"),
                // Persistence failure is fatal to the attempt only;
                // the user sees an empty result, the log sees why.
                Err(CoreError::Database(e)) => {
                    error!(user_id = %profile.id, error = %e, "recommendation lookup failed");
                    println!("no recommendation available");
                }
                Err(e) => return Err(e.into()),
            }
        }
        RecommendAction::Generate { user } => {
            let profile = resolve_user(&db, user.as_deref())?;
            let recs = engine().generate_and_store(&profile, Utc::now(), &db)?;
            if recs.is_empty() {
                println!("no qualifying gaps today");
            } else {
                println!("{}", serde_json::to_string_pretty(&recs)?);
            }
        }
        RecommendAction::GenerateAll => {
            let engine = engine();
            let now = Utc::now();
            let mut generated = 0usize;
            for profile in db.list_profiles()? {
                match engine.generate_and_store(&profile, now, &db) {
                    Ok(recs) => generated += recs.len(),
                    Err(e) => {
                        warn!(user_id = %profile.id, error = %e, "generation failed; continuing");
                    }
                }
            }
            println!("generated {generated} recommendations");
        }
        RecommendAction::List { user } => {
            let profile = resolve_user(&db, user.as_deref())?;
            let tz = user_timezone(&profile)?;
            let (day_start, day_end) = local_day_bounds(Utc::now(), tz)?;
            for rec in db.list_recommendations_between(&profile.id, day_start, day_end)? {
                println!(
                    "{}  {:5}  {:12} {:2}min  score {:.2}  {}",
                    rec.id,
                    rec.recommended_time.with_timezone(&tz).format("%H:%M"),
                    rec.category,
                    rec.duration_minutes,
                    rec.score,
                    rec.status.as_str(),
                );
            }
        }
        RecommendAction::Accept { id } => {
            db.update_status(&id, RecommendationStatus::Accepted)?;
            println!("accepted {id}");
        }
        RecommendAction::Dismiss { id } => {
            db.update_status(&id, RecommendationStatus::Dismissed)?;
            println!("dismissed {id}");
        }
        RecommendAction::Complete { id, felt_better } => {
            let rec = db
                .get_recommendation(&id)?
                .ok_or_else(|| format!("no recommendation {id}"))?;
            db.update_status(&id, RecommendationStatus::Completed)?;
            db.record_completed_break(&rec.user_id, Some(&id), Utc::now(), Some(felt_better))?;
            println!("completed {id}");
        }
    }
    Ok(())
}
