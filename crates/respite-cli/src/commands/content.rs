use clap::Subcommand;
use respite_core::{ContentItem, Database};

use super::common::CliResult;

#[derive(Subcommand)]
pub enum ContentAction {
    /// Seed the library with starter break content
    Seed,
    /// List library items
    List,
    /// Add a content item
    Add {
        /// Item title
        title: String,
        /// Category label, e.g. meditation
        category: String,
        /// Duration in minutes
        minutes: i64,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        url: Option<String>,
    },
}

pub fn run(action: ContentAction) -> CliResult {
    let db = Database::open()?;
    match action {
        ContentAction::Seed => {
            let inserted = db.seed_content_library()?;
            if inserted == 0 {
                println!("library already seeded");
            } else {
                println!("seeded {inserted} items");
            }
        }
        ContentAction::List => {
            for item in db.list_items()? {
                println!(
                    "{:12} {:3}min  {}{}",
                    item.category,
                    item.duration_minutes,
                    item.title,
                    if item.is_active { "" } else { "  (inactive)" },
                );
            }
        }
        ContentAction::Add {
            title,
            category,
            minutes,
            description,
            url,
        } => {
            let item = ContentItem {
                id: uuid::Uuid::new_v4().to_string(),
                title,
                description,
                category,
                duration_minutes: minutes,
                content_url: url,
                is_active: true,
            };
            db.insert_item(&item)?;
            println!("item added: {}", item.id);
        }
    }
    Ok(())
}
