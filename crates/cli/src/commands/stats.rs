//! Stats command handler.
//!
//! Shows the point count of the configured collection.

use clap::Args;
use ragline_core::{config::AppConfig, AppResult};
use ragline_knowledge::{collection_stats, open_index, CollectionTarget};

use crate::output::print_json;

/// Show collection statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let index = open_index(&config.store, config.store_api_key()).await?;
        let target = CollectionTarget::from_settings(&config.store);
        let stats = collection_stats(index.as_ref(), &target).await?;

        if self.json {
            return print_json(&stats);
        }

        println!("Collection: {}", stats.collection);
        println!("  Backend: {}", stats.backend);
        println!("  Points: {}", stats.points);
        println!("  Upsert atomicity: {}", stats.upsert_atomicity.as_str());

        Ok(())
    }
}
