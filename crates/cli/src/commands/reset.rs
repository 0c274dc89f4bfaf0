//! Reset command handler.

use clap::Args;
use ragline_core::{config::AppConfig, AppError, AppResult};
use ragline_knowledge::open_index;

use crate::output::print_json;

/// Remove every point from the collection
#[derive(Args, Debug)]
pub struct ResetCommand {
    /// Confirm the reset
    #[arg(short, long)]
    pub yes: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ResetCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing reset command");

        if !self.yes {
            return Err(AppError::InvalidArgument(
                "Refusing to reset without --yes".to_string(),
            ));
        }

        let collection = &config.store.collection;
        let index = open_index(&config.store, config.store_api_key()).await?;
        index.reset_collection(collection).await?;

        if self.json {
            print_json(&serde_json::json!({ "reset": collection }))
        } else {
            println!("Collection '{}' reset", collection);
            Ok(())
        }
    }
}
