//! Ask command handler.
//!
//! Answers a question from the ingested documents.

use clap::Args;
use ragline_core::{config::AppConfig, AppResult};
use ragline_knowledge::RagServices;

use crate::output::print_json;

/// Answer a question from the ingested documents
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Number of contexts to retrieve (default from config)
    #[arg(short = 'k', long, allow_negative_numbers = true)]
    pub top_k: Option<i64>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let services = RagServices::from_config(config).await?;
        let outcome = services.ask(&self.question, self.top_k).await?;

        if self.json {
            return print_json(&outcome);
        }

        println!("{}", outcome.answer);
        println!();
        if outcome.sources.is_empty() {
            println!("Sources: (no sources available)");
        } else {
            println!("Sources:");
            for source in &outcome.sources {
                println!("- {}", source);
            }
        }
        tracing::debug!("Answer used {} contexts", outcome.num_contexts);

        Ok(())
    }
}
