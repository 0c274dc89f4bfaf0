//! Event command handler.
//!
//! Runs one orchestrator event (`rag/ingest_pdf`, `rag/query_pdf_ai`) and
//! prints its JSON result.

use clap::Args;
use ragline_core::{config::AppConfig, AppResult};
use ragline_knowledge::{Event, RagServices};
use std::io::Read;
use std::path::PathBuf;

use crate::output::print_json;

/// Handle one orchestrator event read from a file or stdin
#[derive(Args, Debug)]
pub struct EventCommand {
    /// JSON event file (reads stdin when omitted or "-")
    pub file: Option<PathBuf>,
}

impl EventCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing event command");

        let text = self.read_event()?;
        let event = Event::from_json(&text)?;

        let services = RagServices::from_config(config).await?;
        let result = services.handle_event(&event).await?;

        print_json(&result)
    }

    fn read_event(&self) -> AppResult<String> {
        match &self.file {
            Some(path) if path.as_os_str() != "-" => Ok(std::fs::read_to_string(path)?),
            _ => {
                let mut text = String::new();
                std::io::stdin().read_to_string(&mut text)?;
                Ok(text)
            }
        }
    }
}
