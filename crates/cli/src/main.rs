//! Ragline CLI
//!
//! Main entry point for the ragline command-line tool.
//! Ingests documents into the vector store and answers questions from them.

mod commands;
mod output;

use clap::{Parser, Subcommand};
use commands::{AskCommand, EventCommand, IngestCommand, ResetCommand, StatsCommand};
use ragline_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Ragline - retrieval-augmented answers over your documents
#[derive(Parser, Debug)]
#[command(name = "ragline")]
#[command(about = "Retrieval-augmented answers over your documents", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to config file (default: ./ragline.yaml if present)
    #[arg(short, long, global = true, env = "RAGLINE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ingest documents or directories into the collection
    Ingest(IngestCommand),

    /// Answer a question from the ingested documents
    Ask(AskCommand),

    /// Handle one orchestrator event read from a file or stdin
    Event(EventCommand),

    /// Show collection statistics
    Stats(StatsCommand),

    /// Remove every point from the collection
    Reset(ResetCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Ingest(_) => "ingest",
            Commands::Ask(_) => "ask",
            Commands::Event(_) => "event",
            Commands::Stats(_) => "stats",
            Commands::Reset(_) => "reset",
        }
    }

    /// Whether results (and failures) go to stdout as JSON.
    fn json_output(&self) -> bool {
        match self {
            Commands::Ingest(cmd) => cmd.json,
            Commands::Ask(cmd) => cmd.json,
            Commands::Event(_) => true,
            Commands::Stats(cmd) => cmd.json,
            Commands::Reset(cmd) => cmd.json,
        }
    }
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Load configuration from file and environment, then apply CLI overrides
    let config = AppConfig::load(cli.config)?.with_overrides(
        cli.log_level,
        cli.verbose,
        cli.no_color,
        cli.json_logs,
    );

    // Initialize logging with final configuration
    logging::init_logging(
        config.logging.level.as_deref(),
        config.logging.no_color,
        config.logging.json,
    )?;

    tracing::info!("Ragline CLI starting");
    tracing::debug!(
        config_file = ?config.config_file,
        backend = ?config.store.backend,
        collection = %config.store.collection,
        "Configuration loaded"
    );

    let json_output = cli.command.json_output();
    let _span = tracing::info_span!("command", name = cli.command.name()).entered();

    // Route to command handlers
    let result = match cli.command {
        Commands::Ingest(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Event(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config).await,
        Commands::Reset(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => {
            tracing::error!(kind = e.kind(), retryable = e.is_retryable(), "Command failed: {}", e);
            if json_output {
                output::print_error(e);
            }
        }
    }

    result
}
