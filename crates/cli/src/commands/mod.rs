//! Command handlers for the ragline CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod ask;
pub mod event;
pub mod ingest;
pub mod reset;
pub mod stats;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use event::EventCommand;
pub use ingest::IngestCommand;
pub use reset::ResetCommand;
pub use stats::StatsCommand;
