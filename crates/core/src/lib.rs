//! Ragline Core Library
//!
//! This crate provides the foundational utilities shared by the ragline crates:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{AppConfig, ChunkUnit, Distance, StoreBackend};
pub use error::{AppError, AppResult};
