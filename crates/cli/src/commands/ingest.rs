//! Ingest command handler.
//!
//! Ingests files, or every supported file under a directory.

use clap::Args;
use ragline_core::{config::AppConfig, AppError, AppResult};
use ragline_knowledge::parser::ContentType;
use ragline_knowledge::ingestion_from_config;
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::output::print_json;

/// Ingest documents or directories into the collection
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Files or directories to ingest
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Source identifier (single file only; defaults to the path)
    #[arg(short, long)]
    pub source: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct IngestedFile {
    source: String,
    ingested: usize,
}

#[derive(Debug, Serialize)]
struct IngestReport {
    files: Vec<IngestedFile>,
    ingested: usize,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ingest command");
        tracing::debug!("Ingest options: {:?}", self);

        let files = self.collect_files()?;
        if files.is_empty() {
            return Err(AppError::InvalidArgument(
                "No supported documents found in the given paths".to_string(),
            ));
        }

        let pipeline = ingestion_from_config(config).await?;

        let mut report = IngestReport {
            files: Vec::with_capacity(files.len()),
            ingested: 0,
        };

        for file in &files {
            let outcome = pipeline.run(file, self.source.as_deref()).await?;
            let source = self
                .source
                .clone()
                .unwrap_or_else(|| file.to_string_lossy().into_owned());

            if !self.json {
                println!("Ingested {} chunks from {}", outcome.ingested, source);
            }

            report.ingested += outcome.ingested;
            report.files.push(IngestedFile {
                source,
                ingested: outcome.ingested,
            });
        }

        if self.json {
            print_json(&report)?;
        } else if report.files.len() > 1 {
            println!(
                "Total: {} chunks from {} files",
                report.ingested,
                report.files.len()
            );
        }

        Ok(())
    }

    /// Expand directories into their supported files, in a stable order.
    fn collect_files(&self) -> AppResult<Vec<PathBuf>> {
        let mut files = Vec::new();

        for path in &self.paths {
            if path.is_dir() {
                if self.source.is_some() {
                    return Err(AppError::InvalidArgument(format!(
                        "--source cannot be used with directory {}",
                        path.display()
                    )));
                }
                files.extend(walk_supported(path));
            } else {
                files.push(path.clone());
            }
        }

        if self.source.is_some() && files.len() > 1 {
            return Err(AppError::InvalidArgument(
                "--source can only be used with a single file".to_string(),
            ));
        }

        Ok(files)
    }
}

fn walk_supported(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| ContentType::from_path(p) != ContentType::Unknown)
        .collect();
    files.sort();

    tracing::debug!("Found {} supported files under {:?}", files.len(), dir);
    files
}
