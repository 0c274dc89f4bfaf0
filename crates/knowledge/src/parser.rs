//! Document loading and text extraction.

use ragline_core::{AppError, AppResult};
use std::fs;
use std::path::Path;

use crate::types::Document;

/// Content type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Pdf,
    Markdown,
    Html,
    PlainText,
    Unknown,
}

impl ContentType {
    /// Detect content type from file extension.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("pdf") => Self::Pdf,
            Some("md") | Some("markdown") => Self::Markdown,
            Some("html") | Some("htm") => Self::Html,
            Some("txt") | Some("text") | Some("rst") => Self::PlainText,
            _ => Self::Unknown,
        }
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::PlainText => "text",
            Self::Unknown => "unknown",
        }
    }
}

/// Load a document from disk.
///
/// `source_id` defaults to the path as given.
pub fn load_document(path: &Path, source_id: Option<&str>) -> AppResult<Document> {
    let text = parse_file(path)?;
    let source_id = source_id
        .map(str::to_string)
        .unwrap_or_else(|| path.to_string_lossy().into_owned());

    tracing::debug!(
        source_id = %source_id,
        bytes = text.len(),
        "Loaded document {:?}",
        path
    );

    Ok(Document::new(source_id, text))
}

/// Parse a source file and extract clean text.
pub fn parse_file(path: &Path) -> AppResult<String> {
    let content_type = ContentType::from_path(path);
    let read_error =
        |e: std::io::Error| AppError::Document(format!("Failed to read {:?}: {}", path, e));

    let cleaned = match content_type {
        ContentType::Pdf => {
            let bytes = fs::read(path).map_err(read_error)?;
            extract_pdf(&bytes)
                .inspect_err(|e| tracing::warn!("Failed to extract {:?}: {}", path, e))?
        }
        ContentType::Markdown => {
            clean_markdown(&fs::read_to_string(path).map_err(read_error)?)
        }
        ContentType::Html => clean_html(&fs::read_to_string(path).map_err(read_error)?),
        ContentType::PlainText => fs::read_to_string(path).map_err(read_error)?,
        ContentType::Unknown => {
            let raw = fs::read_to_string(path).map_err(read_error)?;
            // Try to read as text, skip if binary
            if !is_likely_text(&raw) {
                tracing::warn!("Skipping likely binary file: {:?}", path);
                return Err(AppError::Document(format!(
                    "Binary file not supported: {:?}",
                    path
                )));
            }
            raw
        }
    };

    Ok(cleaned)
}

/// Extract the text layer of a PDF.
pub fn extract_pdf(bytes: &[u8]) -> AppResult<String> {
    pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| AppError::Document(format!("PDF extraction failed: {}", e)))
}

/// Clean markdown by removing excess formatting.
fn clean_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for line in text.lines() {
        // Remove markdown headers
        let trimmed = line.trim_start_matches('#').trim();

        // Skip horizontal rules and code fences
        if trimmed.starts_with("---") || trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            continue;
        }

        if !trimmed.is_empty() {
            result.push_str(trimmed);
            result.push('\n');
        }
    }

    result.trim().to_string()
}

/// Clean HTML by stripping tags, scripts and styles.
fn clean_html(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_tag = false;
    let mut in_script = false;
    let mut in_style = false;

    for (i, ch) in text.char_indices() {
        if ch == '<' {
            in_tag = true;

            let rest = &text[i..];
            if starts_with_ignore_case(rest, "<script") {
                in_script = true;
            } else if starts_with_ignore_case(rest, "</script") {
                in_script = false;
            } else if starts_with_ignore_case(rest, "<style") {
                in_style = true;
            } else if starts_with_ignore_case(rest, "</style") {
                in_style = false;
            }
        } else if ch == '>' {
            in_tag = false;
            result.push(' ');
        } else if !in_tag && !in_script && !in_style {
            result.push(ch);
        }
    }

    // Collapse whitespace
    result.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn starts_with_ignore_case(haystack: &str, prefix: &str) -> bool {
    haystack
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Check if text is likely UTF-8 text (not binary).
fn is_likely_text(data: &str) -> bool {
    !data.contains('\0')
}
