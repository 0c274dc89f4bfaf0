//! Text chunking with configurable size and overlap.
//!
//! Text is segmented into units (sentences or words, per UAX #29) and cut
//! into windows of at most `chunk_size` units. Each window after the first
//! starts `overlap` units before the previous window's end. Segmentation is
//! a pure function of the input, so the same text and settings always yield
//! the same chunk sequence, which keeps point ids stable across re-ingestion.

use std::ops::Range;

use ragline_core::config::{ChunkUnit, ChunkingSettings};
use ragline_core::{AppError, AppResult};
use unicode_segmentation::UnicodeSegmentation;

use crate::types::Chunk;

/// Splits document text into overlapping, unit-bounded chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    unit: ChunkUnit,
    chunk_size: usize,
    overlap: usize,
}

impl Chunker {
    /// Create a chunker, validating `chunk_size > 0` and `overlap < chunk_size`.
    pub fn new(unit: ChunkUnit, chunk_size: usize, overlap: usize) -> AppResult<Self> {
        if chunk_size == 0 {
            return Err(AppError::Config(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(AppError::Config(format!(
                "chunk overlap ({}) must be less than chunk_size ({})",
                overlap, chunk_size
            )));
        }

        Ok(Self {
            unit,
            chunk_size,
            overlap,
        })
    }

    pub fn from_settings(settings: &ChunkingSettings) -> AppResult<Self> {
        Self::new(settings.unit, settings.chunk_size, settings.overlap)
    }

    /// Split `text` into chunks owned by `source_id`.
    ///
    /// Empty or whitespace-only text yields no chunks.
    pub fn split(&self, source_id: &str, text: &str) -> Vec<Chunk> {
        let units = self.unit_spans(text);
        if units.is_empty() {
            return Vec::new();
        }

        let chunks: Vec<Chunk> = self
            .windows(units.len())
            .into_iter()
            .enumerate()
            .map(|(index, window)| {
                let bytes = units[window.start].start..units[window.end - 1].end;
                Chunk {
                    index: index as u32,
                    source_id: source_id.to_string(),
                    text: text[bytes].trim().to_string(),
                }
            })
            .collect();

        tracing::debug!(
            source_id,
            units = units.len(),
            chunks = chunks.len(),
            chunk_size = self.chunk_size,
            overlap = self.overlap,
            "Chunked text"
        );

        chunks
    }

    /// Byte ranges of the units in `text`.
    ///
    /// Every unit contains at least one non-whitespace character. Whitespace
    /// (and, for words, punctuation) between units is folded into the
    /// preceding unit.
    pub(crate) fn unit_spans(&self, text: &str) -> Vec<Range<usize>> {
        let segments: Box<dyn Iterator<Item = (usize, &str)> + '_> = match self.unit {
            ChunkUnit::Sentence => Box::new(text.split_sentence_bound_indices()),
            ChunkUnit::Word => Box::new(text.split_word_bound_indices()),
        };

        let mut units: Vec<Range<usize>> = Vec::new();
        for (offset, segment) in segments {
            let end = offset + segment.len();
            let starts_unit = match self.unit {
                ChunkUnit::Sentence => segment.chars().any(|c| !c.is_whitespace()),
                ChunkUnit::Word => {
                    segment.chars().any(char::is_alphanumeric)
                        || (units.is_empty() && segment.chars().any(|c| !c.is_whitespace()))
                }
            };

            if starts_unit {
                units.push(offset..end);
            } else if let Some(last) = units.last_mut() {
                last.end = end;
            }
        }

        units
    }

    /// Unit-index windows covering `unit_count` units.
    pub(crate) fn windows(&self, unit_count: usize) -> Vec<Range<usize>> {
        let mut windows = Vec::new();
        if unit_count == 0 {
            return windows;
        }

        let mut start = 0;
        loop {
            let end = (start + self.chunk_size).min(unit_count);
            windows.push(start..end);
            if end == unit_count {
                break;
            }
            start = end - self.overlap;
        }

        windows
    }
}

/// Chunk text into overlapping segments.
///
/// Convenience wrapper around [`Chunker`]; fails with `AppError::Config`
/// when `chunk_size` is zero or `overlap >= chunk_size`.
pub fn chunk_text(
    source_id: &str,
    text: &str,
    unit: ChunkUnit,
    chunk_size: usize,
    overlap: usize,
) -> AppResult<Vec<Chunk>> {
    Ok(Chunker::new(unit, chunk_size, overlap)?.split(source_id, text))
}
